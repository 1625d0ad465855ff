use chrono::Duration;
use rand::Rng;
use rand_chacha::ChaCha8Rng;

use quipu_core::{ChaosLevel, IdSpace, Row, TableSpec, Value};

use crate::seed::SeedDerivation;

/// Per-rule corruption rates derived from the chaos level.
#[derive(Debug, Clone, Copy)]
pub struct ChaosProfile {
    pub null_rate: f64,
    pub duplicate_rate: f64,
    pub orphan_rate: f64,
    pub casing_rate: f64,
    pub spaces_rate: f64,
    pub typo_rate: f64,
    pub paradox_rate: f64,
}

impl ChaosProfile {
    pub fn for_level(level: ChaosLevel) -> Self {
        match level {
            ChaosLevel::Low => Self {
                null_rate: 0.005,
                duplicate_rate: 0.001,
                orphan_rate: 0.001,
                casing_rate: 0.01,
                spaces_rate: 0.005,
                typo_rate: 0.002,
                paradox_rate: 0.001,
            },
            ChaosLevel::Medium => Self {
                null_rate: 0.02,
                duplicate_rate: 0.005,
                orphan_rate: 0.01,
                casing_rate: 0.03,
                spaces_rate: 0.02,
                typo_rate: 0.01,
                paradox_rate: 0.005,
            },
            ChaosLevel::High => Self {
                null_rate: 0.05,
                duplicate_rate: 0.02,
                orphan_rate: 0.03,
                casing_rate: 0.08,
                spaces_rate: 0.05,
                typo_rate: 0.03,
                paradox_rate: 0.02,
            },
        }
    }
}

/// Applies corruption rules to fully-formed clean batches.
///
/// Every decision is drawn from a stream keyed by the GLOBAL row index and
/// a rule+column purpose tag, never by batch position, so any batch plan
/// reproduces byte-identical corrupted output. Rules never drop or reorder
/// clean rows; duplication inserts the duplicate directly after its source
/// row, which keeps placement independent of batch boundaries.
pub struct ChaosEngine {
    seeds: SeedDerivation,
    domain: String,
    profile: Option<ChaosProfile>,
    event_total: u64,
}

impl ChaosEngine {
    pub fn new(
        seeds: SeedDerivation,
        domain: &str,
        level: Option<ChaosLevel>,
        event_total: u64,
    ) -> Self {
        Self {
            seeds,
            domain: domain.to_string(),
            profile: level.map(ChaosProfile::for_level),
            event_total,
        }
    }

    pub fn enabled(&self) -> bool {
        self.profile.is_some()
    }

    /// Corrupt a clean batch. `start_index` is the global index of the
    /// first row. Returns the physical rows, duplicates included.
    pub fn corrupt(&self, table: &TableSpec, start_index: u64, rows: Vec<Row>) -> Vec<Row> {
        let Some(profile) = self.profile else {
            return rows;
        };

        let mut out = Vec::with_capacity(rows.len());
        for (offset, mut row) in rows.into_iter().enumerate() {
            let index = start_index + offset as u64;
            self.corrupt_row(table, &profile, index, &mut row);

            let duplicate = self.roll(table, "duplicate", index) < profile.duplicate_rate;
            out.push(row);
            if duplicate {
                // Re-emit with the same key; a classic double-entry artifact.
                let copy = out.last().cloned().unwrap_or_default();
                out.push(copy);
            }
        }
        out
    }

    fn corrupt_row(&self, table: &TableSpec, profile: &ChaosProfile, index: u64, row: &mut Row) {
        for &col in &table.text_noise {
            let name = table.columns[col].name.as_str();
            if let Value::Text(text) = &mut row[col] {
                self.noise_text(table, name, profile, index, text);
            }
        }

        for &col in &table.nullable {
            let purpose = format!("null:{}", table.columns[col].name);
            if self.roll(table, &purpose, index) < profile.null_rate {
                row[col] = Value::Null;
            }
        }

        for fk in &table.foreign_keys {
            let purpose = format!("orphan:{}", table.columns[fk.column].name);
            let mut rng = self.stream(table, &purpose, index);
            if rng.random::<f64>() < profile.orphan_rate {
                let bound = match fk.id_space {
                    IdSpace::Fixed(count) => count,
                    IdSpace::EventCount => self.event_total,
                };
                let jitter = rng.random_range(0..1000_u64);
                row[fk.column] = Value::Int((bound + 9999 + jitter) as i64);
            }
        }

        for pair in &table.date_pairs {
            let purpose = format!("paradox:{}", table.columns[pair.later].name);
            let mut rng = self.stream(table, &purpose, index);
            if rng.random::<f64>() < profile.paradox_rate {
                let days = rng.random_range(1..=3_i64);
                let earlier = row[pair.earlier].clone();
                match (earlier, &mut row[pair.later]) {
                    (Value::Date(earlier), Value::Date(later)) => {
                        *later = earlier - Duration::days(days);
                    }
                    (Value::Timestamp(earlier), Value::Timestamp(later)) => {
                        *later = earlier - Duration::days(days);
                    }
                    _ => {}
                }
            }
        }
    }

    fn noise_text(
        &self,
        table: &TableSpec,
        column: &str,
        profile: &ChaosProfile,
        index: u64,
        text: &mut String,
    ) {
        let mut rng = self.stream(table, &format!("case:{column}"), index);
        if rng.random::<f64>() < profile.casing_rate {
            *text = if rng.random::<bool>() {
                text.to_uppercase()
            } else {
                text.to_lowercase()
            };
        }

        let mut rng = self.stream(table, &format!("spaces:{column}"), index);
        if rng.random::<f64>() < profile.spaces_rate {
            if rng.random::<bool>() {
                text.insert(0, ' ');
            } else {
                text.push(' ');
            }
        }

        let mut rng = self.stream(table, &format!("typo:{column}"), index);
        if rng.random::<f64>() < profile.typo_rate {
            let mut chars: Vec<char> = text.chars().collect();
            if chars.len() >= 2 {
                let pos = rng.random_range(0..chars.len() - 1);
                chars.swap(pos, pos + 1);
                *text = chars.into_iter().collect();
            }
        }
    }

    fn stream(&self, table: &TableSpec, purpose: &str, index: u64) -> ChaCha8Rng {
        self.seeds.stream(&self.domain, &table.name, purpose, index)
    }

    fn roll(&self, table: &TableSpec, purpose: &str, index: u64) -> f64 {
        self.stream(table, purpose, index).random()
    }
}
