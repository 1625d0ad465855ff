use std::collections::BTreeMap;
use std::time::Instant;

use serde::Serialize;
use tracing::{info, warn};

use quipu_core::{Error, RunConfig, TableVolume, validate_config};

use crate::budget::{ResourceBudget, Tier};
use crate::calendar::DemandCalendar;
use crate::chaos::ChaosEngine;
use crate::domain::DomainHandler;
use crate::errors::EngineError;
use crate::estimator::SizeEstimator;
use crate::seed::SeedDerivation;
use crate::sink::{Batch, Sink};

/// How the run materializes its rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Everything in one pass.
    Monolithic,
    /// Sequential bounded chunks sized by the resource budget.
    Batched,
}

#[derive(Debug, Clone, Serialize)]
pub struct TableCount {
    pub table: String,
    pub rows: u64,
}

/// Outcome surfaced to callers. An abort is a gracefully handled outcome,
/// not an error: confirmed output stays valid and `checkpoint` names the
/// global row index a resumed run would continue from.
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    pub run_id: String,
    pub domain: String,
    pub strategy: Strategy,
    /// Scheduled logical rows (before duplication).
    pub events_total: u64,
    /// Physical rows confirmed by the sink, duplicates included.
    pub rows_emitted: u64,
    pub final_tier: Tier,
    pub aborted: bool,
    pub checkpoint: Option<u64>,
    pub tables: Vec<TableCount>,
    pub duration_ms: u64,
}

/// Drives one generation run: schedule, capacity gate, strategy selection,
/// and the budget-aware batch loop.
pub struct RunOrchestrator {
    config: RunConfig,
    budget: ResourceBudget,
    estimator: Box<dyn SizeEstimator>,
}

impl RunOrchestrator {
    pub fn new(
        config: RunConfig,
        budget: ResourceBudget,
        estimator: Box<dyn SizeEstimator>,
    ) -> Self {
        Self {
            config,
            budget,
            estimator,
        }
    }

    pub fn run(
        &mut self,
        domain: &dyn DomainHandler,
        sink: &mut dyn Sink,
    ) -> Result<RunOutcome, EngineError> {
        let start = Instant::now();
        let run_id = uuid::Uuid::new_v4().to_string();

        validate_config(&self.config).map_err(EngineError::from)?;
        self.check_capacity()?;

        let seeds = SeedDerivation::new(self.config.chaos.global_seed);
        let calendar = DemandCalendar::new(&self.config.demand, seeds, domain.name());
        let schedule = calendar.build(&self.config.window)?;
        schedule.validate()?;

        let estimate = self.estimator.estimate(&schedule, domain);
        info!(
            run_id = %run_id,
            domain = domain.name(),
            days = schedule.len(),
            events = schedule.total_rows(),
            projected_rows = estimate.projected_rows,
            projected_bytes = estimate.projected_bytes,
            "run scheduled"
        );
        if estimate.projected_bytes > self.config.limits.max_output_bytes {
            return Err(Error::Capacity(format!(
                "projected output of {} bytes exceeds the configured ceiling of {} bytes; \
                 reduce the window or the daily rate",
                estimate.projected_bytes, self.config.limits.max_output_bytes
            ))
            .into());
        }

        let total = schedule.total_rows();
        let strategy = if total <= self.config.limits.monolithic_threshold {
            Strategy::Monolithic
        } else {
            Strategy::Batched
        };
        info!(run_id = %run_id, strategy = ?strategy, total_rows = total, "strategy selected");

        let chaos = ChaosEngine::new(seeds, domain.name(), self.config.chaos.level, total);
        let mut counts: BTreeMap<String, u64> = BTreeMap::new();
        let mut rows_emitted = 0_u64;

        // Dimensions are small and not day-scheduled; emit them up front so
        // facts never reference a dimension the sink has not confirmed.
        for table in domain.tables().iter().filter(|spec| spec.is_dimension()) {
            let TableVolume::Fixed(count) = table.volume else {
                continue;
            };
            let rows = domain.materialize(&table.name, 0..count, &schedule)?;
            if rows.len() as u64 != count {
                return Err(Error::Internal(format!(
                    "table '{}' produced {} rows for range 0..{count}",
                    table.name,
                    rows.len()
                ))
                .into());
            }
            let batch = Batch {
                domain: domain.name(),
                table,
                range: 0..count,
                rows: chaos.corrupt(table, 0, rows),
            };
            let ack = sink.accept(&batch)?;
            rows_emitted += ack.rows_written;
            *counts.entry(table.name.clone()).or_insert(0) += ack.rows_written;
            info!(table = %table.name, rows = ack.rows_written, "dimension emitted");
        }

        let fact_tables: Vec<_> = domain
            .tables()
            .iter()
            .filter(|spec| !spec.is_dimension())
            .collect();

        let mut cursor = 0_u64;
        let mut aborted = false;

        while cursor < total {
            // Re-consult the budget at every batch boundary; on abort the
            // next range is never materialized.
            let snapshot = self.budget.sample();
            if snapshot.tier == Tier::Abort {
                aborted = true;
                warn!(
                    run_id = %run_id,
                    checkpoint = cursor,
                    usage = format!("{:.1}%", snapshot.usage_fraction * 100.0),
                    "resource budget abort; confirmed output preserved"
                );
                break;
            }

            let size = match strategy {
                Strategy::Monolithic => total,
                Strategy::Batched => snapshot.batch_size,
            };
            let end = cursor.saturating_add(size).min(total);

            for &table in &fact_tables {
                let rows = domain.materialize(&table.name, cursor..end, &schedule)?;
                if rows.len() as u64 != end - cursor {
                    return Err(Error::Internal(format!(
                        "table '{}' produced {} rows for range {cursor}..{end}",
                        table.name,
                        rows.len()
                    ))
                    .into());
                }
                let batch = Batch {
                    domain: domain.name(),
                    table,
                    range: cursor..end,
                    rows: chaos.corrupt(table, cursor, rows),
                };
                let ack = sink.accept(&batch)?;
                rows_emitted += ack.rows_written;
                *counts.entry(table.name.clone()).or_insert(0) += ack.rows_written;
            }

            cursor = end;
        }

        sink.finish()?;

        let tables = domain
            .tables()
            .iter()
            .map(|spec| TableCount {
                table: spec.name.clone(),
                rows: counts.get(&spec.name).copied().unwrap_or(0),
            })
            .collect();

        let outcome = RunOutcome {
            run_id: run_id.clone(),
            domain: domain.name().to_string(),
            strategy,
            events_total: total,
            rows_emitted,
            final_tier: self.budget.tier(),
            aborted,
            checkpoint: aborted.then_some(cursor),
            tables,
            duration_ms: start.elapsed().as_millis() as u64,
        };

        if aborted {
            warn!(
                run_id = %run_id,
                rows_emitted,
                checkpoint = cursor,
                "run aborted by resource budget"
            );
        } else {
            info!(
                run_id = %run_id,
                rows_emitted,
                duration_ms = outcome.duration_ms,
                "run completed"
            );
        }

        Ok(outcome)
    }

    fn check_capacity(&self) -> Result<(), EngineError> {
        let limits = &self.config.limits;
        let days = self.config.window.days();
        if days > limits.max_days {
            return Err(Error::Capacity(format!(
                "window of {days} days exceeds the hard limit of {} days",
                limits.max_days
            ))
            .into());
        }
        if self.config.demand.base_daily_rate > limits.max_daily_rate {
            return Err(Error::Capacity(format!(
                "base daily rate {} exceeds the volume cap of {}",
                self.config.demand.base_daily_rate, limits.max_daily_rate
            ))
            .into());
        }
        Ok(())
    }
}
