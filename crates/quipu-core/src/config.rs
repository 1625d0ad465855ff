use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Simulation window, inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationWindow {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl SimulationWindow {
    pub fn new(start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            start_date,
            end_date,
        }
    }

    /// Number of calendar days covered, counting both endpoints.
    pub fn days(&self) -> i64 {
        (self.end_date - self.start_date).num_days() + 1
    }
}

/// Bounded per-day random multiplier applied on top of the structural model.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ShockJitter {
    pub min: f64,
    pub max: f64,
}

impl Default for ShockJitter {
    fn default() -> Self {
        Self { min: 0.9, max: 1.1 }
    }
}

/// Calendar event affecting the expected daily volume.
///
/// Multipliers of overlapping events combine by maximum, never by product.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventRule {
    /// Recurring fixed-date event, e.g. a public holiday.
    FixedDate { month: u32, day: u32, multiplier: f64 },
    /// Floating observance: the nth occurrence of a weekday in a month
    /// (weekday 0 = Monday). Mother's Day is `{month: 5, weekday: 6, nth: 2}`.
    NthWeekday {
        month: u32,
        weekday: u8,
        nth: u32,
        multiplier: f64,
    },
    /// Linear ramp-up ending on a fixed anchor date: the multiplier grows
    /// from `start_multiplier` to `peak_multiplier` over `days_before` days.
    Ramp {
        month: u32,
        day: u32,
        days_before: u32,
        start_multiplier: f64,
        peak_multiplier: f64,
    },
}

/// Composite multiplicative demand model.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DemandModel {
    /// Expected transactions per day before any multiplier.
    pub base_daily_rate: f64,
    /// Linear annual growth anchored at the window start (1.0 at start).
    pub annual_growth: f64,
    /// Amplitude of the yearly cosine seasonality; must stay below 1.0 so
    /// the factor never reaches zero.
    pub seasonality_amplitude: f64,
    /// Day of year where the seasonal cosine peaks.
    pub seasonality_peak_day: u32,
    /// Raw per-weekday multipliers, Monday first. Not normalized.
    pub weekly_weights: [f64; 7],
    pub events: Vec<EventRule>,
    pub shock: ShockJitter,
}

impl Default for DemandModel {
    fn default() -> Self {
        Self {
            base_daily_rate: 1000.0,
            annual_growth: 0.06,
            seasonality_amplitude: 0.25,
            seasonality_peak_day: 45,
            weekly_weights: [0.9, 0.9, 1.0, 1.05, 1.2, 1.3, 1.1],
            events: Vec::new(),
            shock: ShockJitter::default(),
        }
    }
}

/// Corruption intensity preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChaosLevel {
    Low,
    Medium,
    High,
}

/// Corruption settings, immutable for the run. `level: None` disables all
/// corruption rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChaosConfig {
    pub global_seed: u64,
    pub level: Option<ChaosLevel>,
}

impl Default for ChaosConfig {
    fn default() -> Self {
        Self {
            global_seed: 42,
            level: Some(ChaosLevel::Low),
        }
    }
}

/// Memory-usage fractions gating the resource-budget tiers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetThresholds {
    pub observation: f64,
    pub throttle: f64,
    pub abort: f64,
    /// System-wide airbag: abort when total system memory usage crosses
    /// this fraction, regardless of the process budget.
    pub system_stop: f64,
}

impl Default for BudgetThresholds {
    fn default() -> Self {
        Self {
            observation: 0.70,
            throttle: 0.80,
            abort: 0.90,
            system_stop: 0.95,
        }
    }
}

/// Resource ceilings and batch-sizing knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceLimits {
    /// RAM budget the process usage fraction is measured against.
    pub ram_budget_bytes: u64,
    /// Refuse to start when the projected output exceeds this.
    pub max_output_bytes: u64,
    /// Refuse to start when the window exceeds this many days.
    pub max_days: i64,
    /// Refuse to start when the base daily rate exceeds this.
    pub max_daily_rate: f64,
    pub batch_floor: u64,
    pub batch_ceiling: u64,
    /// At or below this total row count the run is monolithic.
    pub monolithic_threshold: u64,
    /// Consecutive safe samples required before a tier steps down.
    pub hysteresis_samples: u32,
    /// Batch growth applied after a full safe streak at the Normal tier.
    pub growth_factor: f64,
    pub thresholds: BudgetThresholds,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            ram_budget_bytes: 4 * 1024 * 1024 * 1024,
            max_output_bytes: 10 * 1024 * 1024 * 1024,
            max_days: 3660,
            max_daily_rate: 1_000_000.0,
            batch_floor: 500_000,
            batch_ceiling: 5_000_000,
            monolithic_threshold: 5_000_000,
            hysteresis_samples: 3,
            growth_factor: 1.5,
            thresholds: BudgetThresholds::default(),
        }
    }
}

/// Immutable configuration record for one generation run.
///
/// Read once at run start, never mutated. File parsing lives in the CLI;
/// this crate only defines the record and its invariants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub window: SimulationWindow,
    #[serde(default)]
    pub demand: DemandModel,
    #[serde(default)]
    pub chaos: ChaosConfig,
    #[serde(default)]
    pub limits: ResourceLimits,
}

impl RunConfig {
    pub fn new(window: SimulationWindow) -> Self {
        Self {
            window,
            demand: DemandModel::default(),
            chaos: ChaosConfig::default(),
            limits: ResourceLimits::default(),
        }
    }
}
