use std::path::Path;

use chrono::NaiveDate;
use serde::Deserialize;

use quipu_core::{ChaosLevel, DemandModel, ResourceLimits, RunConfig, SimulationWindow};
use quipu_domains::SalesParams;

/// TOML file shape. The core never parses files; this module maps the user
/// configuration onto the immutable run record.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub daily_avg_transactions: f64,
    /// Absent means no corruption at all.
    #[serde(default)]
    pub chaos_level: Option<ChaosLevel>,
    #[serde(default)]
    pub chaos: ChaosSection,
    #[serde(default)]
    pub demand: Option<DemandModel>,
    #[serde(default)]
    pub limits: Option<ResourceLimits>,
    #[serde(default)]
    pub sales: Option<SalesParams>,
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChaosSection {
    pub global_seed: u64,
}

impl Default for ChaosSection {
    fn default() -> Self {
        Self { global_seed: 42 }
    }
}

pub struct LoadedConfig {
    pub run: RunConfig,
    pub sales: SalesParams,
}

pub fn load(path: &Path) -> Result<LoadedConfig, crate::CliError> {
    let text = std::fs::read_to_string(path)?;
    let file: FileConfig = toml::from_str(&text)?;

    let mut run = RunConfig::new(SimulationWindow::new(file.start_date, file.end_date));
    if let Some(demand) = file.demand {
        run.demand = demand;
    }
    run.demand.base_daily_rate = file.daily_avg_transactions;
    run.chaos.global_seed = file.chaos.global_seed;
    run.chaos.level = file.chaos_level;
    if let Some(limits) = file.limits {
        run.limits = limits;
    }

    Ok(LoadedConfig {
        run,
        sales: file.sales.unwrap_or_default(),
    })
}
