use serde::Serialize;

use quipu_core::TableVolume;

use crate::calendar::DaySchedule;
use crate::domain::DomainHandler;

/// Uncertainty buffer for overhead, metadata, and size variance.
pub const UNCERTAINTY_FACTOR: f64 = 1.3;

/// Projected footprint of a run, consulted once before strategy selection.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct SizeEstimate {
    pub projected_rows: u64,
    pub projected_bytes: u64,
}

pub trait SizeEstimator {
    fn estimate(&self, schedule: &DaySchedule, domain: &dyn DomainHandler) -> SizeEstimate;
}

/// Bytes-per-row heuristic over every table the domain produces.
#[derive(Debug, Default)]
pub struct HeuristicEstimator;

impl SizeEstimator for HeuristicEstimator {
    fn estimate(&self, schedule: &DaySchedule, domain: &dyn DomainHandler) -> SizeEstimate {
        let mut projected_rows = 0_u64;
        let mut bytes = 0.0_f64;

        for table in domain.tables() {
            let rows = match table.volume {
                TableVolume::Fixed(count) => count,
                TableVolume::PerEvent => schedule.total_rows(),
            };
            projected_rows += rows;
            bytes += rows as f64 * table.avg_row_bytes as f64;
        }

        SizeEstimate {
            projected_rows,
            projected_bytes: (bytes * UNCERTAINTY_FACTOR) as u64,
        }
    }
}
