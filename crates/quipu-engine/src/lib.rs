//! Generation control plane for Quipu.
//!
//! This crate turns a simulation window and an aggregate demand model into
//! a day-by-day production schedule, injects deterministic dirty data, and
//! adaptively resizes the unit of work under memory pressure while keeping
//! output bit-exact across execution strategies.

pub mod budget;
pub mod calendar;
pub mod chaos;
pub mod domain;
pub mod errors;
pub mod estimator;
pub mod orchestrator;
pub mod seed;
pub mod sink;

pub use budget::{
    BudgetSnapshot, MemoryProbe, MemoryReading, ResourceBudget, SystemMemoryProbe, Tier,
};
pub use calendar::{DayEntry, DaySchedule, DemandCalendar};
pub use chaos::{ChaosEngine, ChaosProfile};
pub use domain::{DomainHandler, DomainRegistry};
pub use errors::EngineError;
pub use estimator::{HeuristicEstimator, SizeEstimate, SizeEstimator};
pub use orchestrator::{RunOrchestrator, RunOutcome, Strategy, TableCount};
pub use seed::SeedDerivation;
pub use sink::{Batch, CsvSink, MemorySink, Sink, SinkAck};
