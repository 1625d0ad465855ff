//! Core contracts for Quipu.
//!
//! This crate defines the immutable run configuration record, the value/row
//! model, per-table metadata, and validation helpers shared across the
//! engine, domain, and CLI crates.

pub mod config;
pub mod error;
pub mod row;
pub mod table;
pub mod validation;

pub use config::{
    BudgetThresholds, ChaosConfig, ChaosLevel, DemandModel, EventRule, ResourceLimits, RunConfig,
    ShockJitter, SimulationWindow,
};
pub use error::{Error, Result};
pub use row::{ColumnKind, Row, Value};
pub use table::{ColumnSpec, DatePair, ForeignKeyTarget, IdSpace, TableSpec, TableVolume};
pub use validation::validate_config;
