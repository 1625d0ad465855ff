use std::collections::BTreeMap;
use std::ops::Range;

use quipu_core::{Row, TableSpec};

use crate::calendar::DaySchedule;
use crate::errors::EngineError;

/// Producer of clean rows for one business domain.
///
/// Implementations must be deterministic for a fixed range and schedule,
/// and must assign every row-local identifier as a function of the GLOBAL
/// row index, never of the batch position.
pub trait DomainHandler {
    fn name(&self) -> &str;

    /// Table metadata in emission order: dimensions first, then facts.
    fn tables(&self) -> &[TableSpec];

    /// Materialize clean rows for exactly `range`. For dimension tables the
    /// range covers `0..fixed_count`; for fact tables it is a slice of the
    /// schedule's global row-index partition.
    fn materialize(
        &self,
        table: &str,
        range: Range<u64>,
        schedule: &DaySchedule,
    ) -> Result<Vec<Row>, EngineError>;

    fn table(&self, name: &str) -> Option<&TableSpec> {
        self.tables().iter().find(|spec| spec.name == name)
    }
}

/// Explicit handler registry, constructed at startup and passed to the
/// orchestrator. Lookup is by domain name; there is no global state.
#[derive(Default)]
pub struct DomainRegistry {
    handlers: BTreeMap<String, Box<dyn DomainHandler>>,
}

impl DomainRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, handler: Box<dyn DomainHandler>) {
        self.handlers.insert(handler.name().to_string(), handler);
    }

    pub fn get(&self, domain: &str) -> Result<&dyn DomainHandler, EngineError> {
        self.handlers
            .get(domain)
            .map(|handler| handler.as_ref())
            .ok_or_else(|| EngineError::UnknownDomain(domain.to_string()))
    }

    pub fn domains(&self) -> Vec<&str> {
        self.handlers.keys().map(String::as_str).collect()
    }
}
