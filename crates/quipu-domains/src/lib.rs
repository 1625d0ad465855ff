//! Business domains for Quipu.
//!
//! Domain handlers produce clean rows behind the engine's `DomainHandler`
//! trait; the control plane owns scheduling, corruption, and batching.

pub mod catalog;
pub mod sales;

pub use sales::{SalesDomain, SalesParams};

use quipu_engine::DomainRegistry;

/// Registry with every built-in domain registered.
pub fn builtin_registry(params: SalesParams, global_seed: u64) -> DomainRegistry {
    let mut registry = DomainRegistry::new();
    registry.register(Box::new(SalesDomain::new(params, global_seed)));
    registry
}
