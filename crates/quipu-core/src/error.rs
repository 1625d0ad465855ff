use thiserror::Error;

/// Core error type shared across Quipu crates.
#[derive(Debug, Error)]
pub enum Error {
    /// The run configuration violates an invariant.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// A projected resource footprint exceeds a configured ceiling.
    #[error("capacity exceeded: {0}")]
    Capacity(String),
    /// An internal invariant was violated; indicates a logic defect.
    #[error("internal invariant violated: {0}")]
    Internal(String),
}

/// Convenience alias for results returned by Quipu crates.
pub type Result<T> = std::result::Result<T, Error>;
