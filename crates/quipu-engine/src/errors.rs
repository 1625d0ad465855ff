use thiserror::Error;

/// Errors emitted by the generation control plane.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Core(#[from] quipu_core::Error),
    #[error("unknown domain '{0}'")]
    UnknownDomain(String),
    #[error("unknown table '{0}'")]
    UnknownTable(String),
    #[error("sink failure: {0}")]
    Sink(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
