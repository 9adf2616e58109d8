use thiserror::Error;

/// Errors a caller can hit while configuring or fitting a forest. Panics are
/// reserved for internal invariant violations (a pipeline wiring mistake
/// inside this crate); this enum is for problems the caller's inputs can
/// actually cause.
#[derive(Error, Debug)]
pub enum ForesterError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("dataset has no samples")]
    EmptyDataset,

    #[error("dimension mismatch: expected {expected} rows, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}
