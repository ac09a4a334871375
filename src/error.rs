//! Errors returned by tree construction and queries.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VpTreeError {
    /// The point data (or a query) is empty, ragged, or holds non-finite values.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A query point does not have the dimension of the indexed points.
    #[error("dimension mismatch: tree has dimension {expected}, query has {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// A call or configuration argument is out of range (e.g. `k == 0`).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("failed to start worker pool: {0}")]
    WorkerPool(String),
}

pub type Result<T> = std::result::Result<T, VpTreeError>;
