//! Error types for the store layer.

use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur talking to the replicated store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store cannot serve reads or writes right now (no quorum, no
    /// leader, shutting down). Callers treat this as "no current state".
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The requested write would break the value lifecycle.
    #[error("illegal transition: {0}")]
    IllegalTransition(String),
}
