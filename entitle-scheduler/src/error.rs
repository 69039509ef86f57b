//! Error types for the scheduler.

use thiserror::Error;

/// Result type for scheduler operations.
pub type SchedulerResult<T> = Result<T, SchedulerError>;

/// Errors that can occur in the scheduler.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// `start` was called outside a tokio runtime.
    #[error("no async runtime available to run the scheduler loop")]
    NoRuntime,

    /// A listener failed while handling an event.
    #[error("listener failed: {0}")]
    Listener(String),
}
