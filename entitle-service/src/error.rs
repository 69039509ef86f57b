//! Error types for the licensing service.

use entitle_license::LicenseError;
use entitle_scheduler::SchedulerError;
use entitle_store::StoreError;
use thiserror::Error;

/// Result type for service operations.
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Errors that can occur in service operations.
///
/// Validation failures are not errors: `register` reports them through
/// `RegistrationStatus`.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Store error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Record construction or signing error.
    #[error("license error: {0}")]
    License(#[from] LicenseError),

    /// Scheduler error.
    #[error("scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),

    /// Another writer committed first. Re-read and retry.
    #[error("write conflict: expected term {expected_term}, store is at {current_term}")]
    Conflict { expected_term: u64, current_term: u64 },
}

/// Result type for dependent callbacks.
pub type DependentResult<T> = Result<T, DependentError>;

/// Errors a dependent reports back from a change notification.
#[derive(Debug, Error)]
pub enum DependentError {
    /// The dependent could not apply the new state.
    #[error("failed to apply entitlement change: {0}")]
    Apply(String),

    /// The dependent is shutting down or otherwise not accepting changes.
    #[error("dependent unavailable: {0}")]
    Unavailable(String),
}
