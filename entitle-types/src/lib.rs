//! Core type definitions for the entitlement core.
//!
//! This crate defines the small, domain-agnostic types shared by every other
//! crate in the workspace:
//! - Record identifiers (UUID v4)
//! - Millisecond-resolution timestamps
//! - The `Clock` abstraction used to make time-dependent logic testable

mod clock;
mod ids;
mod timestamp;

pub use clock::{Clock, SystemClock};
pub use ids::RecordId;
pub use timestamp::Timestamp;

#[cfg(any(test, feature = "test-util"))]
pub use clock::ManualClock;

/// Result type for parsing foundation types.
pub type TypesResult<T> = std::result::Result<T, TypesError>;

/// Errors that can occur parsing foundation types.
#[derive(Debug, thiserror::Error)]
pub enum TypesError {
    #[error("invalid record id: {0}")]
    InvalidId(#[from] uuid::Error),
}
