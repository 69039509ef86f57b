//! Entitlement records and their lifecycle.
//!
//! This crate handles:
//! - The immutable, signed `EntitlementRecord` and its wire layout
//! - Lifecycle state derivation (`Enabled` / `GracePeriod` / `Disabled`)
//! - Signature verification for vendor-issued and trial records
//! - Expiration warning schedules
//!
//! # Signature schemes
//!
//! - **Issued records** carry a base64 Ed25519 signature over the canonical
//!   JSON of every other field.
//! - **Trial records** carry an envelope: `[i32 -version][i32 len][sealed spec]`,
//!   base64-encoded. Verification opens the envelope and compares the sealed
//!   copy with the record field by field.
//!
//! Everything here is pure: no I/O, no clocks. Callers pass `now` in.

mod envelope;
mod error;
mod policy;
mod record;
mod state;
mod verify;

pub use envelope::{open_trial_envelope, seal_trial_envelope, sign_trial};
pub use error::{LicenseError, LicenseResult};
pub use policy::{
    ExpirationPolicy, GRACE_WARNING, LONG_RANGE_WARNING, SHORT_RANGE_WARNING,
};
pub use record::{
    EntitlementRecord, OperationMode, RecordSpec, StoredEntitlement, CURRENT_VERSION,
};
pub use state::{LifecycleState, StateResolver, DEFAULT_GRACE_PERIOD_MS};
pub use verify::Verifier;
