//! Error types for the licensing module.

use entitle_crypto::CryptoError;
use entitle_types::Timestamp;
use thiserror::Error;

/// Licensing-specific errors.
#[derive(Debug, Error)]
pub enum LicenseError {
    /// The record would expire before it is issued.
    #[error("issue date {issue} is after expiry date {expiry}")]
    InvalidDates { issue: Timestamp, expiry: Timestamp },

    /// The issuer signature does not match the record.
    #[error("record signature invalid")]
    InvalidSignature,

    /// The trial envelope is malformed or does not match the record.
    #[error("invalid trial envelope: {0}")]
    InvalidEnvelope(String),

    /// A trial operation was given a record that is not auto-generated, or
    /// the other way round.
    #[error("record kind mismatch: {0}")]
    KindMismatch(String),

    /// An expiration policy has unusable parameters.
    #[error("invalid expiration policy: {0}")]
    InvalidPolicy(String),

    /// Underlying cryptographic failure.
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for license operations.
pub type LicenseResult<T> = Result<T, LicenseError>;
