//! Error types for the crypto layer.

use thiserror::Error;

/// Result type for crypto operations.
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Errors that can occur in cryptographic operations.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Key derivation failed.
    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    /// Sealing failed.
    #[error("encryption failed: {0}")]
    Encryption(String),

    /// Opening failed (wrong key or tampered data).
    #[error("decryption failed: {0}")]
    Decryption(String),

    /// Key material has the wrong length or is not a valid point.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// Signature bytes are malformed.
    #[error("invalid signature encoding: {0}")]
    InvalidSignature(String),

    /// Signature did not verify.
    #[error("signature verification failed")]
    SignatureMismatch,
}
