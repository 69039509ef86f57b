//! Envelope key derivation.
//!
//! Nodes never exchange the envelope key. Each one derives it with Argon2id
//! from the shared cluster secret and the deployment salt, so every node of a
//! cluster ends up holding the same 32 bytes.

use crate::error::{CryptoError, CryptoResult};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::{rngs::OsRng, RngCore};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Size of envelope keys in bytes (256 bits for ChaCha20).
pub const KEY_SIZE: usize = 32;

/// Size of salt in bytes.
pub const SALT_SIZE: usize = 16;

/// A symmetric envelope key, wiped on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct EnvelopeKey([u8; KEY_SIZE]);

impl EnvelopeKey {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }

    /// Derives the envelope key from the cluster secret.
    ///
    /// # Errors
    ///
    /// `KeyDerivation` for an empty secret or parameters Argon2 rejects.
    pub fn derive(secret: &str, salt: &Salt, params: &KdfParams) -> CryptoResult<Self> {
        if secret.is_empty() {
            return Err(CryptoError::KeyDerivation("empty cluster secret".to_string()));
        }
        let mut key = Self([0u8; KEY_SIZE]);
        params
            .argon2()?
            .hash_password_into(secret.as_bytes(), salt.as_bytes(), &mut key.0)
            .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
        Ok(key)
    }
}

impl fmt::Debug for EnvelopeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EnvelopeKey([REDACTED])")
    }
}

/// Key derivation salt. Fixed per deployment, not per node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Salt([u8; SALT_SIZE]);

impl Salt {
    /// The salt used when a deployment does not configure its own.
    pub const DEFAULT: Self = Self(*b"entitle-envelope");

    pub fn random() -> Self {
        let mut bytes = [0u8; SALT_SIZE];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn from_bytes(bytes: [u8; SALT_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; SALT_SIZE] {
        &self.0
    }
}

impl Default for Salt {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Argon2id cost parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KdfParams {
    /// Memory cost in KiB.
    pub memory_cost: u32,
    /// Iterations.
    pub time_cost: u32,
    /// Lanes.
    pub parallelism: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        // Derived once per process start; 19 MiB, 2 passes.
        Self {
            memory_cost: 19 * 1024,
            time_cost: 2,
            parallelism: 1,
        }
    }
}

impl KdfParams {
    /// Cheap parameters for tests and local demos. Not for production.
    pub fn fast() -> Self {
        Self {
            memory_cost: 1024,
            time_cost: 1,
            parallelism: 1,
        }
    }

    fn argon2(&self) -> CryptoResult<Argon2<'static>> {
        let params = Params::new(
            self.memory_cost,
            self.time_cost,
            self.parallelism,
            Some(KEY_SIZE),
        )
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }
}

/// Generates a random envelope key (tests, single-node demos).
pub fn generate_random_key() -> EnvelopeKey {
    let mut key = EnvelopeKey([0u8; KEY_SIZE]);
    OsRng.fill_bytes(&mut key.0);
    key
}
