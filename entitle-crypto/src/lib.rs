//! Cryptographic primitives for the entitlement core.
//!
//! Two independent schemes are provided:
//! - **Issuer signatures** (Ed25519): externally issued records are signed by
//!   the vendor's private key and verified with the embedded public key.
//! - **Envelope sealing** (ChaCha20-Poly1305): system-generated trial records
//!   carry an encrypted copy of themselves, sealed with a key every node
//!   derives from the shared cluster secret (Argon2id).
//!
//! Neither scheme knows anything about record layout; callers hand in bytes.

mod cipher;
mod error;
mod key;
mod signing;

pub use cipher::{open, seal, SealedBlob, NONCE_SIZE, TAG_SIZE};
pub use error::{CryptoError, CryptoResult};
pub use key::{generate_random_key, EnvelopeKey, KdfParams, Salt, KEY_SIZE, SALT_SIZE};
pub use signing::{IssuerKeyPair, IssuerSignature, IssuerSigningKey, IssuerVerifyingKey};
