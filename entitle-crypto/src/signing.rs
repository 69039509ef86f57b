//! Ed25519 issuer keys for externally issued records.

use crate::error::{CryptoError, CryptoResult};
use base64::{engine::general_purpose::STANDARD, Engine};
use ed25519_dalek::{
    Signature as DalekSignature, Signer as _, SigningKey as DalekSigningKey, Verifier as _,
    VerifyingKey as DalekVerifyingKey,
};
use rand::rngs::OsRng;

/// Issuer secret key. Only the vendor holds this.
pub struct IssuerSigningKey(DalekSigningKey);

/// Issuer public key, embedded in every node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IssuerVerifyingKey(DalekVerifyingKey);

/// A detached Ed25519 signature.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IssuerSignature(DalekSignature);

/// A keypair for signing and verification.
pub struct IssuerKeyPair {
    pub signing_key: IssuerSigningKey,
    pub verifying_key: IssuerVerifyingKey,
}

impl IssuerKeyPair {
    /// Generates a new random keypair.
    pub fn generate() -> Self {
        let signing = DalekSigningKey::generate(&mut OsRng);
        let verifying = signing.verifying_key();
        Self {
            signing_key: IssuerSigningKey(signing),
            verifying_key: IssuerVerifyingKey(verifying),
        }
    }
}

impl IssuerSigningKey {
    /// Creates a signing key from a raw 32-byte secret.
    pub fn from_bytes(bytes: &[u8; 32]) -> Self {
        Self(DalekSigningKey::from_bytes(bytes))
    }

    /// Signs a message.
    pub fn sign(&self, message: &[u8]) -> IssuerSignature {
        IssuerSignature(self.0.sign(message))
    }

    /// Returns the corresponding verifying key.
    pub fn verifying_key(&self) -> IssuerVerifyingKey {
        IssuerVerifyingKey(self.0.verifying_key())
    }
}

impl std::fmt::Debug for IssuerSigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssuerSigningKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

impl IssuerVerifyingKey {
    /// Creates a verifying key from a raw 32-byte public key.
    pub fn from_bytes(bytes: &[u8; 32]) -> CryptoResult<Self> {
        DalekVerifyingKey::from_bytes(bytes)
            .map(Self)
            .map_err(|_| CryptoError::InvalidKey("not a valid Ed25519 public key".to_string()))
    }

    /// Parses a base64-encoded 32-byte public key.
    pub fn from_base64(encoded: &str) -> CryptoResult<Self> {
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|e| CryptoError::InvalidKey(format!("invalid base64: {e}")))?;
        let bytes: [u8; 32] = bytes.try_into().map_err(|b: Vec<u8>| {
            CryptoError::InvalidKey(format!("expected 32 bytes, got {}", b.len()))
        })?;
        Self::from_bytes(&bytes)
    }

    /// Returns the raw 32-byte public key.
    pub fn to_bytes(&self) -> [u8; 32] {
        self.0.to_bytes()
    }

    /// Returns the base64 encoding of the public key.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.0.to_bytes())
    }

    /// Verifies a signature against a message.
    pub fn verify(&self, message: &[u8], signature: &IssuerSignature) -> CryptoResult<()> {
        self.0
            .verify(message, &signature.0)
            .map_err(|_| CryptoError::SignatureMismatch)
    }
}

impl IssuerSignature {
    /// Creates a signature from raw bytes.
    pub fn from_slice(bytes: &[u8]) -> CryptoResult<Self> {
        DalekSignature::from_slice(bytes)
            .map(Self)
            .map_err(|_| CryptoError::InvalidSignature(format!("expected 64 bytes, got {}", bytes.len())))
    }

    /// Returns the raw 64-byte signature.
    pub fn to_bytes(&self) -> [u8; 64] {
        self.0.to_bytes()
    }
}
