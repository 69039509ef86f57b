//! Trial record envelope.
//!
//! A trial record's signature is not a signature in the asymmetric sense: it
//! is a sealed copy of the record's own spec. Layout before base64:
//!
//! ```text
//! [i32 BE: -version][i32 BE: blob length][blob: nonce || ciphertext]
//! ```
//!
//! Any field edited after sealing makes the record differ from the sealed
//! copy, and any edit to the envelope itself fails AEAD authentication.

use crate::error::{LicenseError, LicenseResult};
use crate::record::{EntitlementRecord, RecordSpec, CURRENT_VERSION};
use base64::{engine::general_purpose::STANDARD, Engine};
use entitle_crypto::{open, seal, EnvelopeKey, SealedBlob};

const HEADER_LEN: usize = 8;

/// Seals `spec` into a base64 envelope string.
pub fn seal_trial_envelope(
    spec: &RecordSpec,
    version: i32,
    key: &EnvelopeKey,
) -> LicenseResult<String> {
    let plaintext = serde_json::to_vec(spec)?;
    let blob = seal(key, &plaintext)?.to_bytes();
    let blob_len = i32::try_from(blob.len())
        .map_err(|_| LicenseError::InvalidEnvelope("sealed spec too large".to_string()))?;

    let mut bytes = Vec::with_capacity(HEADER_LEN + blob.len());
    bytes.extend_from_slice(&version.wrapping_neg().to_be_bytes());
    bytes.extend_from_slice(&blob_len.to_be_bytes());
    bytes.extend_from_slice(&blob);
    Ok(STANDARD.encode(bytes))
}

/// Opens a base64 envelope, returning the sealed version and spec.
///
/// # Errors
///
/// `InvalidEnvelope` for bad base64, short headers, length prefixes that do
/// not match the payload, or undecodable plaintext; `Crypto` when the blob
/// does not authenticate under `key`.
pub fn open_trial_envelope(
    signature: &str,
    key: &EnvelopeKey,
) -> LicenseResult<(i32, RecordSpec)> {
    let bytes = STANDARD
        .decode(signature)
        .map_err(|e| LicenseError::InvalidEnvelope(format!("invalid base64: {e}")))?;

    if bytes.len() < HEADER_LEN {
        return Err(LicenseError::InvalidEnvelope("truncated header".to_string()));
    }
    let (header, blob) = bytes.split_at(HEADER_LEN);
    let marker = i32::from_be_bytes([header[0], header[1], header[2], header[3]]);
    let declared = i32::from_be_bytes([header[4], header[5], header[6], header[7]]);

    if usize::try_from(declared).ok() != Some(blob.len()) {
        return Err(LicenseError::InvalidEnvelope(format!(
            "length prefix {declared} does not match {} payload bytes",
            blob.len()
        )));
    }

    let sealed = SealedBlob::from_bytes(blob)?;
    let plaintext = open(key, &sealed)?;
    let spec: RecordSpec = serde_json::from_slice(&plaintext)
        .map_err(|e| LicenseError::InvalidEnvelope(format!("undecodable spec: {e}")))?;

    Ok((marker.wrapping_neg(), spec))
}

/// Builds a trial record whose signature is the envelope of its own spec.
pub fn sign_trial(spec: RecordSpec, key: &EnvelopeKey) -> LicenseResult<EntitlementRecord> {
    if !spec.auto_generated {
        return Err(LicenseError::KindMismatch(
            "only auto-generated records carry a trial envelope".to_string(),
        ));
    }
    let signature = seal_trial_envelope(&spec, CURRENT_VERSION, key)?;
    spec.into_record(CURRENT_VERSION, signature)
}
