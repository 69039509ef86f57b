//! Envelope sealing using ChaCha20-Poly1305.
//!
//! A blob that opens at all is known to be unmodified, which is what lets a
//! trial record carry its own authenticated copy.

use crate::error::{CryptoError, CryptoResult};
use crate::key::EnvelopeKey;
use chacha20poly1305::aead::{Aead, AeadCore, KeyInit, OsRng};
use chacha20poly1305::{ChaCha20Poly1305, Nonce};

/// Size of nonce in bytes (96 bits for ChaCha20-Poly1305).
pub const NONCE_SIZE: usize = 12;

/// Size of authentication tag in bytes.
pub const TAG_SIZE: usize = 16;

/// A sealed payload. Wire form is `nonce || ciphertext`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SealedBlob {
    pub nonce: [u8; NONCE_SIZE],
    /// Ciphertext followed by the 16-byte tag.
    pub ciphertext: Vec<u8>,
}

impl SealedBlob {
    pub fn len(&self) -> usize {
        NONCE_SIZE + self.ciphertext.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ciphertext.is_empty()
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        [self.nonce.as_slice(), self.ciphertext.as_slice()].concat()
    }

    /// Splits wire bytes into nonce and ciphertext. Anything shorter than a
    /// nonce plus a tag cannot have been produced by `seal`.
    pub fn from_bytes(bytes: &[u8]) -> CryptoResult<Self> {
        if bytes.len() < NONCE_SIZE + TAG_SIZE {
            return Err(CryptoError::Decryption(format!(
                "sealed blob of {} bytes is shorter than nonce and tag",
                bytes.len()
            )));
        }
        let (nonce, ciphertext) = bytes.split_at(NONCE_SIZE);
        let nonce = <[u8; NONCE_SIZE]>::try_from(nonce)
            .map_err(|_| CryptoError::Decryption("malformed nonce".to_string()))?;
        Ok(Self {
            nonce,
            ciphertext: ciphertext.to_vec(),
        })
    }
}

fn cipher_for(key: &EnvelopeKey) -> ChaCha20Poly1305 {
    ChaCha20Poly1305::new(key.as_bytes().into())
}

/// Seals `plaintext` under `key` with a fresh random nonce.
pub fn seal(key: &EnvelopeKey, plaintext: &[u8]) -> CryptoResult<SealedBlob> {
    let nonce = ChaCha20Poly1305::generate_nonce(&mut OsRng);
    let ciphertext = cipher_for(key)
        .encrypt(&nonce, plaintext)
        .map_err(|e| CryptoError::Encryption(e.to_string()))?;
    let mut nonce_bytes = [0u8; NONCE_SIZE];
    nonce_bytes.copy_from_slice(&nonce);
    Ok(SealedBlob {
        nonce: nonce_bytes,
        ciphertext,
    })
}

/// Opens `sealed`. Fails on a wrong key or any modification.
pub fn open(key: &EnvelopeKey, sealed: &SealedBlob) -> CryptoResult<Vec<u8>> {
    cipher_for(key)
        .decrypt(Nonce::from_slice(&sealed.nonce), sealed.ciphertext.as_slice())
        .map_err(|_| CryptoError::Decryption("envelope does not authenticate".to_string()))
}
