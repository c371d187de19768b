//! Symmetric encryption of credential fields and one-way password digests.
//!
//! Ciphertext layout: `base64(nonce[12] || aes-256-gcm(plaintext))`.
//! A fresh nonce is drawn per call, so the same plaintext never encrypts to the
//! same string twice.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand::Rng;
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use thiserror::Error;

const NONCE_LEN: usize = 12;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("failed to serialize value for encryption: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("encryption failed")]
    Encrypt,
}

/// Holds the process-wide cipher. The key is the SHA-256 of the configured secret.
#[derive(Clone)]
pub struct CryptoHelper {
    cipher: Aes256Gcm,
}

impl CryptoHelper {
    pub fn new(secret: &str) -> Self {
        let key = Sha256::digest(secret.as_bytes());
        Self {
            cipher: Aes256Gcm::new(&key),
        }
    }

    /// Encrypts a string as-is, or any other value as its canonical JSON text.
    pub fn encrypt<T: Serialize + ?Sized>(&self, value: &T) -> Result<String, CryptoError> {
        let plaintext = match serde_json::to_value(value)? {
            Value::String(s) => s,
            other => serde_json::to_string(&other)?,
        };

        let nonce_bytes: [u8; NONCE_LEN] = rand::thread_rng().gen();
        let ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext.as_bytes())
            .map_err(|_| CryptoError::Encrypt)?;

        let mut blob = nonce_bytes.to_vec();
        blob.extend_from_slice(&ciphertext);
        Ok(STANDARD.encode(blob))
    }

    /// Returns `None` for empty, malformed or foreign ciphertext. Decrypted text
    /// that parses as JSON comes back structured, anything else as a JSON string.
    pub fn decrypt(&self, ciphertext: &str) -> Option<Value> {
        let plaintext = self.decrypt_raw(ciphertext)?;
        Some(serde_json::from_str(&plaintext).unwrap_or(Value::String(plaintext)))
    }

    /// Decrypts to the exact plaintext string without JSON interpretation.
    pub fn decrypt_string(&self, ciphertext: &str) -> Option<String> {
        self.decrypt_raw(ciphertext)
    }

    fn decrypt_raw(&self, ciphertext: &str) -> Option<String> {
        let trimmed = ciphertext.trim();
        if trimmed.is_empty() {
            return None;
        }
        let blob = STANDARD.decode(trimmed).ok()?;
        if blob.len() <= NONCE_LEN {
            return None;
        }
        let (nonce, body) = blob.split_at(NONCE_LEN);
        let plaintext = self.cipher.decrypt(Nonce::from_slice(nonce), body).ok()?;
        String::from_utf8(plaintext).ok()
    }
}

/// Lowercase hex SHA-256 of `plaintext`. Used for password comparison only.
pub fn digest(plaintext: &str) -> String {
    hex::encode(Sha256::digest(plaintext.as_bytes()))
}

/// Constant-time comparison of two digests.
pub fn digests_match(a: &str, b: &str) -> bool {
    a.len() == b.len() && bool::from(a.as_bytes().ct_eq(b.as_bytes()))
}
