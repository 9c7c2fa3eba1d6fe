//! Deterministic encryption using AES-SIV for protected-value fields.
//!
//! AES-SIV (Synthetic IV) derives its IV from the key, the associated data
//! and the plaintext, so the same value stored in the same column always
//! produces the same ciphertext. That is what lets a query compare a
//! protected column against an encrypted literal without decrypting rows.
//!
//! # Security Properties
//!
//! - **Deterministic**: Same plaintext + column → same ciphertext
//! - **Authenticated**: Tampering or a wrong key fails decryption
//! - **Column-bound**: The field context is the associated data
//!
//! Deterministic encryption reveals which rows share a value within one
//! column. Nothing else about the plaintext is exposed.
//!
//! # Blob Layout
//!
//! ```text
//! [format_version:1][siv_tag:16][ciphertext:N]
//! ```

use aes_siv::{
    aead::{Aead, KeyInit, Payload},
    Aes256SivAead,
};
use secrecy::{ExposeSecret, SecretVec};
use zeroize::Zeroizing;

use crate::context::FieldContext;
use crate::error::Error;
use crate::kdf::SIV_KEY_SIZE;

/// Version byte prefixed to every ciphertext blob.
pub const FORMAT_VERSION: u8 = 1;

/// Deterministic encryption using AES-256-SIV.
///
/// # Example
///
/// ```
/// use cryptorm::context::FieldContext;
/// use cryptorm::deterministic::DeterministicCipher;
/// use secrecy::SecretVec;
///
/// let cipher = DeterministicCipher::new(SecretVec::new(vec![0u8; 64])).unwrap();
/// let ctx = FieldContext::new("users", "email");
///
/// let ct1 = cipher.encrypt(b"alice@example.com", &ctx).unwrap();
/// let ct2 = cipher.encrypt(b"alice@example.com", &ctx).unwrap();
/// assert_eq!(ct1, ct2);
/// ```
pub struct DeterministicCipher {
    /// AES-256-SIV requires a 64-byte key (512 bits)
    key: SecretVec<u8>,
}

impl DeterministicCipher {
    /// Creates a cipher from a 64-byte key.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidKey` if the key length is not 64 bytes.
    pub fn new(key: SecretVec<u8>) -> Result<Self, Error> {
        let len = key.expose_secret().len();
        if len != SIV_KEY_SIZE {
            return Err(Error::InvalidKey(format!(
                "AES-256-SIV needs {SIV_KEY_SIZE} bytes, got {len}"
            )));
        }
        Ok(Self { key })
    }

    fn cipher(&self) -> Result<Aes256SivAead, String> {
        Aes256SivAead::new_from_slice(self.key.expose_secret())
            .map_err(|e| format!("failed to create AES-SIV cipher: {e}"))
    }

    /// Encrypts `plaintext` for the column named by `context`.
    ///
    /// # Errors
    ///
    /// Returns `Error::EncryptionFailed` if the cipher rejects the input.
    pub fn encrypt(&self, plaintext: &[u8], context: &FieldContext<'_>) -> Result<Vec<u8>, Error> {
        let cipher = self.cipher().map_err(Error::EncryptionFailed)?;

        let aad = Zeroizing::new(context.to_bytes());
        let payload = Payload { msg: plaintext, aad: &aad };

        // AES-SIV is deterministic - uses empty nonce
        let sealed = cipher
            .encrypt(&Default::default(), payload)
            .map_err(|e| Error::EncryptionFailed(format!("AES-SIV encryption failed: {e}")))?;

        let mut blob = Vec::with_capacity(sealed.len() + 1);
        blob.push(FORMAT_VERSION);
        blob.extend_from_slice(&sealed);
        Ok(blob)
    }

    /// Decrypts a blob produced by [`DeterministicCipher::encrypt`].
    ///
    /// # Errors
    ///
    /// Returns `Error::DecryptionFailed` if:
    /// - The blob is empty or carries an unknown format version
    /// - The column context doesn't match
    /// - The key doesn't match or the blob was altered
    pub fn decrypt(&self, blob: &[u8], context: &FieldContext<'_>) -> Result<Vec<u8>, Error> {
        let (version, sealed) = blob
            .split_first()
            .ok_or_else(|| Error::DecryptionFailed("empty ciphertext".to_string()))?;
        if *version != FORMAT_VERSION {
            return Err(Error::DecryptionFailed(format!(
                "unsupported ciphertext version {version} (supported: {FORMAT_VERSION})"
            )));
        }

        let cipher = self.cipher().map_err(Error::DecryptionFailed)?;

        let aad = Zeroizing::new(context.to_bytes());
        let payload = Payload { msg: sealed, aad: &aad };

        cipher.decrypt(&Default::default(), payload).map_err(|_| {
            Error::DecryptionFailed(format!(
                "authentication failed for `{context}`: wrong key or corrupted data"
            ))
        })
    }
}

impl Clone for DeterministicCipher {
    fn clone(&self) -> Self {
        Self { key: SecretVec::new(self.key.expose_secret().clone()) }
    }
}
