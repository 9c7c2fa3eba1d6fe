//! Blind index generation for search fields.
//!
//! A search field is never stored in recoverable form. Its column holds
//! `HMAC-SHA256(pepper, len(context) || context || value)`, which is stable for
//! a given key and column (so equality lookups work) and cannot be inverted.

use crate::context::FieldContext;
use crate::error::Error;
use crate::kdf::PEPPER_SIZE;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretVec};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Blind index output size (32 bytes, the full HMAC-SHA256 tag).
pub const BLIND_INDEX_SIZE: usize = 32;

/// Keyed one-way digest for search fields.
pub struct BlindIndexer {
    pepper: SecretVec<u8>,
}

impl BlindIndexer {
    /// Creates an indexer from a 32-byte pepper.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidKey` if the pepper has the wrong size.
    pub fn new(pepper: SecretVec<u8>) -> Result<Self, Error> {
        let len = pepper.expose_secret().len();
        if len != PEPPER_SIZE {
            return Err(Error::InvalidKey(format!(
                "blind index pepper needs {PEPPER_SIZE} bytes, got {len}"
            )));
        }
        Ok(Self { pepper })
    }

    /// Computes the digest of `value` stored in the column named by `context`.
    ///
    /// # Errors
    ///
    /// Returns `Error::IndexGenerationFailed` if the HMAC cannot be keyed.
    ///
    /// # Example
    ///
    /// ```
    /// use cryptorm::blind_index::BlindIndexer;
    /// use cryptorm::context::FieldContext;
    /// use secrecy::SecretVec;
    ///
    /// let indexer = BlindIndexer::new(SecretVec::new(vec![42u8; 32])).unwrap();
    /// let ctx = FieldContext::new("users", "email");
    ///
    /// let a = indexer.digest(b"alice@example.com", &ctx).unwrap();
    /// let b = indexer.digest(b"alice@example.com", &ctx).unwrap();
    /// assert_eq!(a, b);
    /// ```
    pub fn digest(&self, value: &[u8], context: &FieldContext<'_>) -> Result<Vec<u8>, Error> {
        let mut mac = HmacSha256::new_from_slice(self.pepper.expose_secret())
            .map_err(|e| Error::IndexGenerationFailed(format!("invalid pepper: {e}")))?;

        // Length prefix keeps `("ab", "c")` and `("a", "bc")` apart
        let context = context.to_bytes();
        mac.update(&(context.len() as u64).to_be_bytes());
        mac.update(&context);
        mac.update(value);

        Ok(mac.finalize().into_bytes().to_vec())
    }
}

impl Clone for BlindIndexer {
    fn clone(&self) -> Self {
        Self { pepper: SecretVec::new(self.pepper.expose_secret().clone()) }
    }
}
