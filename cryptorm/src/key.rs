//! Session encryption key.

use crate::error::Error;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand::{rngs::OsRng, RngCore};
use secrecy::{ExposeSecret, SecretVec};
use std::fmt;

/// Minimum accepted key length in bytes.
pub const MIN_KEY_SIZE: usize = 32;

/// Size of keys produced by [`EncryptionKey::generate`].
pub const GENERATED_KEY_SIZE: usize = 32;

/// Secret from which every digest and ciphertext of a session is derived.
///
/// The bytes are held in a [`SecretVec`], so they are zeroized on drop and
/// never appear in `Debug` output.
///
/// # Example
///
/// ```
/// use cryptorm::EncryptionKey;
///
/// let key = EncryptionKey::generate();
/// let encoded = key.to_base64();
/// let restored = EncryptionKey::from_base64(&encoded).unwrap();
/// assert_eq!(restored.len(), key.len());
/// ```
pub struct EncryptionKey {
    secret: SecretVec<u8>,
}

impl EncryptionKey {
    /// Wraps raw key bytes.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidKey` if fewer than [`MIN_KEY_SIZE`] bytes are given.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Result<Self, Error> {
        let bytes = bytes.into();
        if bytes.len() < MIN_KEY_SIZE {
            return Err(Error::InvalidKey(format!(
                "expected at least {MIN_KEY_SIZE} bytes, got {}",
                bytes.len()
            )));
        }
        Ok(Self { secret: SecretVec::new(bytes) })
    }

    /// Decodes a standard base64 key, as printed by `cryptorm keygen`.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidKey` if the input is not base64 or too short.
    pub fn from_base64(encoded: &str) -> Result<Self, Error> {
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|e| Error::InvalidKey(format!("invalid base64: {e}")))?;
        Self::from_bytes(bytes)
    }

    /// Generates a fresh random key from the OS RNG.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = vec![0u8; GENERATED_KEY_SIZE];
        OsRng.fill_bytes(&mut bytes);
        Self { secret: SecretVec::new(bytes) }
    }

    /// Encodes the key as standard base64.
    #[must_use]
    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.secret.expose_secret())
    }

    /// Key length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.secret.expose_secret().len()
    }

    /// Always `false`; construction rejects short keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.secret.expose_secret().is_empty()
    }

    pub(crate) const fn secret(&self) -> &SecretVec<u8> {
        &self.secret
    }
}

impl Clone for EncryptionKey {
    fn clone(&self) -> Self {
        Self { secret: SecretVec::new(self.secret.expose_secret().clone()) }
    }
}

impl fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptionKey").field("len", &self.len()).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_short_key() {
        let result = EncryptionKey::from_bytes(vec![1u8; 16]);
        assert!(matches!(result, Err(Error::InvalidKey(_))));
    }

    #[test]
    fn test_base64_round_trip() {
        let key = EncryptionKey::from_bytes(vec![9u8; 48]).unwrap();
        let restored = EncryptionKey::from_base64(&key.to_base64()).unwrap();

        assert_eq!(restored.secret().expose_secret(), key.secret().expose_secret());
    }

    #[test]
    fn test_invalid_base64() {
        let result = EncryptionKey::from_base64("not base64!!");
        assert!(matches!(result, Err(Error::InvalidKey(_))));
    }

    #[test]
    fn test_generated_keys_differ() {
        let a = EncryptionKey::generate();
        let b = EncryptionKey::generate();

        assert_eq!(a.len(), GENERATED_KEY_SIZE);
        assert_ne!(a.secret().expose_secret(), b.secret().expose_secret());
    }

    #[test]
    fn test_debug_is_redacted() {
        let key = EncryptionKey::from_bytes(vec![0x41; 32]).unwrap();
        let debug = format!("{key:?}");

        assert!(debug.contains("len: 32"));
        assert!(!debug.contains("65"));
    }
}
