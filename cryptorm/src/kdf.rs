//! Key derivation using HKDF (HMAC-based Key Derivation Function).
//!
//! The session's [`EncryptionKey`] is never used directly. Each protection
//! strategy gets its own subkey, expanded with HKDF-SHA256 under a purpose
//! label so the cipher key and the blind-index pepper stay independent.

use crate::error::Error;
use crate::key::EncryptionKey;
use hkdf::Hkdf;
use secrecy::{ExposeSecret, SecretVec};
use sha2::Sha256;

/// Salt shared by every derivation in this crate.
const KDF_SALT: &[u8] = b"cryptorm/kdf/v1";

/// AES-256-SIV key size in bytes (two 256-bit halves).
pub const SIV_KEY_SIZE: usize = 64;

/// Blind-index pepper size in bytes.
pub const PEPPER_SIZE: usize = 32;

/// What a derived subkey is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPurpose {
    /// Deterministic encryption of protected-value fields.
    FieldEncryption,
    /// Keyed digests of search fields.
    BlindIndex,
}

impl KeyPurpose {
    const fn label(self) -> &'static [u8] {
        match self {
            Self::FieldEncryption => b"cryptorm|field-encryption|aes-256-siv",
            Self::BlindIndex => b"cryptorm|blind-index|hmac-sha256",
        }
    }

    /// Output length for this purpose.
    #[must_use]
    pub const fn key_size(self) -> usize {
        match self {
            Self::FieldEncryption => SIV_KEY_SIZE,
            Self::BlindIndex => PEPPER_SIZE,
        }
    }
}

/// Derives the subkey for `purpose` from the session key.
///
/// # Errors
///
/// Returns `Error::KeyDerivation` if HKDF cannot expand to the requested size.
///
/// # Example
///
/// ```
/// use cryptorm::kdf::{derive_subkey, KeyPurpose};
/// use cryptorm::EncryptionKey;
///
/// let key = EncryptionKey::from_bytes(vec![7u8; 32]).unwrap();
/// let siv_key = derive_subkey(&key, KeyPurpose::FieldEncryption).unwrap();
/// ```
pub fn derive_subkey(key: &EncryptionKey, purpose: KeyPurpose) -> Result<SecretVec<u8>, Error> {
    let hkdf = Hkdf::<Sha256>::new(Some(KDF_SALT), key.secret().expose_secret());

    let mut okm = vec![0u8; purpose.key_size()];
    hkdf.expand(purpose.label(), &mut okm).map_err(|_| Error::KeyDerivation)?;

    Ok(SecretVec::new(okm))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(byte: u8) -> EncryptionKey {
        EncryptionKey::from_bytes(vec![byte; 32]).unwrap()
    }

    #[test]
    fn test_derive_subkey_deterministic() {
        let a = derive_subkey(&key(1), KeyPurpose::BlindIndex).unwrap();
        let b = derive_subkey(&key(1), KeyPurpose::BlindIndex).unwrap();

        assert_eq!(a.expose_secret(), b.expose_secret());
    }

    #[test]
    fn test_purposes_are_independent() {
        let enc = derive_subkey(&key(1), KeyPurpose::FieldEncryption).unwrap();
        let idx = derive_subkey(&key(1), KeyPurpose::BlindIndex).unwrap();

        assert_ne!(&enc.expose_secret()[..PEPPER_SIZE], idx.expose_secret().as_slice());
    }

    #[test]
    fn test_output_lengths() {
        let enc = derive_subkey(&key(3), KeyPurpose::FieldEncryption).unwrap();
        let idx = derive_subkey(&key(3), KeyPurpose::BlindIndex).unwrap();

        assert_eq!(enc.expose_secret().len(), SIV_KEY_SIZE);
        assert_eq!(idx.expose_secret().len(), PEPPER_SIZE);
    }

    #[test]
    fn test_different_keys_different_subkeys() {
        let a = derive_subkey(&key(1), KeyPurpose::FieldEncryption).unwrap();
        let b = derive_subkey(&key(2), KeyPurpose::FieldEncryption).unwrap();

        assert_ne!(a.expose_secret(), b.expose_secret());
    }

    // RFC 5869 Test Vector (using HKDF-SHA256)
    // https://tools.ietf.org/html/rfc5869#appendix-A.1
    #[test]
    fn test_hkdf_rfc5869_test_case_1() {
        const IKM_HEX: &str = "0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b";
        const SALT_HEX: &str = "000102030405060708090a0b0c";
        const INFO_HEX: &str = "f0f1f2f3f4f5f6f7f8f9";
        const EXPECTED_OKM_HEX: &str =
            "3cb25f25faacd57a90434f64d0362f2a2d2d0a90cf1a5a4c5db02d56ecc4c5bf34007208d5b887185865";

        let ikm = hex::decode(IKM_HEX).unwrap();
        let salt = hex::decode(SALT_HEX).unwrap();
        let info = hex::decode(INFO_HEX).unwrap();
        let expected_okm = hex::decode(EXPECTED_OKM_HEX).unwrap();

        let hkdf = Hkdf::<Sha256>::new(Some(&salt), &ikm);
        let mut okm = vec![0u8; 42];
        hkdf.expand(&info, &mut okm).expect("HKDF expand failed");

        assert_eq!(okm, expected_okm);
    }
}
