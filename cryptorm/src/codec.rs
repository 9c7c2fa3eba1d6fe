//! Per-field protection at the storage boundary.
//!
//! The [`Codec`] picks a strategy from the field's declared kind:
//!
//! | kind | `protect` | `unprotect` |
//! |---|---|---|
//! | identifier | integer as is | integer as is |
//! | hashable | keyed digest | `Unsupported` |
//! | boolean, integer, text | AES-SIV ciphertext | decrypt + restore type |
//!
//! Both transforms are pure functions of the session key and the input.
//! Encrypted plaintexts use a tagged canonical encoding:
//!
//! ```text
//! [tag:1][payload]   bool → 1 byte, integer → 8 bytes big-endian, text → UTF-8
//! ```

use crate::blind_index::BlindIndexer;
use crate::context::FieldContext;
use crate::deterministic::DeterministicCipher;
use crate::error::Error;
use crate::kdf::{derive_subkey, KeyPurpose};
use crate::key::EncryptionKey;
use crate::schema::{FieldDescriptor, FieldKind, Protection};
use crate::storage::SqlValue;
use crate::value::{Hashed, Value};
use zeroize::Zeroizing;

const TAG_BOOL: u8 = 0x01;
const TAG_INT: u8 = 0x02;
const TAG_TEXT: u8 = 0x03;

/// Applies and reverses field protection for one encryption key.
#[derive(Clone)]
pub struct Codec {
    cipher: DeterministicCipher,
    indexer: BlindIndexer,
}

impl Codec {
    /// Derives the cipher key and blind-index pepper from `key`.
    ///
    /// # Errors
    ///
    /// Returns `Error::KeyDerivation` if subkey derivation fails.
    pub fn new(key: &EncryptionKey) -> Result<Self, Error> {
        let cipher = DeterministicCipher::new(derive_subkey(key, KeyPurpose::FieldEncryption)?)?;
        let indexer = BlindIndexer::new(derive_subkey(key, KeyPurpose::BlindIndex)?)?;
        Ok(Self { cipher, indexer })
    }

    /// Converts a plaintext value into its stored form.
    ///
    /// # Arguments
    ///
    /// * `table` - Table the field belongs to
    /// * `field` - Declared field
    /// * `value` - Plaintext value, whose kind must match the field's
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The value's kind differs from the declared kind (`TypeMismatch`)
    /// - Hashing or encryption fails
    pub fn protect(
        &self,
        table: &str,
        field: &FieldDescriptor,
        value: &Value,
    ) -> Result<SqlValue, Error> {
        self.protect_column(table, field.name(), field.kind(), value)
    }

    /// [`Codec::protect`] for a column known only by name and kind.
    ///
    /// # Errors
    ///
    /// Same as [`Codec::protect`].
    pub fn protect_column(
        &self,
        table: &str,
        column: &str,
        kind: FieldKind,
        value: &Value,
    ) -> Result<SqlValue, Error> {
        let mismatch = |value: &Value| Error::TypeMismatch {
            field: column.to_string(),
            expected: kind,
            found: value.type_name(),
        };
        if value.kind() != kind {
            return Err(mismatch(value));
        }
        let context = FieldContext::new(table, column);

        match (kind.protection(), value) {
            (Protection::Identity, Value::Id(id)) => Ok(SqlValue::Integer(*id)),
            (Protection::Hash, Value::Hashed(Hashed::Plain(plain))) => {
                Ok(SqlValue::Blob(self.indexer.digest(plain, &context)?))
            }
            (Protection::Hash, Value::Hashed(Hashed::Digest(digest))) => {
                Ok(SqlValue::Blob(digest.as_bytes().to_vec()))
            }
            (Protection::Encrypt, value) => {
                let plaintext = encode(value)?;
                Ok(SqlValue::Blob(self.cipher.encrypt(&plaintext, &context)?))
            }
            (_, value) => Err(mismatch(value)),
        }
    }

    /// Converts a stored form back into its plaintext value.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The field is a search field (`Unsupported`; digests have no inverse)
    /// - The ciphertext is malformed or from another key (`DecryptionFailed`)
    /// - The stored type or decoded tag does not fit the field (`SchemaMismatch`)
    pub fn unprotect(
        &self,
        table: &str,
        field: &FieldDescriptor,
        stored: &SqlValue,
    ) -> Result<Value, Error> {
        self.unprotect_column(table, field.name(), field.kind(), stored)
    }

    /// [`Codec::unprotect`] for a column known only by name and kind.
    ///
    /// # Errors
    ///
    /// Same as [`Codec::unprotect`].
    pub fn unprotect_column(
        &self,
        table: &str,
        column: &str,
        kind: FieldKind,
        stored: &SqlValue,
    ) -> Result<Value, Error> {
        let context = FieldContext::new(table, column);

        match (kind.protection(), stored) {
            (Protection::Hash, _) => Err(Error::Unsupported(format!(
                "`{context}` is a search field; its digest cannot be reversed"
            ))),
            (Protection::Identity, SqlValue::Integer(id)) => Ok(Value::Id(*id)),
            (Protection::Encrypt, SqlValue::Blob(blob)) => {
                let plaintext = Zeroizing::new(self.cipher.decrypt(blob, &context)?);
                decode(&context, kind, &plaintext)
            }
            (_, other) => Err(Error::mismatch(
                table,
                column,
                format!("{kind} column holds {}", other.type_name()),
            )),
        }
    }
}

fn encode(value: &Value) -> Result<Zeroizing<Vec<u8>>, Error> {
    let mut out = Zeroizing::new(Vec::new());
    match value {
        Value::Bool(b) => out.extend_from_slice(&[TAG_BOOL, u8::from(*b)]),
        Value::Int(n) => {
            out.push(TAG_INT);
            out.extend_from_slice(&n.to_be_bytes());
        }
        Value::Text(s) => {
            out.push(TAG_TEXT);
            out.extend_from_slice(s.as_bytes());
        }
        Value::Id(_) | Value::Hashed(_) => {
            let kind = value.type_name();
            return Err(Error::Unsupported(format!("{kind} values are not encrypted")));
        }
    }
    Ok(out)
}

fn decode(context: &FieldContext<'_>, kind: FieldKind, plaintext: &[u8]) -> Result<Value, Error> {
    let malformed = |reason: &str| {
        Error::DecryptionFailed(format!("malformed plaintext for `{context}`: {reason}"))
    };

    let (tag, payload) = plaintext.split_first().ok_or_else(|| malformed("empty"))?;
    let expected = match kind {
        FieldKind::Boolean => TAG_BOOL,
        FieldKind::Integer => TAG_INT,
        FieldKind::Text => TAG_TEXT,
        FieldKind::Identifier | FieldKind::Hashable => {
            return Err(Error::Unsupported(format!("{kind} fields are not encrypted")))
        }
    };
    if *tag != expected {
        return Err(Error::mismatch(
            context.table(),
            context.column(),
            format!("stored value is not {kind} (tag {tag:#04x})"),
        ));
    }

    match kind {
        FieldKind::Boolean => match payload {
            [0] => Ok(Value::Bool(false)),
            [1] => Ok(Value::Bool(true)),
            _ => Err(malformed("invalid boolean")),
        },
        FieldKind::Integer => {
            let bytes: [u8; 8] = payload.try_into().map_err(|_| malformed("invalid integer"))?;
            Ok(Value::Int(i64::from_be_bytes(bytes)))
        }
        _ => String::from_utf8(payload.to_vec())
            .map(Value::Text)
            .map_err(|_| malformed("invalid UTF-8")),
    }
}
