//! Error types for `cryptorm` operations.

use crate::schema::FieldKind;
use crate::storage::StorageError;

/// Main error type for `cryptorm` operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The storage connection could not be re-established after one reconnect.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Ciphertext is malformed or was produced under a different key/column.
    #[error("decryption failed: {0}")]
    DecryptionFailed(String),

    /// Encryption operation failed
    #[error("encryption failed: {0}")]
    EncryptionFailed(String),

    /// The operation needs a record that has already been persisted.
    #[error("record in `{table}` has not been persisted (id = {id})")]
    NotPersisted {
        /// Table of the record
        table: &'static str,
        /// The non-positive identifier found on the record
        id: i64,
    },

    /// The requested transform does not exist for this field.
    #[error("unsupported operation: {0}")]
    Unsupported(String),

    /// Stored data does not match the declared record shape.
    #[error("schema mismatch on `{table}.{column}`: {reason}")]
    SchemaMismatch {
        /// Table name
        table: String,
        /// Column name
        column: String,
        /// What did not match
        reason: String,
    },

    /// The declared record shape is not usable as a table definition.
    #[error("invalid schema for `{table}`: {reason}")]
    InvalidSchema {
        /// Table name
        table: &'static str,
        /// Why the shape was rejected
        reason: String,
    },

    /// A predicate referenced a column the record type does not declare.
    #[error("unknown field `{field}` on `{table}`")]
    UnknownField {
        /// Table name
        table: &'static str,
        /// Field name
        field: String,
    },

    /// A value does not match the declared kind of its field.
    #[error("type mismatch on `{field}`: expected {expected}, found {found}")]
    TypeMismatch {
        /// Field name
        field: String,
        /// Declared kind
        expected: FieldKind,
        /// Kind of the value supplied
        found: &'static str,
    },

    /// Encryption key material is unusable.
    #[error("invalid encryption key: {0}")]
    InvalidKey(String),

    /// Key derivation failed
    #[error("key derivation failed")]
    KeyDerivation,

    /// Blind index generation failed
    #[error("blind index generation failed: {0}")]
    IndexGenerationFailed(String),

    /// Non-transient error reported by the storage driver.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl Error {
    /// Returns `true` for [`Error::NotPersisted`].
    ///
    /// `save` reports a missing identifier through this variant; callers that
    /// treat it as an absent result can branch on it without matching.
    #[must_use]
    pub const fn is_not_persisted(&self) -> bool {
        matches!(self, Self::NotPersisted { .. })
    }

    pub(crate) fn mismatch(
        table: impl Into<String>,
        column: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::SchemaMismatch { table: table.into(), column: column.into(), reason: reason.into() }
    }
}
