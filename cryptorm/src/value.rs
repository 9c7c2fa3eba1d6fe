//! In-memory field values.
//!
//! Record fields hold plain Rust values. [`FieldType`] maps each supported
//! Rust type to its semantic [`FieldKind`] and to the [`Value`] the codec
//! protects on the way to storage.

use crate::error::Error;
use crate::schema::FieldKind;
use std::fmt;

/// Typed plaintext value of one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Primary key or relation reference
    Id(i64),
    /// Boolean value
    Bool(bool),
    /// Integer value
    Int(i64),
    /// Text value
    Text(String),
    /// Search-field value
    Hashed(Hashed),
}

impl Value {
    /// Short name of the value's type, for error messages.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Id(_) => "identifier",
            Self::Bool(_) => "boolean",
            Self::Int(_) => "integer",
            Self::Text(_) => "text",
            Self::Hashed(_) => "hashable bytes",
        }
    }

    /// Kind of field this value belongs in.
    #[must_use]
    pub const fn kind(&self) -> FieldKind {
        match self {
            Self::Id(_) => FieldKind::Identifier,
            Self::Bool(_) => FieldKind::Boolean,
            Self::Int(_) => FieldKind::Integer,
            Self::Text(_) => FieldKind::Text,
            Self::Hashed(_) => FieldKind::Hashable,
        }
    }
}

/// Identifier of a persisted record, or a reference to one.
///
/// `Id::default()` is 0, the "not persisted" sentinel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Id(i64);

impl Id {
    /// Wraps a raw identifier.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the raw identifier.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }

    /// Returns `true` once the record has been stored.
    #[must_use]
    pub const fn is_persisted(self) -> bool {
        self.0 > 0
    }
}

impl From<i64> for Id {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl From<i32> for Id {
    fn from(id: i32) -> Self {
        Self(i64::from(id))
    }
}

impl From<Id> for i64 {
    fn from(id: Id) -> Self {
        id.0
    }
}

impl PartialEq<i64> for Id {
    fn eq(&self, other: &i64) -> bool {
        self.0 == *other
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Keyed digest read back from a search column.
///
/// There is no public constructor: the only digests are the ones a session
/// read from storage, so arbitrary bytes cannot be written into a search
/// column through one.
///
/// ```compile_fail
/// use cryptorm::value::StoredDigest;
///
/// let forged = StoredDigest(b"ssn-123-45-6789".to_vec());
/// ```
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct StoredDigest(Vec<u8>);

impl StoredDigest {
    pub(crate) fn from_stored(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Digest bytes as stored.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for StoredDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StoredDigest(<{} bytes>)", self.0.len())
    }
}

/// Value of a search field.
///
/// Callers set search fields from plaintext ([`Hashed::Plain`]). Storage only
/// ever sees the keyed digest, and a record read back holds that digest
/// ([`Hashed::Digest`]); the plaintext is not recoverable. Protecting a
/// digest passes it through unchanged.
#[derive(Clone, PartialEq, Eq)]
pub enum Hashed {
    /// Plaintext input, not yet hashed
    Plain(Vec<u8>),
    /// Keyed digest as stored
    Digest(StoredDigest),
}

impl Hashed {
    /// Creates a search value from plaintext.
    #[must_use]
    pub fn new(plain: impl Into<Vec<u8>>) -> Self {
        Self::Plain(plain.into())
    }

    /// Returns the stored digest, if this value was read back from storage.
    #[must_use]
    pub fn digest(&self) -> Option<&[u8]> {
        match self {
            Self::Digest(digest) => Some(digest.as_bytes()),
            Self::Plain(_) => None,
        }
    }

    /// Returns `true` if this holds a digest rather than plaintext.
    #[must_use]
    pub const fn is_digest(&self) -> bool {
        matches!(self, Self::Digest(_))
    }
}

impl Default for Hashed {
    fn default() -> Self {
        Self::Plain(Vec::new())
    }
}

impl From<&str> for Hashed {
    fn from(plain: &str) -> Self {
        Self::Plain(plain.as_bytes().to_vec())
    }
}

impl From<String> for Hashed {
    fn from(plain: String) -> Self {
        Self::Plain(plain.into_bytes())
    }
}

impl From<&[u8]> for Hashed {
    fn from(plain: &[u8]) -> Self {
        Self::Plain(plain.to_vec())
    }
}

impl From<Vec<u8>> for Hashed {
    fn from(plain: Vec<u8>) -> Self {
        Self::Plain(plain)
    }
}

impl PartialEq<&str> for Hashed {
    fn eq(&self, other: &&str) -> bool {
        matches!(self, Self::Plain(bytes) if bytes.as_slice() == other.as_bytes())
    }
}

impl fmt::Debug for Hashed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plain(_) => f.write_str("Hashed::Plain(<redacted>)"),
            Self::Digest(digest) => {
                write!(f, "Hashed::Digest(<{} bytes>)", digest.as_bytes().len())
            }
        }
    }
}

/// Rust types that can back a record field.
pub trait FieldType: Sized {
    /// Semantic kind declared for fields of this type.
    const KIND: FieldKind;

    /// Converts the field to its typed value.
    fn to_value(&self) -> Value;

    /// Restores the field from a typed value.
    ///
    /// # Errors
    ///
    /// Returns `Error::TypeMismatch` if `value` has a different kind.
    fn from_value(field: &str, value: Value) -> Result<Self, Error>;
}

fn mismatch(field: &str, expected: FieldKind, value: &Value) -> Error {
    Error::TypeMismatch { field: field.to_string(), expected, found: value.type_name() }
}

impl FieldType for Id {
    const KIND: FieldKind = FieldKind::Identifier;

    fn to_value(&self) -> Value {
        Value::Id(self.0)
    }

    fn from_value(field: &str, value: Value) -> Result<Self, Error> {
        match value {
            Value::Id(id) => Ok(Self(id)),
            other => Err(mismatch(field, Self::KIND, &other)),
        }
    }
}

impl FieldType for bool {
    const KIND: FieldKind = FieldKind::Boolean;

    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }

    fn from_value(field: &str, value: Value) -> Result<Self, Error> {
        match value {
            Value::Bool(b) => Ok(b),
            other => Err(mismatch(field, Self::KIND, &other)),
        }
    }
}

impl FieldType for i64 {
    const KIND: FieldKind = FieldKind::Integer;

    fn to_value(&self) -> Value {
        Value::Int(*self)
    }

    fn from_value(field: &str, value: Value) -> Result<Self, Error> {
        match value {
            Value::Int(n) => Ok(n),
            other => Err(mismatch(field, Self::KIND, &other)),
        }
    }
}

impl FieldType for i32 {
    const KIND: FieldKind = FieldKind::Integer;

    fn to_value(&self) -> Value {
        Value::Int(i64::from(*self))
    }

    fn from_value(field: &str, value: Value) -> Result<Self, Error> {
        match value {
            Value::Int(n) => Self::try_from(n).map_err(|_| Error::TypeMismatch {
                field: field.to_string(),
                expected: Self::KIND,
                found: "integer out of i32 range",
            }),
            other => Err(mismatch(field, Self::KIND, &other)),
        }
    }
}

impl FieldType for String {
    const KIND: FieldKind = FieldKind::Text;

    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }

    fn from_value(field: &str, value: Value) -> Result<Self, Error> {
        match value {
            Value::Text(s) => Ok(s),
            other => Err(mismatch(field, Self::KIND, &other)),
        }
    }
}

impl FieldType for Hashed {
    const KIND: FieldKind = FieldKind::Hashable;

    fn to_value(&self) -> Value {
        Value::Hashed(self.clone())
    }

    fn from_value(field: &str, value: Value) -> Result<Self, Error> {
        match value {
            Value::Hashed(h) => Ok(h),
            other => Err(mismatch(field, Self::KIND, &other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_default_is_unpersisted() {
        let id = Id::default();
        assert_eq!(id.get(), 0);
        assert!(!id.is_persisted());
        assert!(Id::new(3).is_persisted());
    }

    #[test]
    fn test_hashed_compares_plaintext_only() {
        let plain = Hashed::from("abcd");
        let digest = Hashed::Digest(StoredDigest::from_stored(b"abcd".to_vec()));

        assert_eq!(plain, "abcd");
        assert_ne!(digest, "abcd");
        assert_ne!(plain, digest);
        assert_eq!(digest.digest(), Some(&b"abcd"[..]));
    }

    #[test]
    fn test_hashed_debug_redacts_plaintext() {
        let debug = format!("{:?}", Hashed::from("secret"));
        assert!(!debug.contains("secret"));
    }

    #[test]
    fn test_field_type_kinds() {
        assert_eq!(<Id as FieldType>::KIND, FieldKind::Identifier);
        assert_eq!(<bool as FieldType>::KIND, FieldKind::Boolean);
        assert_eq!(<i64 as FieldType>::KIND, FieldKind::Integer);
        assert_eq!(<String as FieldType>::KIND, FieldKind::Text);
        assert_eq!(<Hashed as FieldType>::KIND, FieldKind::Hashable);
    }

    #[test]
    fn test_from_value_rejects_wrong_kind() {
        let result = bool::from_value("boolean", Value::Int(1));
        assert!(matches!(
            result,
            Err(Error::TypeMismatch { expected: FieldKind::Boolean, found: "integer", .. })
        ));
    }

    #[test]
    fn test_i32_range_checked() {
        assert_eq!(i32::from_value("n", Value::Int(12)).unwrap(), 12);
        assert!(i32::from_value("n", Value::Int(i64::MAX)).is_err());
    }
}
