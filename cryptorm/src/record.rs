//! Record types and typed column references.

use crate::error::Error;
use crate::schema::TableSchema;
use crate::value::{FieldType, Value};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;

/// A record type persisted in its own table.
///
/// Usually implemented with `#[derive(Record)]`:
///
/// ```rust,ignore
/// use cryptorm::{Hashed, Id, Record};
///
/// #[derive(Debug, Clone, Record)]
/// #[record(table = "users")]
/// struct User {
///     id: Id,
///     email: Hashed,
///     name: String,
///     age: i64,
/// }
/// ```
///
/// The derive also generates one [`Column`] constant per field
/// (`User::EMAIL`, `User::AGE`, ...) for building predicates.
pub trait Record: Sized {
    /// Declared shape, built once per type.
    fn schema() -> &'static TableSchema;

    /// Current identifier; 0 until persisted.
    fn id(&self) -> i64;

    /// Overwrites the identifier.
    fn set_id(&mut self, id: i64);

    /// Field values in schema order, `id` included.
    fn values(&self) -> Vec<Value>;

    /// Builds a record from values keyed by field name.
    ///
    /// # Errors
    ///
    /// Returns an error if a field is missing or has the wrong kind.
    fn from_values(values: RecordValues) -> Result<Self, Error>;
}

/// Field values of one fetched row, keyed by field name.
#[derive(Debug, Default)]
pub struct RecordValues {
    table: &'static str,
    values: HashMap<&'static str, Value>,
}

impl RecordValues {
    /// Creates an empty set for `table`.
    #[must_use]
    pub fn new(table: &'static str) -> Self {
        Self { table, values: HashMap::new() }
    }

    /// Adds a field value.
    pub fn insert(&mut self, field: &'static str, value: Value) {
        self.values.insert(field, value);
    }

    /// Removes a field value and converts it to the field's Rust type.
    ///
    /// # Errors
    ///
    /// Returns `Error::SchemaMismatch` if the field is absent and
    /// `Error::TypeMismatch` if its kind does not fit `T`.
    pub fn take<T: FieldType>(&mut self, field: &str) -> Result<T, Error> {
        let value = self
            .values
            .remove(field)
            .ok_or_else(|| Error::mismatch(self.table, field, "column missing from row"))?;
        T::from_value(field, value)
    }
}

/// Reference to a field of `R` holding a `T`.
pub struct Column<R, T> {
    name: &'static str,
    _marker: PhantomData<fn() -> (R, T)>,
}

impl<R, T> Column<R, T> {
    /// References the field called `name`.
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self { name, _marker: PhantomData }
    }

    /// Field name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl<R: Record, T: FieldType> Column<R, T> {
    /// Equality predicate `column = value`.
    ///
    /// ```rust,ignore
    /// session.find::<User>().filter(User::EMAIL.eq("alice@example.com")).first()?;
    /// ```
    #[must_use]
    pub fn eq(self, value: impl Into<T>) -> Predicate<R> {
        let value: T = value.into();
        Predicate { column: self.name, value: value.to_value(), _record: PhantomData }
    }
}

impl<R, T> Clone for Column<R, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R, T> Copy for Column<R, T> {}

impl<R, T> fmt::Debug for Column<R, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Column").field(&self.name).finish()
    }
}

/// Equality predicate against one field of `R`, holding the plaintext literal.
pub struct Predicate<R> {
    column: &'static str,
    value: Value,
    _record: PhantomData<fn() -> R>,
}

impl<R> Predicate<R> {
    /// Builds a predicate from a field name and an untyped value.
    ///
    /// The field and kind are checked when the predicate is added to a query.
    #[must_use]
    pub fn new(column: &'static str, value: Value) -> Self {
        Self { column, value, _record: PhantomData }
    }

    /// Field the predicate compares.
    #[must_use]
    pub const fn column(&self) -> &'static str {
        self.column
    }

    /// Plaintext literal.
    #[must_use]
    pub const fn value(&self) -> &Value {
        &self.value
    }
}

impl<R> Clone for Predicate<R> {
    fn clone(&self) -> Self {
        Self { column: self.column, value: self.value.clone(), _record: PhantomData }
    }
}

impl<R> fmt::Debug for Predicate<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Predicate")
            .field("column", &self.column)
            .field("value", &self.value)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldDescriptor, FieldKind};
    use crate::value::{Hashed, Id};

    struct Note {
        id: Id,
        title: String,
    }

    static NOTE_SCHEMA: TableSchema = TableSchema::new(
        "notes",
        &[
            FieldDescriptor::new("id", FieldKind::Identifier),
            FieldDescriptor::new("title", FieldKind::Text),
        ],
    );

    impl Record for Note {
        fn schema() -> &'static TableSchema {
            &NOTE_SCHEMA
        }

        fn id(&self) -> i64 {
            self.id.get()
        }

        fn set_id(&mut self, id: i64) {
            self.id = Id::new(id);
        }

        fn values(&self) -> Vec<Value> {
            vec![self.id.to_value(), self.title.to_value()]
        }

        fn from_values(mut values: RecordValues) -> Result<Self, Error> {
            Ok(Self { id: values.take("id")?, title: values.take("title")? })
        }
    }

    #[test]
    fn test_column_eq_builds_typed_literal() {
        let title: Column<Note, String> = Column::new("title");
        let predicate = title.eq("hello");

        assert_eq!(predicate.column(), "title");
        assert_eq!(predicate.value(), &Value::Text("hello".into()));
    }

    #[test]
    fn test_hashed_column_keeps_plaintext_until_protected() {
        let email: Column<Note, Hashed> = Column::new("email");
        let predicate = email.eq("a@b.c");

        assert_eq!(predicate.value(), &Value::Hashed(Hashed::from("a@b.c")));
    }

    #[test]
    fn test_from_values_round_trip() {
        let note = Note { id: Id::new(4), title: "x".into() };
        let mut values = RecordValues::new("notes");
        for (field, value) in Note::schema().fields().iter().zip(note.values()) {
            values.insert(field.name(), value);
        }

        let restored = Note::from_values(values).unwrap();
        assert_eq!(restored.id(), 4);
        assert_eq!(restored.title, "x");
    }

    #[test]
    fn test_missing_field_is_schema_mismatch() {
        let mut values = RecordValues::new("notes");
        values.insert("id", Value::Id(1));

        assert!(matches!(Note::from_values(values), Err(Error::SchemaMismatch { .. })));
    }
}
