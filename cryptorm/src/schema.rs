//! Table definitions derived from record shapes.
//!
//! A [`TableSchema`] is a `static` list of [`FieldDescriptor`]s, normally
//! generated by `#[derive(Record)]`. It is the only place the storage layout
//! of a record type is described; DDL, column lists and codec routing all
//! come from it.

use crate::error::Error;
use crate::storage::Dialect;
use std::fmt;

/// Name of the primary-key field every record declares.
pub const ID_FIELD: &str = "id";

/// Semantic kind of a field, which decides how it is protected at rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// Plain integer: the primary key or a relation reference.
    Identifier,
    /// Encrypted boolean.
    Boolean,
    /// Encrypted integer.
    Integer,
    /// Encrypted text.
    Text,
    /// Search field, stored only as a keyed digest.
    Hashable,
}

/// How a field kind is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protection {
    /// Stored as is.
    Identity,
    /// Stored as an irreversible digest.
    Hash,
    /// Stored as deterministic ciphertext.
    Encrypt,
}

impl FieldKind {
    /// Protection strategy applied to this kind.
    #[must_use]
    pub const fn protection(self) -> Protection {
        match self {
            Self::Identifier => Protection::Identity,
            Self::Hashable => Protection::Hash,
            Self::Boolean | Self::Integer | Self::Text => Protection::Encrypt,
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Identifier => "identifier",
            Self::Boolean => "boolean",
            Self::Integer => "integer",
            Self::Text => "text",
            Self::Hashable => "hashable bytes",
        };
        f.write_str(name)
    }
}

/// One declared field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDescriptor {
    name: &'static str,
    kind: FieldKind,
}

impl FieldDescriptor {
    /// Declares a field.
    #[must_use]
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self { name, kind }
    }

    /// Field (and column) name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Declared kind.
    #[must_use]
    pub const fn kind(&self) -> FieldKind {
        self.kind
    }

    /// Returns `true` for the primary-key field.
    #[must_use]
    pub fn is_primary_key(&self) -> bool {
        self.name == ID_FIELD
    }

    fn column_definition(&self, dialect: Dialect) -> String {
        let ty = if self.is_primary_key() {
            dialect.primary_key_column()
        } else if self.kind == FieldKind::Identifier {
            dialect.small_integer_type()
        } else {
            dialect.blob_type()
        };
        format!("{} {ty}", self.name)
    }
}

/// Declared shape of a record type and its backing table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableSchema {
    table: &'static str,
    fields: &'static [FieldDescriptor],
}

impl TableSchema {
    /// Declares a table. Call [`TableSchema::validate`] before use.
    #[must_use]
    pub const fn new(table: &'static str, fields: &'static [FieldDescriptor]) -> Self {
        Self { table, fields }
    }

    /// Table name.
    #[must_use]
    pub const fn table(&self) -> &'static str {
        self.table
    }

    /// Every field in declaration order, `id` included.
    #[must_use]
    pub const fn fields(&self) -> &'static [FieldDescriptor] {
        self.fields
    }

    /// Looks up a field by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&'static FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Checks that the shape can back a table.
    ///
    /// Table and column names end up in statement text, so they are limited
    /// to ASCII identifiers.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidSchema` if:
    /// - A table or field name is not a plain identifier
    /// - A field name appears twice
    /// - There is not exactly one `id` field, or it is not an identifier
    pub fn validate(&self) -> Result<(), Error> {
        let invalid = |reason: String| Error::InvalidSchema { table: self.table, reason };

        if !is_identifier(self.table) {
            return Err(invalid(format!("`{}` is not a valid table name", self.table)));
        }

        for (i, field) in self.fields.iter().enumerate() {
            if !is_identifier(field.name) {
                return Err(invalid(format!("`{}` is not a valid column name", field.name)));
            }
            if self.fields[..i].iter().any(|f| f.name.eq_ignore_ascii_case(field.name)) {
                return Err(invalid(format!("duplicate field `{}`", field.name)));
            }
        }

        match self.field(ID_FIELD) {
            None => Err(invalid(format!("missing `{ID_FIELD}` field"))),
            Some(id) if id.kind != FieldKind::Identifier => {
                Err(invalid(format!("`{ID_FIELD}` must be an identifier, found {}", id.kind)))
            }
            Some(_) => Ok(()),
        }
    }

    /// Renders the idempotent `CREATE TABLE IF NOT EXISTS` statement.
    #[must_use]
    pub fn create_table_sql(&self, dialect: Dialect) -> String {
        let mut columns: Vec<String> =
            self.fields.iter().map(|f| f.column_definition(dialect)).collect();
        if dialect.needs_primary_key_constraint() {
            columns.push(format!("PRIMARY KEY ({ID_FIELD})"));
        }
        format!("CREATE TABLE IF NOT EXISTS {} ({})", self.table, columns.join(", "))
    }

    /// Comma-separated list of every column, for `SELECT`.
    #[must_use]
    pub fn column_list(&self) -> String {
        self.fields.iter().map(FieldDescriptor::name).collect::<Vec<_>>().join(", ")
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
