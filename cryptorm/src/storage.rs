//! Storage collaborator interface.
//!
//! The session never talks to a database engine directly. It goes through a
//! [`Driver`], which owns one connection, runs parameterized statements and
//! hands back buffered [`ResultSet`]s. Statement text produced by the session
//! only ever interpolates validated table and column names; every value travels
//! as a positional parameter.

use std::collections::VecDeque;
use std::fmt;

/// Errors reported by a storage driver.
///
/// Drivers classify their own failures: [`StorageError::Connection`] is
/// treated as transient and triggers one reconnect-and-retry in the session,
/// anything else propagates to the caller untouched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    /// The connection was lost or could not be opened.
    #[error("storage connection error: {0}")]
    Connection(String),

    /// The engine rejected or failed to run a statement.
    #[error("storage statement error: {0}")]
    Statement(String),
}

impl StorageError {
    /// Returns `true` if a reconnect may resolve the failure.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Connection(_))
    }
}

/// SQL flavour spoken by a driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    /// `SQLite` 3.
    #[default]
    Sqlite,
    /// `MySQL` / `MariaDB`.
    MySql,
}

impl Dialect {
    /// Column definition of the auto-incrementing primary key.
    #[must_use]
    pub const fn primary_key_column(self) -> &'static str {
        match self {
            Self::Sqlite => "INTEGER PRIMARY KEY AUTOINCREMENT",
            Self::MySql => "MEDIUMINT NOT NULL AUTO_INCREMENT",
        }
    }

    /// Column type for relation (identifier-kind) columns.
    #[must_use]
    pub const fn small_integer_type(self) -> &'static str {
        match self {
            Self::Sqlite => "INTEGER",
            Self::MySql => "MEDIUMINT",
        }
    }

    /// Column type for ciphertext and digest columns.
    #[must_use]
    pub const fn blob_type(self) -> &'static str {
        "BLOB"
    }

    /// Whether the primary key needs a trailing `PRIMARY KEY (id)` constraint.
    #[must_use]
    pub const fn needs_primary_key_constraint(self) -> bool {
        matches!(self, Self::MySql)
    }

    /// Tail of an `INSERT INTO <table>` that supplies no columns.
    #[must_use]
    pub const fn default_values_insert(self) -> &'static str {
        match self {
            Self::Sqlite => "DEFAULT VALUES",
            Self::MySql => "() VALUES ()",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sqlite => f.write_str("sqlite"),
            Self::MySql => f.write_str("mysql"),
        }
    }
}

/// A value as it crosses the storage boundary.
#[derive(Clone, PartialEq, Eq)]
pub enum SqlValue {
    /// SQL `NULL`
    Null,
    /// Integer column value
    Integer(i64),
    /// Text column value
    Text(String),
    /// Binary column value (ciphertext or digest)
    Blob(Vec<u8>),
}

impl SqlValue {
    /// Short name of the stored type, for error messages.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Integer(_) => "integer",
            Self::Text(_) => "text",
            Self::Blob(_) => "blob",
        }
    }
}

// Blob contents are ciphertext or digests; only their length is useful in logs.
impl fmt::Debug for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("Null"),
            Self::Integer(v) => f.debug_tuple("Integer").field(v).finish(),
            Self::Text(v) => f.debug_tuple("Text").field(v).finish(),
            Self::Blob(v) => write!(f, "Blob(<{} bytes>)", v.len()),
        }
    }
}

/// One fetched row: ordered `(column, value)` pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    columns: Vec<(String, SqlValue)>,
}

impl Row {
    /// Creates an empty row.
    #[must_use]
    pub const fn new() -> Self {
        Self { columns: Vec::new() }
    }

    /// Appends a column value.
    #[must_use]
    pub fn with(mut self, column: impl Into<String>, value: SqlValue) -> Self {
        self.push(column, value);
        self
    }

    /// Appends a column value in place.
    pub fn push(&mut self, column: impl Into<String>, value: SqlValue) {
        self.columns.push((column.into(), value));
    }

    /// Looks up a column by name.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.columns.iter().find(|(name, _)| name == column).map(|(_, value)| value)
    }

    /// Removes and returns a column by name.
    pub fn take(&mut self, column: &str) -> Option<SqlValue> {
        let index = self.columns.iter().position(|(name, _)| name == column)?;
        Some(self.columns.swap_remove(index).1)
    }

    /// Number of columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Returns `true` if the row has no columns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Buffered outcome of one executed statement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultSet {
    rows: VecDeque<Row>,
    last_inserted_id: i64,
    rows_affected: u64,
}

impl ResultSet {
    /// Result of a statement that returned rows.
    #[must_use]
    pub fn from_rows(rows: impl IntoIterator<Item = Row>) -> Self {
        Self { rows: rows.into_iter().collect(), last_inserted_id: 0, rows_affected: 0 }
    }

    /// Result of a statement that changed rows.
    #[must_use]
    pub const fn from_write(rows_affected: u64, last_inserted_id: i64) -> Self {
        Self { rows: VecDeque::new(), last_inserted_id, rows_affected }
    }

    /// Fetches the next row, if any.
    pub fn fetch_one(&mut self) -> Option<Row> {
        self.rows.pop_front()
    }

    /// Fetches every remaining row.
    pub fn fetch_all(&mut self) -> Vec<Row> {
        self.rows.drain(..).collect()
    }

    /// Key generated by the last `INSERT`, or 0.
    #[must_use]
    pub const fn last_inserted_id(&self) -> i64 {
        self.last_inserted_id
    }

    /// Rows changed by a write statement.
    #[must_use]
    pub const fn rows_affected(&self) -> u64 {
        self.rows_affected
    }
}

/// Connection to a relational database engine.
///
/// A driver is created already connected (how it obtains credentials is its
/// own business) and is exclusively owned by one [`Session`](crate::Session).
pub trait Driver {
    /// SQL flavour used to render DDL.
    fn dialect(&self) -> Dialect;

    /// Drops the current connection and opens a fresh one.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the engine is unreachable.
    fn reconnect(&mut self) -> Result<(), StorageError>;

    /// Runs one parameterized statement.
    ///
    /// # Arguments
    ///
    /// * `statement` - SQL text with `?` placeholders
    /// * `params` - Positional parameter values
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` for connectivity failures and
    /// `StorageError::Statement` for everything else.
    fn execute(&mut self, statement: &str, params: &[SqlValue]) -> Result<ResultSet, StorageError>;

    /// Commits the work done since the last commit.
    ///
    /// # Errors
    ///
    /// Same classification as [`Driver::execute`].
    fn commit(&mut self) -> Result<(), StorageError>;

    /// Closes the connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine reports a failure while closing.
    fn close(&mut self) -> Result<(), StorageError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dialect_rendering() {
        assert_eq!(Dialect::Sqlite.primary_key_column(), "INTEGER PRIMARY KEY AUTOINCREMENT");
        assert_eq!(Dialect::MySql.small_integer_type(), "MEDIUMINT");
        assert!(Dialect::MySql.needs_primary_key_constraint());
        assert!(!Dialect::Sqlite.needs_primary_key_constraint());
    }

    #[test]
    fn test_row_lookup_by_name() {
        let mut row = Row::new()
            .with("id", SqlValue::Integer(7))
            .with("hashed", SqlValue::Blob(vec![1, 2, 3]));

        assert_eq!(row.get("id"), Some(&SqlValue::Integer(7)));
        assert_eq!(row.take("hashed"), Some(SqlValue::Blob(vec![1, 2, 3])));
        assert_eq!(row.get("hashed"), None);
        assert_eq!(row.len(), 1);
    }

    #[test]
    fn test_result_set_fetch_order() {
        let mut rs = ResultSet::from_rows([
            Row::new().with("id", SqlValue::Integer(1)),
            Row::new().with("id", SqlValue::Integer(2)),
        ]);

        assert_eq!(rs.fetch_one().and_then(|r| r.get("id").cloned()), Some(SqlValue::Integer(1)));
        assert_eq!(rs.fetch_all().len(), 1);
        assert!(rs.fetch_one().is_none());
    }

    #[test]
    fn test_blob_debug_hides_contents() {
        let debug = format!("{:?}", SqlValue::Blob(vec![0xde, 0xad]));
        assert_eq!(debug, "Blob(<2 bytes>)");
    }

    #[test]
    fn test_only_connection_errors_are_transient() {
        assert!(StorageError::Connection("gone".into()).is_transient());
        assert!(!StorageError::Statement("syntax".into()).is_transient());
    }
}
