//! `SQLite` storage driver for `cryptorm`.
//!
//! Wraps a single `rusqlite` connection behind [`cryptorm::Driver`]. Open
//! failures and I/O errors are reported as transient connection errors so
//! the session can reconnect; everything else is a statement error.
//!
//! # Example
//!
//! ```rust,no_run
//! use cryptorm_sqlite::{SqliteConfig, SqliteDriver};
//!
//! let driver = SqliteDriver::open(SqliteConfig::new("app.db"))?;
//! # Ok::<(), cryptorm::StorageError>(())
//! ```

#![warn(clippy::pedantic, clippy::nursery)]

use cryptorm::{Dialect, Driver, ResultSet, Row, SqlValue, StorageError};
use rusqlite::types::{Value, ValueRef};
use rusqlite::{Connection, ErrorCode, OpenFlags};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// Connection settings for [`SqliteDriver`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SqliteConfig {
    /// Path to the database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// Create the file if it does not exist.
    #[serde(default = "default_create_if_missing")]
    pub create_if_missing: bool,
}

impl SqliteConfig {
    /// Settings for the database at `path`, with defaults for the rest.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            create_if_missing: true,
        }
    }
}

const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

const fn default_create_if_missing() -> bool {
    true
}

#[derive(Debug, Clone)]
enum Target {
    File(SqliteConfig),
    Memory,
}

/// [`Driver`] backed by one `SQLite` connection.
///
/// Statements run in autocommit mode unless the caller opened a transaction,
/// in which case [`Driver::commit`] ends it.
#[derive(Debug)]
pub struct SqliteDriver {
    target: Target,
    connection: Option<Connection>,
}

impl SqliteDriver {
    /// Opens the database described by `config`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the file cannot be opened.
    pub fn open(config: SqliteConfig) -> Result<Self, StorageError> {
        let target = Target::File(config);
        let connection = connect(&target)?;
        Ok(Self { target, connection: Some(connection) })
    }

    /// Opens a private in-memory database.
    ///
    /// A reconnect starts over with an empty database.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if `SQLite` cannot allocate it.
    pub fn open_in_memory() -> Result<Self, StorageError> {
        let target = Target::Memory;
        let connection = connect(&target)?;
        Ok(Self { target, connection: Some(connection) })
    }

    /// Returns `true` while a connection is held.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.connection.is_some()
    }

    fn connection(&self) -> Result<&Connection, StorageError> {
        self.connection.as_ref().ok_or_else(|| StorageError::Connection("connection closed".into()))
    }
}

fn connect(target: &Target) -> Result<Connection, StorageError> {
    match target {
        Target::Memory => Connection::open_in_memory().map_err(classify),
        Target::File(config) => {
            let mut flags = OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX;
            if config.create_if_missing {
                flags |= OpenFlags::SQLITE_OPEN_CREATE;
            }
            let connection = Connection::open_with_flags(&config.path, flags).map_err(classify)?;
            connection
                .busy_timeout(Duration::from_millis(config.busy_timeout_ms))
                .map_err(classify)?;
            info!(path = %config.path.display(), "sqlite database opened");
            Ok(connection)
        }
    }
}

/// Maps a `rusqlite` error onto the session's retry classification.
fn classify(err: rusqlite::Error) -> StorageError {
    match &err {
        rusqlite::Error::SqliteFailure(failure, _)
            if matches!(failure.code, ErrorCode::CannotOpen | ErrorCode::SystemIoFailure) =>
        {
            StorageError::Connection(err.to_string())
        }
        _ => StorageError::Statement(err.to_string()),
    }
}

fn to_sqlite(value: &SqlValue) -> Value {
    match value {
        SqlValue::Null => Value::Null,
        SqlValue::Integer(v) => Value::Integer(*v),
        SqlValue::Text(v) => Value::Text(v.clone()),
        SqlValue::Blob(v) => Value::Blob(v.clone()),
    }
}

fn from_sqlite(value: ValueRef<'_>) -> SqlValue {
    match value {
        ValueRef::Null => SqlValue::Null,
        ValueRef::Integer(v) => SqlValue::Integer(v),
        // No column this crate creates holds a REAL; surface it as text so the
        // codec reports the mismatch.
        ValueRef::Real(v) => SqlValue::Text(v.to_string()),
        ValueRef::Text(v) => SqlValue::Text(String::from_utf8_lossy(v).into_owned()),
        ValueRef::Blob(v) => SqlValue::Blob(v.to_vec()),
    }
}

impl Driver for SqliteDriver {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn reconnect(&mut self) -> Result<(), StorageError> {
        if let Some(old) = self.connection.take() {
            if let Err((_, err)) = old.close() {
                debug!(error = %err, "error closing stale sqlite connection");
            }
        }
        self.connection = Some(connect(&self.target)?);
        Ok(())
    }

    fn execute(&mut self, statement: &str, params: &[SqlValue]) -> Result<ResultSet, StorageError> {
        let connection = self.connection()?;
        let mut prepared = connection.prepare(statement).map_err(classify)?;
        let bound = rusqlite::params_from_iter(params.iter().map(to_sqlite));

        if prepared.column_count() == 0 {
            let changed = prepared.execute(bound).map_err(classify)?;
            let changed = u64::try_from(changed).unwrap_or(u64::MAX);
            return Ok(ResultSet::from_write(changed, connection.last_insert_rowid()));
        }

        let names: Vec<String> = prepared.column_names().into_iter().map(String::from).collect();
        let mut rows = prepared.query(bound).map_err(classify)?;
        let mut fetched = Vec::new();
        while let Some(row) = rows.next().map_err(classify)? {
            let mut out = Row::new();
            for (index, name) in names.iter().enumerate() {
                out.push(name.as_str(), from_sqlite(row.get_ref(index).map_err(classify)?));
            }
            fetched.push(out);
        }
        Ok(ResultSet::from_rows(fetched))
    }

    fn commit(&mut self) -> Result<(), StorageError> {
        let connection = self.connection()?;
        if !connection.is_autocommit() {
            connection.execute_batch("COMMIT").map_err(classify)?;
        }
        Ok(())
    }

    fn close(&mut self) -> Result<(), StorageError> {
        match self.connection.take() {
            Some(connection) => connection.close().map_err(|(_, err)| classify(err)),
            None => Ok(()),
        }
    }
}
