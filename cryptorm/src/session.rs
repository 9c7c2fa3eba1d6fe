//! Persistence session.
//!
//! A [`Session`] owns one storage [`Driver`] and one [`Codec`]. Every value
//! written goes through [`Codec::protect`]; every value read goes through
//! [`Codec::unprotect`], except search fields, which come back as their
//! digest. Writes are committed one statement at a time.
//!
//! A transient connection failure is retried once after a reconnect. A second
//! failure is returned as [`Error::ConnectionFailed`].

use crate::blind_index::BLIND_INDEX_SIZE;
use crate::codec::Codec;
use crate::error::Error;
use crate::key::EncryptionKey;
use crate::query::Query;
use crate::record::{Record, RecordValues};
use crate::schema::{Protection, TableSchema, ID_FIELD};
use crate::storage::{Driver, ResultSet, Row, SqlValue, StorageError};
use crate::value::{Hashed, StoredDigest, Value};
use tracing::{debug, error, info, warn};

/// Builds a [`Session`] and ensures the tables of registered record types.
///
/// # Example
///
/// ```rust,ignore
/// let mut session = Session::builder(driver, &key)
///     .register::<User>()
///     .register::<Post>()
///     .open()?;
/// ```
pub struct SessionBuilder<'k, D: Driver> {
    driver: D,
    key: &'k EncryptionKey,
    schemas: Vec<&'static TableSchema>,
}

impl<'k, D: Driver> SessionBuilder<'k, D> {
    /// Adds a record type whose table is created on open.
    #[must_use]
    pub fn register<R: Record>(mut self) -> Self {
        self.schemas.push(R::schema());
        self
    }

    /// Opens the session and runs `CREATE TABLE IF NOT EXISTS` for every
    /// registered type.
    ///
    /// # Errors
    ///
    /// Returns error if key derivation fails, a schema is invalid, or a
    /// table cannot be created.
    pub fn open(self) -> Result<Session<D>, Error> {
        let mut session = Session::new(self.driver, self.key)?;
        for schema in self.schemas {
            session.ensure_schema(schema)?;
        }
        Ok(session)
    }
}

/// Encryption-aware CRUD over one storage connection.
pub struct Session<D: Driver> {
    driver: D,
    codec: Codec,
}

impl<D: Driver> Session<D> {
    /// Creates a session over an already connected driver.
    ///
    /// # Errors
    ///
    /// Returns `Error::KeyDerivation` if the codec keys cannot be derived.
    pub fn new(driver: D, key: &EncryptionKey) -> Result<Self, Error> {
        let codec = Codec::new(key)?;
        info!(dialect = %driver.dialect(), "session opened");
        Ok(Self { driver, codec })
    }

    /// Starts a [`SessionBuilder`].
    pub fn builder(driver: D, key: &EncryptionKey) -> SessionBuilder<'_, D> {
        SessionBuilder { driver, key, schemas: Vec::new() }
    }

    /// The codec applied to every stored value.
    #[must_use]
    pub const fn codec(&self) -> &Codec {
        &self.codec
    }

    /// The underlying driver.
    #[must_use]
    pub const fn driver(&self) -> &D {
        &self.driver
    }

    /// Closes the storage connection.
    ///
    /// # Errors
    ///
    /// Returns the driver's error if closing fails.
    pub fn close(mut self) -> Result<(), Error> {
        self.driver.close()?;
        info!("session closed");
        Ok(())
    }

    /// Creates the table for `R` if it does not exist yet.
    ///
    /// Safe to call any number of times; the table is never altered.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidSchema` for an unusable shape, or the storage
    /// error if the statement fails.
    pub fn ensure_table<R: Record>(&mut self) -> Result<(), Error> {
        self.ensure_schema(R::schema())
    }

    fn ensure_schema(&mut self, schema: &TableSchema) -> Result<(), Error> {
        schema.validate()?;
        let statement = schema.create_table_sql(self.driver.dialect());
        self.run(&statement, &[], true)?;
        info!(table = schema.table(), "table ensured");
        Ok(())
    }

    /// Inserts `record` and stores the generated key in its `id`.
    ///
    /// Only non-identifier columns are listed; the database assigns the key.
    /// No field of `record` other than `id` is modified.
    ///
    /// # Returns
    ///
    /// The generated identifier.
    ///
    /// # Errors
    ///
    /// Returns error if protection or the `INSERT` fails.
    pub fn create<R: Record>(&mut self, record: &mut R) -> Result<i64, Error> {
        let schema = checked_schema::<R>()?;
        let table = schema.table();
        let (columns, params) = self.protect_record(schema, record)?;

        let statement = if columns.is_empty() {
            format!("INSERT INTO {table} {}", self.driver.dialect().default_values_insert())
        } else {
            let placeholders = vec!["?"; columns.len()].join(", ");
            format!("INSERT INTO {table} ({}) VALUES ({placeholders})", columns.join(", "))
        };

        let result = self.run(&statement, &params, true)?;
        let id = result.last_inserted_id();
        record.set_id(id);
        debug!(table, id, "record created");
        Ok(id)
    }

    /// Overwrites every field of a stored record.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotPersisted` if `record` has no positive `id`, or the
    /// error from protection or the `UPDATE`.
    pub fn save<R: Record>(&mut self, record: &R) -> Result<(), Error> {
        let schema = checked_schema::<R>()?;
        let table = schema.table();
        let id = record.id();
        if id <= 0 {
            return Err(Error::NotPersisted { table, id });
        }

        let (columns, mut params) = self.protect_record(schema, record)?;
        if columns.is_empty() {
            return Ok(());
        }

        let assignments =
            columns.iter().map(|c| format!("{c} = ?")).collect::<Vec<_>>().join(", ");
        let statement = format!("UPDATE {table} SET {assignments} WHERE {ID_FIELD} = ?");
        params.push(SqlValue::Integer(id));

        let result = self.run(&statement, &params, true)?;
        if result.rows_affected() == 0 {
            debug!(table, id, "save matched no row");
        }
        debug!(table, id, "record saved");
        Ok(())
    }

    /// Deletes a stored record and resets its `id` to 0.
    ///
    /// A record without a positive `id` is left alone, so removing twice is
    /// harmless.
    ///
    /// # Errors
    ///
    /// Returns the storage error if the `DELETE` fails; `id` is then unchanged.
    pub fn remove<R: Record>(&mut self, record: &mut R) -> Result<(), Error> {
        let schema = checked_schema::<R>()?;
        let table = schema.table();
        let id = record.id();
        if id <= 0 {
            debug!(table, id, "remove skipped, record not persisted");
            return Ok(());
        }

        let statement = format!("DELETE FROM {table} WHERE {ID_FIELD} = ?");
        let result = self.run(&statement, &[SqlValue::Integer(id)], true)?;
        if result.rows_affected() == 0 {
            debug!(table, id, "remove matched no row");
        }
        record.set_id(0);
        debug!(table, id, "record removed");
        Ok(())
    }

    /// Starts a query over the table of `R`.
    pub fn find<R: Record>(&mut self) -> Query<'_, D, R> {
        Query::new(self)
    }

    fn protect_record<R: Record>(
        &self,
        schema: &'static TableSchema,
        record: &R,
    ) -> Result<(Vec<&'static str>, Vec<SqlValue>), Error> {
        let values = record.values();
        if values.len() != schema.fields().len() {
            return Err(Error::InvalidSchema {
                table: schema.table(),
                reason: format!(
                    "record yields {} values for {} declared fields",
                    values.len(),
                    schema.fields().len()
                ),
            });
        }

        let mut columns = Vec::with_capacity(values.len());
        let mut params = Vec::with_capacity(values.len());
        for (field, value) in schema.fields().iter().zip(&values) {
            if field.is_primary_key() {
                continue;
            }
            params.push(self.codec.protect(schema.table(), field, value)?);
            columns.push(field.name());
        }
        Ok((columns, params))
    }

    pub(crate) fn materialize<R: Record>(&self, mut row: Row) -> Result<R, Error> {
        let schema = R::schema();
        let table = schema.table();
        let mut values = RecordValues::new(table);

        for field in schema.fields() {
            let stored = row
                .take(field.name())
                .ok_or_else(|| Error::mismatch(table, field.name(), "column missing from row"))?;
            let value = match (field.kind().protection(), stored) {
                (Protection::Hash, SqlValue::Blob(digest)) if digest.len() == BLIND_INDEX_SIZE => {
                    Value::Hashed(Hashed::Digest(StoredDigest::from_stored(digest)))
                }
                (Protection::Hash, SqlValue::Blob(other)) => {
                    return Err(Error::mismatch(
                        table,
                        field.name(),
                        format!("search column holds {} bytes, not a digest", other.len()),
                    ))
                }
                (Protection::Hash, other) => {
                    return Err(Error::mismatch(
                        table,
                        field.name(),
                        format!("search column holds {}", other.type_name()),
                    ))
                }
                (_, stored) => self.codec.unprotect(table, field, &stored)?,
            };
            values.insert(field.name(), value);
        }

        R::from_values(values)
    }

    pub(crate) fn run(
        &mut self,
        statement: &str,
        params: &[SqlValue],
        commit: bool,
    ) -> Result<ResultSet, Error> {
        debug!(statement, params = params.len(), "executing statement");

        match self.attempt(statement, params, commit) {
            Ok(result) => Ok(result),
            Err(err) if err.is_transient() => {
                warn!(error = %err, "storage connection lost, reconnecting");
                self.driver.reconnect().map_err(|e| {
                    error!(error = %e, "reconnect failed");
                    Error::ConnectionFailed(e.to_string())
                })?;
                info!("reconnected to storage");

                self.attempt(statement, params, commit).map_err(|err| {
                    if err.is_transient() {
                        error!(error = %err, "statement failed after reconnect");
                        Error::ConnectionFailed(err.to_string())
                    } else {
                        Error::Storage(err)
                    }
                })
            }
            Err(err) => Err(Error::Storage(err)),
        }
    }

    fn attempt(
        &mut self,
        statement: &str,
        params: &[SqlValue],
        commit: bool,
    ) -> Result<ResultSet, StorageError> {
        let result = self.driver.execute(statement, params)?;
        if commit {
            self.driver.commit()?;
        }
        Ok(result)
    }
}

pub(crate) fn checked_schema<R: Record>() -> Result<&'static TableSchema, Error> {
    let schema = R::schema();
    schema.validate()?;
    Ok(schema)
}
