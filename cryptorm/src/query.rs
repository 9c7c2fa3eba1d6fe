//! Equality queries over protected tables.
//!
//! A [`Query`] collects `column = literal` predicates. Each literal is
//! protected with the same codec used for writes before it is bound, so a
//! search-field literal is compared as its digest, a protected-value literal
//! as its ciphertext and an identifier as the raw integer. Predicates are
//! joined with `AND` in the order they were added.
//!
//! A predicate that cannot be protected (unknown column, wrong value kind)
//! does not abort the chain; the error is returned by the terminal call.

use crate::error::Error;
use crate::record::{Predicate, Record};
use crate::session::{checked_schema, Session};
use crate::storage::{Driver, SqlValue};
use std::marker::PhantomData;
use tracing::debug;

/// Fluent equality query over the table of `R`.
///
/// # Example
///
/// ```rust,ignore
/// let matches = session
///     .find::<User>()
///     .filter(User::EMAIL.eq("alice@example.com"))
///     .filter(User::ACTIVE.eq(true))
///     .all()?;
/// ```
#[must_use = "a query does nothing until `first`, `all` or `delete` is called"]
pub struct Query<'s, D: Driver, R: Record> {
    session: &'s mut Session<D>,
    columns: Vec<&'static str>,
    params: Vec<SqlValue>,
    error: Option<Error>,
    _record: PhantomData<fn() -> R>,
}

impl<'s, D: Driver, R: Record> Query<'s, D, R> {
    pub(crate) fn new(session: &'s mut Session<D>) -> Self {
        Self { session, columns: Vec::new(), params: Vec::new(), error: None, _record: PhantomData }
    }

    /// Adds `predicate`, conjoined with the ones already added.
    pub fn filter(mut self, predicate: Predicate<R>) -> Self {
        if self.error.is_none() {
            match self.protect(&predicate) {
                Ok(param) => {
                    self.columns.push(predicate.column());
                    self.params.push(param);
                }
                Err(err) => self.error = Some(err),
            }
        }
        self
    }

    fn protect(&self, predicate: &Predicate<R>) -> Result<SqlValue, Error> {
        let schema = R::schema();
        let field = schema.field(predicate.column()).ok_or_else(|| Error::UnknownField {
            table: schema.table(),
            field: predicate.column().to_string(),
        })?;
        self.session.codec().protect(schema.table(), field, predicate.value())
    }

    /// Rendered filter clause (empty without predicates) and its parameters.
    #[must_use]
    pub fn clause(&self) -> (String, &[SqlValue]) {
        let clause = if self.columns.is_empty() {
            String::new()
        } else {
            let conditions: Vec<String> = self.columns.iter().map(|c| format!("{c} = ?")).collect();
            format!(" WHERE {}", conditions.join(" AND "))
        };
        (clause, &self.params)
    }

    fn select(&mut self, limit: Option<usize>) -> Result<Vec<R>, Error> {
        if let Some(err) = self.error.take() {
            return Err(err);
        }
        let schema = checked_schema::<R>()?;

        let (clause, _) = self.clause();
        let mut statement =
            format!("SELECT {} FROM {}{clause}", schema.column_list(), schema.table());
        if let Some(limit) = limit {
            statement.push_str(&format!(" LIMIT {limit}"));
        }

        let mut result = self.session.run(&statement, &self.params, false)?;
        let rows = if limit == Some(1) {
            result.fetch_one().into_iter().collect()
        } else {
            result.fetch_all()
        };
        debug!(table = schema.table(), rows = rows.len(), "query fetched rows");

        rows.into_iter().map(|row| self.session.materialize(row)).collect()
    }

    /// Returns the first matching record, or `None`.
    ///
    /// Search fields of the result hold their digest, not the original input.
    ///
    /// # Errors
    ///
    /// Returns a stored predicate error, a storage error, or
    /// `Error::DecryptionFailed` if a row does not decrypt.
    pub fn first(mut self) -> Result<Option<R>, Error> {
        Ok(self.select(Some(1))?.into_iter().next())
    }

    /// Returns every matching record, or `None` when nothing matches.
    ///
    /// An empty match is `None` rather than an empty vector, the same as
    /// [`Query::first`].
    ///
    /// # Errors
    ///
    /// Same as [`Query::first`].
    pub fn all(mut self) -> Result<Option<Vec<R>>, Error> {
        let records = self.select(None)?;
        Ok(if records.is_empty() { None } else { Some(records) })
    }

    /// Removes every matching record, one `DELETE` per row.
    ///
    /// Not atomic: the loop stops at the first failure and leaves the rows
    /// removed so far deleted.
    ///
    /// # Returns
    ///
    /// The number of rows removed.
    ///
    /// # Errors
    ///
    /// Returns the first error hit while fetching or removing.
    pub fn delete(mut self) -> Result<usize, Error> {
        let records = self.select(None)?;
        let count = records.len();
        for mut record in records {
            self.session.remove(&mut record)?;
        }
        Ok(count)
    }
}
