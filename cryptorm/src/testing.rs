//! Test doubles shared by unit tests.

use crate::error::Error;
use crate::record::{Column, Record, RecordValues};
use crate::schema::{FieldDescriptor, FieldKind, TableSchema};
use crate::storage::{Dialect, Driver, ResultSet, SqlValue, StorageError};
use crate::value::{FieldType, Hashed, Id, Value};
use std::collections::VecDeque;

/// Driver that records statements and replays queued responses.
///
/// Without a queued response a statement succeeds with an empty result.
#[derive(Debug, Default)]
pub struct ScriptedDriver {
    dialect: Dialect,
    responses: VecDeque<Result<ResultSet, StorageError>>,
    log: Vec<(String, Vec<SqlValue>)>,
    commits: usize,
    reconnects: usize,
    reconnect_fails: bool,
    commit_failure: Option<StorageError>,
}

impl ScriptedDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dialect(dialect: Dialect) -> Self {
        Self { dialect, ..Self::default() }
    }

    pub fn respond(&mut self, response: Result<ResultSet, StorageError>) {
        self.responses.push_back(response);
    }

    pub fn fail_reconnect(&mut self) {
        self.reconnect_fails = true;
    }

    /// Fails the next commit once with `err`.
    pub fn fail_next_commit(&mut self, err: StorageError) {
        self.commit_failure = Some(err);
    }

    pub fn log(&self) -> &[(String, Vec<SqlValue>)] {
        &self.log
    }

    pub fn statements(&self) -> Vec<&str> {
        self.log.iter().map(|(s, _)| s.as_str()).collect()
    }

    pub const fn commits(&self) -> usize {
        self.commits
    }

    pub const fn reconnects(&self) -> usize {
        self.reconnects
    }
}

impl Driver for ScriptedDriver {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn reconnect(&mut self) -> Result<(), StorageError> {
        self.reconnects += 1;
        if self.reconnect_fails {
            return Err(StorageError::Connection("connection refused".into()));
        }
        Ok(())
    }

    fn execute(&mut self, statement: &str, params: &[SqlValue]) -> Result<ResultSet, StorageError> {
        self.log.push((statement.to_string(), params.to_vec()));
        self.responses.pop_front().unwrap_or_else(|| Ok(ResultSet::default()))
    }

    fn commit(&mut self) -> Result<(), StorageError> {
        if let Some(err) = self.commit_failure.take() {
            return Err(err);
        }
        self.commits += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<(), StorageError> {
        Ok(())
    }
}

/// Hand-written record exercising every field kind.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub id: Id,
    pub hashed: Hashed,
    pub number: i64,
    pub string: String,
    pub boolean: bool,
    pub owner: Id,
}

static SAMPLE_SCHEMA: TableSchema = TableSchema::new(
    "sample",
    &[
        FieldDescriptor::new("id", FieldKind::Identifier),
        FieldDescriptor::new("hashed", FieldKind::Hashable),
        FieldDescriptor::new("number", FieldKind::Integer),
        FieldDescriptor::new("string", FieldKind::Text),
        FieldDescriptor::new("boolean", FieldKind::Boolean),
        FieldDescriptor::new("owner", FieldKind::Identifier),
    ],
);

impl Sample {
    pub const ID: Column<Self, Id> = Column::new("id");
    pub const HASHED: Column<Self, Hashed> = Column::new("hashed");
    pub const NUMBER: Column<Self, i64> = Column::new("number");
    pub const OWNER: Column<Self, Id> = Column::new("owner");

    pub fn new(hashed: &str, number: i64, string: &str, boolean: bool) -> Self {
        Self {
            id: Id::default(),
            hashed: hashed.into(),
            number,
            string: string.to_string(),
            boolean,
            owner: Id::default(),
        }
    }
}

impl Record for Sample {
    fn schema() -> &'static TableSchema {
        &SAMPLE_SCHEMA
    }

    fn id(&self) -> i64 {
        self.id.get()
    }

    fn set_id(&mut self, id: i64) {
        self.id = Id::new(id);
    }

    fn values(&self) -> Vec<Value> {
        vec![
            self.id.to_value(),
            self.hashed.to_value(),
            self.number.to_value(),
            self.string.to_value(),
            self.boolean.to_value(),
            self.owner.to_value(),
        ]
    }

    fn from_values(mut values: RecordValues) -> Result<Self, Error> {
        Ok(Self {
            id: values.take("id")?,
            hashed: values.take("hashed")?,
            number: values.take("number")?,
            string: values.take("string")?,
            boolean: values.take("boolean")?,
            owner: values.take("owner")?,
        })
    }
}

/// Record with no value fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub id: Id,
}

static MARKER_SCHEMA: TableSchema =
    TableSchema::new("marker", &[FieldDescriptor::new("id", FieldKind::Identifier)]);

impl Record for Marker {
    fn schema() -> &'static TableSchema {
        &MARKER_SCHEMA
    }

    fn id(&self) -> i64 {
        self.id.get()
    }

    fn set_id(&mut self, id: i64) {
        self.id = Id::new(id);
    }

    fn values(&self) -> Vec<Value> {
        vec![self.id.to_value()]
    }

    fn from_values(mut values: RecordValues) -> Result<Self, Error> {
        Ok(Self { id: values.take("id")? })
    }
}
