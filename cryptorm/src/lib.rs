//! # `cryptorm`
//!
//! Encryption-aware object-relational mapping. Records are stored one table
//! per type, and every field is protected according to its declared kind:
//!
//! - identifiers (`id` and relation references) stay plain integers
//! - search fields ([`Hashed`]) are stored only as a keyed HMAC digest
//! - all other fields are encrypted with AES-256-SIV, deterministically, so
//!   equality queries work against ciphertext
//!
//! In-memory records always hold plaintext; the [`Session`] protects values on
//! the way out and restores them on the way in.
//!
//! ## Example
//!
//! ```rust,ignore
//! use cryptorm::prelude::*;
//! use cryptorm_sqlite::SqliteDriver;
//!
//! #[derive(Debug, Clone, Record)]
//! #[record(table = "users")]
//! struct User {
//!     id: Id,
//!     email: Hashed,
//!     name: String,
//! }
//!
//! let key = EncryptionKey::from_base64(&std::env::var("CRYPTORM_KEY")?)?;
//! let mut session = Session::builder(SqliteDriver::open_in_memory()?, &key)
//!     .register::<User>()
//!     .open()?;
//!
//! let mut user = User {
//!     id: Id::default(),
//!     email: "alice@example.com".into(),
//!     name: "Alice".into(),
//! };
//! session.create(&mut user)?;
//!
//! let found = session.find::<User>().filter(User::EMAIL.eq("alice@example.com")).first()?;
//! ```

#![warn(clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

extern crate self as cryptorm;

pub mod blind_index;
pub mod codec;
pub mod context;
pub mod deterministic;
pub mod error;
pub mod kdf;
pub mod key;
pub mod query;
pub mod record;
pub mod schema;
pub mod session;
pub mod storage;
pub mod value;

#[cfg(test)]
mod testing;

pub use codec::Codec;
pub use error::Error;
pub use key::EncryptionKey;
pub use query::Query;
pub use record::{Column, Predicate, Record, RecordValues};
pub use schema::{FieldDescriptor, FieldKind, TableSchema};
pub use session::{Session, SessionBuilder};
pub use storage::{Dialect, Driver, ResultSet, Row, SqlValue, StorageError};
pub use value::{FieldType, Hashed, Id, StoredDigest, Value};

#[cfg(feature = "derive")]
pub use cryptorm_derive::Record;

pub mod prelude {
    //! Convenience re-exports for common use.
    pub use crate::error::Error;
    pub use crate::key::EncryptionKey;
    pub use crate::record::Record;
    pub use crate::session::Session;
    pub use crate::storage::Driver;
    pub use crate::value::{Hashed, Id};

    #[cfg(feature = "derive")]
    pub use cryptorm_derive::Record;
}
