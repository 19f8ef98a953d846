//! Persistence adapter over an opaque key-value medium.
//!
//! # Responsibility
//! - Define the `get`/`set` contract the core consumes from its host.
//! - Provide SQLite and in-memory media.
//! - Map serialized note/session blobs onto that medium fail-softly.
//!
//! # Invariants
//! - A missing key means "use defaults", never an error.
//! - Write failures surface as `StoreError` and never touch in-memory state.

pub mod kv_store;
pub mod snapshot;

use crate::db::DbError;
use crate::model::record::ParseError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub use kv_store::{KeyValueStore, MemoryKeyValueStore, SqliteKeyValueStore};
pub use snapshot::SnapshotStore;

pub type StoreResult<T> = Result<T, StoreError>;

/// Failure reading or writing the key-value medium.
#[derive(Debug)]
pub enum StoreError {
    Db(DbError),
    /// Write rejected because the value exceeds the medium's quota.
    QuotaExceeded {
        key: String,
        bytes: usize,
        quota: usize,
    },
    /// Medium refused access (denied, detached, read-only).
    Unavailable(String),
    /// Blob could not be serialized before writing.
    Encode(ParseError),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::QuotaExceeded { key, bytes, quota } => write!(
                f,
                "storage quota exceeded writing `{key}`: {bytes} bytes > {quota} bytes"
            ),
            Self::Unavailable(reason) => write!(f, "storage unavailable: {reason}"),
            Self::Encode(err) => write!(f, "failed to encode record: {err}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Encode(err) => Some(err),
            Self::QuotaExceeded { .. } | Self::Unavailable(_) => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}
