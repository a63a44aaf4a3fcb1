//! Persistence contract shared by all record stores.

use crate::db::DbError;
use crate::model::value::Record;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence failures. Always recoverable from the form's point of view.
#[derive(Debug)]
pub enum StoreError {
    /// Locator does not name an existing record.
    NotFound(String),
    /// Stored data is not a flat key/value record.
    Parse(String),
    /// Record key cannot be used as a storage column.
    InvalidKey(String),
    Io(std::io::Error),
    Db(DbError),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(locator) => write!(f, "record not found: {locator}"),
            Self::Parse(message) => write!(f, "cannot parse record: {message}"),
            Self::InvalidKey(key) => write!(f, "invalid record key `{key}`"),
            Self::Io(_) => write!(f, "record I/O failed"),
            Self::Db(_) => write!(f, "record database access failed"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for StoreError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
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

/// Load/save access to records addressed by a store-specific locator.
pub trait RecordStore {
    /// File path, database row id, ...
    type Locator: ?Sized;

    fn load(&self, locator: &Self::Locator) -> StoreResult<Record>;

    fn save(&self, locator: &Self::Locator, record: &Record) -> StoreResult<()>;

    /// Human-readable locator for status messages.
    fn describe(&self, locator: &Self::Locator) -> String;
}
