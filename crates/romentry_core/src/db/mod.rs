//! SQLite bootstrap for the measurement database.
//!
//! # Responsibility
//! - Open connections with the pragmas the row store relies on.
//! - Run schema migrations before any row access.
//!
//! # Invariants
//! - Connections handed out have `foreign_keys=ON` and a current schema.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

/// Database bootstrap and access failures.
#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    /// A numbered migration failed; the schema stays at the previous version.
    Migration {
        version: u32,
        source: rusqlite::Error,
    },
    /// Measurement database written by a newer build.
    UnsupportedSchemaVersion { on_disk: u32, supported: u32 },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(_) => write!(f, "sqlite operation failed"),
            Self::Migration { version, .. } => {
                write!(f, "measurement database migration {version} failed")
            }
            Self::UnsupportedSchemaVersion { on_disk, supported } => write!(
                f,
                "measurement database is at schema {on_disk}, this build supports up to {supported}"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) | Self::Migration { source: err, .. } => Some(err),
            Self::UnsupportedSchemaVersion { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
