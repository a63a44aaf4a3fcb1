//! Automatic persistence after edits.
//!
//! # Responsibility
//! - Persist the live record after every effective edit.
//! - Manage the lifecycle of the working checkpoint file.
//!
//! # Invariants
//! - A file checkpoint always holds a complete record.
//! - A SQLite checkpoint touches only the columns that changed.

use super::file_store::JsonFileStore;
use super::record_store::{RecordStore, StoreResult};
use super::sqlite_store::{RomId, SqliteRowStore};
use crate::model::value::{Record, Value};
use log::info;
use std::path::{Path, PathBuf};

/// Sink for records changed by an edit.
pub trait Checkpoint {
    /// Persists `record` after the variables in `changed` were modified.
    fn write(&mut self, record: &Record, changed: &[String]) -> StoreResult<()>;

    /// Removes the checkpoint after a clean shutdown.
    fn discard(&mut self) -> StoreResult<()> {
        Ok(())
    }
}

/// Whole-record checkpoint in a well-known working file.
#[derive(Debug, Clone)]
pub struct FileCheckpoint {
    path: PathBuf,
    store: JsonFileStore,
}

impl FileCheckpoint {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            store: JsonFileStore::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether a checkpoint from an earlier session is waiting for recovery.
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Reads the checkpoint left by an earlier session.
    pub fn load(&self) -> StoreResult<Record> {
        self.store.load(&self.path)
    }
}

impl Checkpoint for FileCheckpoint {
    fn write(&mut self, record: &Record, _changed: &[String]) -> StoreResult<()> {
        self.store.save(&self.path, record)
    }

    fn discard(&mut self) -> StoreResult<()> {
        if self.exists() {
            std::fs::remove_file(&self.path)?;
            info!("event=checkpoint_discard module=repo status=ok store=file");
        }
        Ok(())
    }
}

/// Per-column checkpoint into one `roms` row.
pub struct SqliteCheckpoint<'conn> {
    store: SqliteRowStore<'conn>,
    rom_id: RomId,
}

impl<'conn> SqliteCheckpoint<'conn> {
    pub fn new(store: SqliteRowStore<'conn>, rom_id: RomId) -> Self {
        Self { store, rom_id }
    }
}

impl Checkpoint for SqliteCheckpoint<'_> {
    fn write(&mut self, record: &Record, changed: &[String]) -> StoreResult<()> {
        for key in changed {
            match record.get(key) {
                Some(value) => self.store.save_field(self.rom_id, key, value)?,
                None => self.store.save_field(self.rom_id, key, &Value::NoValue)?,
            }
        }
        Ok(())
    }
}
