//! JSON file record store.
//!
//! # Responsibility
//! - Persist a record as one flat UTF-8 JSON object per file.
//!
//! # Invariants
//! - Values are JSON numbers, strings or `null` (`NoValue`).
//! - Writes go to a sibling temporary file first and replace the target by
//!   rename, so an interrupted save never truncates an existing file.

use super::record_store::{RecordStore, StoreError, StoreResult};
use crate::model::value::Record;
use log::{info, warn};
use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Record store addressing records by file path.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFileStore;

impl JsonFileStore {
    pub fn new() -> Self {
        Self
    }
}

impl RecordStore for JsonFileStore {
    type Locator = Path;

    fn load(&self, path: &Path) -> StoreResult<Record> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(StoreError::NotFound(path.display().to_string()));
            }
            Err(err) => return Err(err.into()),
        };

        let record: Record = serde_json::from_str(&text).map_err(|err| {
            warn!(
                "event=record_load module=repo status=error store=file error_code=parse_failed line={} column={}",
                err.line(),
                err.column()
            );
            StoreError::Parse(format!("{}: {err}", path.display()))
        })?;

        info!(
            "event=record_load module=repo status=ok store=file keys={}",
            record.len()
        );
        Ok(record)
    }

    fn save(&self, path: &Path, record: &Record) -> StoreResult<()> {
        let text = serde_json::to_string(record)
            .map_err(|err| StoreError::Parse(err.to_string()))?;
        let staging = staging_path(path);
        std::fs::write(&staging, text)?;
        if let Err(err) = std::fs::rename(&staging, path) {
            let _ = std::fs::remove_file(&staging);
            return Err(err.into());
        }
        Ok(())
    }

    fn describe(&self, path: &Path) -> String {
        path.display().to_string()
    }
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("record"));
    name.push(".partial");
    path.with_file_name(name)
}
