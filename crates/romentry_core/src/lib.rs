//! Core of the range-of-motion measurement form.
//! Owns control binding, the live record, persistence and report data.

pub mod binding;
pub mod config;
pub mod crash;
pub mod db;
pub mod hetu;
pub mod logging;
pub mod model;
pub mod report;
pub mod repo;
pub mod schema;
pub mod service;
pub mod view;

pub use binding::codec::{CheckTexts, CodecError};
pub use binding::registry::{ControlBinding, DerivedFrom, Registry, RegistryError};
pub use config::{ConfigError, FormConfig};
pub use crash::{escalate, install_crash_handler};
pub use hetu::{validate_hetu, HetuError};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::control::{CheckState, ControlDecl, ControlProps, ControlType, NativeValue};
pub use model::value::{Record, Value};
pub use report::{ReportData, ReportError, ReportKind};
pub use repo::checkpoint::{Checkpoint, FileCheckpoint, SqliteCheckpoint};
pub use repo::file_store::JsonFileStore;
pub use repo::record_store::{RecordStore, StoreError, StoreResult};
pub use repo::sqlite_store::{PatientInfo, RomId, SqliteRowStore};
pub use schema::clinical_form;
pub use service::form_service::{
    ChangeOutcome, FormSynchronizer, LoadOutcome, ReconciliationReport, SaveOutcome, SyncError,
    SyncState,
};
pub use view::{FormView, MemoryForm};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
