//! Record persistence contracts and implementations.
//!
//! # Responsibility
//! - Define the load/save contract the synchronizer depends on.
//! - Provide a JSON file store and a SQLite row store.
//! - Provide checkpoint sinks for automatic persistence after edits.
//!
//! # Invariants
//! - `load` parses completely before returning; callers never see a partial
//!   record.
//! - Stores carry no schema version; key drift is handled by reconciliation.

pub mod checkpoint;
pub mod file_store;
pub mod record_store;
pub mod sqlite_store;
