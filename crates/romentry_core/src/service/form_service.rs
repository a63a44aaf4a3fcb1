//! Record synchronizer between form controls and the record.
//!
//! # Responsibility
//! - Own the live record and the empty-form baseline.
//! - Route every control change through one entry point, recompute derived
//!   values and checkpoint effective edits.
//! - Load whole records (from stores, checkpoints or the empty form) with key
//!   reconciliation.
//!
//! # Invariants
//! - `current` always holds exactly `registry.all_variable_names()` as keys.
//! - Derived controls only change through recomputation.
//! - `Reconciling` only spans the bulk push inside one `&mut self` call, so
//!   no notification can arrive during it; echoes delivered afterwards are
//!   absorbed because they decode to the value already in the record.
//! - Loaded values are stored as their control shows them.
//! - A failed load leaves the live record and the controls untouched.
//! - Record values never appear in log lines.
//!
//! # See also
//! - `binding::codec` for value conversion.
//! - `repo::checkpoint` for automatic persistence.

use crate::binding::codec::{self, CheckTexts, CodecError};
use crate::binding::derived;
use crate::binding::registry::{ControlBinding, Registry};
use crate::config::FormConfig;
use crate::crash;
use crate::hetu::{validate_hetu, HetuError};
use crate::model::control::NativeValue;
use crate::model::value::{Record, Value};
use crate::repo::checkpoint::{Checkpoint, FileCheckpoint};
use crate::repo::record_store::{RecordStore, StoreError};
use crate::report::ReportData;
use crate::view::FormView;
use log::{error, info, warn};
use std::collections::{BTreeMap, BTreeSet};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Variable holding the personal identity code checked on save.
pub const IDENTITY_CODE_VARIABLE: &str = "TiedotHetu";

/// Lifecycle state of the synchronizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// Controls not read yet; only observed during construction.
    Uninitialized,
    /// Record matches what was last loaded, saved or cleared.
    Quiescent,
    /// Record has edits not saved to a store.
    Editing,
    /// A whole record is being pushed into the controls. Only held inside
    /// the exclusive borrow of a load, so never observed by callers.
    Reconciling,
}

/// Synchronizer failures.
#[derive(Debug)]
pub enum SyncError {
    /// Change notification for a control the registry does not know.
    UnknownControl(String),
    /// Bound control missing from the form view.
    MissingControl(String),
    /// Direct edit of a derived control.
    ReadOnlyControl(String),
    /// Control wiring defect reported by the codec.
    Codec(CodecError),
    /// Incoming record value cannot be shown by its control.
    IncompatibleValue { key: String, source: CodecError },
    /// Persistence failure.
    Store(StoreError),
}

impl Display for SyncError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownControl(id) => write!(f, "unknown control `{id}`"),
            Self::MissingControl(id) => write!(f, "control `{id}` is missing from the form"),
            Self::ReadOnlyControl(id) => write!(f, "control `{id}` is computed and read-only"),
            Self::Codec(err) => write!(f, "{err}"),
            Self::IncompatibleValue { key, .. } => {
                write!(f, "value of `{key}` does not fit its control")
            }
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SyncError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Codec(err) => err.source(),
            Self::IncompatibleValue { source, .. } => Some(source),
            Self::Store(err) => err.source(),
            _ => None,
        }
    }
}

impl From<CodecError> for SyncError {
    fn from(value: CodecError) -> Self {
        Self::Codec(value)
    }
}

impl From<StoreError> for SyncError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

/// Result of one change notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeOutcome {
    /// Record updated; `changed` lists the edited variable first, then any
    /// recomputed derived variables.
    Updated { changed: Vec<String> },
    /// Decoded value equals the record value (echo of a programmatic write).
    Unchanged,
}

/// Key mismatch between an incoming record and the registry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconciliationReport {
    /// Keys the form does not know; their values are dropped.
    pub unknown_keys: BTreeSet<String>,
    /// Form variables absent from the incoming record; they keep defaults.
    pub missing_keys: BTreeSet<String>,
}

impl ReconciliationReport {
    fn between(expected: &BTreeSet<String>, incoming: &BTreeSet<String>) -> Self {
        Self {
            unknown_keys: incoming.difference(expected).cloned().collect(),
            missing_keys: expected.difference(incoming).cloned().collect(),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.unknown_keys.is_empty() && self.missing_keys.is_empty()
    }

    /// Whether data was lost and the user must be told.
    ///
    /// Missing keys alone are expected for records written by older forms.
    pub fn requires_attention(&self) -> bool {
        !self.unknown_keys.is_empty()
    }

    /// User-facing description, `None` when the keys matched exactly.
    pub fn message(&self) -> Option<String> {
        if self.is_clean() {
            return None;
        }
        let mut parts = Vec::new();
        if !self.unknown_keys.is_empty() {
            parts.push(format!(
                "The loaded data contains fields unknown to this form; their values were discarded: {}.",
                join_keys(&self.unknown_keys)
            ));
        }
        if !self.missing_keys.is_empty() {
            parts.push(format!(
                "The loaded data lacks these form fields; they keep their default values: {}.",
                join_keys(&self.missing_keys)
            ));
        }
        Some(parts.join(" "))
    }
}

fn join_keys(keys: &BTreeSet<String>) -> String {
    keys.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
}

/// Result of a whole-record load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOutcome {
    pub report: ReconciliationReport,
    /// Variables differing from the empty form after the load.
    pub modified: usize,
}

/// Result of a user-initiated save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveOutcome {
    /// Set when the identity code is filled in but invalid. The save still
    /// happened.
    pub hetu_warning: Option<HetuError>,
}

/// Receiver of checkpoint failures raised during change handling.
pub type FailureHandler<'a> = Box<dyn FnMut(&StoreError) + 'a>;

fn escalate_store_failure(err: &StoreError) {
    crash::escalate(err)
}

/// Single owner of the form record.
pub struct FormSynchronizer<'a, V: FormView> {
    registry: Registry,
    view: V,
    config: FormConfig,
    texts: CheckTexts,
    current: Record,
    empty: Record,
    state: SyncState,
    saved: bool,
    last_saved_locator: Option<String>,
    auto_persist: bool,
    checkpoint: Option<Box<dyn Checkpoint + 'a>>,
    on_failure: FailureHandler<'a>,
}

impl<'a, V: FormView> FormSynchronizer<'a, V> {
    /// Reads every bound control, computes derived values and captures the
    /// empty-form baseline.
    ///
    /// # Errors
    /// - `MissingControl` when the view lacks a registry control.
    /// - `Codec` when a control reports an impossible state.
    pub fn new(registry: Registry, view: V, config: FormConfig) -> Result<Self, SyncError> {
        let texts = config.check_texts();
        let auto_persist = config.auto_persist;
        let mut sync = Self {
            registry,
            view,
            config,
            texts,
            current: Record::new(),
            empty: Record::new(),
            state: SyncState::Uninitialized,
            saved: true,
            last_saved_locator: None,
            auto_persist,
            checkpoint: None,
            on_failure: Box::new(escalate_store_failure),
        };
        sync.populate()?;
        info!(
            "event=form_init module=service status=ok variables={} derived={}",
            sync.current.len(),
            sync.registry.derived_controls().count()
        );
        Ok(sync)
    }

    /// Installs the automatic persistence sink.
    pub fn with_checkpoint(mut self, checkpoint: impl Checkpoint + 'a) -> Self {
        self.checkpoint = Some(Box::new(checkpoint));
        self
    }

    /// Replaces the default failure sink (process-fatal escalation).
    pub fn with_failure_handler(mut self, handler: impl FnMut(&StoreError) + 'a) -> Self {
        self.on_failure = Box::new(handler);
        self
    }

    pub fn set_auto_persist(&mut self, enabled: bool) {
        self.auto_persist = enabled;
    }

    fn populate(&mut self) -> Result<(), SyncError> {
        let mut record = Record::new();
        for control in self.registry.controls() {
            let native = self
                .view
                .read(&control.id)
                .ok_or_else(|| SyncError::MissingControl(control.id.clone()))?;
            let value = codec::decode(control, &native, &self.texts)?;
            record.insert(control.variable_name.clone(), value);
        }
        Self::refresh_derived(
            &self.registry,
            &mut self.view,
            &mut record,
            &self.texts,
            self.registry.derived_controls(),
        )?;
        self.empty = record.clone();
        self.current = record;
        self.state = SyncState::Quiescent;
        Ok(())
    }

    /// Handles a change notification from the toolkit.
    ///
    /// Checkpoint failures are not returned; they go to the failure handler.
    ///
    /// # Errors
    /// - `UnknownControl` for ids outside the registry.
    /// - `ReadOnlyControl` when a derived control was edited; the control is
    ///   reset to its computed value.
    /// - `Codec` when the control reports an impossible state.
    pub fn on_control_changed(
        &mut self,
        control_id: &str,
        native: NativeValue,
    ) -> Result<ChangeOutcome, SyncError> {
        let control = self
            .registry
            .get(control_id)
            .ok_or_else(|| SyncError::UnknownControl(control_id.to_string()))?;
        let value = codec::decode(control, &native, &self.texts)?;
        if self.current.get(&control.variable_name) == Some(&value) {
            return Ok(ChangeOutcome::Unchanged);
        }

        if control.is_derived() {
            if let Some(computed) = self.current.get(&control.variable_name) {
                let restored = codec::encode(control, computed, &self.texts)?;
                self.view.write(&control.id, restored);
            }
            warn!(
                "event=control_change module=service status=rejected reason=read_only control={}",
                control.id
            );
            return Err(SyncError::ReadOnlyControl(control.id.clone()));
        }

        self.current.insert(control.variable_name.clone(), value);
        let mut changed = vec![control.variable_name.clone()];
        changed.extend(Self::refresh_derived(
            &self.registry,
            &mut self.view,
            &mut self.current,
            &self.texts,
            self.registry.dependents_of(control_id),
        )?);
        self.saved = false;
        self.state = SyncState::Editing;

        self.persist_checkpoint(&changed);
        Ok(ChangeOutcome::Updated { changed })
    }

    /// Replaces the live record with `incoming`.
    ///
    /// Known keys take the incoming value as its control shows it, missing
    /// keys keep their empty-form default and unknown keys are dropped. The returned report tells which;
    /// only `requires_attention()` reports need a user dialog.
    ///
    /// # Errors
    /// - `IncompatibleValue` when an incoming value does not fit its control.
    ///   Nothing is modified in that case.
    pub fn load_record(&mut self, incoming: &Record) -> Result<LoadOutcome, SyncError> {
        let expected = self.registry.all_variable_names();
        let report = ReconciliationReport::between(&expected, &incoming.keys());

        let mut record = self.empty.clone();
        for (key, value) in incoming {
            let Some(control) = self.registry.by_variable(key) else {
                continue;
            };
            let value = codec::admit(control, value, &self.texts, &self.config.no_value_text)
                .map_err(|source| SyncError::IncompatibleValue {
                    key: key.clone(),
                    source,
                })?;
            record.insert(key.clone(), value);
        }

        if report.requires_attention() {
            warn!(
                "event=record_reconcile module=service status=data_dropped unknown_keys={} missing_keys={}",
                report.unknown_keys.len(),
                report.missing_keys.len()
            );
        } else if !report.is_clean() {
            info!(
                "event=record_reconcile module=service status=ok missing_keys={}",
                report.missing_keys.len()
            );
        }

        self.reconcile(record)?;
        self.saved = true;
        self.state = SyncState::Quiescent;
        let modified = self.modified_count();
        info!(
            "event=record_load module=service status=ok modified={}",
            modified
        );
        Ok(LoadOutcome { report, modified })
    }

    /// Resets every control to the empty form. Empty data counts as saved.
    pub fn clear_to_defaults(&mut self) -> Result<LoadOutcome, SyncError> {
        let empty = self.empty.clone();
        let outcome = self.load_record(&empty)?;
        self.last_saved_locator = None;
        Ok(outcome)
    }

    /// Loads a record from a store and marks the form saved to it.
    ///
    /// # Errors
    /// - `Store` for persistence failures; the live record is untouched.
    /// - `IncompatibleValue`, as for [`Self::load_record`].
    pub fn load_from<S: RecordStore>(
        &mut self,
        store: &S,
        locator: &S::Locator,
    ) -> Result<LoadOutcome, SyncError> {
        let incoming = store.load(locator).map_err(|err| {
            warn!(
                "event=record_load module=service status=error error={}",
                err
            );
            SyncError::Store(err)
        })?;
        let outcome = self.load_record(&incoming)?;
        self.last_saved_locator = Some(store.describe(locator));
        Ok(outcome)
    }

    /// Saves the live record to a store.
    ///
    /// An invalid identity code does not block saving; it is returned as a
    /// warning.
    pub fn save_to<S: RecordStore>(
        &mut self,
        store: &S,
        locator: &S::Locator,
    ) -> Result<SaveOutcome, SyncError> {
        let hetu_warning = self.identity_code_warning();
        if let Err(err) = store.save(locator, &self.current) {
            warn!(
                "event=record_save module=service status=error error={}",
                err
            );
            return Err(err.into());
        }
        self.saved = true;
        self.state = SyncState::Quiescent;
        self.last_saved_locator = Some(store.describe(locator));
        info!(
            "event=record_save module=service status=ok keys={} hetu_valid={}",
            self.current.len(),
            hetu_warning.is_none()
        );
        Ok(SaveOutcome { hetu_warning })
    }

    /// Loads the working checkpoint left by an abnormal exit, if any.
    ///
    /// Recovered data is not saved anywhere yet, so the form stays unsaved
    /// when the checkpoint holds edits.
    pub fn recover_checkpoint(
        &mut self,
        checkpoint: &FileCheckpoint,
    ) -> Result<Option<LoadOutcome>, SyncError> {
        if !checkpoint.exists() {
            return Ok(None);
        }
        let incoming = checkpoint.load()?;
        let outcome = self.load_record(&incoming)?;
        if outcome.modified > 0 {
            self.saved = false;
            self.state = SyncState::Editing;
        }
        self.last_saved_locator = None;
        info!(
            "event=checkpoint_recover module=service status=ok modified={}",
            outcome.modified
        );
        Ok(Some(outcome))
    }

    /// Removes the working checkpoint on clean exit.
    pub fn discard_checkpoint(&mut self) -> Result<(), SyncError> {
        if let Some(checkpoint) = self.checkpoint.as_mut() {
            checkpoint.discard()?;
        }
        Ok(())
    }

    /// Live record plus the variables still at their empty-form value.
    pub fn snapshot_for_report(&self) -> (&Record, BTreeSet<String>) {
        (&self.current, self.defaulted_keys())
    }

    pub fn defaulted_keys(&self) -> BTreeSet<String> {
        self.current.keys_equal_to(&self.empty)
    }

    pub fn modified_count(&self) -> usize {
        self.current.len() - self.defaulted_keys().len()
    }

    /// Current unit suffix per variable.
    pub fn units(&self) -> BTreeMap<String, String> {
        self.registry
            .controls()
            .map(|control| {
                let unit = self
                    .current
                    .get(&control.variable_name)
                    .map(|value| codec::unit(control, value))
                    .unwrap_or("");
                (control.variable_name.clone(), unit.to_string())
            })
            .collect()
    }

    /// Textual record for report renderers.
    pub fn report_data(&self, include_units: bool) -> ReportData {
        let no_value_text = self.config.no_value_text.as_str();
        let values = self
            .registry
            .controls()
            .filter_map(|control| {
                let value = self.current.get(&control.variable_name)?;
                let unit = if include_units {
                    codec::unit(control, value)
                } else {
                    ""
                };
                Some((
                    control.variable_name.clone(),
                    format!("{}{unit}", value.display_with(no_value_text)),
                ))
            })
            .collect();
        ReportData {
            values,
            defaulted: self.defaulted_keys(),
        }
    }

    pub fn record(&self) -> &Record {
        &self.current
    }

    pub fn empty_record(&self) -> &Record {
        &self.empty
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    /// Mutable view access for simulating user edits in headless use.
    pub fn view_mut(&mut self) -> &mut V {
        &mut self.view
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    pub fn is_saved(&self) -> bool {
        self.saved
    }

    pub fn last_saved_locator(&self) -> Option<&str> {
        self.last_saved_locator.as_deref()
    }

    pub fn config(&self) -> &FormConfig {
        &self.config
    }

    /// Pushes `record` into every control and makes it the live record.
    ///
    /// Derived values are recomputed and every native value encoded before
    /// the first control is written.
    fn reconcile(&mut self, mut record: Record) -> Result<(), SyncError> {
        for control in self.registry.derived_controls() {
            if let Some(value) = derived::recompute(control, &self.registry, &record) {
                record.insert(control.variable_name.clone(), value);
            }
        }
        let natives = self
            .registry
            .controls()
            .filter_map(|control| {
                record
                    .get(&control.variable_name)
                    .map(|value| (control, value))
            })
            .map(|(control, value)| {
                codec::encode(control, value, &self.texts).map(|native| (control.id.clone(), native))
            })
            .collect::<Result<Vec<_>, _>>()?;

        self.state = SyncState::Reconciling;
        for (control_id, native) in natives {
            self.view.write(&control_id, native);
        }
        self.current = record;
        self.state = SyncState::Quiescent;
        Ok(())
    }

    /// Recomputes `controls` against `record`, writing changed values to
    /// both the record and the view. Returns the changed variables.
    fn refresh_derived<'r>(
        registry: &'r Registry,
        view: &mut V,
        record: &mut Record,
        texts: &CheckTexts,
        controls: impl Iterator<Item = &'r ControlBinding>,
    ) -> Result<Vec<String>, SyncError> {
        let mut changed = Vec::new();
        for control in controls {
            let Some(value) = derived::recompute(control, registry, record) else {
                continue;
            };
            if record.get(&control.variable_name) == Some(&value) {
                continue;
            }
            let native = codec::encode(control, &value, texts)?;
            view.write(&control.id, native);
            record.insert(control.variable_name.clone(), value);
            changed.push(control.variable_name.clone());
        }
        Ok(changed)
    }

    fn persist_checkpoint(&mut self, changed: &[String]) {
        if !self.auto_persist {
            return;
        }
        let Some(checkpoint) = self.checkpoint.as_mut() else {
            return;
        };
        if let Err(err) = checkpoint.write(&self.current, changed) {
            error!(
                "event=checkpoint_write module=service status=error changed={} error={}",
                changed.len(),
                err
            );
            (self.on_failure)(&err);
        }
    }

    fn identity_code_warning(&self) -> Option<HetuError> {
        match self.current.get(IDENTITY_CODE_VARIABLE) {
            Some(Value::Text(code)) if !code.trim().is_empty() => {
                let result = validate_hetu(code);
                if let Err(err) = &result {
                    warn!(
                        "event=hetu_check module=service status=invalid error={}",
                        err
                    );
                }
                result.err()
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ReconciliationReport;
    use std::collections::BTreeSet;

    fn keys(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn report_splits_unknown_and_missing_keys() {
        let report = ReconciliationReport::between(&keys(&["a", "b"]), &keys(&["b", "ghost"]));
        assert_eq!(report.unknown_keys, keys(&["ghost"]));
        assert_eq!(report.missing_keys, keys(&["a"]));
        assert!(report.requires_attention());
        let message = report.message().unwrap();
        assert!(message.contains("ghost"));
        assert!(message.contains(": a."));
    }

    #[test]
    fn missing_keys_alone_do_not_need_attention() {
        let report = ReconciliationReport::between(&keys(&["a", "b"]), &keys(&["b"]));
        assert!(!report.requires_attention());
        assert!(!report.is_clean());
        assert!(report.message().is_some());
    }

    #[test]
    fn matching_keys_are_clean() {
        let report = ReconciliationReport::between(&keys(&["a"]), &keys(&["a"]));
        assert!(report.is_clean());
        assert_eq!(report.message(), None);
    }
}
