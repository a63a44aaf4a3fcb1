//! Headless form backed by a map of native values.

use super::FormView;
use crate::binding::codec::default_native;
use crate::binding::registry::Registry;
use crate::model::control::NativeValue;
use std::collections::BTreeMap;

/// In-memory stand-in for a rendered form.
///
/// Every bound control starts in its default native state; writes are
/// recorded so callers can inspect what the synchronizer pushed.
#[derive(Debug, Clone, Default)]
pub struct MemoryForm {
    values: BTreeMap<String, NativeValue>,
    writes: Vec<String>,
}

impl MemoryForm {
    /// Creates a form holding one control per registry entry.
    pub fn for_registry(registry: &Registry) -> Self {
        let values = registry
            .controls()
            .map(|control| (control.id.clone(), default_native(control)))
            .collect();
        Self {
            values,
            writes: Vec::new(),
        }
    }

    /// Simulates a user edit without notifying anyone.
    ///
    /// Returns the value so callers can forward it as the change notification.
    pub fn set(&mut self, control_id: &str, value: NativeValue) -> NativeValue {
        self.values.insert(control_id.to_string(), value.clone());
        value
    }

    /// Control ids written through [`FormView::write`], oldest first.
    pub fn writes(&self) -> &[String] {
        &self.writes
    }

    pub fn clear_writes(&mut self) {
        self.writes.clear();
    }
}

impl FormView for MemoryForm {
    fn read(&self, control_id: &str) -> Option<NativeValue> {
        self.values.get(control_id).cloned()
    }

    fn write(&mut self, control_id: &str, value: NativeValue) {
        self.values.insert(control_id.to_string(), value);
        self.writes.push(control_id.to_string());
    }
}
