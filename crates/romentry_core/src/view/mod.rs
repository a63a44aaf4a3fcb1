//! Boundary to the UI toolkit that renders the form.
//!
//! # Responsibility
//! - Define the get/set contract the synchronizer needs from controls.
//! - Provide a headless in-memory form for tests and command-line use.
//!
//! # Invariants
//! - Implementations never call back into the synchronizer from `write`;
//!   change notifications are delivered through
//!   `FormSynchronizer::on_control_changed` by the toolkit's event loop.

mod memory_form;

pub use memory_form::MemoryForm;

use crate::model::control::NativeValue;

/// Get/set access to the form's bound controls.
pub trait FormView {
    /// Current native value of a control, or `None` if no such control exists.
    fn read(&self, control_id: &str) -> Option<NativeValue>;

    /// Programmatically sets a control's native value.
    fn write(&mut self, control_id: &str, value: NativeValue);
}
