//! Control declaration model.
//!
//! # Responsibility
//! - Describe bound input controls independently of any UI toolkit.
//! - Define the native values a control reports and accepts.
//!
//! # Invariants
//! - `ControlType` is fixed per control for the lifetime of a form.
//! - `ControlProps::options` is only meaningful for `ControlType::Choice`.

use serde::{Deserialize, Serialize};

/// Type tag of a bound input control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlType {
    /// Integer or real spin box; its minimum means "not measured".
    Numeric,
    /// Single-line text input.
    Text,
    /// Multi-line comment field.
    MultilineText,
    /// Drop-down list of fixed options.
    Choice,
    /// Two-state check box.
    Boolean,
    /// Composite angle input (degree spin box with special-value check box).
    CompoundAngle,
}

impl ControlType {
    /// Whether the control reports a unit suffix for numeric values.
    pub fn has_unit(self) -> bool {
        matches!(self, Self::Numeric | Self::CompoundAngle)
    }
}

/// Static per-control properties configured in the form layout.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlProps {
    /// Lowest value of numeric and angle controls.
    pub minimum: f64,
    /// Display suffix (unit) of numeric and angle controls, e.g. `"°"`.
    pub suffix: String,
    /// Options of choice controls, in display order.
    pub options: Vec<String>,
}

impl ControlProps {
    pub fn numeric(minimum: f64, suffix: impl Into<String>) -> Self {
        Self {
            minimum,
            suffix: suffix.into(),
            options: Vec::new(),
        }
    }

    pub fn choice<I, S>(options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            minimum: 0.0,
            suffix: String::new(),
            options: options.into_iter().map(Into::into).collect(),
        }
    }
}

/// One input control as declared by the form layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlDecl {
    /// Unique control identifier; its prefix encodes the control type.
    pub id: String,
    #[serde(rename = "type")]
    pub control_type: ControlType,
    #[serde(default)]
    pub props: ControlProps,
}

impl ControlDecl {
    pub fn new(id: impl Into<String>, control_type: ControlType, props: ControlProps) -> Self {
        Self {
            id: id.into(),
            control_type,
            props,
        }
    }

    /// Numeric spin box declaration.
    pub fn numeric(id: impl Into<String>, minimum: f64, suffix: &str) -> Self {
        Self::new(id, ControlType::Numeric, ControlProps::numeric(minimum, suffix))
    }

    /// Composite angle declaration.
    pub fn angle(id: impl Into<String>, minimum: f64) -> Self {
        Self::new(id, ControlType::CompoundAngle, ControlProps::numeric(minimum, "°"))
    }

    pub fn text(id: impl Into<String>) -> Self {
        Self::new(id, ControlType::Text, ControlProps::default())
    }

    pub fn comment(id: impl Into<String>) -> Self {
        Self::new(id, ControlType::MultilineText, ControlProps::default())
    }

    pub fn boolean(id: impl Into<String>) -> Self {
        Self::new(id, ControlType::Boolean, ControlProps::default())
    }

    pub fn choice<I, S>(id: impl Into<String>, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(id, ControlType::Choice, ControlProps::choice(options))
    }
}

/// Tri-state of a check box as reported by the toolkit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckState {
    Unchecked,
    PartiallyChecked,
    Checked,
}

/// Value as reported by, or written to, a control.
#[derive(Debug, Clone, PartialEq)]
pub enum NativeValue {
    /// Spin box or angle value.
    Number(f64),
    /// Line edit, text edit or combo box current text.
    Text(String),
    /// Check box state.
    Check(CheckState),
}

impl NativeValue {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }
}
