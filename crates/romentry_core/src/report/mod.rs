//! Report rendering from a record snapshot.
//!
//! # Responsibility
//! - Substitute `{Variable}` placeholders in text and spreadsheet templates.
//! - Leave out or blank fields that are still at their empty-form default.
//! - Check templates against the form's variable names.
//!
//! # Invariants
//! - Rendering never mutates the record it is given.
//! - An unknown placeholder is an error, never rendered verbatim.

pub mod spreadsheet;
pub mod template;
pub mod text;

use std::collections::{BTreeMap, BTreeSet};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub use spreadsheet::{render_spreadsheet, Cell, Spreadsheet, SpreadsheetTemplate};
pub use template::{template_fields, validate_template};
pub use text::render_text;

/// Report flavours produced by the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    /// Full text report, values with units.
    Text,
    /// Isokinetic strength text report, values without units.
    IsokineticText,
    /// Spreadsheet report, values without units.
    Spreadsheet,
}

impl ReportKind {
    pub fn includes_units(self) -> bool {
        matches!(self, Self::Text)
    }

    /// File name prefix for saved reports of this kind.
    pub fn file_prefix(self) -> &'static str {
        match self {
            Self::Text => "Rom_",
            Self::IsokineticText => "Isokin_",
            Self::Spreadsheet => "Rom_excel_",
        }
    }
}

/// Textual record handed to renderers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportData {
    /// Rendered value per variable, optionally with unit suffix.
    pub values: BTreeMap<String, String>,
    /// Variables still equal to the empty form ("not measured").
    pub defaulted: BTreeSet<String>,
}

impl ReportData {
    pub fn is_defaulted(&self, variable: &str) -> bool {
        self.defaulted.contains(variable)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportError {
    /// Template references a variable that does not exist.
    UnknownField(String),
    /// Template braces do not form a placeholder.
    MalformedTemplate { line: usize, detail: String },
}

impl Display for ReportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownField(name) => write!(f, "template refers to unknown field `{name}`"),
            Self::MalformedTemplate { line, detail } => {
                write!(f, "malformed template at line {line}: {detail}")
            }
        }
    }
}

impl Error for ReportError {}
