//! Form configuration.
//!
//! # Responsibility
//! - Hold the display texts and locations the form core depends on.
//! - Load configuration from a JSON file, defaulting every missing key.
//!
//! # Invariants
//! - `yes_text` and `no_text` are non-empty and distinct.
//! - `no_value_text` is non-empty.

use crate::binding::codec::CheckTexts;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

const CHECKPOINT_FILE_NAME: &str = "romentry_checkpoint.json";
const CRASH_DUMP_FILE_NAME: &str = "romentry_crash.txt";

/// Configuration load/validation errors.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(serde_json::Error),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(_) => write!(f, "cannot read configuration"),
            Self::Parse(_) => write!(f, "cannot parse configuration"),
            Self::Invalid(message) => write!(f, "invalid configuration: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Parse(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

/// Settings shared by the binding core, persistence and reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormConfig {
    /// Text shown and stored for "not measured" numeric values.
    pub no_value_text: String,
    /// Stored text of a checked check box.
    pub yes_text: String,
    /// Stored text of an unchecked check box.
    pub no_text: String,
    /// Control id of the body weight used for normalization.
    pub body_weight_control: String,
    /// Whether every effective edit is checkpointed immediately.
    pub auto_persist: bool,
    /// Working location overwritten on every edit.
    pub checkpoint_path: PathBuf,
    /// Where fatal diagnostics are written.
    pub crash_dump_path: PathBuf,
    pub log_level: String,
    /// Absolute log directory; logging stays off when `None`.
    pub log_dir: Option<PathBuf>,
}

impl Default for FormConfig {
    fn default() -> Self {
        let temp_dir = std::env::temp_dir();
        Self {
            no_value_text: "Ei mitattu".to_string(),
            yes_text: "Kyllä".to_string(),
            no_text: "Ei".to_string(),
            body_weight_control: "spAntropPaino".to_string(),
            auto_persist: true,
            checkpoint_path: temp_dir.join(CHECKPOINT_FILE_NAME),
            crash_dump_path: temp_dir.join(CRASH_DUMP_FILE_NAME),
            log_level: crate::logging::default_log_level().to_string(),
            log_dir: None,
        }
    }
}

impl FormConfig {
    /// Reads and validates configuration from a JSON file.
    ///
    /// # Errors
    /// - `Io` when the file cannot be read.
    /// - `Parse` when the content is not a valid configuration object.
    /// - `Invalid` when validation fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        let config: Self = serde_json::from_str(&text).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.no_value_text.is_empty() {
            return Err(ConfigError::Invalid("no_value_text cannot be empty".to_string()));
        }
        if self.yes_text.is_empty() || self.no_text.is_empty() {
            return Err(ConfigError::Invalid(
                "yes_text and no_text cannot be empty".to_string(),
            ));
        }
        if self.yes_text == self.no_text {
            return Err(ConfigError::Invalid(format!(
                "yes_text and no_text must differ, both are `{}`",
                self.yes_text
            )));
        }
        if self.body_weight_control.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "body_weight_control cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn check_texts(&self) -> CheckTexts {
        CheckTexts {
            yes_text: self.yes_text.clone(),
            no_text: self.no_text.clone(),
        }
    }
}
