//! File logging bootstrap.
//!
//! # Responsibility
//! - Start rotating file logs once per process from the form configuration.
//! - Keep the diagnostics policy in one place: events are `key=value`
//!   metadata; measurement values and patient identity are never logged.
//!
//! # Invariants
//! - Repeated initialization with identical settings is a no-op.
//! - Initialization with different settings is rejected, never applied.
//! - Initialization never panics.

use flexi_logger::{
    Cleanup, Criterion, FileSpec, FlexiLoggerError, Logger, LoggerHandle, Naming, WriteMode,
};
use log::info;
use once_cell::sync::OnceCell;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

const LOG_BASENAME: &str = "romentry";
const ROTATE_AT_BYTES: u64 = 10 * 1024 * 1024;
const KEPT_LOG_FILES: usize = 5;
const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

static LOGGER: OnceCell<RunningLogger> = OnceCell::new();

#[derive(Debug)]
pub enum LoggingError {
    UnknownLevel(String),
    /// Log directory must be absolute so every entry point logs to one place.
    RelativeDir(PathBuf),
    CreateDir {
        dir: PathBuf,
        source: std::io::Error,
    },
    Start(FlexiLoggerError),
    /// Logging already runs with other settings.
    AlreadyStarted { level: &'static str, dir: PathBuf },
}

impl Display for LoggingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownLevel(level) => write!(
                f,
                "unknown log level `{level}`, use one of {}",
                LEVELS.join("|")
            ),
            Self::RelativeDir(dir) => {
                write!(f, "log directory `{}` is not absolute", dir.display())
            }
            Self::CreateDir { dir, .. } => {
                write!(f, "cannot create log directory `{}`", dir.display())
            }
            Self::Start(_) => write!(f, "cannot start file logging"),
            Self::AlreadyStarted { level, dir } => write!(
                f,
                "logging already runs at level `{level}` in `{}`",
                dir.display()
            ),
        }
    }
}

impl Error for LoggingError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::CreateDir { source, .. } => Some(source),
            Self::Start(err) => Some(err),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct LogTarget {
    level: &'static str,
    dir: PathBuf,
}

struct RunningLogger {
    target: LogTarget,
    _handle: LoggerHandle,
}

/// Starts file logging at `level` into the absolute directory `log_dir`.
///
/// # Errors
/// - `UnknownLevel` / `RelativeDir` for bad settings.
/// - `CreateDir` / `Start` when the backend cannot start.
/// - `AlreadyStarted` when logging runs with different settings.
pub fn init_logging(level: &str, log_dir: &Path) -> Result<(), LoggingError> {
    let wanted = LogTarget {
        level: parse_level(level)?,
        dir: absolute_dir(log_dir)?,
    };
    let running = LOGGER.get_or_try_init(|| start(&wanted))?;
    if running.target == wanted {
        Ok(())
    } else {
        Err(LoggingError::AlreadyStarted {
            level: running.target.level,
            dir: running.target.dir.clone(),
        })
    }
}

/// Active `(level, log_dir)`, or `None` before [`init_logging`] succeeded.
pub fn logging_status() -> Option<(&'static str, PathBuf)> {
    LOGGER
        .get()
        .map(|running| (running.target.level, running.target.dir.clone()))
}

/// `debug` in debug builds, `info` otherwise.
pub fn default_log_level() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    }
}

fn start(target: &LogTarget) -> Result<RunningLogger, LoggingError> {
    std::fs::create_dir_all(&target.dir).map_err(|source| LoggingError::CreateDir {
        dir: target.dir.clone(),
        source,
    })?;

    let handle = Logger::try_with_str(target.level)
        .and_then(|logger| {
            logger
                .log_to_file(
                    FileSpec::default()
                        .directory(target.dir.as_path())
                        .basename(LOG_BASENAME),
                )
                .rotate(
                    Criterion::Size(ROTATE_AT_BYTES),
                    Naming::Numbers,
                    Cleanup::KeepLogFiles(KEPT_LOG_FILES),
                )
                .write_mode(WriteMode::BufferAndFlush)
                .append()
                .format_for_files(flexi_logger::detailed_format)
                .start()
        })
        .map_err(LoggingError::Start)?;

    info!(
        "event=app_start module=logging status=ok platform={} version={} level={}",
        std::env::consts::OS,
        env!("CARGO_PKG_VERSION"),
        target.level
    );
    Ok(RunningLogger {
        target: target.clone(),
        _handle: handle,
    })
}

fn parse_level(level: &str) -> Result<&'static str, LoggingError> {
    let lowered = level.trim().to_ascii_lowercase();
    let lowered = if lowered == "warning" { "warn".to_string() } else { lowered };
    LEVELS
        .iter()
        .copied()
        .find(|known| *known == lowered)
        .ok_or_else(|| LoggingError::UnknownLevel(level.to_string()))
}

fn absolute_dir(log_dir: &Path) -> Result<PathBuf, LoggingError> {
    if log_dir.as_os_str().is_empty() || !log_dir.is_absolute() {
        return Err(LoggingError::RelativeDir(log_dir.to_path_buf()));
    }
    Ok(log_dir.to_path_buf())
}
