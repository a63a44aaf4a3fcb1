//! Process-fatal failure handling.
//!
//! # Responsibility
//! - Capture panics once per process, log a bounded summary and write the
//!   full diagnostic to a crash-dump file.
//! - Turn unhandled background failures into such a panic.
//!
//! # Invariants
//! - The hook is installed at most once; later calls are ignored.
//! - Log lines carry a sanitized, length-capped payload; the full text only
//!   goes to the dump file.
//! - The hook never panics itself; dump write failures are only logged.

use log::error;
use once_cell::sync::OnceCell;
use std::backtrace::Backtrace;
use std::error::Error;
use std::io::Write;
use std::path::{Path, PathBuf};

const MAX_LOGGED_PAYLOAD_CHARS: usize = 160;

static CRASH_DUMP_PATH: OnceCell<PathBuf> = OnceCell::new();

/// Installs the process-wide panic hook writing crash dumps to `dump_path`.
///
/// Returns `false` when a hook was already installed by an earlier call.
pub fn install_crash_handler(dump_path: impl Into<PathBuf>) -> bool {
    if CRASH_DUMP_PATH.set(dump_path.into()).is_err() {
        return false;
    }

    let previous_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let location = panic_info
            .location()
            .map(|loc| format!("{}:{}", loc.file(), loc.line()))
            .unwrap_or_else(|| "unknown".to_string());
        let payload = panic_payload(panic_info);
        error!(
            "event=panic_captured module=crash status=error location={} payload={}",
            location,
            sanitize_message(&payload, MAX_LOGGED_PAYLOAD_CHARS)
        );

        if let Some(path) = CRASH_DUMP_PATH.get() {
            let report = format!(
                "unhandled failure at {location}\n\n{payload}\n\nbacktrace:\n{}\n",
                Backtrace::force_capture()
            );
            if let Err(err) = write_crash_dump(path, &report) {
                error!(
                    "event=crash_dump module=crash status=error error={}",
                    err
                );
            }
        }
        previous_hook(panic_info);
    }));
    true
}

/// Location configured by [`install_crash_handler`], if any.
pub fn crash_dump_path() -> Option<&'static Path> {
    CRASH_DUMP_PATH.get().map(PathBuf::as_path)
}

/// Escalates an error no caller handled into a process-fatal panic.
///
/// The panic message carries the whole `source()` chain so the crash dump is
/// self-contained.
pub fn escalate(err: &dyn Error) -> ! {
    panic!("unhandled failure: {}", error_chain(err));
}

/// Renders `err` and its sources as `outer: inner: ...`.
pub fn error_chain(err: &dyn Error) -> String {
    let mut text = err.to_string();
    let mut source = err.source();
    while let Some(inner) = source {
        text.push_str(": ");
        text.push_str(&inner.to_string());
        source = inner.source();
    }
    text
}

/// Writes (overwrites) the crash dump file.
pub fn write_crash_dump(path: &Path, report: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = std::fs::File::create(path)?;
    file.write_all(report.as_bytes())?;
    file.flush()
}

fn panic_payload(info: &std::panic::PanicHookInfo<'_>) -> String {
    if let Some(message) = info.payload().downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = info.payload().downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

fn sanitize_message(value: &str, max_chars: usize) -> String {
    let normalized = value.replace(['\n', '\r'], " ");
    let mut truncated = normalized.chars().take(max_chars).collect::<String>();
    if normalized.chars().count() > max_chars {
        truncated.push_str("...");
    }
    truncated
}
