//! Logging for the bridge host process.
//!
//! Log lines go to the terminal the host was launched from (colored) and to
//! `nellie-bridge.log` in the host's log directory, so a webview session that
//! misbehaved can be traced after the editor is closed.
//!
//! Frame-level traffic is logged by the bridge at `trace`; the websocket
//! library's own chatter is held at `warn` regardless of the host level.

use crate::error::NellieHostError;

use std::fmt::Arguments;
use std::fs::File;
use std::io::stdout;
use std::path::Path;
use std::sync::Once;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::SystemTime;

use fern::colors::Color::{Blue, Green, Magenta, Red, Yellow};
use fern::colors::ColoredLevelConfig;
use fern::{Dispatch, FormatCallback};
use humantime::format_rfc3339;
use log::{LevelFilter, Record, info, warn};

static INIT_LOGGER_ONCE: Once = Once::new();
static LOGGER_ALREADY_CALLED: AtomicBool = AtomicBool::new(false);

pub const LOG_FILE_NAME: &str = "nellie-bridge.log";

/// Crates whose logs are capped at `warn`.
const QUIET_TARGETS: [&str; 2] = ["tungstenite", "tokio_tungstenite"];

#[cfg(debug_assertions)]
const LOG_LEVEL: LevelFilter = LevelFilter::Debug;

#[cfg(not(debug_assertions))]
const LOG_LEVEL: LevelFilter = LevelFilter::Info;

/// Install the global logger writing to stdout and `{log_dir}/nellie-bridge.log`.
///
/// Only the first call installs anything; later calls log a warning and
/// return `Ok`.
///
/// # Errors
///
/// Returns [`NellieHostError::App`] if the log file cannot be opened or a
/// global logger is already installed by someone else.
pub fn initialize(log_dir: &Path) -> Result<(), NellieHostError> {
    if LOGGER_ALREADY_CALLED.swap(true, Ordering::SeqCst) {
        warn!("Logger already initialized");
        return Ok(());
    }

    let mut result = Ok(());

    INIT_LOGGER_ONCE.call_once(|| {
        result = install(log_dir);
        if result.is_ok() {
            info!("Bridge host logging at {LOG_LEVEL:?} to {}", log_dir.join(LOG_FILE_NAME).display());
        }
    });

    result
}

fn install(log_dir: &Path) -> Result<(), NellieHostError> {
    let colors = ColoredLevelConfig::new()
        .debug(Blue)
        .info(Green)
        .warn(Yellow)
        .error(Red)
        .trace(Magenta);

    let terminal = Dispatch::new()
        .format(move |out, message, record| write_line(out, message, record, colors.color(record.level())))
        .chain(stdout());

    let file = Dispatch::new()
        .format(|out, message, record| write_line(out, message, record, record.level()))
        .chain(open_log_file(&log_dir.join(LOG_FILE_NAME))?);

    QUIET_TARGETS
        .iter()
        .fold(Dispatch::new().level(LOG_LEVEL), |dispatch, target| {
            dispatch.level_for(*target, LevelFilter::Warn)
        })
        .chain(terminal)
        .chain(file)
        .apply()
        .map_err(|e| NellieHostError::app(format!("Failed to initialize logger: {e}")))
}

/// `[<rfc3339> - <level>] <message> [<file>:<line>]`
fn write_line(out: FormatCallback<'_>, message: &Arguments, record: &Record, level: impl std::fmt::Display) {
    out.finish(format_args!(
        "[{date} - {level}] {message} [{file}:{line}]",
        date = format_rfc3339(SystemTime::now()),
        file = record.file().unwrap_or("unknown"),
        line = record.line().unwrap_or(0),
    ))
}

/// Open (append) the log file.
pub(crate) fn open_log_file(path: &Path) -> Result<File, NellieHostError> {
    fern::log_file(path)
        .map_err(|e| NellieHostError::app(format!("Failed to create log file {}: {e}", path.display())))
}
