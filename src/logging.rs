//! Tracing setup for the terminal front-end.
//!
//! Game output owns stdout, so console logs go to stderr and stay quiet
//! unless asked for. A daily log file under `logs/` keeps the full `info`
//! trail of background jobs.

use std::{path::Path, sync::OnceLock};

use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{InitError, RollingFileAppender, Rotation},
};
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt, prelude::*};

use crate::app_dirs::{self, AppDirError};

/// Console filter override, e.g. `SHAPE_HUNTER_LOG=debug`.
pub const CONSOLE_LOG_ENV: &str = "SHAPE_HUNTER_LOG";
const CONSOLE_DEFAULT: &str = "warn";
const FILE_DEFAULT: &str = "info";
const LOG_FILE_PREFIX: &str = "shape-hunter";
/// Daily files kept before the oldest is removed.
const MAX_LOG_FILES: usize = 7;

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error(transparent)]
    AppDir(#[from] AppDirError),
    #[error("Failed to open log file: {0}")]
    Appender(#[from] InitError),
    #[error("Failed to install global tracing subscriber: {0}")]
    SetGlobal(#[from] tracing::subscriber::SetGlobalDefaultError),
}

/// Install the global subscriber. Later calls are no-ops.
///
/// On error nothing is installed and the caller runs without logs.
pub fn init() -> Result<(), LoggingError> {
    if LOG_GUARD.get().is_some() {
        return Ok(());
    }
    let log_dir = app_dirs::logs_dir()?;
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender(&log_dir)?);

    let console_layer = fmt::layer()
        .compact()
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::new(filter_directives(
            std::env::var(CONSOLE_LOG_ENV).ok(),
            CONSOLE_DEFAULT,
        )));
    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_writer(file_writer)
        .with_filter(EnvFilter::new(filter_directives(
            std::env::var(EnvFilter::DEFAULT_ENV).ok(),
            FILE_DEFAULT,
        )));

    tracing::subscriber::set_global_default(
        Registry::default().with(console_layer).with(file_layer),
    )?;
    let _ = LOG_GUARD.set(guard);
    tracing::info!("Logging to {}", log_dir.display());
    Ok(())
}

fn file_appender(dir: &Path) -> Result<RollingFileAppender, InitError> {
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix("log")
        .max_log_files(MAX_LOG_FILES)
        .build(dir)
}

/// Use the environment value unless it is missing or blank.
fn filter_directives(from_env: Option<String>, default: &str) -> String {
    from_env
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| default.to_string())
}
