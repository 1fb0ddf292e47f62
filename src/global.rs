//! Process-wide logger
//!
//! Optional convenience for applications that want one logger reachable from
//! anywhere. Statics are never dropped, so call [`shutdown`] before exiting to
//! drain pending records.

use crate::core::{LogLevel, Logger, LoggerConfig, LoggerError, Result};
use parking_lot::Mutex;
use std::sync::OnceLock;
use std::time::Duration;

static LOGGER: OnceLock<Logger> = OnceLock::new();
static INIT: Mutex<()> = parking_lot::const_mutex(());

fn already_initialized() -> LoggerError {
    LoggerError::config("klog::init", "global logger already initialized")
}

/// Create the process-wide logger
///
/// # Examples
///
/// ```no_run
/// use klog::LoggerConfig;
///
/// let config = LoggerConfig::builder()
///     .log_name("testLog")
///     .debug(false)
///     .catch_crash_log(true)
///     .build()
///     .unwrap();
/// klog::init(config).unwrap();
///
/// klog::info("application started");
/// ```
///
/// # Errors
///
/// Returns error if already initialized or the logger cannot start
pub fn init(config: LoggerConfig) -> Result<&'static Logger> {
    let _guard = INIT.lock();
    if LOGGER.get().is_some() {
        return Err(already_initialized());
    }

    LOGGER.set(Logger::new(config)?).map_err(|_| already_initialized())?;
    LOGGER.get().ok_or_else(already_initialized)
}

/// The process-wide logger, if [`init`] has run
pub fn logger() -> Option<&'static Logger> {
    LOGGER.get()
}

/// Log through the process-wide logger; a no-op before [`init`]
pub fn log(level: LogLevel, message: impl Into<String>) {
    if let Some(logger) = LOGGER.get() {
        logger.log(level, message);
    }
}

pub fn info(message: impl Into<String>) {
    log(LogLevel::Info, message);
}

pub fn error(message: impl Into<String>) {
    log(LogLevel::Error, message);
}

/// Drain and stop the process-wide logger's writer
///
/// Returns `true` if there was nothing to stop or it stopped within `timeout`.
pub fn shutdown(timeout: Duration) -> bool {
    LOGGER.get().map_or(true, |logger| logger.shutdown(timeout))
}
