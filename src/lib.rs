//! # KLog
//!
//! A lightweight file-backed logger.
//!
//! ## Features
//!
//! - **Non-blocking**: records are handed to a single background writer
//! - **Size-capped**: the oldest quarter of the limit is trimmed once the file outgrows it
//! - **Crash capture**: panics are written to the log file before the process exits
//! - **Debug mode**: console only, nothing touches the disk

pub mod appenders;
pub mod core;
pub mod global;
pub mod macros;

pub mod prelude {
    pub use crate::appenders::{ConsoleSink, FileTarget, RotationPolicy};
    pub use crate::core::{
        Appender, CrashInterceptor, CrashReport, LogLevel, LogRecord, Logger, LoggerBuilder,
        LoggerConfig, LoggerError, LoggerMetrics, Result, SerialWriter, WriterHandle,
    };
}

pub use appenders::{ConsoleSink, FileTarget, RotationDecision, RotationPolicy};
pub use core::{
    default_log_dir, Appender, CrashCaptureGuard, CrashInterceptor, CrashReport, LogLevel,
    LogRecord, Logger, LoggerBuilder, LoggerConfig, LoggerConfigBuilder, LoggerError,
    LoggerMetrics, PlatformStorage, Result, SerialWriter, StorageResolver, Terminator,
    WriterHandle, CRASH_EXIT_CODE, DEFAULT_GRACE_PERIOD, DEFAULT_SHUTDOWN_TIMEOUT,
};
pub use global::{error, info, init, logger, shutdown};
