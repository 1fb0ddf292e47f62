//! Core logger types and traits

pub mod appender;
pub mod config;
pub mod crash;
pub mod error;
pub mod log_level;
pub mod log_record;
pub mod logger;
pub mod metrics;
pub mod serial_writer;
pub mod storage;

pub use appender::Appender;
pub use config::{LoggerConfig, LoggerConfigBuilder, DEFAULT_GRACE_PERIOD};
pub use crash::{CrashCaptureGuard, CrashInterceptor, CrashReport, Terminator, CRASH_EXIT_CODE};
pub use error::{LoggerError, Result};
pub use log_level::LogLevel;
pub use log_record::LogRecord;
pub use logger::{Logger, LoggerBuilder};
pub use metrics::LoggerMetrics;
pub use serial_writer::{SerialWriter, WriterHandle, DEFAULT_SHUTDOWN_TIMEOUT};
pub use storage::{default_log_dir, PlatformStorage, StorageResolver};
