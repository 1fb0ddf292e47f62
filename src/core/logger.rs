//! Logger facade

use super::{
    appender::Appender,
    config::{LoggerConfig, LoggerConfigBuilder},
    crash::{CrashCaptureGuard, CrashInterceptor},
    error::Result,
    log_level::LogLevel,
    log_record::LogRecord,
    metrics::LoggerMetrics,
    serial_writer::SerialWriter,
    storage::StorageResolver,
};
use crate::appenders::{ConsoleSink, FileTarget};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Routes every call to the console and, outside debug mode, to the log file
///
/// The configuration is a snapshot taken at construction; build a new logger
/// to change it.
///
/// # Example
///
/// ```no_run
/// use klog::Logger;
///
/// let logger = Logger::builder()
///     .log_name("testLog")
///     .debug(false)
///     .catch_crash_log(true)
///     .build()
///     .unwrap();
///
/// logger.info("application started");
/// logger.error("failed to load optional plugin");
/// ```
pub struct Logger {
    config: Arc<LoggerConfig>,
    console: ConsoleSink,
    // Declared before the writer so crash capture is released first on drop
    crash_capture: Mutex<Option<CrashCaptureGuard>>,
    writer: SerialWriter,
}

impl Logger {
    /// Create a logger writing to `<log_dir>/<log_name>`
    ///
    /// Installs crash capture if the configuration asks for it.
    ///
    /// # Errors
    ///
    /// Returns error if the writer cannot start or crash capture is already
    /// installed in this process
    pub fn new(config: LoggerConfig) -> Result<Self> {
        let metrics = Arc::new(LoggerMetrics::new());
        let target = FileTarget::new(config.log_dir(), config.log_name(), config.size_limit())?
            .with_metrics(Arc::clone(&metrics));
        Self::with_target(config, Box::new(target), metrics)
    }

    /// Create a logger whose records go to a custom appender
    ///
    /// # Errors
    ///
    /// Same as [`Logger::new`]
    pub fn with_appender<A: Appender + 'static>(config: LoggerConfig, appender: A) -> Result<Self> {
        Self::with_target(config, Box::new(appender), Arc::new(LoggerMetrics::new()))
    }

    fn with_target(
        config: LoggerConfig,
        target: Box<dyn Appender>,
        metrics: Arc<LoggerMetrics>,
    ) -> Result<Self> {
        let writer = SerialWriter::with_options(target, config.queue_capacity(), metrics)?;
        let logger = Self {
            config: Arc::new(config),
            console: ConsoleSink::new(),
            crash_capture: Mutex::new(None),
            writer,
        };

        if logger.config.catch_crash_log() {
            logger.enable_crash_capture()?;
        }
        Ok(logger)
    }

    pub fn builder() -> LoggerBuilder {
        LoggerBuilder::new()
    }

    pub fn config(&self) -> &LoggerConfig {
        &self.config
    }

    pub fn log_path(&self) -> PathBuf {
        self.config.log_path()
    }

    pub fn metrics(&self) -> &LoggerMetrics {
        self.writer.metrics()
    }

    /// Route panics to this logger's file until it shuts down or is dropped
    ///
    /// # Errors
    ///
    /// Returns error if another logger currently has crash capture enabled
    pub fn enable_crash_capture(&self) -> Result<()> {
        let guard = CrashInterceptor::new(self.writer.handle())
            .with_grace_period(self.config.grace_period())
            .install()?;
        *self.crash_capture.lock() = Some(guard);
        Ok(())
    }

    /// Whether panics are currently routed to this logger
    pub fn crash_capture_enabled(&self) -> bool {
        self.crash_capture.lock().is_some()
    }

    pub fn log(&self, level: LogLevel, message: impl Into<String>) {
        let message = message.into();
        self.console.write(level, self.config.tag(), &message);
        if !self.config.debug() {
            self.writer.submit(LogRecord::new(message));
        }
    }

    #[inline]
    pub fn info(&self, message: impl Into<String>) {
        self.log(LogLevel::Info, message);
    }

    #[inline]
    pub fn error(&self, message: impl Into<String>) {
        self.log(LogLevel::Error, message);
    }

    /// Wait until every record logged so far has been processed
    ///
    /// Returns `false` if `timeout` elapsed first.
    pub fn flush(&self, timeout: Duration) -> bool {
        self.writer.flush(timeout)
    }

    /// Release crash capture, drain pending records and stop the writer
    ///
    /// Records logged afterwards still reach the console but not the file.
    /// Dropping the logger does the same with a 5-second timeout.
    pub fn shutdown(&self, timeout: Duration) -> bool {
        self.crash_capture.lock().take();
        self.writer.shutdown(timeout)
    }
}

/// Builder for constructing a [`Logger`] with a fluent API
pub struct LoggerBuilder {
    config: LoggerConfigBuilder,
}

impl LoggerBuilder {
    pub fn new() -> Self {
        Self {
            config: LoggerConfigBuilder::new(),
        }
    }

    #[must_use = "builder methods return a new value"]
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.config = self.config.tag(tag);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config = self.config.log_dir(dir);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn log_name(mut self, name: impl Into<String>) -> Self {
        self.config = self.config.log_name(name);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn size_limit(mut self, bytes: u64) -> Self {
        self.config = self.config.size_limit(bytes);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn debug(mut self, debug: bool) -> Self {
        self.config = self.config.debug(debug);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn catch_crash_log(mut self, enabled: bool) -> Self {
        self.config = self.config.catch_crash_log(enabled);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn grace_period(mut self, grace: Duration) -> Self {
        self.config = self.config.grace_period(grace);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.config = self.config.queue_capacity(capacity);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn storage(mut self, resolver: impl StorageResolver + 'static) -> Self {
        self.config = self.config.storage(resolver);
        self
    }

    /// # Errors
    ///
    /// Returns error if the configuration is invalid or the logger cannot start
    pub fn build(self) -> Result<Logger> {
        Logger::new(self.config.build()?)
    }
}

impl Default for LoggerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const WAIT: Duration = Duration::from_secs(5);

    #[test]
    fn test_release_mode_writes_file() {
        let dir = tempdir().unwrap();
        let logger = Logger::builder()
            .log_dir(dir.path())
            .log_name("testLog")
            .debug(false)
            .build()
            .unwrap();

        logger.info("first");
        logger.error("second");
        assert!(logger.flush(WAIT));

        let content = fs::read_to_string(dir.path().join("testLog")).unwrap();
        let lines: Vec<&str> = content.split_terminator("\r\n").collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with(" first"));
        assert!(lines[1].ends_with(" second"));
        assert_eq!(logger.metrics().written_count(), 2);
    }

    #[test]
    fn test_debug_mode_leaves_file_absent() {
        let dir = tempdir().unwrap();
        let logger = Logger::builder().log_dir(dir.path()).build().unwrap();
        assert!(logger.config().debug());

        for i in 0..20 {
            logger.info(format!("info {}", i));
            logger.error(format!("error {}", i));
        }
        assert!(logger.flush(WAIT));

        assert!(!logger.log_path().exists());
        assert_eq!(logger.metrics().submitted_count(), 0);
    }

    #[test]
    fn test_unwritable_directory_is_silent() {
        let dir = tempdir().unwrap();
        let logger = Logger::builder()
            .log_dir(dir.path().join("does-not-exist"))
            .debug(false)
            .build()
            .unwrap();

        logger.info("lost");
        assert!(logger.flush(WAIT));
        assert_eq!(logger.metrics().failed_count(), 1);

        // The next call still works once the directory appears
        fs::create_dir(dir.path().join("does-not-exist")).unwrap();
        logger.info("kept");
        assert!(logger.flush(WAIT));
        let content = fs::read_to_string(logger.log_path()).unwrap();
        assert!(content.ends_with(" kept\r\n"));
    }

    #[test]
    fn test_shutdown_stops_file_output() {
        let dir = tempdir().unwrap();
        let logger = Logger::builder()
            .log_dir(dir.path())
            .debug(false)
            .build()
            .unwrap();

        logger.info("before");
        assert!(logger.shutdown(WAIT));
        logger.info("after");

        let content = fs::read_to_string(logger.log_path()).unwrap();
        assert!(content.contains("before"));
        assert!(!content.contains("after"));
        assert_eq!(logger.metrics().dropped_count(), 1);
    }
}
