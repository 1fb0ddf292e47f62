//! Logger configuration
//!
//! A [`LoggerConfig`] is an immutable snapshot. It is assembled once through
//! [`LoggerConfigBuilder`] (or loaded from JSON) and handed to the logger, so
//! the file target never observes a half-applied change.

use super::error::{LoggerError, Result};
use super::storage::{default_log_dir, PlatformStorage, StorageResolver, DEFAULT_LOG_ROOT};
use crate::appenders::rotating_file::DEFAULT_SIZE_LIMIT;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_TAG: &str = "KLog";
pub const DEFAULT_LOG_NAME: &str = "log";

/// How long a crashing thread waits for its report to reach the file
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    tag: String,
    log_dir: PathBuf,
    log_name: String,
    size_limit: u64,
    debug: bool,
    catch_crash_log: bool,
    #[serde(rename = "grace_period_ms", with = "duration_millis")]
    grace_period: Duration,
    queue_capacity: Option<usize>,
}

impl Default for LoggerConfig {
    /// Defaults with an unresolved (empty) directory
    fn default() -> Self {
        Self {
            tag: DEFAULT_TAG.to_string(),
            log_dir: PathBuf::new(),
            log_name: DEFAULT_LOG_NAME.to_string(),
            size_limit: DEFAULT_SIZE_LIMIT,
            debug: true,
            catch_crash_log: false,
            grace_period: DEFAULT_GRACE_PERIOD,
            queue_capacity: None,
        }
    }
}

impl LoggerConfig {
    pub fn builder() -> LoggerConfigBuilder {
        LoggerConfigBuilder::new()
    }

    /// Parse a configuration from JSON
    ///
    /// Missing fields take their defaults; a missing `log_dir` is resolved
    /// through [`PlatformStorage`].
    ///
    /// # Examples
    ///
    /// ```
    /// use klog::LoggerConfig;
    ///
    /// let config = LoggerConfig::from_json(
    ///     r#"{ "log_dir": "/tmp/klog", "log_name": "app", "debug": false }"#,
    /// ).unwrap();
    /// assert_eq!(config.log_name(), "app");
    /// assert_eq!(config.tag(), "KLog");
    /// ```
    ///
    /// # Errors
    ///
    /// Returns error on malformed JSON or an invalid configuration
    pub fn from_json(json: &str) -> Result<Self> {
        let mut config: LoggerConfig = serde_json::from_str(json)?;
        if config.log_dir.as_os_str().is_empty() {
            config.log_dir = default_log_dir(&PlatformStorage, DEFAULT_LOG_ROOT)?;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    pub fn log_name(&self) -> &str {
        &self.log_name
    }

    /// Full path of the log file
    pub fn log_path(&self) -> PathBuf {
        self.log_dir.join(&self.log_name)
    }

    pub fn size_limit(&self) -> u64 {
        self.size_limit
    }

    /// In debug mode records only go to the console
    pub fn debug(&self) -> bool {
        self.debug
    }

    pub fn catch_crash_log(&self) -> bool {
        self.catch_crash_log
    }

    pub fn grace_period(&self) -> Duration {
        self.grace_period
    }

    /// `None` means unbounded
    pub fn queue_capacity(&self) -> Option<usize> {
        self.queue_capacity
    }

    fn validate(&self) -> Result<()> {
        if self.log_name.is_empty() {
            return Err(LoggerError::config("LoggerConfig", "log name must not be empty"));
        }
        if self.log_name.contains(['/', '\\']) {
            return Err(LoggerError::config(
                "LoggerConfig",
                format!("log name '{}' must not contain path separators", self.log_name),
            ));
        }
        if self.size_limit == 0 {
            return Err(LoggerError::config("LoggerConfig", "size limit must be positive"));
        }
        if self.queue_capacity == Some(0) {
            return Err(LoggerError::config("LoggerConfig", "queue capacity must be positive"));
        }
        Ok(())
    }
}

/// Builder for [`LoggerConfig`]
///
/// # Example
///
/// ```
/// use klog::LoggerConfig;
///
/// let config = LoggerConfig::builder()
///     .tag("MyApp")
///     .log_dir(std::env::temp_dir())
///     .log_name("testLog")
///     .size_limit(1024 * 1024)
///     .debug(false)
///     .build()
///     .unwrap();
///
/// assert_eq!(config.log_name(), "testLog");
/// assert!(!config.debug());
/// ```
pub struct LoggerConfigBuilder {
    config: LoggerConfig,
    log_dir: Option<PathBuf>,
    storage: Option<Box<dyn StorageResolver>>,
}

impl LoggerConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: LoggerConfig::default(),
            log_dir: None,
            storage: None,
        }
    }

    /// Console tag
    #[must_use = "builder methods return a new value"]
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.config.tag = tag.into();
        self
    }

    /// Directory of the log file; overrides the storage resolver
    #[must_use = "builder methods return a new value"]
    pub fn log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(dir.into());
        self
    }

    /// File name of the log file
    #[must_use = "builder methods return a new value"]
    pub fn log_name(mut self, name: impl Into<String>) -> Self {
        self.config.log_name = name.into();
        self
    }

    /// Size limit in bytes
    #[must_use = "builder methods return a new value"]
    pub fn size_limit(mut self, bytes: u64) -> Self {
        self.config.size_limit = bytes;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn debug(mut self, debug: bool) -> Self {
        self.config.debug = debug;
        self
    }

    /// Persist panics to the log file before terminating the process
    #[must_use = "builder methods return a new value"]
    pub fn catch_crash_log(mut self, enabled: bool) -> Self {
        self.config.catch_crash_log = enabled;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn grace_period(mut self, grace: Duration) -> Self {
        self.config.grace_period = grace;
        self
    }

    /// Bound the writer queue; records submitted while it is full are dropped
    #[must_use = "builder methods return a new value"]
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.config.queue_capacity = Some(capacity);
        self
    }

    /// Resolver used for the default directory when none is set explicitly
    #[must_use = "builder methods return a new value"]
    pub fn storage(mut self, resolver: impl StorageResolver + 'static) -> Self {
        self.storage = Some(Box::new(resolver));
        self
    }

    /// Validate and freeze the configuration
    ///
    /// # Errors
    ///
    /// Returns error if a value is invalid or the default directory cannot be
    /// created
    pub fn build(self) -> Result<LoggerConfig> {
        let mut config = self.config;
        config.validate()?;

        config.log_dir = match (self.log_dir, self.storage) {
            (Some(dir), _) => dir,
            (None, Some(storage)) => default_log_dir(storage.as_ref(), DEFAULT_LOG_ROOT)?,
            (None, None) => default_log_dir(&PlatformStorage, DEFAULT_LOG_ROOT)?,
        };
        Ok(config)
    }
}

impl Default for LoggerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for LoggerConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggerConfigBuilder")
            .field("config", &self.config)
            .field("log_dir", &self.log_dir)
            .field("storage", &self.storage.is_some())
            .finish()
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
