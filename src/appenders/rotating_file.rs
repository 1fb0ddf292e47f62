//! Size-capped log file
//!
//! [`FileTarget`] appends formatted records to a single file. Before each
//! append it asks [`RotationPolicy`] whether the file has outgrown its limit;
//! if so the oldest quarter of the limit is cut from the front of the file.
//! Nothing is ever renamed or archived.

use crate::core::appender::Appender;
use crate::core::error::{LoggerError, Result};
use crate::core::log_record::LogRecord;
use crate::core::metrics::LoggerMetrics;
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Default size limit: 50 MiB
pub const DEFAULT_SIZE_LIMIT: u64 = 50 * 1024 * 1024;

/// Suffix appended to the log path to name the rotation backup
pub const ROTATION_TEMP_SUFFIX: &str = "Temp";

/// Outcome of [`RotationPolicy::decide`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotationDecision {
    pub should_rotate: bool,
    /// Bytes before this offset are discarded; everything from it onward is kept
    pub keep_from_offset: u64,
}

impl RotationDecision {
    const KEEP_ALL: Self = Self {
        should_rotate: false,
        keep_from_offset: 0,
    };
}

/// Quarter-trimming policy
///
/// Once the file is larger than the limit, the first `limit / 4` bytes are
/// dropped no matter how far past the limit the file has grown. The file then
/// needs another quarter of the limit written before it rotates again.
///
/// # Examples
///
/// ```
/// use klog::appenders::RotationPolicy;
///
/// let policy = RotationPolicy::new(40);
/// assert!(!policy.decide(40).should_rotate);
///
/// let decision = policy.decide(50);
/// assert!(decision.should_rotate);
/// assert_eq!(decision.keep_from_offset, 10);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotationPolicy {
    size_limit: u64,
}

impl Default for RotationPolicy {
    fn default() -> Self {
        Self {
            size_limit: DEFAULT_SIZE_LIMIT,
        }
    }
}

impl RotationPolicy {
    #[must_use]
    pub fn new(size_limit: u64) -> Self {
        Self { size_limit }
    }

    #[must_use]
    pub fn size_limit(&self) -> u64 {
        self.size_limit
    }

    #[must_use]
    pub fn decide(&self, current_size: u64) -> RotationDecision {
        decide(current_size, self.size_limit)
    }
}

/// Decide whether a file of `current_size` bytes must be trimmed under `limit`
#[must_use]
pub fn decide(current_size: u64, limit: u64) -> RotationDecision {
    if current_size <= limit {
        return RotationDecision::KEEP_ALL;
    }
    RotationDecision {
        should_rotate: true,
        keep_from_offset: limit / 4,
    }
}

/// The log file at `<dir>/<name>` together with its size limit
///
/// Only the serial writer's worker thread touches the file, so none of the
/// operations here lock.
///
/// # Examples
///
/// ```no_run
/// use klog::appenders::FileTarget;
/// use klog::{Appender, LogRecord};
///
/// let mut target = FileTarget::new("/tmp/klog", "log", 1024 * 1024).unwrap();
/// target.append(&LogRecord::new("service started")).unwrap();
/// ```
pub struct FileTarget {
    dir: PathBuf,
    name: String,
    path: PathBuf,
    policy: RotationPolicy,
    metrics: Option<Arc<LoggerMetrics>>,
}

impl FileTarget {
    /// Create a target for `<dir>/<name>`
    ///
    /// Nothing is created on disk; the file appears on the first append. A
    /// backup left behind by an interrupted rotation is removed.
    ///
    /// # Errors
    ///
    /// Returns error if the size limit is zero or the name is empty
    pub fn new(dir: impl Into<PathBuf>, name: impl Into<String>, size_limit: u64) -> Result<Self> {
        let dir = dir.into();
        let name = name.into();
        if name.is_empty() {
            return Err(LoggerError::config("FileTarget", "log name must not be empty"));
        }
        if size_limit == 0 {
            return Err(LoggerError::config("FileTarget", "size limit must be positive"));
        }

        let path = dir.join(&name);
        let target = Self {
            dir,
            name,
            path,
            policy: RotationPolicy::new(size_limit),
            metrics: None,
        };
        target.discard_stale_backup();
        Ok(target)
    }

    /// Count rotations in the given metrics
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<LoggerMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn policy(&self) -> &RotationPolicy {
        &self.policy
    }

    /// Sibling path used as the rotation backup: `<path>Temp`
    #[must_use]
    pub fn temp_path(&self) -> PathBuf {
        let mut raw: OsString = self.path.as_os_str().to_owned();
        raw.push(ROTATION_TEMP_SUFFIX);
        PathBuf::from(raw)
    }

    /// Create the log file if it does not exist. Existing content is untouched.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be created (missing parent directory,
    /// permissions)
    pub fn ensure_exists(&self) -> Result<()> {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map(drop)
            .map_err(|e| {
                LoggerError::io_operation(
                    "create log file",
                    format!("Failed to create '{}'", self.path.display()),
                    e,
                )
            })
    }

    /// Current size of the log file in bytes (0 if absent)
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but its metadata cannot be read
    pub fn current_size(&self) -> Result<u64> {
        match fs::metadata(&self.path) {
            Ok(meta) => Ok(meta.len()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(0),
            Err(e) => Err(LoggerError::file_target(
                self.path.display().to_string(),
                format!("Cannot access file metadata: {}", e),
            )),
        }
    }

    /// Rotate if needed, then append already-formatted bytes at end of file
    ///
    /// # Errors
    ///
    /// Returns error on any I/O failure; the bytes are not retried
    pub fn append_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.ensure_exists()?;

        let decision = self.policy.decide(self.current_size()?);
        if decision.should_rotate {
            self.rotate(decision.keep_from_offset)?;
        }

        let mut file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .map_err(|e| {
                LoggerError::file_target(
                    self.path.display().to_string(),
                    format!("Failed to open for append: {}", e),
                )
            })?;
        file.write_all(bytes).map_err(|e| {
            LoggerError::file_target(
                self.path.display().to_string(),
                format!("Failed to write log record: {}", e),
            )
        })
    }

    /// Drop everything before `keep_from` by copying through a backup file
    ///
    /// The original is truncated only after the backup copy is complete.
    fn rotate(&self, keep_from: u64) -> Result<()> {
        let temp_path = self.temp_path();
        let rotation_err = |what: &str, e: io::Error| {
            LoggerError::rotation(self.path.display().to_string(), format!("{}: {}", what, e))
        };

        fs::copy(&self.path, &temp_path).map_err(|e| rotation_err("Failed to create backup", e))?;

        let backup = File::open(&temp_path).map_err(|e| rotation_err("Failed to open backup", e))?;
        let mut reader = BufReader::new(backup);
        reader
            .seek(SeekFrom::Start(keep_from))
            .map_err(|e| rotation_err("Failed to skip discarded bytes", e))?;

        let original = OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(&self.path)
            .map_err(|e| rotation_err("Failed to reopen log file", e))?;
        let mut writer = BufWriter::new(original);
        io::copy(&mut reader, &mut writer).map_err(|e| rotation_err("Failed to copy retained bytes", e))?;
        writer.flush().map_err(|e| rotation_err("Failed to flush retained bytes", e))?;
        drop(reader);

        if let Err(e) = fs::remove_file(&temp_path) {
            eprintln!(
                "[KLOG WARNING] Rotation succeeded but failed to remove backup {}: {}",
                temp_path.display(),
                e
            );
        }

        if let Some(ref metrics) = self.metrics {
            metrics.record_rotation();
        }
        Ok(())
    }

    fn discard_stale_backup(&self) {
        let temp_path = self.temp_path();
        if temp_path.exists() {
            if let Err(e) = fs::remove_file(&temp_path) {
                eprintln!(
                    "[KLOG WARNING] Failed to remove leftover rotation backup {}: {}",
                    temp_path.display(),
                    e
                );
            }
        }
    }
}

impl Appender for FileTarget {
    fn append(&mut self, record: &LogRecord) -> Result<()> {
        self.append_bytes(record.format().as_bytes())
    }

    // The file is opened per append, so there is nothing buffered.
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        "FileTarget"
    }
}
