//! Crash capture
//!
//! The process-wide panic hook is replaced once. While an interceptor is
//! active, the hook writes a diagnostic record (timestamp, panic message,
//! location, backtrace) through its serial writer, waits a bounded grace
//! period for the write to be acknowledged, and then terminates the process.
//! The previously installed hook runs when the report could not be persisted
//! or when no interceptor is active.

use super::{
    config::DEFAULT_GRACE_PERIOD,
    error::{LoggerError, Result},
    log_record::LogRecord,
    serial_writer::{is_writer_thread, panic_message, WriterHandle},
};
use chrono::{DateTime, Local};
use parking_lot::RwLock;
use std::backtrace::Backtrace;
use std::fmt;
use std::panic::{self, PanicHookInfo};
use std::sync::{Arc, Once};
use std::thread;
use std::time::Duration;

/// Exit status used after a captured crash
pub const CRASH_EXIT_CODE: i32 = 1;

/// Timestamp pattern heading a crash report
pub const CRASH_TIMESTAMP_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

/// Ends the process once the report is handled. Receives the exit status.
pub type Terminator = Arc<dyn Fn(i32) + Send + Sync>;

/// The interceptor the panic hook reports to, if any
static ACTIVE: RwLock<Option<Arc<CrashInterceptor>>> = parking_lot::const_rwlock(None);
static HOOK: Once = Once::new();

/// What is known about a panic when the hook runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrashReport {
    message: String,
    thread: String,
    location: Option<String>,
    backtrace: String,
}

impl CrashReport {
    /// Report for the current thread with a freshly captured backtrace
    pub fn capture(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            thread: current_thread_name(),
            location: None,
            backtrace: Backtrace::force_capture().to_string(),
        }
    }

    pub fn from_panic(info: &PanicHookInfo<'_>) -> Self {
        let mut report = Self::capture(panic_message(info.payload()));
        report.location = info
            .location()
            .map(|loc| format!("{}:{}:{}", loc.file(), loc.line(), loc.column()));
        report
    }

    #[must_use]
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn thread(&self) -> &str {
        &self.thread
    }

    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    pub fn backtrace(&self) -> &str {
        &self.backtrace
    }

    /// Build the diagnostic record, one part per line
    pub fn to_record(&self, at: DateTime<Local>) -> LogRecord {
        let origin = match self.location {
            Some(ref location) => format!("thread '{}' panicked at {}", self.thread, location),
            None => format!("thread '{}' panicked", self.thread),
        };
        let text = format!(
            "{}:\n{}\n{}\nstack backtrace:\n{}",
            at.format(CRASH_TIMESTAMP_FORMAT),
            self.message,
            origin,
            self.backtrace.trim_end()
        );
        LogRecord::at(at, text)
    }
}

/// Persists panics through a [`WriterHandle`] before the process exits
///
/// # Example
///
/// ```no_run
/// use klog::appenders::FileTarget;
/// use klog::{CrashInterceptor, SerialWriter};
///
/// let target = FileTarget::new("/tmp/klog", "log", 1024 * 1024).unwrap();
/// let writer = SerialWriter::spawn(target).unwrap();
///
/// // Crash capture stays active until the guard is dropped
/// let _capture = CrashInterceptor::new(writer.handle()).install().unwrap();
/// ```
pub struct CrashInterceptor {
    writer: WriterHandle,
    grace_period: Duration,
    terminate: Terminator,
}

impl CrashInterceptor {
    pub fn new(writer: WriterHandle) -> Self {
        Self {
            writer,
            grace_period: DEFAULT_GRACE_PERIOD,
            terminate: Arc::new(|code| std::process::exit(code)),
        }
    }

    /// Upper bound on how long the crashing thread waits for the write
    #[must_use]
    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    /// Replace `std::process::exit`
    #[must_use]
    pub fn with_terminator(mut self, terminate: impl Fn(i32) + Send + Sync + 'static) -> Self {
        self.terminate = Arc::new(terminate);
        self
    }

    pub fn grace_period(&self) -> Duration {
        self.grace_period
    }

    /// Whether a crash interceptor is currently active in this process
    pub fn is_installed() -> bool {
        ACTIVE.read().is_some()
    }

    /// Write the report and wait up to the grace period for it to land
    ///
    /// # Errors
    ///
    /// Returns error if the writer is stopped, failed to write, or did not
    /// acknowledge within the grace period
    pub fn persist(&self, report: &CrashReport) -> Result<()> {
        self.writer
            .persist(report.to_record(Local::now()), self.grace_period)
    }

    /// Persist the report, fall back if that fails, then terminate
    pub fn handle<F: FnOnce()>(&self, report: &CrashReport, fallback: F) {
        if let Err(e) = self.persist(report) {
            eprintln!("[KLOG CRITICAL] Crash report not persisted: {}", e);
            fallback();
        }
        (self.terminate)(CRASH_EXIT_CODE);
    }

    /// Make this interceptor the target of the process-wide panic hook
    ///
    /// The hook itself is set on first use and chains to whatever hook was
    /// installed before it. Dropping the returned guard deactivates the
    /// interceptor; a later install may then take its place. Panics on a
    /// writer thread go straight to the previous hook; the writer isolates
    /// them and keeps running.
    ///
    /// # Errors
    ///
    /// Returns [`LoggerError::CrashCaptureInstalled`] if another interceptor
    /// is active
    pub fn install(self) -> Result<CrashCaptureGuard> {
        {
            let mut active = ACTIVE.write();
            if active.is_some() {
                return Err(LoggerError::CrashCaptureInstalled);
            }
            *active = Some(Arc::new(self));
        }

        HOOK.call_once(|| {
            let previous = panic::take_hook();
            panic::set_hook(Box::new(move |info| {
                let active = if is_writer_thread() {
                    None
                } else {
                    ACTIVE.read().clone()
                };
                match active {
                    Some(interceptor) => {
                        let report = CrashReport::from_panic(info);
                        interceptor.handle(&report, || previous(info));
                    }
                    None => previous(info),
                }
            }));
        });
        Ok(CrashCaptureGuard { _active: () })
    }
}

/// Keeps a [`CrashInterceptor`] active; dropping it detaches the interceptor
/// from the panic hook
#[must_use = "crash capture ends when the guard is dropped"]
#[derive(Debug)]
pub struct CrashCaptureGuard {
    _active: (),
}

impl Drop for CrashCaptureGuard {
    fn drop(&mut self) {
        // Only one interceptor is active at a time, and it is this guard's
        ACTIVE.write().take();
    }
}

impl fmt::Debug for CrashInterceptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CrashInterceptor")
            .field("grace_period", &self.grace_period)
            .finish_non_exhaustive()
    }
}

fn current_thread_name() -> String {
    let current = thread::current();
    match current.name() {
        Some(name) => name.to_string(),
        None => format!("{:?}", current.id()),
    }
}
