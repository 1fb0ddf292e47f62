//! Single-consumer writer
//!
//! All file mutation for a target happens on one dedicated thread. Producers
//! hand records over through a FIFO channel and return immediately; the
//! channel order is the file order.

use super::{
    appender::Appender,
    error::{LoggerError, Result},
    log_record::LogRecord,
    metrics::LoggerMetrics,
};
use crossbeam_channel::{bounded, unbounded, Receiver, RecvTimeoutError, SendTimeoutError, Sender, TrySendError};
use parking_lot::Mutex;
use std::cell::Cell;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Name of the worker thread
pub const WRITER_THREAD_NAME: &str = "klog-writer";

/// Default time to wait for the queue to drain when the writer is dropped
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

enum Command {
    Append(LogRecord),
    /// Append and report whether the record reached the target
    Persist(LogRecord, Sender<bool>),
    /// Barrier: acknowledged once everything queued before it is processed
    Flush(Sender<()>),
    Shutdown,
}

thread_local! {
    static ON_WRITER_THREAD: Cell<bool> = const { Cell::new(false) };
}

/// Whether the calling thread is a serial writer's worker
///
/// Set by the worker itself, so an application thread that happens to share
/// the worker's name is not mistaken for it.
pub fn is_writer_thread() -> bool {
    ON_WRITER_THREAD.with(Cell::get)
}

/// Cloneable producer side of a [`SerialWriter`]
#[derive(Clone)]
pub struct WriterHandle {
    sender: Sender<Command>,
    metrics: Arc<LoggerMetrics>,
}

impl WriterHandle {
    /// Queue a record and return immediately
    ///
    /// Failures are never reported back to the caller. A full bounded queue or
    /// a stopped writer drops the record and counts it.
    pub fn submit(&self, record: LogRecord) {
        match self.sender.try_send(Command::Append(record)) {
            Ok(()) => {
                self.metrics.record_submitted();
            }
            Err(TrySendError::Full(_)) => self.alert_and_drop(),
            Err(TrySendError::Disconnected(_)) => {
                self.metrics.record_dropped();
            }
        }
    }

    /// Queue a record and wait until it has been written, up to `timeout`
    ///
    /// # Errors
    ///
    /// - [`LoggerError::WriterStopped`] if the worker is gone
    /// - [`LoggerError::FlushTimeout`] if no acknowledgement arrived in time
    /// - [`LoggerError::Other`] if the target failed to write the record
    pub fn persist(&self, record: LogRecord, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        let (ack_tx, ack_rx) = bounded(1);

        match self.sender.send_timeout(Command::Persist(record, ack_tx), timeout) {
            Ok(()) => {
                self.metrics.record_submitted();
            }
            Err(SendTimeoutError::Timeout(_)) => {
                self.metrics.record_dropped();
                return Err(LoggerError::FlushTimeout(timeout));
            }
            Err(SendTimeoutError::Disconnected(_)) => {
                self.metrics.record_dropped();
                return Err(LoggerError::WriterStopped);
            }
        }

        match ack_rx.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
            Ok(true) => Ok(()),
            Ok(false) => Err(LoggerError::other("target failed to write the record")),
            Err(RecvTimeoutError::Timeout) => Err(LoggerError::FlushTimeout(timeout)),
            Err(RecvTimeoutError::Disconnected) => Err(LoggerError::WriterStopped),
        }
    }

    /// Wait until every record submitted so far has been processed
    ///
    /// Returns `false` if the writer is stopped or `timeout` elapsed first.
    pub fn flush(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let (ack_tx, ack_rx) = bounded(1);

        if self.sender.send_timeout(Command::Flush(ack_tx), timeout).is_err() {
            return false;
        }
        ack_rx
            .recv_timeout(deadline.saturating_duration_since(Instant::now()))
            .is_ok()
    }

    pub fn metrics(&self) -> &LoggerMetrics {
        &self.metrics
    }

    fn alert_and_drop(&self) {
        let dropped_count = self.metrics.record_dropped();

        // Alert on first drop and periodically thereafter
        if dropped_count == 0 || (dropped_count + 1) % 1000 == 0 {
            eprintln!(
                "[KLOG WARNING] Writer queue full, {} records dropped. \
                 Consider a larger queue capacity.",
                dropped_count + 1
            );
        }
    }
}

/// Owns the worker thread and the only [`Appender`] it writes to
///
/// # Example
///
/// ```no_run
/// use klog::appenders::FileTarget;
/// use klog::{LogRecord, SerialWriter};
/// use std::time::Duration;
///
/// let target = FileTarget::new("/tmp/klog", "log", 1024 * 1024).unwrap();
/// let writer = SerialWriter::spawn(target).unwrap();
///
/// writer.submit(LogRecord::new("first"));
/// writer.submit(LogRecord::new("second"));
/// assert!(writer.flush(Duration::from_secs(1)));
/// ```
pub struct SerialWriter {
    handle: WriterHandle,
    worker: Mutex<Option<thread::JoinHandle<()>>>,
}

impl SerialWriter {
    /// Start a worker with an unbounded queue
    ///
    /// # Errors
    ///
    /// Returns error if the worker thread cannot be spawned
    pub fn spawn<A: Appender + 'static>(appender: A) -> Result<Self> {
        Self::with_options(Box::new(appender), None, Arc::new(LoggerMetrics::new()))
    }

    /// Start a worker with an optional queue bound and shared metrics
    ///
    /// # Errors
    ///
    /// Returns error if the worker thread cannot be spawned
    pub fn with_options(
        appender: Box<dyn Appender>,
        queue_capacity: Option<usize>,
        metrics: Arc<LoggerMetrics>,
    ) -> Result<Self> {
        let (sender, receiver) = match queue_capacity {
            Some(capacity) => bounded(capacity),
            None => unbounded(),
        };
        let worker_metrics = Arc::clone(&metrics);

        let worker = thread::Builder::new()
            .name(WRITER_THREAD_NAME.to_string())
            .spawn(move || Self::run(appender, receiver, worker_metrics))
            .map_err(|e| LoggerError::io_operation("spawn writer thread", "cannot start worker", e))?;

        Ok(Self {
            handle: WriterHandle { sender, metrics },
            worker: Mutex::new(Some(worker)),
        })
    }

    fn run(mut appender: Box<dyn Appender>, receiver: Receiver<Command>, metrics: Arc<LoggerMetrics>) {
        ON_WRITER_THREAD.with(|flag| flag.set(true));
        for command in receiver.iter() {
            match command {
                Command::Append(record) => {
                    Self::write(appender.as_mut(), &record, &metrics);
                }
                Command::Persist(record, ack) => {
                    let written = Self::write(appender.as_mut(), &record, &metrics);
                    let _ = ack.send(written);
                }
                Command::Flush(ack) => {
                    Self::flush_appender(appender.as_mut());
                    let _ = ack.send(());
                }
                Command::Shutdown => break,
            }
        }
        Self::flush_appender(appender.as_mut());
    }

    /// Write one record, isolating the worker from a panicking appender
    fn write(appender: &mut dyn Appender, record: &LogRecord, metrics: &LoggerMetrics) -> bool {
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| appender.append(record)));

        match result {
            Ok(Ok(())) => {
                metrics.record_written();
                true
            }
            Ok(Err(e)) => {
                eprintln!("[KLOG ERROR] {} failed, record lost: {}", appender.name(), e);
                metrics.record_failed();
                false
            }
            Err(panic_info) => {
                eprintln!(
                    "[KLOG CRITICAL] {} panicked, record lost: {}",
                    appender.name(),
                    panic_message(panic_info.as_ref())
                );
                metrics.record_failed();
                false
            }
        }
    }

    fn flush_appender(appender: &mut dyn Appender) {
        match std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| appender.flush())) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => eprintln!("[KLOG ERROR] {} flush failed: {}", appender.name(), e),
            Err(panic_info) => eprintln!(
                "[KLOG CRITICAL] {} panicked during flush: {}",
                appender.name(),
                panic_message(panic_info.as_ref())
            ),
        }
    }

    /// Queue a record; see [`WriterHandle::submit`]
    pub fn submit(&self, record: LogRecord) {
        self.handle.submit(record);
    }

    /// Wait for the queue to drain; see [`WriterHandle::flush`]
    pub fn flush(&self, timeout: Duration) -> bool {
        self.handle.flush(timeout)
    }

    /// A producer handle that can outlive borrows of this writer
    pub fn handle(&self) -> WriterHandle {
        self.handle.clone()
    }

    pub fn metrics(&self) -> &LoggerMetrics {
        &self.handle.metrics
    }

    /// Drain the queue and stop the worker
    ///
    /// Records submitted after shutdown are dropped. Returns `true` if the
    /// worker finished within `timeout`. On `false` the worker is still
    /// owned here, so a later call (or drop) can retry.
    pub fn shutdown(&self, timeout: Duration) -> bool {
        let mut slot = self.worker.lock();
        let Some(worker) = slot.take() else {
            return true;
        };

        let start = Instant::now();
        // Queued behind every pending record, so they are written first. A
        // disconnected channel means the worker is already exiting.
        let signal = self.handle.sender.send_timeout(Command::Shutdown, timeout);
        if matches!(signal, Err(SendTimeoutError::Timeout(_))) && !worker.is_finished() {
            eprintln!("[KLOG WARNING] Could not signal writer shutdown within {:?}", timeout);
            *slot = Some(worker);
            return false;
        }

        loop {
            if worker.is_finished() {
                if let Err(e) = worker.join() {
                    eprintln!("[KLOG ERROR] Writer thread panicked during shutdown: {:?}", e);
                    return false;
                }
                return true;
            }

            if start.elapsed() >= timeout {
                eprintln!(
                    "[KLOG WARNING] Writer thread did not finish within {:?}. Some records may be lost.",
                    timeout
                );
                *slot = Some(worker);
                return false;
            }

            thread::sleep(Duration::from_millis(10));
        }
    }
}

impl Drop for SerialWriter {
    fn drop(&mut self) {
        self.shutdown(DEFAULT_SHUTDOWN_TIMEOUT);

        let metrics = &self.handle.metrics;
        let lost = metrics.failed_count() + metrics.dropped_count();
        if lost > 0 {
            eprintln!(
                "[KLOG WARNING] Writer shutting down with {} lost records (failure rate: {:.2}%)",
                lost,
                metrics.failure_rate()
            );
        }
    }
}

pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Collects messages in memory
    struct MemoryAppender {
        lines: Arc<Mutex<Vec<String>>>,
    }

    impl Appender for MemoryAppender {
        fn append(&mut self, record: &LogRecord) -> Result<()> {
            self.lines.lock().push(record.message().to_string());
            Ok(())
        }

        fn flush(&mut self) -> Result<()> {
            Ok(())
        }

        fn name(&self) -> &str {
            "MemoryAppender"
        }
    }

    struct FailingAppender;

    impl Appender for FailingAppender {
        fn append(&mut self, _record: &LogRecord) -> Result<()> {
            Err(LoggerError::other("simulated failure"))
        }

        fn flush(&mut self) -> Result<()> {
            Ok(())
        }

        fn name(&self) -> &str {
            "FailingAppender"
        }
    }

    /// Blocks every append until released
    struct GatedAppender {
        open: Arc<AtomicBool>,
    }

    impl Appender for GatedAppender {
        fn append(&mut self, _record: &LogRecord) -> Result<()> {
            while !self.open.load(Ordering::Acquire) {
                thread::sleep(Duration::from_millis(1));
            }
            Ok(())
        }

        fn flush(&mut self) -> Result<()> {
            Ok(())
        }

        fn name(&self) -> &str {
            "GatedAppender"
        }
    }

    fn memory_writer() -> (SerialWriter, Arc<Mutex<Vec<String>>>) {
        let lines = Arc::new(Mutex::new(Vec::new()));
        let writer = SerialWriter::spawn(MemoryAppender {
            lines: Arc::clone(&lines),
        })
        .unwrap();
        (writer, lines)
    }

    #[test]
    fn test_records_written_in_submission_order() {
        let (writer, lines) = memory_writer();
        for i in 0..100 {
            writer.submit(LogRecord::new(format!("record {}", i)));
        }
        assert!(writer.flush(Duration::from_secs(5)));

        let expected: Vec<String> = (0..100).map(|i| format!("record {}", i)).collect();
        assert_eq!(*lines.lock(), expected);
        assert_eq!(writer.metrics().written_count(), 100);
    }

    #[test]
    fn test_worker_thread_is_named() {
        struct NameProbe(Arc<Mutex<Option<bool>>>);

        impl Appender for NameProbe {
            fn append(&mut self, _record: &LogRecord) -> Result<()> {
                *self.0.lock() = Some(is_writer_thread());
                Ok(())
            }

            fn flush(&mut self) -> Result<()> {
                Ok(())
            }

            fn name(&self) -> &str {
                "NameProbe"
            }
        }

        let seen = Arc::new(Mutex::new(None));
        let writer = SerialWriter::spawn(NameProbe(Arc::clone(&seen))).unwrap();
        writer.submit(LogRecord::new("probe"));
        assert!(writer.flush(Duration::from_secs(5)));

        assert_eq!(*seen.lock(), Some(true));
        assert!(!is_writer_thread());
    }

    #[test]
    fn test_failures_are_counted_not_returned() {
        let writer = SerialWriter::spawn(FailingAppender).unwrap();
        for _ in 0..5 {
            writer.submit(LogRecord::new("lost"));
        }
        assert!(writer.flush(Duration::from_secs(5)));

        assert_eq!(writer.metrics().submitted_count(), 5);
        assert_eq!(writer.metrics().failed_count(), 5);
        assert_eq!(writer.metrics().written_count(), 0);
    }

    #[test]
    fn test_panicking_appender_does_not_stop_worker() {
        struct PanicOnce {
            panicked: bool,
            lines: Arc<Mutex<Vec<String>>>,
        }

        impl Appender for PanicOnce {
            fn append(&mut self, record: &LogRecord) -> Result<()> {
                if !self.panicked {
                    self.panicked = true;
                    panic!("appender exploded");
                }
                self.lines.lock().push(record.message().to_string());
                Ok(())
            }

            fn flush(&mut self) -> Result<()> {
                Ok(())
            }

            fn name(&self) -> &str {
                "PanicOnce"
            }
        }

        let lines = Arc::new(Mutex::new(Vec::new()));
        let writer = SerialWriter::spawn(PanicOnce {
            panicked: false,
            lines: Arc::clone(&lines),
        })
        .unwrap();

        writer.submit(LogRecord::new("first"));
        writer.submit(LogRecord::new("second"));
        assert!(writer.flush(Duration::from_secs(5)));

        assert_eq!(*lines.lock(), vec!["second".to_string()]);
        assert_eq!(writer.metrics().failed_count(), 1);
    }

    #[test]
    fn test_persist_reports_outcome() {
        let (writer, lines) = memory_writer();
        writer
            .handle()
            .persist(LogRecord::new("durable"), Duration::from_secs(5))
            .unwrap();
        assert_eq!(*lines.lock(), vec!["durable".to_string()]);

        let failing = SerialWriter::spawn(FailingAppender).unwrap();
        assert!(matches!(
            failing.handle().persist(LogRecord::new("x"), Duration::from_secs(5)),
            Err(LoggerError::Other(_))
        ));
    }

    #[test]
    fn test_persist_times_out_behind_slow_appender() {
        let open = Arc::new(AtomicBool::new(false));
        let writer = SerialWriter::spawn(GatedAppender {
            open: Arc::clone(&open),
        })
        .unwrap();

        writer.submit(LogRecord::new("stuck"));
        let result = writer
            .handle()
            .persist(LogRecord::new("late"), Duration::from_millis(50));
        assert!(matches!(result, Err(LoggerError::FlushTimeout(_))));

        open.store(true, Ordering::Release);
        assert!(writer.flush(Duration::from_secs(5)));
    }

    #[test]
    fn test_bounded_queue_drops_when_full() {
        let open = Arc::new(AtomicBool::new(false));
        let writer = SerialWriter::with_options(
            Box::new(GatedAppender {
                open: Arc::clone(&open),
            }),
            Some(2),
            Arc::new(LoggerMetrics::new()),
        )
        .unwrap();

        for _ in 0..20 {
            writer.submit(LogRecord::new("burst"));
        }
        // The worker holds at most one record, the queue at most two
        assert!(writer.metrics().dropped_count() >= 17);

        open.store(true, Ordering::Release);
        assert!(writer.flush(Duration::from_secs(5)));
        assert_eq!(
            writer.metrics().written_count() + writer.metrics().dropped_count(),
            20
        );
    }

    #[test]
    fn test_shutdown_drains_then_drops_new_records() {
        let (writer, lines) = memory_writer();
        let handle = writer.handle();
        for i in 0..10 {
            writer.submit(LogRecord::new(format!("{}", i)));
        }

        assert!(writer.shutdown(Duration::from_secs(5)));
        assert_eq!(lines.lock().len(), 10);

        handle.submit(LogRecord::new("after shutdown"));
        assert_eq!(writer.metrics().dropped_count(), 1);
        assert!(!handle.flush(Duration::from_millis(50)));
        assert!(matches!(
            handle.persist(LogRecord::new("x"), Duration::from_millis(50)),
            Err(LoggerError::WriterStopped)
        ));

        // Second shutdown is a no-op
        assert!(writer.shutdown(Duration::from_secs(1)));
    }

    #[test]
    fn test_failed_shutdown_can_be_retried() {
        let open = Arc::new(AtomicBool::new(false));
        let writer = SerialWriter::with_options(
            Box::new(GatedAppender {
                open: Arc::clone(&open),
            }),
            Some(1),
            Arc::new(LoggerMetrics::new()),
        )
        .unwrap();

        for _ in 0..3 {
            writer.submit(LogRecord::new("stuck"));
        }

        // The worker is blocked, so neither attempt can finish
        assert!(!writer.shutdown(Duration::from_millis(50)));
        assert!(!writer.shutdown(Duration::from_millis(50)));

        open.store(true, Ordering::Release);
        assert!(writer.shutdown(Duration::from_secs(5)));
        assert_eq!(
            writer.metrics().written_count() + writer.metrics().dropped_count(),
            3
        );
        assert!(writer.shutdown(Duration::from_millis(10)));
    }

    #[test]
    fn test_thread_name_alone_is_not_the_writer() {
        let impostor = thread::Builder::new()
            .name(WRITER_THREAD_NAME.to_string())
            .spawn(is_writer_thread)
            .unwrap();
        assert!(!impostor.join().unwrap());
    }
}
