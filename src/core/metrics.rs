//! Logger metrics for observability
//!
//! Submission is fire-and-forget, so these counters are the only place a
//! caller can see that records were lost.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters maintained by the serial writer
///
/// # Example
///
/// ```
/// use klog::LoggerMetrics;
///
/// let metrics = LoggerMetrics::new();
/// metrics.record_submitted();
/// metrics.record_written();
///
/// assert_eq!(metrics.submitted_count(), 1);
/// assert_eq!(metrics.written_count(), 1);
/// ```
#[derive(Debug)]
pub struct LoggerMetrics {
    /// Records accepted into the queue
    submitted: AtomicU64,

    /// Records appended to the file
    written: AtomicU64,

    /// Records lost to an I/O failure in the file target
    failed: AtomicU64,

    /// Records never queued (queue full or writer stopped)
    dropped: AtomicU64,

    /// Truncations performed by the file target
    rotations: AtomicU64,
}

impl LoggerMetrics {
    pub const fn new() -> Self {
        Self {
            submitted: AtomicU64::new(0),
            written: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            rotations: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn submitted_count(&self) -> u64 {
        self.submitted.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn written_count(&self) -> u64 {
        self.written.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn failed_count(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn rotation_count(&self) -> u64 {
        self.rotations.load(Ordering::Relaxed)
    }

    /// Record an accepted submission, returning the previous count
    #[inline]
    pub fn record_submitted(&self) -> u64 {
        self.submitted.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_written(&self) -> u64 {
        self.written.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_failed(&self) -> u64 {
        self.failed.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_dropped(&self) -> u64 {
        self.dropped.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_rotation(&self) -> u64 {
        self.rotations.fetch_add(1, Ordering::Relaxed)
    }

    /// Share of records that never reached the file, as a percentage (0.0 - 100.0)
    ///
    /// Returns 0.0 if nothing has been attempted yet.
    pub fn failure_rate(&self) -> f64 {
        let lost = (self.failed_count() + self.dropped_count()) as f64;
        let total = self.written_count() as f64 + lost;
        if total == 0.0 {
            0.0
        } else {
            (lost / total) * 100.0
        }
    }
}

impl Default for LoggerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for LoggerMetrics {
    /// Create a snapshot of the current metrics values
    fn clone(&self) -> Self {
        Self {
            submitted: AtomicU64::new(self.submitted_count()),
            written: AtomicU64::new(self.written_count()),
            failed: AtomicU64::new(self.failed_count()),
            dropped: AtomicU64::new(self.dropped_count()),
            rotations: AtomicU64::new(self.rotation_count()),
        }
    }
}
