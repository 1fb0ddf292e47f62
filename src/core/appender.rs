//! Appender trait for log output destinations

use super::{error::Result, log_record::LogRecord};

/// A destination owned by the serial writer's worker thread.
///
/// Implementations are only ever called from that single thread, so they may
/// mutate files without any locking of their own.
pub trait Appender: Send {
    fn append(&mut self, record: &LogRecord) -> Result<()>;
    fn flush(&mut self) -> Result<()>;
    fn name(&self) -> &str;
}
