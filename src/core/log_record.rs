//! Log record structure

use chrono::{DateTime, Local};

/// Timestamp pattern prefixed to every line of the log file
pub const RECORD_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Line terminator of the log file
pub const RECORD_TERMINATOR: &str = "\r\n";

/// One timestamped log message.
///
/// Records are immutable once created and written to the file exactly once.
/// Embedded newlines in the message are kept as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    timestamp: DateTime<Local>,
    message: String,
}

impl LogRecord {
    pub fn new(message: impl Into<String>) -> Self {
        Self::at(Local::now(), message)
    }

    /// Create a record with an explicit timestamp
    pub fn at(timestamp: DateTime<Local>, message: impl Into<String>) -> Self {
        Self {
            timestamp,
            message: message.into(),
        }
    }

    pub fn timestamp(&self) -> &DateTime<Local> {
        &self.timestamp
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Render the record as it appears in the log file:
    /// `"<yyyy-MM-dd HH:mm:ss> <message>\r\n"`
    pub fn format(&self) -> String {
        format!(
            "{} {}{}",
            self.timestamp.format(RECORD_TIMESTAMP_FORMAT),
            self.message,
            RECORD_TERMINATOR
        )
    }
}
