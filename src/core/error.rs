//! Error types for the logger

pub type Result<T> = std::result::Result<T, LoggerError>;

#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    /// IO error with context
    #[error("IO error while {operation}: {message}")]
    IoOperation {
        operation: String,
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON configuration error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid configuration with details
    #[error("Invalid configuration for {component}: {message}")]
    InvalidConfiguration { component: String, message: String },

    /// File target error with path
    #[error("File target error for '{path}': {message}")]
    FileTarget { path: String, message: String },

    /// Rotation failure
    #[error("Log rotation failed for '{path}': {message}")]
    Rotation { path: String, message: String },

    /// The background writer has shut down
    #[error("Serial writer has stopped")]
    WriterStopped,

    /// The writer did not acknowledge in time
    #[error("Serial writer did not acknowledge within {0:?}")]
    FlushTimeout(std::time::Duration),

    /// Crash capture is process-wide and may only be installed once
    #[error("Crash capture is already installed for this process")]
    CrashCaptureInstalled,

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl LoggerError {
    /// Create an IO operation error with context
    pub fn io_operation(
        operation: impl Into<String>,
        message: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        LoggerError::IoOperation {
            operation: operation.into(),
            message: message.into(),
            source,
        }
    }

    /// Create an invalid configuration error
    pub fn config(component: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::InvalidConfiguration {
            component: component.into(),
            message: message.into(),
        }
    }

    /// Create a file target error
    pub fn file_target(path: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::FileTarget {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a rotation error
    pub fn rotation(path: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::Rotation {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn other<S: Into<String>>(msg: S) -> Self {
        LoggerError::Other(msg.into())
    }
}
