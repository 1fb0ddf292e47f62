//! Logging macros for ergonomic log message formatting.
//!
//! # Examples
//!
//! ```no_run
//! use klog::prelude::*;
//! use klog::info;
//!
//! let logger = Logger::builder().build().unwrap();
//!
//! let port = 8080;
//! info!(logger, "Server listening on port {}", port);
//! ```

/// Log a message at the given level with automatic formatting.
#[macro_export]
macro_rules! log {
    ($logger:expr, $level:expr, $($arg:tt)+) => {
        $logger.log($level, format!($($arg)+))
    };
}

/// Log an info-level message.
///
/// # Examples
///
/// ```no_run
/// # use klog::prelude::*;
/// # let logger = Logger::builder().build().unwrap();
/// use klog::info;
/// info!(logger, "Processing {} items", 100);
/// ```
#[macro_export]
macro_rules! info {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Info, $($arg)+)
    };
}

/// Log an error-level message.
///
/// # Examples
///
/// ```no_run
/// # use klog::prelude::*;
/// # let logger = Logger::builder().build().unwrap();
/// use klog::error;
/// error!(logger, "Error code: {}, message: {}", 500, "Internal error");
/// ```
#[macro_export]
macro_rules! error {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Error, $($arg)+)
    };
}
