//! Output sinks

pub mod console;
pub mod rotating_file;

pub use console::ConsoleSink;
pub use rotating_file::{FileTarget, RotationDecision, RotationPolicy, DEFAULT_SIZE_LIMIT};

pub use crate::core::Appender;
