//! Console sink
//!
//! Every logging call reaches the console, regardless of debug mode. Writing
//! here is assumed to succeed.

use crate::core::LogLevel;
#[cfg(feature = "console")]
use colored::Colorize;

pub struct ConsoleSink {
    use_colors: bool,
}

impl ConsoleSink {
    pub fn new() -> Self {
        Self { use_colors: true }
    }

    pub fn with_colors(use_colors: bool) -> Self {
        Self { use_colors }
    }

    /// Print one line: info to stdout, error to stderr
    pub fn write(&self, level: LogLevel, tag: &str, message: &str) {
        let line = self.format_line(level, tag, message);
        match level {
            LogLevel::Error => eprintln!("{}", line),
            LogLevel::Info => println!("{}", line),
        }
    }

    /// Format as `"<LEVEL> <tag>: <message>"`
    pub fn format_line(&self, level: LogLevel, tag: &str, message: &str) -> String {
        format!("{} {}: {}", self.format_level(level), tag, message)
    }

    #[cfg(feature = "console")]
    fn format_level(&self, level: LogLevel) -> String {
        let padded = format!("{:5}", level.to_str());
        if self.use_colors {
            padded.color(level.color_code()).to_string()
        } else {
            padded
        }
    }

    #[cfg(not(feature = "console"))]
    fn format_level(&self, level: LogLevel) -> String {
        let _ = self.use_colors;
        format!("{:5}", level.to_str())
    }
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_format() {
        let sink = ConsoleSink::with_colors(false);
        assert_eq!(
            sink.format_line(LogLevel::Info, "KLog", "ready"),
            "INFO  KLog: ready"
        );
        assert_eq!(
            sink.format_line(LogLevel::Error, "App", "failed"),
            "ERROR App: failed"
        );
    }
}
