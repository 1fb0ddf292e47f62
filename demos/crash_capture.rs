//! Crash capture example
//!
//! A panic on any thread is written to the log file, then the process exits
//! with status 1.
//!
//! Run with: cargo run --example crash_capture

use klog::prelude::*;
use std::thread;

fn main() -> Result<()> {
    println!("=== KLog - Crash Capture Example ===\n");

    let logger = Logger::builder()
        .tag("CrashCapture")
        .log_dir("crash-logs")
        .debug(false)
        .catch_crash_log(true)
        .build()?;

    logger.info("About to crash a worker thread");
    println!("Backtrace will be written to {}", logger.log_path().display());

    let worker = thread::Builder::new()
        .name("doomed-worker".to_string())
        .spawn(|| {
            let values: Vec<u32> = Vec::new();
            values[3]
        })?;

    // Never reached: the crash hook exits the process
    let _ = worker.join();
    Ok(())
}
