//! File logging example
//!
//! Release mode: every call goes to the console and to a size-capped file.
//!
//! Run with: cargo run --example file_logging

use klog::prelude::*;
use std::time::Duration;

fn main() -> Result<()> {
    println!("=== KLog - File Logging Example ===\n");

    // A small limit so the run shows trimming in action
    let logger = Logger::builder()
        .tag("FileLogging")
        .log_dir("application-logs")
        .log_name("application.log")
        .size_limit(4 * 1024)
        .debug(false)
        .build()?;

    println!("1. Logging to both console and file:");
    logger.info("Application started");
    logger.info("Configuration loaded successfully");
    logger.error("Failed to load optional plugin");

    println!("\n2. Writing past the size limit:");
    for i in 1..=200 {
        logger.info(format!("Processing item {}/200", i));
    }
    logger.info("All operations completed");

    if !logger.flush(Duration::from_secs(5)) {
        eprintln!("Writer did not catch up in time");
    }

    let metrics = logger.metrics();
    println!("\n=== Example completed successfully! ===");
    println!(
        "Written: {}, rotations: {}, failed: {}",
        metrics.written_count(),
        metrics.rotation_count(),
        metrics.failed_count()
    );
    println!("Check '{}' for the retained tail", logger.log_path().display());

    Ok(())
}
