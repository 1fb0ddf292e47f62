//! Basic logger usage example
//!
//! Debug mode: every call goes to the console and nothing touches the disk.
//!
//! Run with: cargo run --example basic_usage

use klog::prelude::*;
use klog::{error, info};
use std::time::Duration;

fn main() -> Result<()> {
    println!("=== KLog - Basic Usage Example ===\n");

    // Debug mode is the default
    let logger = Logger::builder().tag("BasicUsage").build()?;

    println!("1. Logging at both levels:");
    logger.info("This is an info message");
    logger.error("This is an error message");

    println!("\n2. Formatting with macros:");
    let items = 42;
    info!(logger, "Processed {} items", items);
    error!(logger, "Request failed with status {}", 503);

    logger.flush(Duration::from_secs(1));
    println!(
        "\n{} exists: {}",
        logger.log_path().display(),
        logger.log_path().exists()
    );

    println!("\n=== Example completed successfully! ===");

    Ok(())
}
