//! Storage-path resolution
//!
//! Picks a writable cache directory for the log file. The logger only consumes
//! the resulting path; which locations count as "external" is up to the
//! resolver.

use super::error::{LoggerError, Result};
use std::fs;
use std::path::PathBuf;

/// Root directory name used when the caller does not pick one
pub const DEFAULT_LOG_ROOT: &str = "log";

/// Supplies the candidate cache locations for log files
pub trait StorageResolver {
    /// Whether external (shared, removable) storage is currently writable
    fn is_external_storage_writable(&self) -> bool;

    /// Cache directory on external storage, if the platform has one
    fn external_cache_dir(&self) -> Option<PathBuf>;

    /// Cache directory private to the application; always available
    fn cache_dir(&self) -> PathBuf;
}

/// Resolver backed by the platform's user cache directory
///
/// The user cache directory (`~/.cache`, `~/Library/Caches`, `%LOCALAPPDATA%`)
/// plays the external role; the system temporary directory is the fallback.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlatformStorage;

impl StorageResolver for PlatformStorage {
    fn is_external_storage_writable(&self) -> bool {
        dirs::cache_dir()
            .and_then(|dir| fs::metadata(dir).ok())
            .map(|meta| meta.is_dir() && !meta.permissions().readonly())
            .unwrap_or(false)
    }

    fn external_cache_dir(&self) -> Option<PathBuf> {
        dirs::cache_dir()
    }

    fn cache_dir(&self) -> PathBuf {
        std::env::temp_dir()
    }
}

/// Resolve `<cache>/<root_name>` and create it if missing
///
/// # Errors
///
/// Returns an error if the directory cannot be created
pub fn default_log_dir<R: StorageResolver + ?Sized>(resolver: &R, root_name: &str) -> Result<PathBuf> {
    let cache = if resolver.is_external_storage_writable() {
        resolver
            .external_cache_dir()
            .unwrap_or_else(|| resolver.cache_dir())
    } else {
        resolver.cache_dir()
    };

    let dir = cache.join(root_name);
    if !dir.exists() {
        fs::create_dir_all(&dir).map_err(|e| {
            LoggerError::io_operation(
                "create log directory",
                format!("Failed to create directory '{}'", dir.display()),
                e,
            )
        })?;
    }
    Ok(dir)
}
