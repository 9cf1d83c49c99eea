//! Shared utilities for CLI commands

use anyhow::{Context, Result};
use chrono::{DateTime, Local, TimeZone};
use std::path::{Path, PathBuf};
use ws_core::WatchedRoot;

/// Per-user runtime state (lock files)
///
/// `$XDG_RUNTIME_DIR/wsync`, falling back to the cache directory.
pub fn state_dir() -> Result<PathBuf> {
    dirs::runtime_dir()
        .or_else(dirs::cache_dir)
        .map(|dir| dir.join("wsync"))
        .context("Could not determine a state directory")
}

/// Resolve the watched root from a CLI flag, the config file, or the cwd
pub fn resolve_root(flag: Option<&Path>, configured: Option<&Path>) -> Result<WatchedRoot> {
    let path = match flag.or(configured) {
        Some(path) => path.to_path_buf(),
        None => std::env::current_dir().context("Failed to get current directory")?,
    };
    WatchedRoot::new(&path)
}

/// Format timestamp as relative time ("2 hours ago")
pub fn format_relative_time(ts_ms: u64) -> String {
    let Some(then) = to_local(ts_ms) else {
        return "unknown".to_string();
    };

    let elapsed = Local::now().signed_duration_since(then);
    let seconds = elapsed.num_seconds();

    if seconds < 0 {
        "in the future".to_string()
    } else if seconds < 60 {
        format!("{} seconds ago", seconds)
    } else if seconds < 3600 {
        format!("{} minutes ago", seconds / 60)
    } else if seconds < 86400 {
        format!("{} hours ago", seconds / 3600)
    } else if seconds < 604800 {
        format!("{} days ago", seconds / 86400)
    } else {
        format!("{} weeks ago", seconds / 604800)
    }
}

/// Format timestamp as local absolute time ("2024-01-03 14:30:00")
pub fn format_absolute_time(ts_ms: u64) -> String {
    match to_local(ts_ms) {
        Some(time) => time.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => "unknown".to_string(),
    }
}

fn to_local(ts_ms: u64) -> Option<DateTime<Local>> {
    let ts_ms = i64::try_from(ts_ms).ok()?;
    Local.timestamp_millis_opt(ts_ms).single()
}
