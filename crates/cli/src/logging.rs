//! Tracing setup for the wsync binary
//!
//! Level comes from `-v` count unless `WSYNC_LOG` is set. An optional log
//! file gets a second, non-ANSI layer through a non-blocking writer.

use anyhow::{Context, Result};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Environment variable overriding the `-v` derived filter
pub const LOG_ENV: &str = "WSYNC_LOG";

/// Map `-v` occurrences to a level directive
pub fn level_for(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

/// Install the global subscriber.
///
/// The returned guard flushes the log file on drop; keep it alive in `main`.
pub fn init(verbosity: u8, log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(level_for(verbosity)));
    let stderr = fmt::layer().with_writer(std::io::stderr).with_target(false);
    let registry = Registry::default().with(filter).with(stderr);

    let Some(path) = log_file else {
        registry.try_init().context("Failed to install tracing subscriber")?;
        return Ok(None);
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let file_name = path
        .file_name()
        .with_context(|| format!("Invalid log file path {}", path.display()))?;
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create log directory {}", dir.display()))?;

    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file_name));
    let file = fmt::layer().with_writer(writer).with_ansi(false);

    registry
        .with(file)
        .try_init()
        .context("Failed to install tracing subscriber")?;
    Ok(Some(guard))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_for_verbosity() {
        assert_eq!(level_for(0), "info");
        assert_eq!(level_for(1), "debug");
        assert_eq!(level_for(2), "trace");
        assert_eq!(level_for(9), "trace");
    }
}
