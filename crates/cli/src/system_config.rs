//! System configuration (TOML)
//!
//! Location: `--config <path>` or `$XDG_CONFIG_HOME/wsync/config.toml`.
//! Every field has a default, so a missing file is a valid configuration.

use anyhow::{Context, Result};
use remote::{RsyncOptions, DEFAULT_MAX_SELECTIVE_PATHS};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use watcher::debounce::{DEFAULT_BATCH_SIZE, DEFAULT_BATCH_TIMEOUT, DEFAULT_TICK_INTERVAL};
use watcher::{BatchConfig, IgnoreConfig};

/// Full configuration file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    pub watch: WatchSettings,
    pub batch: BatchSettings,
    pub remote: RemoteSettings,
    pub ignore: IgnoreConfig,
}

/// `[watch]`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchSettings {
    /// Directory to mirror
    pub root: Option<PathBuf>,
}

/// `[batch]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchSettings {
    /// Unique paths that force an immediate flush
    pub batch_size: usize,
    /// Quiet period before a partial batch is flushed
    pub batch_timeout_ms: u64,
    /// Flush loop cadence
    pub tick_interval_ms: u64,
    /// Largest batch synced path by path; bigger batches get a full resync
    pub max_selective_paths: usize,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            batch_timeout_ms: DEFAULT_BATCH_TIMEOUT.as_millis() as u64,
            tick_interval_ms: DEFAULT_TICK_INTERVAL.as_millis() as u64,
            max_selective_paths: DEFAULT_MAX_SELECTIVE_PATHS,
        }
    }
}

/// `[remote]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteSettings {
    /// `[user@]host:path` or a local directory
    pub endpoint: Option<String>,
    /// ssh private key passed as `-i`
    pub key_file: Option<PathBuf>,
    pub rsync_binary: String,
    pub ssh_binary: String,
    /// Extra rsync arguments
    pub extra_args: Vec<String>,
}

impl Default for RemoteSettings {
    fn default() -> Self {
        let rsync = RsyncOptions::default();
        Self {
            endpoint: None,
            key_file: None,
            rsync_binary: rsync.binary,
            ssh_binary: rsync.ssh_binary,
            extra_args: vec![],
        }
    }
}

impl SystemConfig {
    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        let batch = &self.batch;
        if !(1..=10_000).contains(&batch.batch_size) {
            anyhow::bail!("batch.batch_size must be between 1 and 10000 (got {})", batch.batch_size);
        }
        if !(10..=3_600_000).contains(&batch.batch_timeout_ms) {
            anyhow::bail!(
                "batch.batch_timeout_ms must be between 10 and 3600000 (got {})",
                batch.batch_timeout_ms
            );
        }
        if !(1..=60_000).contains(&batch.tick_interval_ms) {
            anyhow::bail!(
                "batch.tick_interval_ms must be between 1 and 60000 (got {})",
                batch.tick_interval_ms
            );
        }
        if batch.max_selective_paths > 10_000 {
            anyhow::bail!(
                "batch.max_selective_paths must be at most 10000 (got {})",
                batch.max_selective_paths
            );
        }
        if self.remote.rsync_binary.trim().is_empty() {
            anyhow::bail!("remote.rsync_binary must not be empty");
        }
        if self.remote.ssh_binary.trim().is_empty() {
            anyhow::bail!("remote.ssh_binary must not be empty");
        }
        if matches!(&self.remote.endpoint, Some(e) if e.trim().is_empty()) {
            anyhow::bail!("remote.endpoint must not be empty");
        }
        Ok(())
    }

    pub fn batch_config(&self) -> BatchConfig {
        BatchConfig {
            batch_size: self.batch.batch_size,
            batch_timeout: Duration::from_millis(self.batch.batch_timeout_ms),
            tick_interval: Duration::from_millis(self.batch.tick_interval_ms),
        }
    }

    /// Sync tool settings; exclude patterns pass through unchanged
    pub fn rsync_options(&self) -> RsyncOptions {
        RsyncOptions {
            binary: self.remote.rsync_binary.clone(),
            ssh_binary: self.remote.ssh_binary.clone(),
            excludes: self.ignore.exclude.clone(),
            key_file: self.remote.key_file.clone(),
            extra_args: self.remote.extra_args.clone(),
        }
    }

    /// Read a single value by dotted key
    pub fn get(&self, key: &str) -> Result<String> {
        let value = match key {
            "watch.root" => display_opt(self.watch.root.as_ref().map(|p| p.display().to_string())),
            "batch.batch_size" => self.batch.batch_size.to_string(),
            "batch.batch_timeout_ms" => self.batch.batch_timeout_ms.to_string(),
            "batch.tick_interval_ms" => self.batch.tick_interval_ms.to_string(),
            "batch.max_selective_paths" => self.batch.max_selective_paths.to_string(),
            "remote.endpoint" => display_opt(self.remote.endpoint.clone()),
            "remote.key_file" => display_opt(self.remote.key_file.as_ref().map(|p| p.display().to_string())),
            "remote.rsync_binary" => self.remote.rsync_binary.clone(),
            "remote.ssh_binary" => self.remote.ssh_binary.clone(),
            "remote.extra_args" => self.remote.extra_args.join(" "),
            "ignore.exclude" => self.ignore.exclude.join(","),
            "ignore.use_syncignore" => self.ignore.use_syncignore.to_string(),
            "ignore.ignore_editor_temp" => self.ignore.ignore_editor_temp.to_string(),
            _ => anyhow::bail!(
                "Unknown config key: {}. Use 'wsync config list' to see available keys.",
                key
            ),
        };
        Ok(value)
    }

    /// Set a single value by dotted key (not validated; call `validate`)
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "watch.root" => self.watch.root = non_empty(value).map(PathBuf::from),
            "batch.batch_size" => {
                self.batch.batch_size = value
                    .parse()
                    .context("Invalid value: must be a positive integer")?;
            }
            "batch.batch_timeout_ms" => {
                self.batch.batch_timeout_ms = value
                    .parse()
                    .context("Invalid value: must be a positive integer")?;
            }
            "batch.tick_interval_ms" => {
                self.batch.tick_interval_ms = value
                    .parse()
                    .context("Invalid value: must be a positive integer")?;
            }
            "batch.max_selective_paths" => {
                self.batch.max_selective_paths = value
                    .parse()
                    .context("Invalid value: must be a non-negative integer")?;
            }
            "remote.endpoint" => self.remote.endpoint = non_empty(value).map(str::to_string),
            "remote.key_file" => self.remote.key_file = non_empty(value).map(PathBuf::from),
            "remote.rsync_binary" => self.remote.rsync_binary = value.to_string(),
            "remote.ssh_binary" => self.remote.ssh_binary = value.to_string(),
            "remote.extra_args" => {
                self.remote.extra_args = value.split_whitespace().map(str::to_string).collect();
            }
            "ignore.exclude" => {
                self.ignore.exclude = value
                    .split(',')
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(str::to_string)
                    .collect();
            }
            "ignore.use_syncignore" => {
                self.ignore.use_syncignore = value
                    .parse()
                    .context("Invalid value: must be 'true' or 'false'")?;
            }
            "ignore.ignore_editor_temp" => {
                self.ignore.ignore_editor_temp = value
                    .parse()
                    .context("Invalid value: must be 'true' or 'false'")?;
            }
            _ => anyhow::bail!(
                "Unknown config key: {}. Use 'wsync config list' to see available keys.",
                key
            ),
        }
        Ok(())
    }
}

/// Keys accepted by `get` / `set`, in display order
pub const KEYS: &[&str] = &[
    "watch.root",
    "batch.batch_size",
    "batch.batch_timeout_ms",
    "batch.tick_interval_ms",
    "batch.max_selective_paths",
    "remote.endpoint",
    "remote.key_file",
    "remote.rsync_binary",
    "remote.ssh_binary",
    "remote.extra_args",
    "ignore.exclude",
    "ignore.use_syncignore",
    "ignore.ignore_editor_temp",
];

fn display_opt(value: Option<String>) -> String {
    value.unwrap_or_default()
}

fn non_empty(value: &str) -> Option<&str> {
    let value = value.trim();
    (!value.is_empty()).then_some(value)
}

/// Default config file location
pub fn config_file_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("wsync").join("config.toml"))
}

/// Resolve an explicit path or fall back to the default location
pub fn resolve_path(explicit: Option<&Path>) -> Result<PathBuf> {
    match explicit {
        Some(path) => Ok(path.to_path_buf()),
        None => config_file_path().context("Could not determine config file path"),
    }
}

/// Load configuration; a missing file yields defaults
pub fn load(explicit: Option<&Path>) -> Result<SystemConfig> {
    let path = resolve_path(explicit)?;
    if !path.exists() {
        return Ok(SystemConfig::default());
    }

    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let config: SystemConfig = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config file {}", path.display()))?;

    config
        .validate()
        .with_context(|| format!("Invalid configuration in {}", path.display()))?;
    Ok(config)
}

/// Write configuration, creating parent directories
pub fn save(config: &SystemConfig, explicit: Option<&Path>) -> Result<PathBuf> {
    let path = resolve_path(explicit)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let contents = toml::to_string_pretty(config).context("Failed to serialize configuration")?;
    std::fs::write(&path, contents)
        .with_context(|| format!("Failed to write config file {}", path.display()))?;
    Ok(path)
}

/// Create the config file with the example contents if it does not exist.
///
/// Returns true if a file was created.
pub fn init_if_missing(explicit: Option<&Path>) -> Result<bool> {
    let path = resolve_path(explicit)?;
    if path.exists() {
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(&path, example_config())
        .with_context(|| format!("Failed to write config file {}", path.display()))?;
    Ok(true)
}

/// Annotated example configuration
pub fn example_config() -> &'static str {
    r#"# wsync configuration

[watch]
# Directory to mirror (absolute path)
# root = "/home/me/projects"

[batch]
# Unique paths that force an immediate flush
batch_size = 10
# Quiet period before a partial batch is flushed
batch_timeout_ms = 2000
# How often pending changes are evaluated
tick_interval_ms = 100
# Batches with more unique paths than this get one full resync
max_selective_paths = 5

[remote]
# [user@]host:path (over ssh) or a local directory
# endpoint = "me@backup.lan:/srv/mirror"
# key_file = "/home/me/.ssh/mirror_ed25519"
rsync_binary = "rsync"
ssh_binary = "ssh"
extra_args = []

[ignore]
# gitignore syntax; also passed to rsync as --exclude
exclude = []
use_syncignore = true
ignore_editor_temp = true
"#
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_are_valid() {
        let config = SystemConfig::default();
        config.validate().unwrap();

        let batch = config.batch_config();
        assert_eq!(batch.batch_size, 10);
        assert_eq!(batch.batch_timeout, Duration::from_secs(2));
        assert_eq!(batch.tick_interval, Duration::from_millis(100));
        assert_eq!(config.batch.max_selective_paths, 5);
    }

    #[test]
    fn test_example_parses_to_defaults() {
        let config: SystemConfig = toml::from_str(example_config()).unwrap();
        assert_eq!(config, SystemConfig::default());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: SystemConfig = toml::from_str(
            r#"
            [remote]
            endpoint = "nas:/srv/mirror"

            [ignore]
            exclude = ["*.log"]
            "#,
        )
        .unwrap();

        assert_eq!(config.remote.endpoint.as_deref(), Some("nas:/srv/mirror"));
        assert_eq!(config.batch, BatchSettings::default());
        assert!(config.ignore.use_syncignore);
        assert_eq!(config.rsync_options().excludes, vec!["*.log".to_string()]);
    }

    #[test]
    fn test_validate_ranges() {
        let mut config = SystemConfig::default();
        config.batch.batch_size = 0;
        assert!(config.validate().is_err());

        let mut config = SystemConfig::default();
        config.batch.tick_interval_ms = 0;
        assert!(config.validate().is_err());

        let mut config = SystemConfig::default();
        config.batch.batch_timeout_ms = 5;
        assert!(config.validate().is_err());

        let mut config = SystemConfig::default();
        config.remote.endpoint = Some("  ".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_get_set_roundtrip_every_key() {
        let mut config = SystemConfig::default();
        for key in KEYS {
            let value = config.get(key).unwrap();
            config.set(key, &value).unwrap();
        }
        assert_eq!(config, SystemConfig::default());
    }

    #[test]
    fn test_set_values() {
        let mut config = SystemConfig::default();
        config.set("batch.batch_size", "25").unwrap();
        config.set("ignore.exclude", "*.log, build/").unwrap();
        config.set("remote.endpoint", "me@nas:/srv").unwrap();

        assert_eq!(config.batch.batch_size, 25);
        assert_eq!(config.ignore.exclude, vec!["*.log", "build/"]);
        assert_eq!(config.get("remote.endpoint").unwrap(), "me@nas:/srv");

        assert!(config.set("batch.batch_size", "many").is_err());
        assert!(config.set("no.such.key", "1").is_err());
        assert!(config.get("no.such.key").is_err());
    }

    #[test]
    fn test_save_and_load() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("nested/config.toml");

        let mut config = SystemConfig::default();
        config.set("watch.root", "/data/photos")?;
        config.set("batch.batch_timeout_ms", "500")?;
        save(&config, Some(&path))?;

        let loaded = load(Some(&path))?;
        assert_eq!(loaded, config);
        Ok(())
    }

    #[test]
    fn test_missing_file_loads_defaults() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let loaded = load(Some(&temp_dir.path().join("absent.toml")))?;
        assert_eq!(loaded, SystemConfig::default());
        Ok(())
    }

    #[test]
    fn test_invalid_file_rejected() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[batch]\nbatch_size = 0\n")?;

        assert!(load(Some(&path)).is_err());
        Ok(())
    }

    #[test]
    fn test_init_if_missing() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("wsync/config.toml");

        assert!(init_if_missing(Some(&path))?);
        assert!(!init_if_missing(Some(&path))?);
        assert_eq!(load(Some(&path))?, SystemConfig::default());
        Ok(())
    }
}
