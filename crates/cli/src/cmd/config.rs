//! Configuration management command
//!
//! Provides CLI interface to view and edit the configuration file.

use anyhow::{Context, Result};
use cli_lib::system_config::{self, SystemConfig, KEYS};
use owo_colors::OwoColorize;
use std::path::Path;

/// List all configuration values
pub async fn run_list(config_path: Option<&Path>) -> Result<()> {
    let config = system_config::load(config_path)?;
    let path = system_config::resolve_path(config_path)?;

    println!("{}", "wsync configuration".bold());
    println!("{}: {}", "Location".dimmed(), path.display().dimmed());

    let mut section = "";
    for &key in KEYS {
        let (prefix, name) = key.split_once('.').unwrap_or(("", key));
        if prefix != section {
            println!("\n{}", format!("[{}]", prefix).yellow());
            section = prefix;
        }

        let value = config.get(key)?;
        if value.is_empty() {
            println!("  {} = {}", name.cyan(), "(unset)".dimmed());
        } else {
            println!("  {} = {}", name.cyan(), value);
        }
    }

    println!("\n{}", "Valid Ranges:".bold());
    println!("  batch_size: 1-10,000");
    println!("  batch_timeout_ms: 10-3,600,000");
    println!("  tick_interval_ms: 1-60,000");
    println!("  max_selective_paths: 0-10,000 (0 = always full resync)");

    Ok(())
}

/// Get a single configuration value
pub async fn run_get(config_path: Option<&Path>, key: &str) -> Result<()> {
    let config = system_config::load(config_path)?;
    println!("{}", config.get(key)?);
    Ok(())
}

/// Set a configuration value
pub async fn run_set(config_path: Option<&Path>, key: &str, value: &str) -> Result<()> {
    let mut config: SystemConfig = system_config::load(config_path)?;
    config.set(key, value)?;

    // Validate before saving
    config.validate().context("Invalid configuration value")?;

    system_config::save(&config, config_path)?;

    println!("{} {} = {}", "✓".green(), key.cyan(), value);
    println!(
        "{}",
        "Note: Restart running instances for changes to take effect (wsync stop && wsync watch)"
            .yellow()
    );

    Ok(())
}

/// Show the config file path and optionally create it
pub async fn run_path(config_path: Option<&Path>, create: bool) -> Result<()> {
    let path = system_config::resolve_path(config_path)?;

    if create && system_config::init_if_missing(config_path)? {
        println!("{} Created config file at: {}", "✓".green(), path.display());
    } else {
        println!("{}", path.display());
        if !path.exists() {
            println!("{}", "File does not exist. Use --create to create it.".yellow());
        }
    }

    Ok(())
}

/// Show example configuration
pub async fn run_example() -> Result<()> {
    println!("{}", system_config::example_config());
    Ok(())
}
