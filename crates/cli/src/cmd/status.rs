//! Show whether a root is being mirrored

use anyhow::{Context, Result};
use cli_lib::{locks, system_config, util};
use owo_colors::OwoColorize;
use std::path::Path;

pub async fn run(config_path: Option<&Path>, root: Option<&Path>) -> Result<()> {
    let config = system_config::load(config_path)?;
    let root = util::resolve_root(root, config.watch.root.as_deref())
        .context("Failed to resolve watched root")?;
    let state_dir = util::state_dir()?;

    let holder = locks::read_holder(&state_dir, &root)?.filter(|h| h.is_alive());

    println!("{}", "wsync status".bold());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!();
    println!("Root:          {}", root.path().display().to_string().cyan());

    let Some(holder) = holder else {
        println!("Instance:      {}", "Not running".yellow());
        println!("  {}", "Tip: Start with 'wsync watch --remote <dest>'".dimmed());
        return Ok(());
    };

    println!("Instance:      {}", "Running ✓".green());
    println!("  PID:         {}", holder.pid);
    println!("  Remote:      {}", holder.endpoint);
    println!(
        "  Started:     {} ({})",
        util::format_relative_time(holder.started_at),
        util::format_absolute_time(holder.started_at).dimmed()
    );
    println!("  Journal:     {}", holder.journal.dimmed());

    Ok(())
}
