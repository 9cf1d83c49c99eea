//! Stop a running instance

use anyhow::{Context, Result};
use cli_lib::{locks, system_config, util};
use owo_colors::OwoColorize;
use std::path::Path;
use std::time::Duration;

pub async fn run(config_path: Option<&Path>, root: Option<&Path>, timeout_secs: u64) -> Result<()> {
    let config = system_config::load(config_path)?;
    let root = util::resolve_root(root, config.watch.root.as_deref())
        .context("Failed to resolve watched root")?;
    let state_dir = util::state_dir()?;

    let Some(holder) = locks::read_holder(&state_dir, &root)?.filter(|h| h.is_alive()) else {
        println!("{}", "Not running".yellow());
        return Ok(());
    };

    send_terminate(holder.pid)?;

    let deadline = tokio::time::Instant::now() + Duration::from_secs(timeout_secs);
    while tokio::time::Instant::now() < deadline {
        let still_held = locks::read_holder(&state_dir, &root)
            .ok()
            .flatten()
            .is_some_and(|h| h.pid == holder.pid && h.is_alive());
        if !still_held {
            println!("{} Stopped (pid {})", "✓".green(), holder.pid);
            return Ok(());
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    anyhow::bail!(
        "Instance (pid {}) did not exit within {}s",
        holder.pid,
        timeout_secs
    )
}

#[cfg(unix)]
fn send_terminate(pid: u32) -> Result<()> {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    let pid = i32::try_from(pid).context("Invalid pid in lock file")?;
    kill(Pid::from_raw(pid), Signal::SIGTERM).context("Failed to send SIGTERM")?;
    Ok(())
}

#[cfg(not(unix))]
fn send_terminate(_pid: u32) -> Result<()> {
    anyhow::bail!("Stopping an instance is only supported on unix")
}
