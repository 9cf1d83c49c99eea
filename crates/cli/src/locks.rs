//! Lock file management for daemon exclusivity
//!
//! One lock per watched root, so two instances never mirror the same
//! directory while instances for different roots run side by side.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use ws_core::WatchedRoot;

/// Held for the lifetime of a running instance; the file is removed on drop
pub struct DaemonLock {
    path: PathBuf,
    #[allow(dead_code)]
    file: File,
}

/// Lock file content, also read back by `wsync status` / `wsync stop`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockHolder {
    pub pid: u32,
    /// Unix milliseconds
    pub started_at: u64,
    pub root: PathBuf,
    pub endpoint: String,
    /// Event journal name of the running instance
    pub journal: String,
}

impl LockHolder {
    pub fn is_alive(&self) -> bool {
        is_process_alive(self.pid)
    }
}

/// Lock file location for a root
pub fn lock_path(state_dir: &Path, root: &WatchedRoot) -> PathBuf {
    state_dir
        .join("locks")
        .join(format!("{}.lock", root.instance_key()))
}

/// Read the current holder of a root's lock, if a lock file exists
pub fn read_holder(state_dir: &Path, root: &WatchedRoot) -> Result<Option<LockHolder>> {
    let path = lock_path(state_dir, root);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read lock file {}", path.display()))?;
    if contents.trim().is_empty() {
        return Ok(None);
    }
    let holder = serde_json::from_str(&contents).context("Failed to deserialize lock content")?;
    Ok(Some(holder))
}

impl DaemonLock {
    /// Acquire the exclusive lock for `root`
    ///
    /// Returns error if:
    /// - Lock is already held by a running process
    /// - Permission denied
    pub fn acquire(state_dir: &Path, root: &WatchedRoot, endpoint: &str, journal: &str) -> Result<Self> {
        let lock_path = lock_path(state_dir, root);

        if let Some(parent) = lock_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create locks directory")?;
        }

        // One retry after removing a stale lock
        for _ in 0..2 {
            let mut file = OpenOptions::new()
                .create(true)
                .truncate(false)
                .read(true)
                .write(true)
                .open(&lock_path)
                .context("Failed to open lock file")?;

            if try_flock_exclusive(&file)? {
                let holder = LockHolder {
                    pid: std::process::id(),
                    started_at: current_timestamp_ms(),
                    root: root.path().to_path_buf(),
                    endpoint: endpoint.to_string(),
                    journal: journal.to_string(),
                };
                Self::write_lock_content(&mut file, &holder)?;

                return Ok(Self {
                    path: lock_path,
                    file,
                });
            }

            match Self::read_lock_content(&mut file) {
                Ok(holder) if !holder.is_alive() => {
                    tracing::warn!("Removing stale lock left by pid {}", holder.pid);
                    drop(file);
                    std::fs::remove_file(&lock_path)?;
                }
                Ok(holder) => anyhow::bail!(
                    "Already watching {} (pid {})",
                    root.path().display(),
                    holder.pid
                ),
                Err(_) => anyhow::bail!(
                    "Already watching {} (lock file held by active process)",
                    root.path().display()
                ),
            }
        }

        anyhow::bail!("Failed to acquire lock {}", lock_path.display())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Release the lock and remove the file
    pub fn release(self) -> Result<()> {
        std::fs::remove_file(&self.path).context("Failed to remove lock file")?;
        Ok(())
    }

    fn write_lock_content(file: &mut File, holder: &LockHolder) -> Result<()> {
        let serialized =
            serde_json::to_string(holder).context("Failed to serialize lock content")?;

        file.set_len(0)?;
        file.seek(SeekFrom::Start(0))?;
        file.write_all(serialized.as_bytes())?;
        file.sync_all()?;
        Ok(())
    }

    fn read_lock_content(file: &mut File) -> Result<LockHolder> {
        file.seek(SeekFrom::Start(0))?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;
        serde_json::from_str(&contents).context("Failed to deserialize lock content")
    }
}

impl Drop for DaemonLock {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

/// Try to acquire exclusive file lock (non-blocking)
#[cfg(unix)]
fn try_flock_exclusive(file: &File) -> Result<bool> {
    use nix::fcntl::{flock, FlockArg};
    use std::os::unix::io::AsRawFd;

    match flock(file.as_raw_fd(), FlockArg::LockExclusiveNonblock) {
        Ok(_) => Ok(true),
        Err(nix::errno::Errno::EWOULDBLOCK) => Ok(false),
        Err(e) => Err(e.into()),
    }
}

#[cfg(not(unix))]
fn try_flock_exclusive(_file: &File) -> Result<bool> {
    Ok(true)
}

/// Null-signal probe: ESRCH means gone, anything else counts as alive
#[cfg(unix)]
pub fn is_process_alive(pid: u32) -> bool {
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    let Ok(raw) = i32::try_from(pid) else {
        return false;
    };
    match kill(Pid::from_raw(raw), None) {
        Ok(_) => true,
        Err(nix::errno::Errno::ESRCH) => false,
        Err(_) => true,
    }
}

#[cfg(not(unix))]
pub fn is_process_alive(_pid: u32) -> bool {
    true
}

fn current_timestamp_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
