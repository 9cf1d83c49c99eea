//! rsync-backed sync primitive

use crate::endpoint::RemoteEndpoint;
use crate::{Result, SyncError, SyncPrimitive};
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;
use ws_core::WatchedRoot;

/// Maximum stderr bytes kept in an error
const STDERR_LIMIT: usize = 2048;

/// Pass-through settings from process configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RsyncOptions {
    /// rsync executable
    pub binary: String,
    /// ssh executable used for remote endpoints
    pub ssh_binary: String,
    /// Exclude patterns, passed unchanged as `--exclude=<pattern>`
    pub excludes: Vec<String>,
    /// Private key for ssh (`-i`)
    pub key_file: Option<PathBuf>,
    /// Extra arguments inserted before the source
    pub extra_args: Vec<String>,
}

impl Default for RsyncOptions {
    fn default() -> Self {
        Self {
            binary: "rsync".to_string(),
            ssh_binary: "ssh".to_string(),
            excludes: vec![],
            key_file: None,
            extra_args: vec![],
        }
    }
}

/// Mirrors the watched root to the endpoint with rsync
///
/// Full: `rsync -az --delete <root>/ <dest>/`
/// Path: `rsync -az --relative --delete-missing-args --force <root>/./<path> <dest>/`
pub struct Rsync {
    root: PathBuf,
    endpoint: RemoteEndpoint,
    options: RsyncOptions,
}

impl Rsync {
    pub fn new(root: &WatchedRoot, endpoint: RemoteEndpoint, options: RsyncOptions) -> Self {
        Self {
            root: root.path().to_path_buf(),
            endpoint,
            options,
        }
    }

    /// Arguments for one invocation (program name excluded)
    pub fn command_args(&self, path: Option<&Path>) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["-az".into()];

        match path {
            None => args.push("--delete".into()),
            Some(_) => {
                args.push("--relative".into());
                // A vanished path is removed remotely, nothing beyond it.
                // --force lets that removal take a non-empty directory.
                args.push("--delete-missing-args".into());
                args.push("--force".into());
            }
        }

        for pattern in &self.options.excludes {
            args.push(format!("--exclude={}", pattern).into());
        }

        if let Some(shell) = self.remote_shell() {
            args.push("-e".into());
            args.push(shell.into());
        }

        args.extend(self.options.extra_args.iter().map(OsString::from));

        let source = match path {
            None => {
                let mut source = self.root.clone().into_os_string();
                source.push("/");
                source
            }
            Some(relative) => {
                // `/./` marks where --relative starts reproducing the path
                let mut source = self.root.join(".");
                source.push(relative);
                source.into_os_string()
            }
        };
        args.push(source);
        args.push(self.endpoint.rsync_destination().into());

        args
    }

    fn remote_shell(&self) -> Option<String> {
        if !self.endpoint.is_remote() {
            return None;
        }
        match &self.options.key_file {
            Some(key) => Some(format!("{} -i {}", self.options.ssh_binary, key.display())),
            None if self.options.ssh_binary != "ssh" => Some(self.options.ssh_binary.clone()),
            None => None,
        }
    }
}

#[async_trait]
impl SyncPrimitive for Rsync {
    async fn invoke(&self, path: Option<&Path>) -> Result<()> {
        let args = self.command_args(path);
        debug!("{} {:?}", self.options.binary, args);

        run_checked(&self.options.binary, &args).await
    }
}

/// Run a program to completion, mapping a non-zero exit to `SyncError::Failed`.
///
/// The child is killed if the returned future is dropped.
pub(crate) async fn run_checked(program: &str, args: &[OsString]) -> Result<()> {
    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|source| SyncError::Spawn {
            program: program.to_string(),
            source,
        })?;

    if output.status.success() {
        return Ok(());
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    let stderr = stderr.trim();
    let stderr = match stderr.char_indices().nth(STDERR_LIMIT) {
        Some((cut, _)) => &stderr[..cut],
        None => stderr,
    };

    Err(SyncError::Failed {
        program: program.to_string(),
        status: output.status.to_string(),
        stderr: stderr.to_string(),
    })
}
