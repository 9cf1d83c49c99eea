//! Change events reported by the file watcher

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Type of file system change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeKind {
    /// File or directory created
    Create,
    /// File contents or metadata modified
    Modify,
    /// File or directory deleted
    Delete,
    /// File or directory renamed / moved
    Move,
    /// Event queue overflowed, the whole root must be reconciled
    Rescan,
}

/// A single file system change, relative to the watched root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    /// Path relative to the watched root (empty for the root itself)
    pub path: PathBuf,
    /// What happened
    pub kind: ChangeKind,
    /// When the watcher observed it
    pub observed_at: SystemTime,
}

impl ChangeEvent {
    pub fn new(path: impl Into<PathBuf>, kind: ChangeKind) -> Self {
        Self {
            path: path.into(),
            kind,
            observed_at: SystemTime::now(),
        }
    }

    /// Event asking for a reconciliation of the whole root.
    ///
    /// The empty path is top-level, so the dispatcher escalates it to a full resync.
    pub fn rescan() -> Self {
        Self::new(PathBuf::new(), ChangeKind::Rescan)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
