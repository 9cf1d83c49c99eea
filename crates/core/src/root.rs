//! Watched root directory and path classification

use anyhow::{Context, Result};
use std::path::{Component, Path, PathBuf};

/// Length (hex chars) of the instance key derived from the root path
const INSTANCE_KEY_LEN: usize = 16;

/// The local directory tree being mirrored
///
/// Immutable for the lifetime of the process. All event paths are
/// stored relative to it once accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchedRoot {
    root: PathBuf,
}

impl WatchedRoot {
    /// Resolve and validate a watched root.
    ///
    /// The directory must exist; the stored path is canonical so that
    /// event paths reported by the OS can be stripped reliably.
    pub fn new(path: &Path) -> Result<Self> {
        let root = path
            .canonicalize()
            .with_context(|| format!("Watched root does not exist: {}", path.display()))?;

        if !root.is_dir() {
            anyhow::bail!("Watched root is not a directory: {}", root.display());
        }

        Ok(Self { root })
    }

    /// Absolute path of the root
    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Express an absolute event path relative to the root.
    ///
    /// Returns `None` for paths outside the root. The root itself maps
    /// to the empty path.
    pub fn relativize(&self, path: &Path) -> Option<PathBuf> {
        if path.is_relative() {
            return Some(normalize(path));
        }
        path.strip_prefix(&self.root).ok().map(normalize)
    }

    /// Short stable identifier for this root.
    ///
    /// Used to name per-instance resources (daemon lock, event journal) so
    /// that instances watching different roots never collide.
    pub fn instance_key(&self) -> String {
        let digest = blake3::hash(self.root.to_string_lossy().as_bytes());
        digest.to_hex()[..INSTANCE_KEY_LEN].to_string()
    }
}

/// Whether a root-relative path is the root itself or a direct child of it.
pub fn is_top_level(relative: &Path) -> bool {
    normal_components(relative) <= 1
}

fn normal_components(path: &Path) -> usize {
    path.components()
        .filter(|c| matches!(c, Component::Normal(_)))
        .count()
}

/// Drop `.` components and any leading separator
fn normalize(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| matches!(c, Component::Normal(_) | Component::ParentDir))
        .collect()
}
