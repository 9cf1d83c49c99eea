//! Sync decisions derived from a flushed batch

use std::fmt;
use std::path::PathBuf;

/// Why a full resync was chosen
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResyncCause {
    /// Mandatory sync before watching starts
    Initial,
    /// Batch touched a direct child of the root (or the root itself)
    TopLevel(PathBuf),
    /// Batch held more unique paths than the selective limit
    BatchTooLarge(usize),
}

impl fmt::Display for ResyncCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResyncCause::Initial => write!(f, "initial sync"),
            ResyncCause::TopLevel(path) if path.as_os_str().is_empty() => {
                write!(f, "root rescan requested")
            }
            ResyncCause::TopLevel(path) => write!(f, "top-level change: {}", path.display()),
            ResyncCause::BatchTooLarge(n) => write!(f, "{} unique paths", n),
        }
    }
}

/// What the dispatcher will ask the sync primitive to do for one flush.
///
/// Derived once per flush and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncDecision {
    /// One invocation covering the whole root, deletions included
    FullResync(ResyncCause),
    /// One invocation per path, in order
    Selective(Vec<PathBuf>),
}

impl SyncDecision {
    pub fn is_full(&self) -> bool {
        matches!(self, SyncDecision::FullResync(_))
    }

    /// Number of sync primitive invocations this decision implies
    pub fn invocation_count(&self) -> usize {
        match self {
            SyncDecision::FullResync(_) => 1,
            SyncDecision::Selective(paths) => paths.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invocation_count() {
        assert_eq!(SyncDecision::FullResync(ResyncCause::Initial).invocation_count(), 1);

        let selective = SyncDecision::Selective(vec![PathBuf::from("a/b"), PathBuf::from("a/c")]);
        assert_eq!(selective.invocation_count(), 2);
        assert!(!selective.is_full());
    }

    #[test]
    fn test_cause_display() {
        assert_eq!(
            ResyncCause::TopLevel(PathBuf::from("root.cfg")).to_string(),
            "top-level change: root.cfg"
        );
        assert_eq!(ResyncCause::TopLevel(PathBuf::new()).to_string(), "root rescan requested");
        assert_eq!(ResyncCause::BatchTooLarge(12).to_string(), "12 unique paths");
    }
}
