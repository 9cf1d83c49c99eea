//! wsync core - shared data model for the sync engine
//!
//! This crate provides:
//! - Change events as reported by the watcher
//! - The watched root and path classification helpers
//! - Sync decisions handed to the dispatcher

pub mod decision;
pub mod event;
pub mod root;

// Re-export main types for convenience
pub use decision::{ResyncCause, SyncDecision};
pub use event::{ChangeEvent, ChangeKind};
pub use root::{is_top_level, WatchedRoot};

/// Common result type used throughout wsync-core
pub type Result<T> = anyhow::Result<T>;
