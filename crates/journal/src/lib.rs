//! Event journal between the watcher and the batching loop
//!
//! This crate provides:
//! - An in-process, append-only handoff buffer for change events
//! - Atomic drain (take everything queued, nothing lost to a concurrent append)
//! - Scoped release via `JournalGuard`

pub mod journal;

// Re-exports
pub use journal::{EventJournal, JournalGuard, JournalStats};
