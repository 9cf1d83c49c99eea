//! Remote side of wsync
//!
//! This crate provides:
//! - The sync primitive seam and its rsync implementation
//! - The startup connectivity check
//! - The sync dispatcher (full resync vs per-path sync)

pub mod dispatch;
pub mod endpoint;
pub mod probe;
pub mod rsync;

use async_trait::async_trait;
use std::path::Path;

pub use dispatch::{DispatchReport, SyncDispatcher, DEFAULT_MAX_SELECTIVE_PATHS};
pub use endpoint::RemoteEndpoint;
pub use probe::EndpointProbe;
pub use rsync::{Rsync, RsyncOptions};

/// External transfer tool
///
/// `None` mirrors the whole watched root, deletions included. `Some(path)`
/// syncs that single root-relative item. Blocks until the transfer ends.
#[async_trait]
pub trait SyncPrimitive: Send + Sync {
    async fn invoke(&self, path: Option<&Path>) -> Result<()>;
}

/// Precondition probe against the remote endpoint, run once at startup
#[async_trait]
pub trait ConnectivityCheck: Send + Sync {
    async fn probe(&self) -> Result<()>;
}

/// Errors from the sync primitive and the connectivity check
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("remote endpoint unreachable: {0}")]
    Unreachable(String),

    #[error("invalid remote endpoint: {0}")]
    InvalidEndpoint(String),
}

/// Result type for remote operations
pub type Result<T> = std::result::Result<T, SyncError>;
