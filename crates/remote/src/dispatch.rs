//! Sync dispatcher: full resync vs per-path sync

use crate::{Result, SyncPrimitive};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use ws_core::{is_top_level, ResyncCause, SyncDecision};

/// Default largest batch still synced path by path
pub const DEFAULT_MAX_SELECTIVE_PATHS: usize = 5;

/// Outcome of one dispatched decision
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    pub decision: SyncDecision,
    pub invocations: usize,
    pub failures: usize,
}

impl DispatchReport {
    pub fn is_success(&self) -> bool {
        self.failures == 0
    }
}

/// Turns flushed batches into sync primitive invocations
///
/// Failures are logged and counted; nothing is retried or re-queued.
pub struct SyncDispatcher {
    primitive: Arc<dyn SyncPrimitive>,
    max_selective: usize,
}

impl SyncDispatcher {
    pub fn new(primitive: Arc<dyn SyncPrimitive>, max_selective: usize) -> Self {
        Self {
            primitive,
            max_selective,
        }
    }

    /// Classify a batch.
    ///
    /// Any top-level path, or more than `max_selective` unique paths,
    /// forces a full resync. Otherwise one invocation per unique path,
    /// in sorted order.
    pub fn classify(&self, batch: Vec<PathBuf>) -> SyncDecision {
        let unique: BTreeSet<PathBuf> = batch.into_iter().collect();

        if let Some(top) = unique.iter().find(|p| is_top_level(p)) {
            return SyncDecision::FullResync(ResyncCause::TopLevel(top.clone()));
        }

        if unique.len() > self.max_selective {
            return SyncDecision::FullResync(ResyncCause::BatchTooLarge(unique.len()));
        }

        SyncDecision::Selective(unique.into_iter().collect())
    }

    /// Issue the invocations for a decision, sequentially.
    ///
    /// A failing selective invocation does not stop the rest of the batch.
    pub async fn dispatch(&self, decision: SyncDecision) -> DispatchReport {
        let mut failures = 0;

        match &decision {
            SyncDecision::FullResync(cause) => {
                info!("Full resync ({})", cause);
                if let Err(e) = self.primitive.invoke(None).await {
                    warn!("Full resync failed: {}", e);
                    failures += 1;
                }
            }
            SyncDecision::Selective(paths) => {
                info!("Selective sync of {} path(s)", paths.len());
                for path in paths {
                    if let Err(e) = self.primitive.invoke(Some(path.as_path())).await {
                        warn!("Sync of {} failed: {}", path.display(), e);
                        failures += 1;
                    }
                }
            }
        }

        DispatchReport {
            invocations: decision.invocation_count(),
            decision,
            failures,
        }
    }

    /// Classify and dispatch a flushed batch. An empty batch is a no-op.
    pub async fn flush(&self, batch: Vec<PathBuf>) -> Option<DispatchReport> {
        if batch.is_empty() {
            return None;
        }
        let decision = self.classify(batch);
        Some(self.dispatch(decision).await)
    }

    /// Mandatory full resync before watching starts; failure is fatal.
    pub async fn initial_sync(&self) -> Result<()> {
        info!("Full resync ({})", ResyncCause::Initial);
        self.primitive.invoke(None).await
    }
}
