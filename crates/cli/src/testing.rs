//! Recording fakes for the sync seams

use async_trait::async_trait;
use parking_lot::Mutex;
use remote::{ConnectivityCheck, SyncError, SyncPrimitive};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Records every invocation with the (tokio) time it started
#[derive(Default)]
pub struct Recorder {
    calls: Mutex<Vec<(Instant, Option<PathBuf>)>>,
    failing: Vec<Option<PathBuf>>,
    delay: Option<Duration>,
}

impl Recorder {
    /// Fail the listed invocations (`None` = full resync)
    pub fn failing_on(failing: Vec<Option<PathBuf>>) -> Self {
        Self {
            failing,
            ..Self::default()
        }
    }

    /// Every invocation takes `delay` to complete
    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn paths(&self) -> Vec<Option<PathBuf>> {
        self.calls.lock().iter().map(|(_, p)| p.clone()).collect()
    }

    pub fn times(&self) -> Vec<Instant> {
        self.calls.lock().iter().map(|(t, _)| *t).collect()
    }
}

#[async_trait]
impl SyncPrimitive for Recorder {
    async fn invoke(&self, path: Option<&Path>) -> Result<(), SyncError> {
        let call = path.map(Path::to_path_buf);
        self.calls.lock().push((Instant::now(), call.clone()));

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.failing.contains(&call) {
            return Err(SyncError::Failed {
                program: "rsync".to_string(),
                status: "exit status: 12".to_string(),
                stderr: "connection unexpectedly closed".to_string(),
            });
        }
        Ok(())
    }
}

/// Connectivity check with a fixed answer
#[derive(Default)]
pub struct FakeProbe {
    pub unreachable: bool,
    /// Shared so a test can keep counting after boxing the probe
    pub probes: Arc<AtomicUsize>,
}

impl FakeProbe {
    pub fn unreachable() -> Self {
        Self {
            unreachable: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl ConnectivityCheck for FakeProbe {
    async fn probe(&self) -> Result<(), SyncError> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        if self.unreachable {
            return Err(SyncError::Unreachable("nas: connection refused".to_string()));
        }
        Ok(())
    }
}
