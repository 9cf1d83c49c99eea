//! File system watching for wsync
//!
//! This crate provides:
//! - The event-source adapter (recursive OS watcher feeding the event journal)
//! - Exclude / .syncignore / editor temp filtering
//! - Batch accumulation and the flush policy
//! - Overflow recovery (rescan requests escalate to a full resync)

pub mod debounce;
pub mod ignore;

pub use debounce::{BatchAccumulator, BatchConfig, FlushReason};
pub use ignore::{IgnoreConfig, IgnoreRules, SYNCIGNORE_FILE};

use anyhow::{Context, Result};
use crossbeam_channel::{Receiver, RecvTimeoutError};
use journal::EventJournal;
use notify::event::{CreateKind, ModifyKind, RemoveKind};
use notify::{RecommendedWatcher, RecursiveMode, Watcher as _};
use parking_lot::RwLock;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, info, trace, warn};
use ws_core::{ChangeEvent, ChangeKind, WatchedRoot};

/// How often the forwarding thread re-checks its stop flag
const STOP_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Event-source adapter
///
/// Owns the OS watcher for one root and a forwarding thread that turns
/// raw notifications into journal records. Appends never block on the
/// consumer.
pub struct Watcher {
    root: WatchedRoot,
    rules: Arc<RwLock<IgnoreRules>>,
    journal: Arc<EventJournal>,
    inner: Option<RecommendedWatcher>,
    forwarder: Option<JoinHandle<()>>,
    stop: Arc<AtomicBool>,
}

impl Watcher {
    /// Create a new watcher for the given root
    pub fn new(root: WatchedRoot, rules: IgnoreRules, journal: Arc<EventJournal>) -> Self {
        Self {
            root,
            rules: Arc::new(RwLock::new(rules)),
            journal,
            inner: None,
            forwarder: None,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Start watching for events
    ///
    /// Fails if the OS watcher cannot be created or the root cannot be
    /// registered; both are fatal for the daemon.
    pub fn start(&mut self) -> Result<()> {
        if self.inner.is_some() {
            anyhow::bail!("Watcher already running for {}", self.root.path().display());
        }

        let (tx, rx) = crossbeam_channel::unbounded();
        let mut inner = notify::recommended_watcher(move |res| {
            let _ = tx.send(res);
        })
        .context("Failed to create file watcher")?;

        inner
            .watch(self.root.path(), RecursiveMode::Recursive)
            .with_context(|| format!("Failed to watch {}", self.root.path().display()))?;

        self.stop.store(false, Ordering::Release);
        let forwarder = Forwarder {
            root: self.root.clone(),
            rules: Arc::clone(&self.rules),
            journal: Arc::clone(&self.journal),
        };
        let stop = Arc::clone(&self.stop);

        let handle = std::thread::Builder::new()
            .name("wsync-watcher".to_string())
            .spawn(move || forwarder.run(rx, stop))
            .context("Failed to spawn watcher thread")?;

        self.inner = Some(inner);
        self.forwarder = Some(handle);

        info!(
            "Watching {} ({} ignore sources)",
            self.root.path().display(),
            self.rules.read().active_sources()
        );
        Ok(())
    }

    /// Stop watching
    ///
    /// Drops the OS watcher and joins the forwarding thread. Safe to call
    /// more than once.
    pub fn stop(&mut self) -> Result<()> {
        self.stop.store(true, Ordering::Release);
        // Dropping the OS watcher disconnects the channel
        self.inner.take();

        if let Some(handle) = self.forwarder.take() {
            handle
                .join()
                .map_err(|_| anyhow::anyhow!("Watcher thread panicked"))?;
            debug!("Watcher stopped for {}", self.root.path().display());
        }
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.inner.is_some()
    }
}

impl Drop for Watcher {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

/// Translation half of the adapter, run on the forwarding thread
struct Forwarder {
    root: WatchedRoot,
    rules: Arc<RwLock<IgnoreRules>>,
    journal: Arc<EventJournal>,
}

impl Forwarder {
    fn run(self, rx: Receiver<notify::Result<notify::Event>>, stop: Arc<AtomicBool>) {
        while !stop.load(Ordering::Acquire) {
            match rx.recv_timeout(STOP_POLL_INTERVAL) {
                Ok(Ok(event)) => {
                    self.forward(event);
                }
                Ok(Err(e)) => warn!("File watcher error: {}", e),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
    }

    /// Append the accepted paths of one notification; returns how many.
    fn forward(&self, event: notify::Event) -> usize {
        if event.need_rescan() {
            warn!("File watcher overflow, requesting full resync");
            return usize::from(self.journal.append(ChangeEvent::rescan()));
        }

        let Some(kind) = translate_kind(&event.kind) else {
            return 0;
        };
        let is_dir = entry_is_dir(&event.kind);

        let mut appended = 0;
        for path in event.paths {
            let Some(relative) = self.root.relativize(&path) else {
                debug!("Ignoring event outside watched root: {}", path.display());
                continue;
            };

            if relative.as_path() == Path::new(SYNCIGNORE_FILE) {
                self.reload_rules();
            }

            // Metadata churn on the root directory itself carries no information
            if relative.as_os_str().is_empty()
                || self.rules.read().should_ignore_entry(&relative, is_dir)
            {
                trace!("Ignoring event for {}", relative.display());
                continue;
            }

            if self.journal.append(ChangeEvent::new(relative, kind)) {
                appended += 1;
            }
        }
        appended
    }

    /// An unreadable .syncignore keeps the previous rules
    fn reload_rules(&self) {
        let mut rules = self.rules.write();
        match rules.reload() {
            Ok(()) => info!(
                "Reloaded {} ({} ignore sources)",
                SYNCIGNORE_FILE,
                rules.active_sources()
            ),
            Err(e) => warn!("Keeping previous ignore rules: {:#}", e),
        }
    }
}

/// Entry type when the event states it; removed paths cannot be stat'ed
fn entry_is_dir(kind: &notify::EventKind) -> Option<bool> {
    use notify::EventKind;

    match kind {
        EventKind::Create(CreateKind::Folder) | EventKind::Remove(RemoveKind::Folder) => {
            Some(true)
        }
        EventKind::Create(CreateKind::File) | EventKind::Remove(RemoveKind::File) => {
            Some(false)
        }
        _ => None,
    }
}

/// Map a notify event kind onto the engine's change kinds
///
/// Access events do not change content and are dropped.
fn translate_kind(kind: &notify::EventKind) -> Option<ChangeKind> {
    use notify::EventKind;

    match kind {
        EventKind::Create(_) => Some(ChangeKind::Create),
        EventKind::Modify(ModifyKind::Name(_)) => Some(ChangeKind::Move),
        EventKind::Modify(_) => Some(ChangeKind::Modify),
        EventKind::Remove(_) => Some(ChangeKind::Delete),
        EventKind::Access(_) => None,
        EventKind::Any | EventKind::Other => Some(ChangeKind::Modify),
    }
}
