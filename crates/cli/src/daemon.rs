//! Daemon lifecycle management
//!
//! Starting → Running → Terminating → Terminated. Startup failures go
//! straight to Terminated. The journal guard, the daemon lock and the
//! watcher are scoped to `run_inner`, so every exit path releases them.

use crate::flush::{FlushLoop, FlushStats};
use crate::locks::DaemonLock;
use crate::system_config::SystemConfig;
use crate::util;
use anyhow::{Context, Result};
use journal::{EventJournal, JournalGuard};
use remote::{
    ConnectivityCheck, EndpointProbe, RemoteEndpoint, Rsync, RsyncOptions, SyncDispatcher,
    SyncPrimitive,
};
use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use watcher::{BatchConfig, IgnoreConfig, IgnoreRules, Watcher};
use ws_core::WatchedRoot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    Starting,
    Running,
    Terminating,
    Terminated,
}

impl fmt::Display for SupervisorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SupervisorState::Starting => "starting",
            SupervisorState::Running => "running",
            SupervisorState::Terminating => "terminating",
            SupervisorState::Terminated => "terminated",
        };
        f.write_str(name)
    }
}

/// Everything one instance needs, resolved from config and flags
#[derive(Debug, Clone)]
pub struct DaemonSettings {
    pub root: WatchedRoot,
    pub endpoint: RemoteEndpoint,
    pub batch: BatchConfig,
    pub max_selective: usize,
    pub rsync: RsyncOptions,
    pub ignore: IgnoreConfig,
    /// Lock files live under `<state_dir>/locks`
    pub state_dir: PathBuf,
}

impl DaemonSettings {
    /// Merge the config file with `--root` / `--remote` overrides
    pub fn resolve(
        config: &SystemConfig,
        root_flag: Option<&Path>,
        remote_flag: Option<&str>,
        state_dir: PathBuf,
    ) -> Result<Self> {
        config.validate()?;

        let root = util::resolve_root(root_flag, config.watch.root.as_deref())?;

        let endpoint = remote_flag
            .or(config.remote.endpoint.as_deref())
            .context("No remote endpoint configured (use --remote or set remote.endpoint)")?;
        let endpoint = RemoteEndpoint::parse(endpoint)?;

        if let RemoteEndpoint::Local(dest) = &endpoint {
            let dest = dest.canonicalize().unwrap_or_else(|_| dest.clone());
            if dest.starts_with(root.path()) {
                anyhow::bail!(
                    "Remote endpoint {} is inside the watched root {}",
                    dest.display(),
                    root.path().display()
                );
            }
        }

        Ok(Self {
            root,
            endpoint,
            batch: config.batch_config(),
            max_selective: config.batch.max_selective_paths,
            rsync: config.rsync_options(),
            ignore: config.ignore.clone(),
            state_dir,
        })
    }
}

pub struct Supervisor {
    settings: DaemonSettings,
    primitive: Arc<dyn SyncPrimitive>,
    probe: Box<dyn ConnectivityCheck>,
    state: SupervisorState,
    journal: Option<Arc<EventJournal>>,
}

impl Supervisor {
    /// Supervisor backed by rsync and the endpoint probe
    pub fn new(settings: DaemonSettings) -> Self {
        let rsync = Rsync::new(&settings.root, settings.endpoint.clone(), settings.rsync.clone());
        let probe = EndpointProbe::new(
            settings.endpoint.clone(),
            settings.rsync.ssh_binary.clone(),
            settings.rsync.key_file.clone(),
        );
        Self::with_backends(settings, Arc::new(rsync), Box::new(probe))
    }

    pub fn with_backends(
        settings: DaemonSettings,
        primitive: Arc<dyn SyncPrimitive>,
        probe: Box<dyn ConnectivityCheck>,
    ) -> Self {
        Self {
            settings,
            primitive,
            probe,
            state: SupervisorState::Starting,
            journal: None,
        }
    }

    pub fn state(&self) -> SupervisorState {
        self.state
    }

    /// Journal of the current or most recent run
    pub fn journal(&self) -> Option<&EventJournal> {
        self.journal.as_deref()
    }

    /// Run until SIGINT or SIGTERM
    pub async fn run(&mut self) -> Result<FlushStats> {
        self.run_until(shutdown_signal()).await
    }

    /// Run until `shutdown` resolves.
    ///
    /// Errors are startup failures and are left to the caller to report;
    /// a clean shutdown returns the flush counters.
    pub async fn run_until<F>(&mut self, shutdown: F) -> Result<FlushStats>
    where
        F: Future<Output = ()>,
    {
        let result = self.run_inner(shutdown).await;
        self.transition(SupervisorState::Terminated);
        result
    }

    async fn run_inner<F>(&mut self, shutdown: F) -> Result<FlushStats>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        self.transition(SupervisorState::Starting);

        let root = self.settings.root.clone();
        let journal = JournalGuard::new(EventJournal::open(&root.instance_key()));
        self.journal = Some(journal.handle());
        let lock = DaemonLock::acquire(
            &self.settings.state_dir,
            &root,
            &self.settings.endpoint.to_string(),
            journal.name(),
        )?;
        info!(
            "Mirroring {} to {} (journal {})",
            root.path().display(),
            self.settings.endpoint,
            journal.name()
        );

        let dispatcher = Arc::new(SyncDispatcher::new(
            Arc::clone(&self.primitive),
            self.settings.max_selective,
        ));

        tokio::select! {
            biased;
            _ = &mut shutdown => {
                info!("Shutdown requested during startup");
                return Ok(FlushStats::default());
            }
            result = self.start_remote(&dispatcher) => result?,
        }

        let rules = IgnoreRules::load(root.path(), self.settings.ignore.clone())?;
        let mut watcher = Watcher::new(root.clone(), rules, journal.handle());
        watcher.start().context("Failed to start file watcher")?;

        let cancel = CancellationToken::new();
        let flush_loop = FlushLoop::new(
            journal.handle(),
            self.settings.batch,
            dispatcher,
            cancel.clone(),
        );
        let mut flush_task = tokio::spawn(flush_loop.run());
        self.transition(SupervisorState::Running);

        let finished = tokio::select! {
            _ = &mut shutdown => None,
            result = &mut flush_task => Some(result),
        };

        self.transition(SupervisorState::Terminating);
        cancel.cancel();

        let stopped = tokio::task::spawn_blocking(move || watcher.stop()).await;
        match stopped {
            Ok(Err(e)) => warn!("Failed to stop watcher cleanly: {:#}", e),
            Err(e) => warn!("Watcher stop task failed: {}", e),
            Ok(Ok(())) => {}
        }

        let stats = match finished {
            Some(result) => {
                warn!("Flush loop ended before shutdown");
                result.context("Flush loop task failed")?
            }
            None => flush_task.await.context("Flush loop task failed")?,
        };

        let journal_stats = journal.stats();
        let discarded = journal.close();
        info!(
            "Released journal {} ({} appended, {} drained, {} discarded)",
            journal.name(),
            journal_stats.appended,
            journal_stats.drained,
            discarded
        );
        drop(journal);
        lock.release()?;

        Ok(stats)
    }

    /// Connectivity check, then the mandatory initial full resync
    async fn start_remote(&self, dispatcher: &SyncDispatcher) -> Result<()> {
        self.probe
            .probe()
            .await
            .context("Connectivity check failed")?;
        dispatcher
            .initial_sync()
            .await
            .context("Initial full resync failed")?;
        Ok(())
    }

    fn transition(&mut self, next: SupervisorState) {
        if self.state != next {
            info!("Supervisor {} -> {}", self.state, next);
        }
        self.state = next;
    }
}

/// Resolves on SIGINT (ctrl-c) or, on unix, SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
