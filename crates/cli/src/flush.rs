//! Flush loop: drain the journal, accumulate, dispatch
//!
//! The loop is the only owner of the `BatchAccumulator`. Each tick:
//! 1. Drain every pending journal record
//! 2. Merge the paths into the pending set
//! 3. Flush if the size threshold or the quiet period is reached
//!
//! A dispatch runs inline, so a slow sync delays the next tick while the
//! journal keeps growing. Cancellation abandons an in-flight batch.

use journal::EventJournal;
use remote::{DispatchReport, SyncDispatcher};
use std::sync::Arc;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use watcher::{BatchAccumulator, BatchConfig};

/// Counters kept for the lifetime of one loop
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushStats {
    /// Flushes that reached the dispatcher
    pub flushes: u64,
    pub full_resyncs: u64,
    pub selective_invocations: u64,
    pub failed_invocations: u64,
    /// Batches dropped because shutdown arrived mid-dispatch
    pub abandoned: u64,
}

impl FlushStats {
    fn record(&mut self, report: &DispatchReport) {
        self.flushes += 1;
        if report.decision.is_full() {
            self.full_resyncs += 1;
        } else {
            self.selective_invocations += report.invocations as u64;
        }
        self.failed_invocations += report.failures as u64;
    }
}

pub struct FlushLoop {
    journal: Arc<EventJournal>,
    accumulator: BatchAccumulator,
    dispatcher: Arc<SyncDispatcher>,
    cancel: CancellationToken,
    stats: FlushStats,
}

impl FlushLoop {
    pub fn new(
        journal: Arc<EventJournal>,
        config: BatchConfig,
        dispatcher: Arc<SyncDispatcher>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            journal,
            accumulator: BatchAccumulator::new(config),
            dispatcher,
            cancel,
            stats: FlushStats::default(),
        }
    }

    /// Tick until cancelled, then return the counters.
    ///
    /// Errors inside a flush never end the loop.
    pub async fn run(mut self) -> FlushStats {
        let mut ticker = time::interval(self.accumulator.config().tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            if !self.tick().await {
                break;
            }
        }

        if !self.accumulator.is_empty() {
            debug!(
                "Dropping {} pending path(s) at shutdown",
                self.accumulator.len()
            );
        }
        info!(
            "Flush loop stopped: {} flushes ({} full, {} selective invocations, {} failed, {} abandoned)",
            self.stats.flushes,
            self.stats.full_resyncs,
            self.stats.selective_invocations,
            self.stats.failed_invocations,
            self.stats.abandoned
        );
        self.stats
    }

    /// One scheduler cycle. Returns false if cancelled mid-dispatch.
    async fn tick(&mut self) -> bool {
        let now = Instant::now().into_std();

        let drained = self.journal.drain_all();
        if !drained.is_empty() {
            let count = drained.len();
            let inserted = self.accumulator.merge(drained, now);
            debug!(
                "Drained {} event(s), {} new path(s), {} pending",
                count,
                inserted,
                self.accumulator.len()
            );
        }

        let Some(reason) = self.accumulator.poll(now) else {
            return true;
        };

        let batch = self.accumulator.take();
        info!("Flushing {} path(s) ({:?})", batch.len(), reason);

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                warn!("Shutdown during sync, abandoning in-flight batch");
                self.stats.abandoned += 1;
                false
            }
            report = self.dispatcher.flush(batch) => {
                if let Some(report) = report {
                    if !report.is_success() {
                        warn!(
                            "{} of {} sync invocation(s) failed; batch discarded",
                            report.failures,
                            report.invocations
                        );
                    }
                    self.stats.record(&report);
                }
                true
            }
        }
    }
}
