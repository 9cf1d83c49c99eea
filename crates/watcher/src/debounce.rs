//! Batch accumulation and flush policy
//!
//! Turns a trickle of drained change events into discrete flushes:
//! - Size threshold: flush as soon as enough unique paths are pending
//! - Quiet period: flush once no new path has arrived for the batch timeout

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use ws_core::ChangeEvent;

/// Default number of unique paths that forces a flush
pub const DEFAULT_BATCH_SIZE: usize = 10;

/// Default quiet period before a partial batch is flushed
pub const DEFAULT_BATCH_TIMEOUT: Duration = Duration::from_secs(2);

/// Default scheduler tick
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(100);

/// Flush thresholds and scheduler cadence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchConfig {
    /// Flush once this many unique paths are pending
    pub batch_size: usize,
    /// Flush once this long has passed since the last new path
    pub batch_timeout: Duration,
    /// How often the flush loop drains the journal and evaluates thresholds
    pub tick_interval: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            batch_timeout: DEFAULT_BATCH_TIMEOUT,
            tick_interval: DEFAULT_TICK_INTERVAL,
        }
    }
}

/// Why a flush was triggered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushReason {
    /// Pending set reached the batch size
    SizeThreshold,
    /// Batch timeout elapsed since the last new path
    Timeout,
}

/// Deduplicated pending paths plus the time of the most recent new one
///
/// Owned by the flush loop alone; nothing else reads or writes it.
#[derive(Debug)]
pub struct BatchAccumulator {
    config: BatchConfig,
    pending: BTreeSet<PathBuf>,
    last_event: Option<Instant>,
}

impl BatchAccumulator {
    pub fn new(config: BatchConfig) -> Self {
        Self {
            config,
            pending: BTreeSet::new(),
            last_event: None,
        }
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Merge drained events into the pending set.
    ///
    /// Event kinds are not retained. `last_event` moves to `now` only when
    /// at least one path was not already pending. Returns the number of
    /// newly inserted paths.
    pub fn merge<I>(&mut self, events: I, now: Instant) -> usize
    where
        I: IntoIterator<Item = ChangeEvent>,
    {
        let inserted = events
            .into_iter()
            .filter(|event| self.pending.insert(event.path.clone()))
            .count();

        if inserted > 0 {
            self.last_event = Some(now);
        }
        inserted
    }

    /// Evaluate the flush conditions, size first.
    pub fn poll(&self, now: Instant) -> Option<FlushReason> {
        if self.pending.is_empty() {
            return None;
        }

        if self.pending.len() >= self.config.batch_size {
            return Some(FlushReason::SizeThreshold);
        }

        match self.last_event {
            Some(last) if now.saturating_duration_since(last) >= self.config.batch_timeout => {
                Some(FlushReason::Timeout)
            }
            _ => None,
        }
    }

    /// Hand over the pending set (sorted) and reset.
    pub fn take(&mut self) -> Vec<PathBuf> {
        self.last_event = None;
        std::mem::take(&mut self.pending).into_iter().collect()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn last_event(&self) -> Option<Instant> {
        self.last_event
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ws_core::ChangeKind;

    fn modify(path: &str) -> ChangeEvent {
        ChangeEvent::new(path, ChangeKind::Modify)
    }

    fn accumulator() -> BatchAccumulator {
        BatchAccumulator::new(BatchConfig::default())
    }

    #[test]
    fn test_empty_never_flushes() {
        let acc = accumulator();
        let far_future = Instant::now() + Duration::from_secs(3600);
        assert_eq!(acc.poll(far_future), None);
    }

    #[test]
    fn test_timeout_waits_for_quiet_period() {
        let mut acc = accumulator();
        let t0 = Instant::now();

        acc.merge(vec![modify("sub/a")], t0);
        acc.merge(vec![modify("sub/b")], t0 + Duration::from_millis(1500));

        // 2s after the first event but only 0.5s after the last one
        assert_eq!(acc.poll(t0 + Duration::from_millis(2000)), None);
        assert_eq!(acc.poll(t0 + Duration::from_millis(3499)), None);
        assert_eq!(
            acc.poll(t0 + Duration::from_millis(3500)),
            Some(FlushReason::Timeout)
        );
    }

    #[test]
    fn test_size_threshold_ignores_timing() {
        let mut acc = accumulator();
        let t0 = Instant::now();

        let events: Vec<_> = (0..DEFAULT_BATCH_SIZE)
            .map(|i| modify(&format!("sub/file{}.txt", i)))
            .collect();
        acc.merge(events, t0);

        assert_eq!(acc.poll(t0), Some(FlushReason::SizeThreshold));
    }

    #[test]
    fn test_duplicates_collapse() {
        let mut acc = accumulator();
        let t0 = Instant::now();

        let inserted = acc.merge(
            vec![modify("sub/same"), modify("sub/same"), modify("sub/same")],
            t0,
        );
        assert_eq!(inserted, 1);
        assert_eq!(acc.len(), 1);
    }

    #[test]
    fn test_duplicate_path_does_not_extend_quiet_period() {
        let mut acc = accumulator();
        let t0 = Instant::now();

        acc.merge(vec![modify("sub/same")], t0);
        let inserted = acc.merge(vec![modify("sub/same")], t0 + Duration::from_secs(1));

        assert_eq!(inserted, 0);
        assert_eq!(acc.last_event(), Some(t0));
        assert_eq!(
            acc.poll(t0 + DEFAULT_BATCH_TIMEOUT),
            Some(FlushReason::Timeout)
        );
    }

    #[test]
    fn test_delete_then_recreate_collapses_to_one_path() {
        let mut acc = accumulator();
        let t0 = Instant::now();

        acc.merge(
            vec![
                ChangeEvent::new("sub/churn.txt", ChangeKind::Delete),
                ChangeEvent::new("sub/churn.txt", ChangeKind::Create),
                ChangeEvent::new("sub/churn.txt", ChangeKind::Modify),
            ],
            t0,
        );

        assert_eq!(acc.take(), vec![PathBuf::from("sub/churn.txt")]);
    }

    #[test]
    fn test_take_resets_and_sorts() {
        let mut acc = accumulator();
        let t0 = Instant::now();

        acc.merge(vec![modify("sub/b"), modify("sub/a"), modify("docs/c")], t0);
        let batch = acc.take();

        assert_eq!(
            batch,
            vec![
                PathBuf::from("docs/c"),
                PathBuf::from("sub/a"),
                PathBuf::from("sub/b"),
            ]
        );
        assert!(acc.is_empty());
        assert_eq!(acc.last_event(), None);
        assert_eq!(acc.poll(t0 + Duration::from_secs(60)), None);
    }
}
