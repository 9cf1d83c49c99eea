//! Append-only event journal with atomic drain

use parking_lot::Mutex;
use std::ops::Deref;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;
use ulid::Ulid;
use ws_core::ChangeEvent;

/// Ordered handoff buffer between the event source and the flush loop
///
/// The producer only appends, the consumer only drains. A drain swaps the
/// whole buffer out under the lock, so an append either lands before the
/// swap (and is returned) or after it (and waits for the next drain).
pub struct EventJournal {
    /// Unique per running instance
    name: String,
    /// Pending records, oldest first
    records: Mutex<Vec<ChangeEvent>>,
    /// Set once the journal has been released
    closed: AtomicBool,
    appended: AtomicU64,
    drained: AtomicU64,
    discarded: AtomicU64,
}

/// Counters exposed for status reporting
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JournalStats {
    pub appended: u64,
    pub drained: u64,
    pub discarded: u64,
    pub pending: usize,
}

impl EventJournal {
    /// Create a journal for the instance identified by `instance_key`
    pub fn open(instance_key: &str) -> Arc<Self> {
        let name = format!("wsync-{}-{}", instance_key, Ulid::new());
        debug!("Opened event journal {}", name);

        Arc::new(Self {
            name,
            records: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
            appended: AtomicU64::new(0),
            drained: AtomicU64::new(0),
            discarded: AtomicU64::new(0),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Append one record.
    ///
    /// Never waits on the consumer. Returns `false` if the journal has
    /// already been released, in which case the record is dropped.
    pub fn append(&self, event: ChangeEvent) -> bool {
        let mut records = self.records.lock();
        // Checked under the lock so close() cannot race a late append
        if self.closed.load(Ordering::Acquire) {
            return false;
        }
        records.push(event);
        self.appended.fetch_add(1, Ordering::Relaxed);
        true
    }

    /// Take every record currently stored, leaving the journal empty.
    pub fn drain_all(&self) -> Vec<ChangeEvent> {
        let drained = std::mem::take(&mut *self.records.lock());
        self.drained.fetch_add(drained.len() as u64, Ordering::Relaxed);
        drained
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Release the journal.
    ///
    /// Pending records are discarded and later appends are refused.
    /// Returns the number of discarded records. Idempotent.
    pub fn close(&self) -> usize {
        let mut records = self.records.lock();
        if self.closed.swap(true, Ordering::AcqRel) {
            return 0;
        }
        let discarded = records.len();
        records.clear();
        records.shrink_to_fit();
        self.discarded.fetch_add(discarded as u64, Ordering::Relaxed);
        debug!("Released event journal {} ({} pending discarded)", self.name, discarded);
        discarded
    }

    pub fn stats(&self) -> JournalStats {
        JournalStats {
            appended: self.appended.load(Ordering::Relaxed),
            drained: self.drained.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
            pending: self.len(),
        }
    }
}

/// Closes the wrapped journal when dropped
///
/// Held by the supervisor so the journal is released on every exit path.
pub struct JournalGuard {
    journal: Arc<EventJournal>,
}

impl JournalGuard {
    pub fn new(journal: Arc<EventJournal>) -> Self {
        Self { journal }
    }

    /// Shared handle for producers and the consumer
    pub fn handle(&self) -> Arc<EventJournal> {
        Arc::clone(&self.journal)
    }
}

impl Deref for JournalGuard {
    type Target = EventJournal;

    fn deref(&self) -> &EventJournal {
        &self.journal
    }
}

impl Drop for JournalGuard {
    fn drop(&mut self) {
        self.journal.close();
    }
}
