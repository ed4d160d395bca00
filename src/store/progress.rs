/*!
 * Progress counters polled while an operation runs.
 */

use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Counters for the operation currently or most recently running.
///
/// Shared through an `Arc` so a poller can read them while the store is
/// locked by a background task.
#[derive(Debug, Default)]
pub struct Progress {
    count: AtomicUsize,
    processed: AtomicUsize,
    saved: AtomicUsize,
    discarded: AtomicUsize,
    exported: AtomicUsize,
    closing: AtomicBool,
}

/// Point-in-time copy of the counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProgressSnapshot {
    pub count: usize,
    pub processed: usize,
    pub saved: usize,
    pub discarded: usize,
    pub exported: usize,
}

impl Progress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Zero every counter at the start of an operation
    pub fn reset(&self) {
        self.count.store(0, Ordering::SeqCst);
        self.processed.store(0, Ordering::SeqCst);
        self.saved.store(0, Ordering::SeqCst);
        self.discarded.store(0, Ordering::SeqCst);
        self.exported.store(0, Ordering::SeqCst);
    }

    /// Units stored by the running ingestion
    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    /// Units examined by the running batch operation
    pub fn processed(&self) -> usize {
        self.processed.load(Ordering::SeqCst)
    }

    /// Units written by the running save
    pub fn saved(&self) -> usize {
        self.saved.load(Ordering::SeqCst)
    }

    /// Units rejected by the running ingestion
    pub fn discarded(&self) -> usize {
        self.discarded.load(Ordering::SeqCst)
    }

    /// Units written by the running export
    pub fn exported(&self) -> usize {
        self.exported.load(Ordering::SeqCst)
    }

    pub fn add_count(&self, n: usize) {
        self.count.fetch_add(n, Ordering::SeqCst);
    }

    /// Take back units whose insertion was rolled back
    pub fn sub_count(&self, n: usize) {
        let _ = self
            .count
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |c| Some(c.saturating_sub(n)));
    }

    pub fn add_processed(&self, n: usize) {
        self.processed.fetch_add(n, Ordering::SeqCst);
    }

    pub fn add_saved(&self, n: usize) {
        self.saved.fetch_add(n, Ordering::SeqCst);
    }

    pub fn add_discarded(&self, n: usize) {
        self.discarded.fetch_add(n, Ordering::SeqCst);
    }

    pub fn add_exported(&self, n: usize) {
        self.exported.fetch_add(n, Ordering::SeqCst);
    }

    /// Refuse further writes; cannot be undone
    pub fn mark_closing(&self) {
        self.closing.store(true, Ordering::SeqCst);
    }

    pub fn is_closing(&self) -> bool {
        self.closing.load(Ordering::SeqCst)
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            count: self.count(),
            processed: self.processed(),
            saved: self.saved(),
            discarded: self.discarded(),
            exported: self.exported(),
        }
    }
}
