//! Shared progress counters for a scan run.

use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard};

/// Point-in-time view of scan progress, safe to hand to a UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
    /// Number of images the run set out to process.
    pub total: usize,

    /// Images processed so far, never above `total`.
    pub processed: usize,

    /// Slips found so far.
    pub slips_found: usize,

    /// Whether the run has finished.
    pub is_complete: bool,

    /// Completion percentage, 0.0 - 100.0.
    pub percentage: f64,
}

/// Counter holder shared by all extraction workers. All updates go
/// through one lock, so concurrent increments never lose counts.
#[derive(Debug)]
pub struct ProgressTracker {
    inner: Mutex<Counters>,
}

#[derive(Debug)]
struct Counters {
    total: usize,
    processed: usize,
    slips_found: usize,
    is_complete: bool,
}

impl ProgressTracker {
    /// Create a tracker for a run over `total` images.
    pub fn new(total: usize) -> Self {
        Self {
            inner: Mutex::new(Counters {
                total,
                processed: 0,
                slips_found: 0,
                is_complete: false,
            }),
        }
    }

    /// Count one processed image, clamped at the total.
    pub fn increment_processed(&self) -> ProgressSnapshot {
        let mut inner = self.lock();
        inner.processed = (inner.processed + 1).min(inner.total);
        snapshot_of(&inner)
    }

    /// Count one found slip. Returns the new count.
    pub fn increment_slips_found(&self) -> usize {
        let mut inner = self.lock();
        inner.slips_found += 1;
        inner.slips_found
    }

    /// Mark the run finished.
    pub fn mark_complete(&self) {
        self.lock().is_complete = true;
    }

    /// Current counters.
    pub fn snapshot(&self) -> ProgressSnapshot {
        snapshot_of(&self.lock())
    }

    /// Reset every counter for a fresh run over the same total.
    pub fn reset(&self) {
        let mut inner = self.lock();
        inner.processed = 0;
        inner.slips_found = 0;
        inner.is_complete = false;
    }

    fn lock(&self) -> MutexGuard<'_, Counters> {
        // A poisoned lock means a worker panicked mid-update; the
        // counters themselves are still plain integers, so keep going.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn snapshot_of(counters: &Counters) -> ProgressSnapshot {
    ProgressSnapshot {
        total: counters.total,
        processed: counters.processed,
        slips_found: counters.slips_found,
        is_complete: counters.is_complete,
        percentage: percentage(counters.processed, counters.total),
    }
}

fn percentage(processed: usize, total: usize) -> f64 {
    let fraction = processed as f64 / total.max(1) as f64;
    (fraction * 100.0).min(100.0)
}
