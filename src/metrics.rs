//! Lightweight metrics for the snapshotter.
//!
//! Counters are instance-scoped: every [`crate::Snapshotter`] owns (or is
//! handed) an `Arc<Metrics>`, so two stores in one process never bleed into
//! each other's numbers. Atomic counters, relaxed ordering; `snapshot()`
//! copies them out into a plain struct for reporting.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counter set for one snapshotter instance.
#[derive(Debug, Default)]
pub struct Metrics {
    // ----- Snapshot lifecycle -----
    prepares: AtomicU64,
    views: AtomicU64,
    commits: AtomicU64,
    removes: AtomicU64,

    // ----- Removal / cleanup -----
    cleanup_runs: AtomicU64,
    orphans_removed: AtomicU64,
    orphan_remove_failures: AtomicU64,

    // ----- Usage scans -----
    usage_scans: AtomicU64,
    usage_entries_walked: AtomicU64,

    // ----- Metadata transactions -----
    txn_commits: AtomicU64,
    txn_rollbacks: AtomicU64,
}

/// Point-in-time copy of all counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub prepares: u64,
    pub views: u64,
    pub commits: u64,
    pub removes: u64,

    pub cleanup_runs: u64,
    pub orphans_removed: u64,
    pub orphan_remove_failures: u64,

    pub usage_scans: u64,
    pub usage_entries_walked: u64,

    pub txn_commits: u64,
    pub txn_rollbacks: u64,
}

impl MetricsSnapshot {
    /// Average directory entries visited per usage scan.
    pub fn avg_usage_entries(&self) -> f64 {
        if self.usage_scans == 0 {
            0.0
        } else {
            self.usage_entries_walked as f64 / self.usage_scans as f64
        }
    }
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    // ----- Recorders (lifecycle) -----
    pub fn record_prepare(&self) {
        self.prepares.fetch_add(1, Ordering::Relaxed);
    }
    pub fn record_view(&self) {
        self.views.fetch_add(1, Ordering::Relaxed);
    }
    pub fn record_commit(&self) {
        self.commits.fetch_add(1, Ordering::Relaxed);
    }
    pub fn record_remove(&self) {
        self.removes.fetch_add(1, Ordering::Relaxed);
    }

    // ----- Recorders (removal / cleanup) -----
    pub fn record_cleanup_run(&self) {
        self.cleanup_runs.fetch_add(1, Ordering::Relaxed);
    }
    pub fn record_orphan_removed(&self) {
        self.orphans_removed.fetch_add(1, Ordering::Relaxed);
    }
    pub fn record_orphan_remove_failure(&self) {
        self.orphan_remove_failures.fetch_add(1, Ordering::Relaxed);
    }

    // ----- Recorders (usage scans) -----
    pub fn record_usage_scan(&self, entries: u64) {
        self.usage_scans.fetch_add(1, Ordering::Relaxed);
        self.usage_entries_walked.fetch_add(entries, Ordering::Relaxed);
    }

    // ----- Recorders (metadata transactions) -----
    pub fn record_txn_commit(&self) {
        self.txn_commits.fetch_add(1, Ordering::Relaxed);
    }
    pub fn record_txn_rollback(&self) {
        self.txn_rollbacks.fetch_add(1, Ordering::Relaxed);
    }

    // ----- Snapshot / Reset -----
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            prepares: self.prepares.load(Ordering::Relaxed),
            views: self.views.load(Ordering::Relaxed),
            commits: self.commits.load(Ordering::Relaxed),
            removes: self.removes.load(Ordering::Relaxed),

            cleanup_runs: self.cleanup_runs.load(Ordering::Relaxed),
            orphans_removed: self.orphans_removed.load(Ordering::Relaxed),
            orphan_remove_failures: self.orphan_remove_failures.load(Ordering::Relaxed),

            usage_scans: self.usage_scans.load(Ordering::Relaxed),
            usage_entries_walked: self.usage_entries_walked.load(Ordering::Relaxed),

            txn_commits: self.txn_commits.load(Ordering::Relaxed),
            txn_rollbacks: self.txn_rollbacks.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&self) {
        self.prepares.store(0, Ordering::Relaxed);
        self.views.store(0, Ordering::Relaxed);
        self.commits.store(0, Ordering::Relaxed);
        self.removes.store(0, Ordering::Relaxed);

        self.cleanup_runs.store(0, Ordering::Relaxed);
        self.orphans_removed.store(0, Ordering::Relaxed);
        self.orphan_remove_failures.store(0, Ordering::Relaxed);

        self.usage_scans.store(0, Ordering::Relaxed);
        self.usage_entries_walked.store(0, Ordering::Relaxed);

        self.txn_commits.store(0, Ordering::Relaxed);
        self.txn_rollbacks.store(0, Ordering::Relaxed);
    }
}
