//! Per-adapter operation counters.
//!
//! All counters use `Ordering::Relaxed`: each is independent and monotonic,
//! and [`Stats::snapshot`] may observe counters slightly out of step with each
//! other. That is fine for telemetry and for tests, which only read a snapshot
//! after the operations under test have completed.
//!
//! The counters that matter most are the bulk ones: they tell a host (and the
//! test suite) which bulk path actually ran.
//!
//! ```
//! use stateplug_store::Stats;
//!
//! let stats = Stats::new();
//! stats.record_batched();
//! stats.record_fallback();
//!
//! let snapshot = stats.snapshot();
//! assert_eq!(snapshot.batched_statements, 1);
//! assert_eq!(snapshot.fallbacks, 1);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

/// Operation kinds counted by [`Stats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Single get.
    Get,
    /// Single set.
    Set,
    /// Single delete.
    Delete,
    /// Bulk get.
    BulkGet,
    /// Bulk set.
    BulkSet,
    /// Bulk delete.
    BulkDelete,
    /// Query.
    Query,
}

/// Relaxed atomic counters for one adapter instance.
#[derive(Debug, Default)]
pub struct Stats {
    gets: AtomicU64,
    sets: AtomicU64,
    deletes: AtomicU64,
    bulk_gets: AtomicU64,
    bulk_sets: AtomicU64,
    bulk_deletes: AtomicU64,
    queries: AtomicU64,
    errors: AtomicU64,
    batched_statements: AtomicU64,
    per_item_runs: AtomicU64,
    fallbacks: AtomicU64,
    skipped_rows: AtomicU64,
}

impl Stats {
    /// Creates zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one top-level operation.
    pub fn record(&self, op: Operation) {
        let counter = match op {
            Operation::Get => &self.gets,
            Operation::Set => &self.sets,
            Operation::Delete => &self.deletes,
            Operation::BulkGet => &self.bulk_gets,
            Operation::BulkSet => &self.bulk_sets,
            Operation::BulkDelete => &self.bulk_deletes,
            Operation::Query => &self.queries,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts one operation that returned an error.
    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts one batched statement that succeeded.
    pub fn record_batched(&self) {
        self.batched_statements.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts one bulk request served by the per-item path.
    pub fn record_per_item(&self) {
        self.per_item_runs.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts one batched statement that failed and fell back.
    pub fn record_fallback(&self) {
        self.fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts rows skipped because they could not be decoded.
    pub fn record_skipped_rows(&self, count: u64) {
        if count > 0 {
            self.skipped_rows.fetch_add(count, Ordering::Relaxed);
        }
    }

    /// Reads every counter.
    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            gets: self.gets.load(Ordering::Relaxed),
            sets: self.sets.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
            bulk_gets: self.bulk_gets.load(Ordering::Relaxed),
            bulk_sets: self.bulk_sets.load(Ordering::Relaxed),
            bulk_deletes: self.bulk_deletes.load(Ordering::Relaxed),
            queries: self.queries.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            batched_statements: self.batched_statements.load(Ordering::Relaxed),
            per_item_runs: self.per_item_runs.load(Ordering::Relaxed),
            fallbacks: self.fallbacks.load(Ordering::Relaxed),
            skipped_rows: self.skipped_rows.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`Stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Single gets.
    pub gets: u64,
    /// Single sets.
    pub sets: u64,
    /// Single deletes.
    pub deletes: u64,
    /// Bulk gets.
    pub bulk_gets: u64,
    /// Bulk sets.
    pub bulk_sets: u64,
    /// Bulk deletes.
    pub bulk_deletes: u64,
    /// Queries.
    pub queries: u64,
    /// Operations that returned an error.
    pub errors: u64,
    /// Batched statements that succeeded.
    pub batched_statements: u64,
    /// Bulk requests served item by item, including fallbacks.
    pub per_item_runs: u64,
    /// Batched statements that failed and fell back to the per-item path.
    pub fallbacks: u64,
    /// Result rows skipped during decoding.
    pub skipped_rows: u64,
}

impl StatsSnapshot {
    /// Total top-level operations.
    #[must_use]
    pub fn total_operations(&self) -> u64 {
        self.gets
            + self.sets
            + self.deletes
            + self.bulk_gets
            + self.bulk_sets
            + self.bulk_deletes
            + self.queries
    }
}
