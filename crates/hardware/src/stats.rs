//! Translation statistics collection and reporting.
//!
//! This module tracks TLB performance metrics for the simulator. It provides:
//! 1. **Hit/Miss Counts:** Split by read and write accesses.
//! 2. **Refill Health:** Refills dropped because the table was full.
//! 3. **Consistency:** Entries invalidated or corrected by a resync.
//!
//! Counters are atomics so every execution context can update them through a
//! shared handle without taking the TLB lock.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::common::AccessType;

/// Live translation counters shared by all clones of an `Mmu`.
#[derive(Debug, Default)]
pub struct TlbStats {
    read_hits: AtomicU64,
    read_misses: AtomicU64,
    write_hits: AtomicU64,
    write_misses: AtomicU64,
    refills_dropped: AtomicU64,
    resync_changes: AtomicU64,
}

impl TlbStats {
    /// Records a cache hit for `access`.
    pub fn record_hit(&self, access: AccessType) {
        let counter = match access {
            AccessType::Read => &self.read_hits,
            AccessType::Write => &self.write_hits,
        };
        let _ = counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a cache miss for `access`.
    pub fn record_miss(&self, access: AccessType) {
        let counter = match access {
            AccessType::Read => &self.read_misses,
            AccessType::Write => &self.write_misses,
        };
        let _ = counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a refill that was dropped because the table was full.
    pub fn record_dropped_refill(&self) {
        let _ = self.refills_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Records `n` entries changed by a resync.
    pub fn record_resync(&self, n: u64) {
        let _ = self.resync_changes.fetch_add(n, Ordering::Relaxed);
    }

    /// Returns a consistent-enough copy of the counters.
    pub fn snapshot(&self) -> TlbStatsSnapshot {
        TlbStatsSnapshot {
            read_hits: self.read_hits.load(Ordering::Relaxed),
            read_misses: self.read_misses.load(Ordering::Relaxed),
            write_hits: self.write_hits.load(Ordering::Relaxed),
            write_misses: self.write_misses.load(Ordering::Relaxed),
            refills_dropped: self.refills_dropped.load(Ordering::Relaxed),
            resync_changes: self.resync_changes.load(Ordering::Relaxed),
        }
    }
}

/// Plain copy of [`TlbStats`] at one point in time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TlbStatsSnapshot {
    /// Reads served from the TLB-backed device.
    pub read_hits: u64,
    /// Reads that went through the page-table collaborator.
    pub read_misses: u64,
    /// Writes whose frame came from the TLB.
    pub write_hits: u64,
    /// Writes whose frame came from the page directory.
    pub write_misses: u64,
    /// Refills dropped because the table was full.
    pub refills_dropped: u64,
    /// Entries removed or corrected by `Mmu::resync`.
    pub resync_changes: u64,
}

impl TlbStatsSnapshot {
    /// Total hits across reads and writes.
    pub const fn hits(&self) -> u64 {
        self.read_hits + self.write_hits
    }

    /// Total misses across reads and writes.
    pub const fn misses(&self) -> u64 {
        self.read_misses + self.write_misses
    }

    /// Fraction of accesses that hit, in `[0, 1]`; zero when nothing was accessed.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits() + self.misses();
        if total == 0 {
            0.0
        } else {
            self.hits() as f64 / total as f64
        }
    }
}

impl fmt::Display for TlbStatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "==========================================================")?;
        writeln!(f, "TLB STATISTICS")?;
        writeln!(f, "==========================================================")?;
        hit_line(f, "read", self.read_hits, self.read_misses)?;
        hit_line(f, "write", self.write_hits, self.write_misses)?;
        hit_line(f, "total", self.hits(), self.misses())?;
        writeln!(f, "----------------------------------------------------------")?;
        writeln!(f, "  refills.dropped        {}", self.refills_dropped)?;
        writeln!(f, "  resync.changes         {}", self.resync_changes)?;
        write!(f, "==========================================================")
    }
}

/// Writes one `accesses | hits | hit_rate` row of the report.
fn hit_line(f: &mut fmt::Formatter<'_>, name: &str, hits: u64, misses: u64) -> fmt::Result {
    let total = hits + misses;
    let rate = if total > 0 {
        (hits as f64 / total as f64) * 100.0
    } else {
        0.0
    };
    writeln!(
        f,
        "  {name:<6} accesses: {total:<10} | hits: {hits:<10} | hit_rate: {rate:.2}%"
    )
}
