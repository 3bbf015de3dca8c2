//! Translation Lookaside Buffer (TLB).
//!
//! A shared, lock-protected cache of page translations for every process in the
//! simulation. It stores the mapping between `(pid, VPN)` and the physical frame
//! number last resolved for that page.
//!
//! Entries are indexed by a hash of the key, so lookups and removals do not scan
//! the table. The table is bounded: once `capacity` distinct keys are live, new
//! keys are rejected until something is removed or flushed.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::common::{MemError, Result};

/// Process identifier.
pub type Pid = u32;

/// Key of a TLB entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
struct TlbKey {
    pid: Pid,
    vpn: u64,
}

/// A single translation, as reported by [`TlbCache::entries`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct TlbEntry {
    /// Owning process.
    pub pid: Pid,
    /// Virtual Page Number (Tag).
    pub vpn: u64,
    /// Physical Frame Number (Data).
    pub fpn: u64,
}

/// Translation Lookaside Buffer shared by all execution contexts.
///
/// Every operation holds the table lock for its whole duration and releases it
/// before returning, so operations are atomic with respect to each other. A
/// lookup followed by a separate insert is not.
pub struct TlbCache {
    entries: Mutex<HashMap<TlbKey, u64>>,
    capacity: usize,
}

impl TlbCache {
    /// Creates an empty TLB that holds at most `capacity` entries.
    ///
    /// # Errors
    ///
    /// Returns `MemError::InvalidCapacity` when `capacity` is zero.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(MemError::InvalidCapacity);
        }
        Ok(Self {
            entries: Mutex::new(HashMap::new()),
            capacity,
        })
    }

    /// Acquires the table lock.
    ///
    /// A poisoned lock is recovered: each operation leaves the map in a
    /// consistent state before it can panic.
    fn table(&self) -> MutexGuard<'_, HashMap<TlbKey, u64>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Inserts a translation, overwriting any existing entry for the same key.
    ///
    /// # Errors
    ///
    /// Returns `MemError::CapacityExceeded` if the key is new and the table is
    /// full. The table is left unchanged in that case.
    pub fn insert(&self, pid: Pid, vpn: u64, fpn: u64) -> Result<()> {
        let key = TlbKey { pid, vpn };
        let mut table = self.table();
        if let Some(slot) = table.get_mut(&key) {
            *slot = fpn;
            return Ok(());
        }
        if table.len() >= self.capacity {
            return Err(MemError::CapacityExceeded {
                capacity: self.capacity,
            });
        }
        let _ = table.insert(key, fpn);
        drop(table);
        debug!(target: "tlb", pid, vpn, fpn, "insert");
        Ok(())
    }

    /// Overwrites the frame number of an existing entry.
    ///
    /// Returns `false` and leaves the table untouched when no entry exists.
    pub fn update(&self, pid: Pid, vpn: u64, fpn: u64) -> bool {
        match self.table().get_mut(&TlbKey { pid, vpn }) {
            Some(slot) => {
                *slot = fpn;
                true
            }
            None => false,
        }
    }

    /// Looks up the frame number cached for `(pid, vpn)`.
    ///
    /// # Returns
    ///
    /// `Some(fpn)` if found, otherwise `None`.
    #[inline]
    pub fn lookup(&self, pid: Pid, vpn: u64) -> Option<u64> {
        self.table().get(&TlbKey { pid, vpn }).copied()
    }

    /// Removes the entry for `(pid, vpn)`, returning its frame number if present.
    pub fn remove(&self, pid: Pid, vpn: u64) -> Option<u64> {
        let removed = self.table().remove(&TlbKey { pid, vpn });
        if removed.is_some() {
            debug!(target: "tlb", pid, vpn, "remove");
        }
        removed
    }

    /// Drops every entry owned by `pid` and returns how many were dropped.
    pub fn flush_process(&self, pid: Pid) -> usize {
        let mut table = self.table();
        let before = table.len();
        table.retain(|key, _| key.pid != pid);
        before - table.len()
    }

    /// Drops every entry.
    pub fn flush(&self) {
        self.table().clear();
    }

    /// Returns the number of live entries.
    pub fn len(&self) -> usize {
        self.table().len()
    }

    /// Returns `true` if no entries are live.
    pub fn is_empty(&self) -> bool {
        self.table().is_empty()
    }

    /// Returns the maximum number of entries.
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns a snapshot of the live entries owned by `pid`, sorted by VPN.
    pub fn entries_of(&self, pid: Pid) -> Vec<TlbEntry> {
        let mut out: Vec<TlbEntry> = self
            .table()
            .iter()
            .filter(|(key, _)| key.pid == pid)
            .map(|(key, &fpn)| TlbEntry {
                pid: key.pid,
                vpn: key.vpn,
                fpn,
            })
            .collect();
        out.sort_unstable();
        out
    }

    /// Returns a snapshot of all live entries sorted by `(pid, vpn)`.
    pub fn entries(&self) -> TlbSnapshot {
        let mut out: Vec<TlbEntry> = self
            .table()
            .iter()
            .map(|(key, &fpn)| TlbEntry {
                pid: key.pid,
                vpn: key.vpn,
                fpn,
            })
            .collect();
        out.sort_unstable();
        TlbSnapshot(out)
    }
}

impl fmt::Debug for TlbCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlbCache")
            .field("len", &self.len())
            .field("capacity", &self.capacity)
            .finish()
    }
}

/// Point-in-time copy of the TLB table, for diagnostics.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TlbSnapshot(pub Vec<TlbEntry>);

impl TlbSnapshot {
    /// Returns the number of entries in the snapshot.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the snapshot is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over the entries in `(pid, vpn)` order.
    pub fn iter(&self) -> std::slice::Iter<'_, TlbEntry> {
        self.0.iter()
    }
}

impl fmt::Display for TlbSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for e in &self.0 {
            writeln!(f, "pid = {}, vpn = {:08x}, fpn = {:08x}", e.pid, e.vpn, e.fpn)?;
        }
        Ok(())
    }
}
