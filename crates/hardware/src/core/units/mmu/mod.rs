//! Memory Management Unit (MMU).
//!
//! This module implements the CPU translation layer: the four process-facing
//! memory operations (allocate, free, read, write). Every access first consults
//! the shared TLB; on a hit it addresses the process's TLB-backed memory bank
//! directly, on a miss it hands the access to the page-table collaborator and
//! refills the TLB from the page directory.
//!
//! The TLB lock is never held across a collaborator call. A miss and its refill
//! are two separate critical sections, so a concurrent context may change the
//! same key in between; the later refill wins.

/// Page table walker interface and page table entry format.
pub mod ptw;

/// Translation Lookaside Buffer (TLB) for caching page translations.
pub mod tlb;

use std::sync::Arc;

use tracing::{Level, debug, trace, warn};

use crate::common::constants::DEFAULT_VMAID;
use crate::common::{AccessType, PhysAddr, Result, VirtAddr};
use crate::config::Config;
use crate::sim::process::Process;
use crate::stats::{TlbStats, TlbStatsSnapshot};

use self::ptw::Region;
use self::tlb::{Pid, TlbCache};

/// CPU translation layer.
///
/// Cloning an `Mmu` is cheap and shares the TLB and statistics; give each
/// execution context its own clone.
#[derive(Clone, Debug)]
pub struct Mmu {
    tlb: Arc<TlbCache>,
    stats: Arc<TlbStats>,
    trace_dumps: bool,
}

impl Mmu {
    /// Creates a translation layer over a fresh TLB of `tlb_capacity` entries.
    ///
    /// # Errors
    ///
    /// Returns `MemError::InvalidCapacity` when `tlb_capacity` is zero.
    pub fn new(tlb_capacity: usize) -> Result<Self> {
        Ok(Self::with_cache(Arc::new(TlbCache::new(tlb_capacity)?)))
    }

    /// Creates a translation layer from the `tlb` and `general` config sections.
    ///
    /// # Errors
    ///
    /// Returns `MemError::InvalidCapacity` when `tlb.max_entries` is zero.
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut mmu = Self::new(config.tlb.max_entries)?;
        mmu.trace_dumps = config.general.trace_dumps;
        Ok(mmu)
    }

    /// Creates a translation layer over an existing TLB.
    pub fn with_cache(tlb: Arc<TlbCache>) -> Self {
        Self {
            tlb,
            stats: Arc::new(TlbStats::default()),
            trace_dumps: false,
        }
    }

    /// Returns the shared TLB.
    pub const fn tlb(&self) -> &Arc<TlbCache> {
        &self.tlb
    }

    /// Returns a snapshot of the hit/miss counters.
    pub fn stats(&self) -> TlbStatsSnapshot {
        self.stats.snapshot()
    }

    /// Allocates `size` bytes into `region` of `proc`.
    ///
    /// On success the base address is stored in the region register, the
    /// bank pages backing the region are zeroed, and the first page of the
    /// region is entered into the TLB.
    ///
    /// # Errors
    ///
    /// Propagates the collaborator's error unchanged; the TLB is untouched then.
    pub fn alloc(&self, proc: &mut Process, size: usize, region: usize) -> Result<VirtAddr> {
        proc.check_region(region)?;
        let base = proc.mm_mut().alloc_region(DEFAULT_VMAID, region, size)?;
        proc.set_region(region, base);

        for page in (Region { base, size }).pages() {
            if let Some(fpn) = proc.mm().page_entry(page).frame() {
                proc.tlb_memory_mut().clear_frame(fpn);
            }
        }

        let vpn = base.page_number();
        match proc.mm().page_entry(vpn).frame() {
            Some(fpn) => self.refill(proc.pid(), vpn, fpn),
            None => debug!(target: "tlb", pid = proc.pid(), vpn, "alloc left first page unmapped"),
        }
        Ok(base)
    }

    /// Frees `region` of `proc` and drops the TLB entries of every page it spanned.
    ///
    /// # Errors
    ///
    /// Propagates the collaborator's error (e.g. `RegionNotAllocated`); the TLB
    /// is untouched then.
    pub fn free(&self, proc: &mut Process, region: usize) -> Result<()> {
        proc.check_region(region)?;
        let freed = proc.mm_mut().free_region(DEFAULT_VMAID, region)?;
        proc.clear_region(region);
        for vpn in freed.pages() {
            let _ = self.tlb.remove(proc.pid(), vpn);
        }
        Ok(())
    }

    /// Reads the byte at `regs[region] + offset`.
    ///
    /// A hit is served from the TLB-backed bank without touching the
    /// collaborator. A miss reads through the collaborator, mirrors the byte
    /// into the bank, and refills the TLB.
    ///
    /// # Errors
    ///
    /// Returns register errors, bank `OutOfBounds` errors, and collaborator
    /// errors unchanged.
    pub fn read(&self, proc: &mut Process, region: usize, offset: u64) -> Result<u8> {
        let vaddr = proc.region_base(region)?.offset(offset)?;
        let vpn = vaddr.page_number();

        if let Some(fpn) = self.tlb.lookup(proc.pid(), vpn) {
            self.stats.record_hit(AccessType::Read);
            debug!(target: "tlb", "TLB hit at read region={region} offset={offset}");
            let val = proc
                .tlb_memory()
                .read(PhysAddr::from_frame(fpn, vaddr.page_offset()))?;
            self.trace_dump(proc);
            return Ok(val);
        }

        self.stats.record_miss(AccessType::Read);
        debug!(target: "tlb", "TLB miss at read region={region} offset={offset}");
        let val = proc.mm_mut().read_byte(DEFAULT_VMAID, region, offset)?;
        if let Some(fpn) = proc.mm().page_entry(vpn).frame() {
            proc.tlb_memory_mut()
                .write(PhysAddr::from_frame(fpn, vaddr.page_offset()), val)?;
            self.refill(proc.pid(), vpn, fpn);
        }
        self.trace_dump(proc);
        Ok(val)
    }

    /// Writes `val` at `regs[region] + offset`.
    ///
    /// The collaborator performs the authoritative write first. Only once it
    /// succeeds does the byte land in the TLB-backed bank, at the cached frame
    /// on a hit and at the page directory frame in every case. The TLB is then
    /// refreshed from the page directory, so an entry made stale by page-table
    /// activity is corrected by the next write.
    ///
    /// # Errors
    ///
    /// Returns register errors, collaborator errors, and bank `OutOfBounds`
    /// errors unchanged. A rejected collaborator write leaves the bank untouched.
    pub fn write(&self, proc: &mut Process, val: u8, region: usize, offset: u64) -> Result<()> {
        let vaddr = proc.region_base(region)?.offset(offset)?;
        let vpn = vaddr.page_number();
        let cached = self.tlb.lookup(proc.pid(), vpn);

        if cached.is_some() {
            self.stats.record_hit(AccessType::Write);
            debug!(target: "tlb", "TLB hit at write region={region} offset={offset} value={val}");
        } else {
            self.stats.record_miss(AccessType::Write);
            debug!(target: "tlb", "TLB miss at write region={region} offset={offset} value={val}");
        }

        proc.mm_mut()
            .write_byte(DEFAULT_VMAID, region, offset, val)?;

        if let Some(fpn) = cached {
            proc.tlb_memory_mut()
                .write(PhysAddr::from_frame(fpn, vaddr.page_offset()), val)?;
        }
        if let Some(fpn) = proc.mm().page_entry(vpn).frame() {
            if cached != Some(fpn) {
                proc.tlb_memory_mut()
                    .write(PhysAddr::from_frame(fpn, vaddr.page_offset()), val)?;
            }
            self.refill(proc.pid(), vpn, fpn);
        }
        self.trace_dump(proc);
        Ok(())
    }

    /// Re-validates every TLB entry of `proc` against its page directory.
    ///
    /// Entries for pages that are no longer present are removed; entries whose
    /// frame moved are updated. Returns the number of entries changed.
    pub fn resync(&self, proc: &Process) -> usize {
        let pid = proc.pid();
        let mut changed = 0;
        for entry in self.tlb.entries_of(pid) {
            let applied = match proc.mm().page_entry(entry.vpn).frame() {
                None => self.tlb.remove(pid, entry.vpn).is_some(),
                Some(fpn) if fpn != entry.fpn => self.tlb.update(pid, entry.vpn, fpn),
                Some(_) => false,
            };
            if applied {
                changed += 1;
            }
        }
        if changed > 0 {
            debug!(target: "tlb", pid, changed, "resync");
            self.stats.record_resync(changed as u64);
        }
        changed
    }

    /// Drops every TLB entry of `proc`, e.g. when the process exits.
    pub fn release(&self, proc: &Process) -> usize {
        self.tlb.flush_process(proc.pid())
    }

    /// Inserts or overwrites `(pid, vpn) -> fpn`.
    ///
    /// A full table only costs a future miss, so the refill is dropped.
    fn refill(&self, pid: Pid, vpn: u64, fpn: u64) {
        if let Err(err) = self.tlb.insert(pid, vpn, fpn) {
            self.stats.record_dropped_refill();
            warn!(target: "tlb", pid, vpn, fpn, %err, "refill dropped");
        }
    }

    /// Emits the table and the process bank on the trace channel.
    fn trace_dump(&self, proc: &Process) {
        if self.trace_dumps && tracing::enabled!(target: "tlb", Level::TRACE) {
            trace!(target: "tlb", "TLB table:\n{}", self.tlb.entries());
            trace!(target: "tlb", "{}", proc.tlb_memory().report());
        }
    }
}
