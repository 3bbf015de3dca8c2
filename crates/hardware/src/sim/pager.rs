//! Reference page-table collaborator.
//!
//! A small demand-free pager used to drive the translation layer end to end:
//! 1. **Frame Allocator:** A free list of physical frames shared by all processes.
//! 2. **Page Directory:** One flat directory per process, `vpn -> (fpn, present)`.
//! 3. **Region Table:** Page-aligned regions, frames assigned and zeroed eagerly on allocation.
//!
//! Every access goes through the page directory into the shared main memory.

use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;

use crate::common::constants::PAGE_SIZE;
use crate::common::{MemError, PhysAddr, Result, VirtAddr};
use crate::core::units::mmu::ptw::{PageTableEntry, Region, VirtualMemory};
use crate::core::units::mmu::tlb::Pid;
use crate::soc::memory::SharedMemory;

/// Free list of physical frames.
#[derive(Debug)]
pub struct FrameAllocator {
    free: Vec<u32>,
    total: usize,
}

/// Frame allocator shared between every process of a simulation.
pub type SharedFrames = Arc<Mutex<FrameAllocator>>;

impl FrameAllocator {
    /// Creates an allocator owning frames `0..total`.
    ///
    /// Frames are handed out lowest first.
    pub fn new(total: usize) -> Self {
        Self {
            free: (0..total as u32).rev().collect(),
            total,
        }
    }

    /// Creates an allocator behind a shared handle.
    pub fn shared(total: usize) -> SharedFrames {
        Arc::new(Mutex::new(Self::new(total)))
    }

    /// Takes one free frame.
    pub fn alloc(&mut self) -> Option<u32> {
        self.free.pop()
    }

    /// Returns a frame to the free list.
    pub fn release(&mut self, fpn: u32) {
        debug_assert!((fpn as usize) < self.total);
        self.free.push(fpn);
    }

    /// Number of frames still free.
    pub fn available(&self) -> usize {
        self.free.len()
    }

    /// Total number of frames managed.
    pub const fn total(&self) -> usize {
        self.total
    }
}

/// Page directory, region table, and frame assignment for one process.
///
/// Only virtual memory area 0 exists; the `vmaid` argument of the
/// [`VirtualMemory`] methods is accepted and ignored.
#[derive(Debug)]
pub struct PagedMemory {
    pid: Pid,
    ram: SharedMemory,
    frames: SharedFrames,
    pgd: Vec<PageTableEntry>,
    regions: Vec<Option<Region>>,
}

impl PagedMemory {
    /// Creates an empty address space of `pages` virtual pages and `regions` slots.
    pub fn new(
        pid: Pid,
        pages: usize,
        regions: usize,
        ram: SharedMemory,
        frames: SharedFrames,
    ) -> Self {
        Self {
            pid,
            ram,
            frames,
            pgd: vec![PageTableEntry::INVALID; pages],
            regions: vec![None; regions],
        }
    }

    /// Overwrites the directory entry for `vpn`.
    ///
    /// Lets a harness remap a page behind the TLB's back, as a swapper would.
    pub fn set_page_entry(&mut self, vpn: u64, pte: PageTableEntry) {
        if let Some(slot) = self.pgd.get_mut(vpn as usize) {
            *slot = pte;
        }
    }

    /// Returns the recorded region, if any.
    pub fn region(&self, region: usize) -> Option<Region> {
        self.regions.get(region).copied().flatten()
    }

    /// Finds the first run of `n` unmapped pages.
    fn find_free_run(&self, n: usize) -> Option<usize> {
        let mut run = 0;
        for (vpn, pte) in self.pgd.iter().enumerate() {
            if pte.is_present() {
                run = 0;
                continue;
            }
            run += 1;
            if run == n {
                return Some(vpn + 1 - n);
            }
        }
        None
    }

    /// Resolves `offset` within `region` to a physical address.
    fn translate(&self, region: usize, offset: u64) -> Result<PhysAddr> {
        let reg = self
            .regions
            .get(region)
            .ok_or(MemError::InvalidRegion(region))?
            .ok_or(MemError::RegionNotAllocated(region))?;
        let vaddr = reg.base.offset(offset)?;
        if offset >= reg.size as u64 {
            return Err(MemError::PageFault(vaddr.val()));
        }
        let fpn = self
            .page_entry(vaddr.page_number())
            .frame()
            .ok_or(MemError::PageFault(vaddr.val()))?;
        Ok(PhysAddr::from_frame(fpn, vaddr.page_offset()))
    }

    /// Unmaps `vpns` and returns their frames to the allocator.
    fn unmap(&mut self, vpns: impl IntoIterator<Item = u64>) {
        let mut frames = self.frames.lock().unwrap_or_else(PoisonError::into_inner);
        for vpn in vpns {
            if let Some(pte) = self.pgd.get_mut(vpn as usize) {
                if let Some(fpn) = pte.frame() {
                    frames.release(fpn as u32);
                }
                *pte = PageTableEntry::INVALID;
            }
        }
    }
}

impl VirtualMemory for PagedMemory {
    fn alloc_region(&mut self, _vmaid: usize, region: usize, size: usize) -> Result<VirtAddr> {
        match self.regions.get(region) {
            None => return Err(MemError::InvalidRegion(region)),
            Some(Some(_)) => return Err(MemError::AllocationFailed { size }),
            Some(None) => {}
        }
        let pages = size.max(1).div_ceil(PAGE_SIZE as usize);
        let first = self
            .find_free_run(pages)
            .ok_or(MemError::AllocationFailed { size })?;

        let mut frames = self.frames.lock().unwrap_or_else(PoisonError::into_inner);
        if frames.available() < pages {
            return Err(MemError::AllocationFailed { size });
        }
        let mut taken = Vec::with_capacity(pages);
        for vpn in first..first + pages {
            let Some(fpn) = frames.alloc() else {
                return Err(MemError::AllocationFailed { size });
            };
            self.pgd[vpn] = PageTableEntry::present(fpn);
            taken.push(fpn);
        }
        drop(frames);

        // Reused frames still hold the previous owner's bytes.
        let mut ram = self.ram.lock().unwrap_or_else(PoisonError::into_inner);
        for fpn in taken {
            ram.clear_frame(u64::from(fpn));
        }
        drop(ram);

        let base = VirtAddr::from_page(first as u64);
        self.regions[region] = Some(Region { base, size });
        debug!(pid = self.pid, region, size, base = base.val(), "alloc region");
        Ok(base)
    }

    fn free_region(&mut self, _vmaid: usize, region: usize) -> Result<Region> {
        let freed = self
            .regions
            .get_mut(region)
            .ok_or(MemError::InvalidRegion(region))?
            .take()
            .ok_or(MemError::RegionNotAllocated(region))?;
        self.unmap(freed.pages());
        debug!(pid = self.pid, region, "free region");
        Ok(freed)
    }

    fn read_byte(&mut self, _vmaid: usize, region: usize, offset: u64) -> Result<u8> {
        let paddr = self.translate(region, offset)?;
        self.ram
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .read(paddr)
    }

    fn write_byte(&mut self, _vmaid: usize, region: usize, offset: u64, val: u8) -> Result<()> {
        let paddr = self.translate(region, offset)?;
        self.ram
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .write(paddr, val)
    }

    fn page_entry(&self, vpn: u64) -> PageTableEntry {
        usize::try_from(vpn)
            .ok()
            .and_then(|i| self.pgd.get(i))
            .copied()
            .unwrap_or(PageTableEntry::INVALID)
    }
}

impl Drop for PagedMemory {
    /// Returns every mapped frame to the shared allocator.
    fn drop(&mut self) {
        let vpns = 0..self.pgd.len() as u64;
        self.unmap(vpns);
    }
}
