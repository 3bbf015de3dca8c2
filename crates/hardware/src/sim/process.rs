//! Process descriptor.
//!
//! A `Process` bundles what the translation layer needs from one simulated
//! process: its pid, its region registers, its page-table collaborator, and the
//! private memory bank that backs its TLB translations.

use std::fmt;

use crate::common::{MemError, Result, VirtAddr};
use crate::core::units::mmu::ptw::VirtualMemory;
use crate::core::units::mmu::tlb::Pid;
use crate::soc::MemPhy;

/// One simulated process as seen by the `Mmu`.
pub struct Process {
    pid: Pid,
    /// Region registers: base address of each allocated region.
    regs: Vec<Option<VirtAddr>>,
    mm: Box<dyn VirtualMemory>,
    tlb_mem: MemPhy,
}

impl Process {
    /// Creates a process with `regions` empty region registers.
    pub fn new(pid: Pid, regions: usize, mm: Box<dyn VirtualMemory>, tlb_mem: MemPhy) -> Self {
        Self {
            pid,
            regs: vec![None; regions],
            mm,
            tlb_mem,
        }
    }

    /// Returns the process identifier.
    pub const fn pid(&self) -> Pid {
        self.pid
    }

    /// Returns the number of region registers.
    pub fn region_count(&self) -> usize {
        self.regs.len()
    }

    /// Fails with `InvalidRegion` if `region` is not a register index.
    ///
    /// # Errors
    ///
    /// Returns `MemError::InvalidRegion` for out-of-range indices.
    pub fn check_region(&self, region: usize) -> Result<()> {
        if region < self.regs.len() {
            Ok(())
        } else {
            Err(MemError::InvalidRegion(region))
        }
    }

    /// Returns the base address held in `region`.
    ///
    /// # Errors
    ///
    /// Returns `MemError::InvalidRegion` for out-of-range indices and
    /// `MemError::RegionNotAllocated` for empty registers.
    pub fn region_base(&self, region: usize) -> Result<VirtAddr> {
        self.regs
            .get(region)
            .ok_or(MemError::InvalidRegion(region))?
            .ok_or(MemError::RegionNotAllocated(region))
    }

    /// Stores a region base address.
    pub(crate) fn set_region(&mut self, region: usize, base: VirtAddr) {
        if let Some(reg) = self.regs.get_mut(region) {
            *reg = Some(base);
        }
    }

    /// Clears a region register.
    pub(crate) fn clear_region(&mut self, region: usize) {
        if let Some(reg) = self.regs.get_mut(region) {
            *reg = None;
        }
    }

    /// Returns the page-table collaborator.
    pub fn mm(&self) -> &dyn VirtualMemory {
        self.mm.as_ref()
    }

    /// Returns the page-table collaborator mutably.
    pub fn mm_mut(&mut self) -> &mut dyn VirtualMemory {
        self.mm.as_mut()
    }

    /// Returns the TLB-backed memory bank.
    pub const fn tlb_memory(&self) -> &MemPhy {
        &self.tlb_mem
    }

    /// Returns the TLB-backed memory bank mutably.
    pub const fn tlb_memory_mut(&mut self) -> &mut MemPhy {
        &mut self.tlb_mem
    }
}

impl fmt::Debug for Process {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Process")
            .field("pid", &self.pid)
            .field("regs", &self.regs)
            .field("tlb_mem", &self.tlb_mem)
            .finish_non_exhaustive()
    }
}
