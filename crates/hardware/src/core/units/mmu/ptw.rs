//! Page table walker interface.
//!
//! The translation layer does not walk page tables itself. On a TLB miss it hands
//! the access to a `VirtualMemory` implementation, which owns the process page
//! directory, allocates frames, and services faults. This module defines that
//! seam together with the page table entry format both sides agree on.

use std::fmt;
use std::ops::RangeInclusive;

use crate::common::constants::{PTE_FPN_MASK, PTE_PRESENT_BIT};
use crate::common::{Result, VirtAddr};

/// A raw 32-bit page directory entry.
///
/// Bit 31 is the present bit; the low bits hold the physical frame number.
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct PageTableEntry(u32);

impl PageTableEntry {
    /// An entry with the present bit cleared.
    pub const INVALID: Self = Self(0);

    /// Creates a present entry that maps to frame `fpn`.
    pub const fn present(fpn: u32) -> Self {
        Self(PTE_PRESENT_BIT | (fpn & PTE_FPN_MASK))
    }

    /// Creates an entry from its raw encoding.
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the underlying raw value.
    pub const fn raw(&self) -> u32 {
        self.0
    }

    /// Returns true if the present (valid) bit is set.
    pub const fn is_present(&self) -> bool {
        self.0 & PTE_PRESENT_BIT != 0
    }

    /// Returns the frame number field regardless of validity.
    pub const fn fpn(&self) -> u64 {
        (self.0 & PTE_FPN_MASK) as u64
    }

    /// Returns the frame number if the entry is present.
    pub const fn frame(&self) -> Option<u64> {
        if self.is_present() {
            Some(self.fpn())
        } else {
            None
        }
    }
}

impl fmt::Debug for PageTableEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageTableEntry")
            .field("present", &self.is_present())
            .field("fpn", &self.fpn())
            .finish()
    }
}

/// A contiguous virtual region returned by the allocator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Region {
    /// First byte of the region.
    pub base: VirtAddr,
    /// Length in bytes.
    pub size: usize,
}

impl Region {
    /// Returns the virtual page numbers spanned by the region.
    ///
    /// An empty region still covers the page holding its base address.
    pub fn pages(&self) -> RangeInclusive<u64> {
        let first = self.base.page_number();
        let last_byte = self.base.val() + (self.size.max(1) as u64 - 1);
        first..=VirtAddr::new(last_byte).page_number()
    }
}

/// The page-table and frame-allocation subsystem of one process.
///
/// Implementations perform the full page-table walk (including fault handling)
/// for every access routed to them, and expose the page directory for direct
/// inspection. `vmaid` selects the virtual memory area; the translation layer
/// always uses area 0.
pub trait VirtualMemory: Send {
    /// Allocates `size` bytes and records the region under `region`.
    ///
    /// # Errors
    ///
    /// Returns `MemError::AllocationFailed` (or another collaborator error) if
    /// the request cannot be satisfied.
    fn alloc_region(&mut self, vmaid: usize, region: usize, size: usize) -> Result<VirtAddr>;

    /// Frees the region recorded under `region` and returns what it spanned.
    ///
    /// # Errors
    ///
    /// Returns `MemError::RegionNotAllocated` if nothing is recorded there.
    fn free_region(&mut self, vmaid: usize, region: usize) -> Result<Region>;

    /// Reads the byte at `offset` within `region` through the page table.
    ///
    /// # Errors
    ///
    /// Propagates region, fault, and device errors.
    fn read_byte(&mut self, vmaid: usize, region: usize, offset: u64) -> Result<u8>;

    /// Writes the byte at `offset` within `region` through the page table.
    ///
    /// # Errors
    ///
    /// Propagates region, fault, and device errors.
    fn write_byte(&mut self, vmaid: usize, region: usize, offset: u64, val: u8) -> Result<()>;

    /// Returns the page directory entry for `vpn`, or [`PageTableEntry::INVALID`]
    /// for pages outside the directory.
    fn page_entry(&self, vpn: u64) -> PageTableEntry;
}
