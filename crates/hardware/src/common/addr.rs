//! Physical and Virtual Address types.
//!
//! This module defines strong types for physical and virtual addresses to prevent
//! accidental mixing of address spaces. It provides the following:
//! 1. **Type Safety:** Distinguishes between virtual and physical address spaces at compile time.
//! 2. **Address Decomposition:** Splits a virtual address into page number and offset.
//! 3. **Address Composition:** Joins a frame number and offset into a physical address.

use super::constants::{PAGE_OFFSET_MASK, PAGE_SHIFT};
use super::error::MemError;

/// A virtual address in a process address space.
///
/// Virtual addresses are produced by region registers plus an offset and must be
/// translated through the TLB or the page directory before touching a device.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VirtAddr(pub u64);

/// A physical address on a storage device.
///
/// Physical addresses are byte offsets into a `MemPhy` device.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PhysAddr(pub u64);

impl VirtAddr {
    /// Creates a new virtual address from a raw 64-bit value.
    #[inline(always)]
    pub const fn new(addr: u64) -> Self {
        Self(addr)
    }

    /// Returns the raw 64-bit address value.
    #[inline(always)]
    pub const fn val(&self) -> u64 {
        self.0
    }

    /// Extracts the virtual page number (the high-order bits).
    #[inline(always)]
    pub const fn page_number(&self) -> u64 {
        self.0 >> PAGE_SHIFT
    }

    /// Extracts the page offset from the virtual address.
    ///
    /// The page offset is the lower `PAGE_SHIFT` bits of the address, representing
    /// the byte offset within a page.
    #[inline(always)]
    pub const fn page_offset(&self) -> u64 {
        self.0 & PAGE_OFFSET_MASK
    }

    /// Adds a byte offset to the address.
    ///
    /// # Errors
    ///
    /// Returns `MemError::AddressOverflow` if the sum overflows the address space.
    pub fn offset(self, offset: u64) -> Result<Self, MemError> {
        self.0
            .checked_add(offset)
            .map(Self)
            .ok_or(MemError::AddressOverflow { base: self.0, offset })
    }

    /// Returns the address of the first byte of page `vpn`.
    #[inline(always)]
    pub const fn from_page(vpn: u64) -> Self {
        Self(vpn << PAGE_SHIFT)
    }
}

impl PhysAddr {
    /// Creates a new physical address from a raw 64-bit value.
    #[inline(always)]
    pub const fn new(addr: u64) -> Self {
        Self(addr)
    }

    /// Returns the raw 64-bit address value.
    #[inline(always)]
    pub const fn val(&self) -> u64 {
        self.0
    }

    /// Builds a physical address from a frame number and an in-page offset.
    ///
    /// Uses the same bit split as [`VirtAddr::page_number`] so a frame maps to a
    /// page one to one. Offsets wider than a page are masked.
    #[inline(always)]
    pub const fn from_frame(fpn: u64, offset: u64) -> Self {
        Self((fpn << PAGE_SHIFT) | (offset & PAGE_OFFSET_MASK))
    }

    /// Returns the frame number that contains this address.
    #[inline(always)]
    pub const fn frame_number(&self) -> u64 {
        self.0 >> PAGE_SHIFT
    }
}

impl TryFrom<i64> for PhysAddr {
    type Error = MemError;

    /// Converts a signed device address, rejecting negative values.
    fn try_from(addr: i64) -> Result<Self, Self::Error> {
        u64::try_from(addr)
            .map(Self)
            .map_err(|_| MemError::InvalidAddress(addr))
    }
}

impl TryFrom<i64> for VirtAddr {
    type Error = MemError;

    fn try_from(addr: i64) -> Result<Self, Self::Error> {
        u64::try_from(addr)
            .map(Self)
            .map_err(|_| MemError::InvalidAddress(addr))
    }
}
