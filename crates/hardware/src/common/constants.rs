//! Global System Constants.
//!
//! This module defines the paging constants shared by the translation layer and
//! the page-table collaborator. Both sides must agree on them:
//! 1. **Address Split:** Page shift, size, and offset mask.
//! 2. **Page Table Entries:** Present bit and frame number field.
//! 3. **Process Layout:** Region register count and default sizes.

/// Number of bits to shift to convert between bytes and pages.
pub const PAGE_SHIFT: u64 = 12;

/// Page size in bytes (4KB).
pub const PAGE_SIZE: u64 = 1 << PAGE_SHIFT;

/// Mask for extracting the page offset from an address.
pub const PAGE_OFFSET_MASK: u64 = PAGE_SIZE - 1;

/// Page table entry present (valid) bit.
pub const PTE_PRESENT_BIT: u32 = 1 << 31;

/// Mask for the frame number field of a page table entry (bits 0-12).
pub const PTE_FPN_MASK: u32 = 0x1FFF;

/// Number of region registers per process.
pub const REGION_COUNT: usize = 10;

/// Virtual memory area used by every translation-layer operation.
pub const DEFAULT_VMAID: usize = 0;
