//! Memory subsystem error definitions.
//!
//! This module defines the single error type shared by the TLB cache, the
//! physical storage devices, the translation layer, and the page-table
//! collaborator. It provides:
//! 1. **Cache Errors:** Capacity exhaustion of the TLB table.
//! 2. **Device Errors:** Out-of-bounds physical accesses and invalid capacities.
//! 3. **Collaborator Errors:** Region and allocation failures, propagated unchanged.
//! 4. **Address Errors:** Negative or overflowing address arithmetic.

use thiserror::Error;

/// Errors reported by the memory subsystem.
///
/// Lookups that find nothing are not errors; they return `None`.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum MemError {
    /// The TLB table already holds its maximum number of entries.
    #[error("TLB cache full ({capacity} entries)")]
    CapacityExceeded {
        /// Maximum number of entries the table can hold.
        capacity: usize,
    },

    /// A physical address fell outside `[0, size)` of a storage device.
    #[error("physical address {addr:#x} out of bounds (device size {size:#x})")]
    OutOfBounds {
        /// Offending address.
        addr: u64,
        /// Device capacity in bytes.
        size: usize,
    },

    /// A storage device or table was configured with zero capacity.
    #[error("capacity must be non-zero")]
    InvalidCapacity,

    /// The region register does not hold an allocated region.
    #[error("region {0} is not allocated")]
    RegionNotAllocated(usize),

    /// The region index is outside the process register file.
    #[error("region index {0} out of range")]
    InvalidRegion(usize),

    /// The allocator could not satisfy a request.
    #[error("allocation of {size} bytes failed")]
    AllocationFailed {
        /// Requested size in bytes.
        size: usize,
    },

    /// A signed address was negative.
    #[error("invalid address {0}")]
    InvalidAddress(i64),

    /// Adding an offset to a region base overflowed the address space.
    #[error("address {base:#x} + {offset:#x} overflows")]
    AddressOverflow {
        /// Region base address.
        base: u64,
        /// Byte offset added to the base.
        offset: u64,
    },

    /// The page-table collaborator found no valid mapping for the address.
    #[error("page fault at {0:#x}")]
    PageFault(u64),
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, MemError>;
