//! Common utilities and types used throughout the TLB simulator.
//!
//! This module provides fundamental building blocks that are shared across all components
//! of the simulator. It includes:
//! 1. **Address Types:** Strong types for virtual and physical addresses.
//! 2. **Constants:** Paging constants shared with the page-table collaborator.
//! 3. **Memory Access:** Definitions for categorizing memory operations (Read/Write).
//! 4. **Error Handling:** The crate-wide `MemError` type.

/// Address type definitions (physical and virtual addresses).
pub mod addr;

/// Paging constants used throughout the simulator.
pub mod constants;

/// Memory access type definitions.
pub mod data;

/// Error types.
pub mod error;

pub use addr::{PhysAddr, VirtAddr};
pub use constants::{PAGE_SHIFT, PAGE_SIZE};
pub use data::AccessType;
pub use error::{MemError, Result};
