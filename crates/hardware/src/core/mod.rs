//! Core processor implementation.
//!
//! This module contains the parts of the CPU that sit between a process and
//! physical memory: the memory management unit, its TLB, and the page-table
//! collaborator interface.

/// Execution units (MMU).
pub mod units;

pub use self::units::mmu::Mmu;
