//! Execution units and functional components.
//!
//! This module contains the memory management unit, which owns the TLB and
//! the translation protocol.

/// Memory Management Unit with TLB and page table walker interface.
pub mod mmu;
