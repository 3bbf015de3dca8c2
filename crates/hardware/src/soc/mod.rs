//! System-on-Chip (SoC) Components.
//!
//! This module organizes the physical storage devices of the simulated system.

/// Physical memory devices.
pub mod memory;

pub use memory::MemPhy;
