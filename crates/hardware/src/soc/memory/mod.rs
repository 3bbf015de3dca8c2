//! Physical System Memory.
//!
//! This module implements the physical storage devices. It provides:
//! 1. **Buffer:** `MemPhy`, a bounds-checked byte bank used for RAM and TLB storage.
//! 2. **Sharing:** A lock-protected handle for main memory shared across processes.

/// Bounds-checked byte storage with diagnostic dumps.
pub mod buffer;

use std::sync::{Arc, Mutex};

pub use self::buffer::{Dump, DumpReport, MemPhy};
use crate::common::Result;

/// Main memory shared between every process of a simulation.
///
/// Each process keeps its own TLB-backed `MemPhy`; only main memory is shared.
pub type SharedMemory = Arc<Mutex<MemPhy>>;

/// Allocates a zeroed main memory of `capacity` bytes behind a shared handle.
///
/// # Errors
///
/// Returns `MemError::InvalidCapacity` when `capacity` is zero.
pub fn shared(capacity: usize) -> Result<SharedMemory> {
    Ok(Arc::new(Mutex::new(MemPhy::new(capacity)?)))
}
