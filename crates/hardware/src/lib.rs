//! TLB and translation-layer simulator library.
//!
//! This crate emulates the translation lookaside buffer of a paged,
//! multi-process CPU with the following:
//! 1. **TLB:** A bounded, lock-protected `(pid, vpn) -> fpn` cache shared by every execution context.
//! 2. **Translation:** Allocate, free, read, and write operations that try the TLB before the page table.
//! 3. **Memory:** Bounds-checked physical banks for main memory and the TLB backing store.
//! 4. **Simulation:** Configuration, a reference pager, process descriptors, and statistics.

/// Common types and constants (addresses, paging split, access types, errors).
pub mod common;
/// Simulator configuration (defaults and hierarchical config structures).
pub mod config;
/// CPU core (MMU, TLB, page-table interface).
pub mod core;
/// Process descriptors, reference pager, and machine wiring.
pub mod sim;
/// Physical memory devices.
pub mod soc;
/// Translation statistics collection and reporting.
pub mod stats;

/// Crate-wide error type.
pub use crate::common::MemError;
/// Root configuration type; use `Config::default()` or deserialize from JSON.
pub use crate::config::Config;
/// CPU translation layer; clone one per execution context.
pub use crate::core::Mmu;
/// Shared TLB table.
pub use crate::core::units::mmu::tlb::TlbCache;
/// Machine wiring for a set of processes.
pub use crate::sim::Machine;
/// Process descriptor.
pub use crate::sim::process::Process;
/// Physical memory bank.
pub use crate::soc::MemPhy;
