//! Simulation harness.
//!
//! Provides the process descriptor, a reference page-table collaborator, and a
//! `Machine` that wires main memory, the frame allocator, and the shared TLB
//! together from a `Config`.

/// Reference page directory and frame allocator.
pub mod pager;

/// Process descriptor used by the translation layer.
pub mod process;

use tracing::info;

use crate::common::Result;
use crate::config::Config;
use crate::core::units::mmu::Mmu;
use crate::core::units::mmu::tlb::Pid;
use crate::soc::MemPhy;
use crate::soc::memory::{self, SharedMemory};

use self::pager::{FrameAllocator, PagedMemory, SharedFrames};
use self::process::Process;

/// Shared state of one simulated machine.
///
/// Processes created by [`Machine::spawn`] share main memory, the frame
/// allocator, and the TLB; each owns its page directory and TLB backing store.
#[derive(Debug)]
pub struct Machine {
    config: Config,
    ram: SharedMemory,
    frames: SharedFrames,
    mmu: Mmu,
}

impl Machine {
    /// Builds a machine from a configuration.
    ///
    /// # Errors
    ///
    /// Returns `MemError::InvalidCapacity` if the configuration does not validate.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let ram = memory::shared(config.memory.ram_size)?;
        let frames = FrameAllocator::shared(config.memory.frames());
        let mmu = Mmu::from_config(&config)?;
        info!(
            ram = config.memory.ram_size,
            frames = config.memory.frames(),
            tlb_entries = config.tlb.max_entries,
            "machine ready"
        );
        Ok(Self {
            config,
            ram,
            frames,
            mmu,
        })
    }

    /// Creates a process with an empty address space.
    ///
    /// # Errors
    ///
    /// Returns `MemError::InvalidCapacity` if the TLB backing store cannot be sized.
    pub fn spawn(&self, pid: Pid) -> Result<Process> {
        let mm = PagedMemory::new(
            pid,
            self.config.memory.pages_per_process,
            self.config.memory.regions,
            self.ram.clone(),
            self.frames.clone(),
        );
        let tlb_mem = MemPhy::new(self.config.tlb_backing_size())?;
        Ok(Process::new(
            pid,
            self.config.memory.regions,
            Box::new(mm),
            tlb_mem,
        ))
    }

    /// Returns a translation layer handle; clone it per execution context.
    pub const fn mmu(&self) -> &Mmu {
        &self.mmu
    }

    /// Returns the shared main memory.
    pub const fn ram(&self) -> &SharedMemory {
        &self.ram
    }

    /// Returns the shared frame allocator.
    pub const fn frames(&self) -> &SharedFrames {
        &self.frames
    }

    /// Returns the configuration the machine was built from.
    pub const fn config(&self) -> &Config {
        &self.config
    }
}
