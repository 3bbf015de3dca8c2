//! Configuration system for the TLB simulator.
//!
//! This module defines all configuration structures used to parameterize the
//! simulator. It provides:
//! 1. **Defaults:** Baseline sizes for main memory, the TLB table, and its backing store.
//! 2. **Structures:** Hierarchical config for general, memory, and TLB settings.
//! 3. **Validation:** Rejection of sizes the paging layout cannot represent.
//!
//! Configuration is deserialized from JSON by the CLI; use `Config::default()` otherwise.

use serde::Deserialize;
use thiserror::Error;

use crate::common::constants::{PAGE_SIZE, PTE_FPN_MASK, REGION_COUNT};
use crate::common::{MemError, Result};

/// Default configuration constants for the simulator.
mod defaults {
    /// Total size of main memory (1 MiB, 256 frames).
    pub const RAM_SIZE: usize = 1024 * 1024;

    /// Maximum number of TLB entries across all processes.
    pub const TLB_MAX_ENTRIES: usize = 0x10000;

    /// Virtual pages per process page directory.
    pub const PAGES_PER_PROCESS: usize = 1024;
}

/// Errors from loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The text is not valid JSON for `Config`.
    #[error("malformed configuration: {0}")]
    Parse(#[from] serde_json::Error),

    /// The configuration parsed but describes an unusable machine.
    #[error("invalid configuration: {0}")]
    Invalid(#[from] MemError),
}

/// Root configuration structure.
///
/// # Examples
///
/// ```
/// use tlbsim_core::config::Config;
///
/// let json = r#"{ "tlb": { "max_entries": 64 } }"#;
/// let config: Config = serde_json::from_str(json).unwrap();
/// assert_eq!(config.tlb.max_entries, 64);
/// assert_eq!(config.memory.ram_size, 1024 * 1024);
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// General simulation settings
    #[serde(default)]
    pub general: GeneralConfig,

    /// Main memory and process layout
    #[serde(default)]
    pub memory: MemoryConfig,

    /// TLB table and backing store
    #[serde(default)]
    pub tlb: TlbConfig,
}

impl Config {
    /// Checks that every size is usable.
    ///
    /// # Errors
    ///
    /// Returns `MemError::InvalidCapacity` for zero sizes, a RAM size that is
    /// not a whole number of pages, or more frames than a page table entry
    /// can address.
    pub fn validate(&self) -> Result<()> {
        let page = PAGE_SIZE as usize;
        let max_frames = PTE_FPN_MASK as usize + 1;
        if self.memory.ram_size == 0
            || self.memory.ram_size % page != 0
            || self.memory.ram_size / page > max_frames
            || self.memory.regions == 0
            || self.memory.pages_per_process == 0
            || self.tlb.max_entries == 0
            || self.tlb_backing_size() == 0
        {
            return Err(MemError::InvalidCapacity);
        }
        Ok(())
    }

    /// Returns the per-process TLB backing store size.
    ///
    /// Frames index the backing store the same way they index main memory, so
    /// the default matches the RAM size; anything smaller makes high frames
    /// unreachable on the hit path.
    pub fn tlb_backing_size(&self) -> usize {
        self.tlb.backing_size.unwrap_or(self.memory.ram_size)
    }

    /// Parses and validates a JSON configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` for malformed JSON and
    /// `ConfigError::Invalid` when the parsed sizes do not validate.
    pub fn from_json(text: &str) -> std::result::Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }
}

/// General simulation parameters.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GeneralConfig {
    /// Emit TLB table and backing store dumps on every access (trace level)
    #[serde(default)]
    pub trace_dumps: bool,
}

/// Main memory and per-process layout.
#[derive(Debug, Clone, Deserialize)]
pub struct MemoryConfig {
    /// Main memory size in bytes
    #[serde(default = "MemoryConfig::default_ram_size")]
    pub ram_size: usize,

    /// Region registers per process
    #[serde(default = "MemoryConfig::default_regions")]
    pub regions: usize,

    /// Virtual pages in each process page directory
    #[serde(default = "MemoryConfig::default_pages_per_process")]
    pub pages_per_process: usize,
}

impl MemoryConfig {
    /// Returns the default main memory size in bytes.
    fn default_ram_size() -> usize {
        defaults::RAM_SIZE
    }

    /// Returns the default region register count.
    fn default_regions() -> usize {
        REGION_COUNT
    }

    /// Returns the default page directory size.
    fn default_pages_per_process() -> usize {
        defaults::PAGES_PER_PROCESS
    }

    /// Number of physical frames in main memory.
    pub const fn frames(&self) -> usize {
        self.ram_size / PAGE_SIZE as usize
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            ram_size: defaults::RAM_SIZE,
            regions: REGION_COUNT,
            pages_per_process: defaults::PAGES_PER_PROCESS,
        }
    }
}

/// TLB table and backing store configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct TlbConfig {
    /// Maximum live entries in the shared table
    #[serde(default = "TlbConfig::default_max_entries")]
    pub max_entries: usize,

    /// Per-process TLB backing store size in bytes (defaults to the RAM size)
    #[serde(default)]
    pub backing_size: Option<usize>,
}

impl TlbConfig {
    /// Returns the default TLB entry count.
    fn default_max_entries() -> usize {
        defaults::TLB_MAX_ENTRIES
    }
}

impl Default for TlbConfig {
    fn default() -> Self {
        Self {
            max_entries: defaults::TLB_MAX_ENTRIES,
            backing_size: None,
        }
    }
}
