//! Operation traces.
//!
//! A trace lists simulated processes and the memory operations each one
//! issues, in order. Traces are JSON:
//!
//! ```json
//! { "processes": [
//!     { "pid": 1, "ops": [
//!         { "op": "alloc", "region": 0, "size": 40 },
//!         { "op": "write", "region": 0, "offset": 10, "value": 65 },
//!         { "op": "read",  "region": 0, "offset": 10 },
//!         { "op": "free",  "region": 0 }
//!     ] }
//! ] }
//! ```

use std::fmt;

use serde::Deserialize;
use tlbsim_core::{Mmu, Process};

/// A complete trace file.
#[derive(Debug, Clone, Deserialize)]
pub struct Trace {
    /// Processes, each run on its own thread.
    pub processes: Vec<ProcessTrace>,
}

/// The operations issued by one process.
#[derive(Debug, Clone, Deserialize)]
pub struct ProcessTrace {
    /// Process identifier.
    pub pid: u32,
    /// Operations in program order.
    #[serde(default)]
    pub ops: Vec<Op>,
}

/// One translation-layer operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum Op {
    /// Allocate `size` bytes into a region register.
    Alloc {
        /// Region register index.
        region: usize,
        /// Size in bytes.
        size: usize,
    },
    /// Free the region held in a register.
    Free {
        /// Region register index.
        region: usize,
    },
    /// Read one byte at `regs[region] + offset`.
    Read {
        /// Region register index.
        region: usize,
        /// Byte offset from the region base.
        offset: u64,
    },
    /// Write one byte at `regs[region] + offset`.
    Write {
        /// Region register index.
        region: usize,
        /// Byte offset from the region base.
        offset: u64,
        /// Byte to store.
        value: u8,
    },
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Alloc { region, size } => write!(f, "alloc {size} -> r{region}"),
            Self::Free { region } => write!(f, "free r{region}"),
            Self::Read { region, offset } => write!(f, "read r{region}+{offset}"),
            Self::Write {
                region,
                offset,
                value,
            } => write!(f, "write {value:#04x} -> r{region}+{offset}"),
        }
    }
}

impl Trace {
    /// Parses a trace from JSON text.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error for malformed JSON or unknown operations.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// Applies one operation and renders its outcome as a log line.
pub fn apply(mmu: &Mmu, proc: &mut Process, op: Op) -> String {
    let outcome = match op {
        Op::Alloc { region, size } => mmu
            .alloc(proc, size, region)
            .map(|base| format!("base {:#x}", base.val())),
        Op::Free { region } => mmu.free(proc, region).map(|()| "ok".to_string()),
        Op::Read { region, offset } => mmu
            .read(proc, region, offset)
            .map(|val| format!("value {val:#04x}")),
        Op::Write {
            region,
            offset,
            value,
        } => mmu
            .write(proc, value, region, offset)
            .map(|()| "ok".to_string()),
    };
    match outcome {
        Ok(msg) => format!("[pid {}] {op}: {msg}", proc.pid()),
        Err(e) => format!("[pid {}] {op}: error: {e}", proc.pid()),
    }
}
