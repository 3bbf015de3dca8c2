//! Memory Access Types.
//!
//! This module defines the classification of memory accesses made through the
//! translation layer. These types are used for the following:
//! 1. **Diagnostics:** Labelling hit/miss lines on the debug channel.
//! 2. **Statistics Tracking:** Splitting hit and miss counters by direction.

use std::fmt;

/// Type of memory access operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccessType {
    /// Data read access.
    Read,

    /// Data write access.
    Write,
}

impl fmt::Display for AccessType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read => f.write_str("read"),
            Self::Write => f.write_str("write"),
        }
    }
}
