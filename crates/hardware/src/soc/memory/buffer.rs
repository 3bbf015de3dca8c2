//! Physical storage buffer.
//!
//! This module provides `MemPhy`, a fixed-capacity byte-addressable memory bank.
//! The same type backs main memory and, in an independent instance per process,
//! the TLB's own physical store. It supports:
//! 1. **Bounds-Checked Access:** Every read and write validates the address.
//! 2. **Diagnostics:** A lazy dump of non-zero bytes and a printable report.

use std::fmt;

use crate::common::constants::PAGE_SIZE;
use crate::common::{MemError, PhysAddr, Result};

/// A fixed-size, zero-initialised physical memory bank.
///
/// The buffer is allocated once in [`MemPhy::new`] and never resized.
#[derive(Clone, PartialEq, Eq)]
pub struct MemPhy {
    storage: Box<[u8]>,
}

impl MemPhy {
    /// Creates a new device of `capacity` bytes, all zero.
    ///
    /// # Errors
    ///
    /// Returns `MemError::InvalidCapacity` when `capacity` is zero.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(MemError::InvalidCapacity);
        }
        Ok(Self {
            storage: vec![0u8; capacity].into_boxed_slice(),
        })
    }

    /// Returns the size of the device in bytes.
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    /// Returns `true` if the device has no storage. Never true for a constructed device.
    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    /// Maps a physical address to a storage index.
    #[inline(always)]
    fn index(&self, addr: PhysAddr) -> Result<usize> {
        usize::try_from(addr.val())
            .ok()
            .filter(|&i| i < self.storage.len())
            .ok_or(MemError::OutOfBounds {
                addr: addr.val(),
                size: self.storage.len(),
            })
    }

    /// Reads a single byte.
    ///
    /// # Errors
    ///
    /// Returns `MemError::OutOfBounds` if `addr` is not below the device capacity.
    #[inline]
    pub fn read(&self, addr: PhysAddr) -> Result<u8> {
        let i = self.index(addr)?;
        Ok(self.storage[i])
    }

    /// Writes a single byte in place.
    ///
    /// # Errors
    ///
    /// Returns `MemError::OutOfBounds` if `addr` is not below the device capacity.
    #[inline]
    pub fn write(&mut self, addr: PhysAddr, val: u8) -> Result<()> {
        let i = self.index(addr)?;
        self.storage[i] = val;
        Ok(())
    }

    /// Zeroes every byte of frame `fpn` that lies on the device.
    ///
    /// A frame partly or wholly past the device end is cleared up to the end;
    /// accesses beyond it still fail with `OutOfBounds`.
    pub fn clear_frame(&mut self, fpn: u64) {
        let len = self.storage.len();
        let start = PhysAddr::from_frame(fpn, 0).val();
        let Ok(start) = usize::try_from(start) else {
            return;
        };
        let end = start.saturating_add(PAGE_SIZE as usize).min(len);
        if start < end {
            self.storage[start..end].fill(0);
        }
    }

    /// Reads a byte at a signed device address.
    ///
    /// # Errors
    ///
    /// Returns `MemError::OutOfBounds` for negative addresses and addresses at
    /// or above the device capacity.
    pub fn read_signed(&self, addr: i64) -> Result<u8> {
        self.read(self.signed(addr)?)
    }

    /// Writes a byte at a signed device address.
    ///
    /// # Errors
    ///
    /// Returns `MemError::OutOfBounds` for negative addresses and addresses at
    /// or above the device capacity.
    pub fn write_signed(&mut self, addr: i64, val: u8) -> Result<()> {
        let addr = self.signed(addr)?;
        self.write(addr, val)
    }

    /// Rejects negative device addresses as out of bounds.
    fn signed(&self, addr: i64) -> Result<PhysAddr> {
        PhysAddr::try_from(addr).map_err(|_| MemError::OutOfBounds {
            addr: addr as u64,
            size: self.storage.len(),
        })
    }

    /// Returns a lazy iterator over every non-zero byte as `(address, value)`.
    ///
    /// The iterator borrows the device immutably; clone it (or call `dump` again)
    /// to restart from the beginning.
    pub fn dump(&self) -> Dump<'_> {
        Dump {
            storage: &self.storage,
            pos: 0,
        }
    }

    /// Returns a printable report of the device contents.
    pub fn report(&self) -> DumpReport<'_> {
        DumpReport(self.dump())
    }
}

impl fmt::Debug for MemPhy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemPhy")
            .field("size", &self.storage.len())
            .field("non_zero", &self.dump().count())
            .finish()
    }
}

/// Iterator over the non-zero bytes of a [`MemPhy`].
#[derive(Clone, Debug)]
pub struct Dump<'a> {
    storage: &'a [u8],
    pos: usize,
}

impl Iterator for Dump<'_> {
    type Item = (PhysAddr, u8);

    fn next(&mut self) -> Option<Self::Item> {
        while self.pos < self.storage.len() {
            let i = self.pos;
            self.pos += 1;
            let val = self.storage[i];
            if val != 0 {
                return Some((PhysAddr::new(i as u64), val));
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.storage.len() - self.pos))
    }
}

/// Display adapter printing `Memory content-[pos, content]: [a, v][b, w]`.
#[derive(Clone, Debug)]
pub struct DumpReport<'a>(Dump<'a>);

impl fmt::Display for DumpReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Memory content-[pos, content]: ")?;
        for (addr, val) in self.0.clone() {
            write!(f, "[{}, {}]", addr.val(), val)?;
        }
        Ok(())
    }
}
