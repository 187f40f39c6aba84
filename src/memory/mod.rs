//! Memory accessor interface
//!
//! This module defines the raw I/O seam the engine reads and writes through:
//! - [`MemoryAccessor`] for byte-level reads and writes against a target
//! - [`Protection`] flags for mapped regions
//! - [`BufferMemory`], a sparse in-memory address space used for dumps and tests

pub mod buffer;
pub mod protection;

pub use buffer::BufferMemory;
pub use protection::Protection;

use crate::core::types::{Address, Fault};

/// Raw byte access to a target address space
///
/// Both calls must tolerate arbitrary addresses: an address that belongs to no
/// mapped region yields a [`Fault`], never a panic.
pub trait MemoryAccessor {
    /// Reads up to `length` bytes at `address`.
    ///
    /// Returns a non-empty prefix when the range runs off the end of a
    /// readable region, and a [`Fault`] when not even the first byte is
    /// readable.
    fn read(&self, address: Address, length: usize) -> Result<Vec<u8>, Fault>;

    /// Writes all of `bytes` at `address`, or nothing
    fn write(&self, address: Address, bytes: &[u8]) -> Result<(), Fault>;
}

impl<T: MemoryAccessor + ?Sized> MemoryAccessor for &T {
    fn read(&self, address: Address, length: usize) -> Result<Vec<u8>, Fault> {
        (**self).read(address, length)
    }

    fn write(&self, address: Address, bytes: &[u8]) -> Result<(), Fault> {
        (**self).write(address, bytes)
    }
}

impl<T: MemoryAccessor + ?Sized> MemoryAccessor for Box<T> {
    fn read(&self, address: Address, length: usize) -> Result<Vec<u8>, Fault> {
        (**self).read(address, length)
    }

    fn write(&self, address: Address, bytes: &[u8]) -> Result<(), Fault> {
        (**self).write(address, bytes)
    }
}

/// Reads exactly `length` bytes or fails
///
/// A short prefix is reported as an [`Fault::Unmapped`] at the first byte
/// that could not be read.
pub fn read_exact<M: MemoryAccessor + ?Sized>(
    memory: &M,
    address: Address,
    length: usize,
) -> Result<Vec<u8>, Fault> {
    let bytes = memory.read(address, length)?;
    if bytes.len() < length {
        let missing = address
            .checked_add(bytes.len())
            .unwrap_or(Address::new(u64::MAX));
        return Err(Fault::Unmapped { address: missing });
    }
    Ok(bytes)
}
