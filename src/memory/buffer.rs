//! Sparse in-memory address space
//!
//! Backs offline inspection of raw dumps and lets tests stage exactly the
//! mapped, unmapped and protected ranges they need. Interior mutability keeps
//! the accessor usable through a shared reference while a binding holds it.

use super::{MemoryAccessor, Protection};
use crate::core::types::{Address, Fault};
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

#[derive(Debug, Clone)]
struct Region {
    bytes: Vec<u8>,
    protection: Protection,
}

impl Region {
    fn end(&self, base: u64) -> u64 {
        base.saturating_add(self.bytes.len() as u64)
    }
}

/// An address space made of independently mapped regions
#[derive(Debug, Clone, Default)]
pub struct BufferMemory {
    regions: RefCell<BTreeMap<u64, Region>>,
    reads: Cell<usize>,
    writes: Cell<usize>,
}

impl BufferMemory {
    /// Creates an empty address space
    pub fn new() -> Self {
        BufferMemory::default()
    }

    /// Loads a raw dump file as a single region at `base`
    pub fn from_dump<P: AsRef<Path>>(
        path: P,
        base: Address,
        protection: Protection,
    ) -> io::Result<Self> {
        let bytes = fs::read(path)?;
        let memory = BufferMemory::new();
        memory.map(base, bytes, protection);
        Ok(memory)
    }

    /// Maps `bytes` at `base`, dropping any region it overlaps
    pub fn map(&self, base: Address, bytes: Vec<u8>, protection: Protection) {
        let start = base.as_u64();
        let end = start.saturating_add(bytes.len() as u64);
        let mut regions = self.regions.borrow_mut();
        regions.retain(|&b, r| r.end(b) <= start || b >= end);
        regions.insert(start, Region { bytes, protection });
    }

    /// Removes the region starting at `base`, returning its contents
    pub fn unmap(&self, base: Address) -> Option<Vec<u8>> {
        self.regions
            .borrow_mut()
            .remove(&base.as_u64())
            .map(|r| r.bytes)
    }

    /// Changes the protection of the region starting at `base`
    pub fn protect(&self, base: Address, protection: Protection) -> bool {
        match self.regions.borrow_mut().get_mut(&base.as_u64()) {
            Some(region) => {
                region.protection = protection;
                true
            }
            None => false,
        }
    }

    /// Writes bytes ignoring protection, as the target process itself would
    pub fn poke(&self, address: Address, bytes: &[u8]) -> Result<(), Fault> {
        self.write_checked(address, bytes, false)
    }

    /// Reads exactly `length` bytes ignoring protection
    pub fn peek(&self, address: Address, length: usize) -> Result<Vec<u8>, Fault> {
        let bytes = self.collect(address, length, false)?;
        if bytes.len() < length {
            return Err(Fault::Unmapped {
                address: address
                    .checked_add(bytes.len())
                    .unwrap_or(Address::new(u64::MAX)),
            });
        }
        Ok(bytes)
    }

    /// Base, length and protection of the region containing `address`
    pub fn region_at(&self, address: Address) -> Option<(Address, usize, Protection)> {
        let regions = self.regions.borrow();
        let (&base, region) = regions.range(..=address.as_u64()).next_back()?;
        (address.as_u64() < region.end(base))
            .then(|| (Address::new(base), region.bytes.len(), region.protection))
    }

    /// Number of accessor reads served so far
    pub fn read_count(&self) -> usize {
        self.reads.get()
    }

    /// Number of accessor writes applied so far
    pub fn write_count(&self) -> usize {
        self.writes.get()
    }

    fn collect(&self, address: Address, length: usize, enforce: bool) -> Result<Vec<u8>, Fault> {
        let regions = self.regions.borrow();
        let mut out = Vec::with_capacity(length);
        let mut cursor = address.as_u64();

        while out.len() < length {
            let here = Address::new(cursor);
            let found = regions
                .range(..=cursor)
                .next_back()
                .filter(|(base, region)| cursor < region.end(**base));

            let Some((&base, region)) = found else {
                if out.is_empty() {
                    return Err(Fault::Unmapped { address: here });
                }
                break;
            };
            if enforce && !region.protection.is_readable() {
                if out.is_empty() {
                    return Err(Fault::Protection { address: here });
                }
                break;
            }

            let start = (cursor - base) as usize;
            let take = (length - out.len()).min(region.bytes.len() - start);
            out.extend_from_slice(&region.bytes[start..start + take]);
            cursor = match cursor.checked_add(take as u64) {
                Some(next) => next,
                None => break,
            };
        }

        Ok(out)
    }

    fn write_checked(&self, address: Address, bytes: &[u8], enforce: bool) -> Result<(), Fault> {
        let mut regions = self.regions.borrow_mut();

        // Validate the whole span before touching anything
        let mut spans = Vec::new();
        let mut cursor = address.as_u64();
        let mut done = 0usize;
        while done < bytes.len() {
            let here = Address::new(cursor);
            let (&base, region) = regions
                .range(..=cursor)
                .next_back()
                .filter(|(base, region)| cursor < region.end(**base))
                .ok_or(Fault::Unmapped { address: here })?;
            if enforce && !region.protection.is_writable() {
                return Err(Fault::Protection { address: here });
            }
            let start = (cursor - base) as usize;
            let take = (bytes.len() - done).min(region.bytes.len() - start);
            spans.push((base, start, done, take));
            done += take;
            cursor = cursor
                .checked_add(take as u64)
                .ok_or(Fault::Unmapped { address: here })?;
        }

        for (base, start, from, take) in spans {
            if let Some(region) = regions.get_mut(&base) {
                region.bytes[start..start + take].copy_from_slice(&bytes[from..from + take]);
            }
        }
        Ok(())
    }
}

impl MemoryAccessor for BufferMemory {
    fn read(&self, address: Address, length: usize) -> Result<Vec<u8>, Fault> {
        self.reads.set(self.reads.get() + 1);
        if length == 0 {
            return Ok(Vec::new());
        }
        self.collect(address, length, true)
    }

    fn write(&self, address: Address, bytes: &[u8]) -> Result<(), Fault> {
        self.write_checked(address, bytes, true)?;
        self.writes.set(self.writes.get() + 1);
        Ok(())
    }
}
