//! `/proc/<pid>/maps` parsing

use crate::core::types::{Address, MemoryError, MemoryResult};
use crate::memory::Protection;
use std::fs;

/// One mapping line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapRegion {
    pub start: Address,
    /// Exclusive
    pub end: Address,
    pub protection: Protection,
    pub path: Option<String>,
}

impl MapRegion {
    pub fn contains(&self, address: Address) -> bool {
        address >= self.start && address < self.end
    }

    pub fn len(&self) -> u64 {
        self.end.as_u64().saturating_sub(self.start.as_u64())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Snapshot of a process's mappings, sorted by start address
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryMap {
    regions: Vec<MapRegion>,
}

impl MemoryMap {
    /// Parses the text of a maps file
    pub fn parse(text: &str) -> MemoryResult<Self> {
        let mut regions = text
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(parse_line)
            .collect::<MemoryResult<Vec<_>>>()?;
        regions.sort_by_key(|r| r.start);
        Ok(MemoryMap { regions })
    }

    /// Reads `/proc/<pid>/maps`
    pub fn for_pid(pid: u32) -> MemoryResult<Self> {
        let text = fs::read_to_string(format!("/proc/{}/maps", pid))?;
        Self::parse(&text)
    }

    pub fn regions(&self) -> &[MapRegion] {
        &self.regions
    }

    /// Region containing `address`
    pub fn find(&self, address: Address) -> Option<&MapRegion> {
        let index = self.regions.partition_point(|r| r.end <= address);
        self.regions.get(index).filter(|r| r.contains(address))
    }

    /// Checks that `[address, address + len)` is mapped writable
    ///
    /// Returns the first address that is unmapped or not writable.
    pub fn first_unwritable(&self, address: Address, len: usize) -> Option<(Address, bool)> {
        let end = address.as_u64().saturating_add(len as u64);
        let mut cursor = address;
        while cursor.as_u64() < end {
            match self.find(cursor) {
                None => return Some((cursor, false)),
                Some(region) if !region.protection.is_writable() => return Some((cursor, true)),
                Some(region) => cursor = region.end,
            }
        }
        None
    }
}

fn parse_line(line: &str) -> MemoryResult<MapRegion> {
    let bad = || MemoryError::InvalidAddress(format!("malformed maps line: {}", line));
    let mut parts = line.split_whitespace();

    let range = parts.next().ok_or_else(bad)?;
    let (start, end) = range.split_once('-').ok_or_else(bad)?;
    let start = u64::from_str_radix(start, 16).map_err(|_| bad())?;
    let end = u64::from_str_radix(end, 16).map_err(|_| bad())?;
    let protection: Protection = parts.next().ok_or_else(bad)?.parse().map_err(|_| bad())?;

    // offset, device, inode
    let mut rest = parts.skip(3);
    let path = rest.next().map(|first| {
        std::iter::once(first)
            .chain(rest)
            .collect::<Vec<_>>()
            .join(" ")
    });

    Ok(MapRegion {
        start: Address::new(start),
        end: Address::new(end),
        protection,
        path,
    })
}
