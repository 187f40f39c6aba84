//! Target-process address wrapper with hex parsing and checked arithmetic

use super::error::{MemoryError, MemoryResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// An address inside the target process.
///
/// Stored as `u64` regardless of the host pointer width, since the target may
/// be a different architecture than the inspector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(pub u64);

impl Address {
    /// Creates a new address from a raw value
    pub const fn new(value: u64) -> Self {
        Address(value)
    }

    /// The null sentinel (0x0)
    pub const fn null() -> Self {
        Address(0)
    }

    /// Checks if the address is the null sentinel
    pub const fn is_null(&self) -> bool {
        self.0 == 0
    }

    /// Returns the raw value
    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    /// Adds a byte offset, returning `None` if the result leaves the address space
    pub fn checked_add(&self, offset: usize) -> Option<Self> {
        u64::try_from(offset)
            .ok()
            .and_then(|offset| self.0.checked_add(offset))
            .map(Address)
    }

    /// Distance in bytes from `base` to this address, if this address is not below it
    pub fn distance_from(&self, base: Address) -> Option<u64> {
        self.0.checked_sub(base.0)
    }

    /// Checks whether the address lies in `[start, start + len)`
    pub fn within(&self, start: Address, len: u64) -> bool {
        self.distance_from(start).is_some_and(|d| d < len)
    }

    /// Parses an address typed by an operator, returning a crate error on failure
    pub fn parse(s: &str) -> MemoryResult<Self> {
        s.parse()
    }
}

impl FromStr for Address {
    type Err = MemoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let cleaned: String = s.chars().filter(|&c| c != '_' && c != '`').collect();

        let value = if let Some(hex) = cleaned
            .strip_prefix("0x")
            .or_else(|| cleaned.strip_prefix("0X"))
            .or_else(|| cleaned.strip_prefix('$'))
        {
            u64::from_str_radix(hex, 16)
        } else if cleaned.chars().any(|c| c.is_ascii_alphabetic()) {
            // Letters mean hex, as debuggers print addresses without a prefix
            u64::from_str_radix(&cleaned, 16)
        } else {
            cleaned.parse::<u64>()
        };

        value
            .map(Address::new)
            .map_err(|_| MemoryError::InvalidAddress(s.to_string()))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:X}", self.0)
    }
}

impl fmt::LowerHex for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016x}", self.0)
    }
}

impl fmt::UpperHex for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016X}", self.0)
    }
}

impl From<u64> for Address {
    fn from(value: u64) -> Self {
        Address::new(value)
    }
}

impl From<usize> for Address {
    fn from(value: usize) -> Self {
        Address::new(value as u64)
    }
}
