//! Page protection flags for mapped regions

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Access rights of a mapped region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Protection {
    pub read: bool,
    pub write: bool,
    pub execute: bool,
}

impl Protection {
    /// Create protection flags from individual rights
    pub const fn new(read: bool, write: bool, execute: bool) -> Self {
        Protection {
            read,
            write,
            execute,
        }
    }

    /// No access protection
    pub const fn no_access() -> Self {
        Protection::new(false, false, false)
    }

    /// Read-only protection
    pub const fn read_only() -> Self {
        Protection::new(true, false, false)
    }

    /// Read-write protection
    pub const fn read_write() -> Self {
        Protection::new(true, true, false)
    }

    /// Execute-read protection
    pub const fn execute_read() -> Self {
        Protection::new(true, false, true)
    }

    /// Execute-read-write protection
    pub const fn execute_read_write() -> Self {
        Protection::new(true, true, true)
    }

    /// Check if protection allows reading
    pub const fn is_readable(&self) -> bool {
        self.read
    }

    /// Check if protection allows writing
    pub const fn is_writable(&self) -> bool {
        self.write
    }

    /// Check if protection allows execution
    pub const fn is_executable(&self) -> bool {
        self.execute
    }
}

impl FromStr for Protection {
    type Err = String;

    /// Parses the permission column of `/proc/<pid>/maps` (`r-xp`, `rw-s`, ...)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.as_bytes();
        if bytes.len() < 3 {
            return Err(format!("permission string too short: {s}"));
        }
        let flag = |i: usize, set: u8| match bytes[i] {
            b'-' => Ok(false),
            b if b == set => Ok(true),
            other => Err(format!("unexpected permission flag '{}' in {s}", other as char)),
        };
        Ok(Protection::new(flag(0, b'r')?, flag(1, b'w')?, flag(2, b'x')?))
    }
}

impl fmt::Display for Protection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}",
            if self.read { 'r' } else { '-' },
            if self.write { 'w' } else { '-' },
            if self.execute { 'x' } else { '-' }
        )
    }
}
