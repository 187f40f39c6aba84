//! Live process accessor backed by `/proc/<pid>/mem`

use super::maps::MemoryMap;
use crate::core::types::{Address, Fault, MemoryResult};
use crate::memory::MemoryAccessor;
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::fs::FileExt;
use tracing::debug;

/// Open handle on a process's address space
///
/// Reads go straight to `/proc/<pid>/mem`. Because the kernel lets that file
/// write through read-only pages, writes first consult `/proc/<pid>/maps` and
/// are refused with [`Fault::Protection`] unless every byte is mapped writable.
pub struct ProcessHandle {
    pid: u32,
    mem: File,
    writable: bool,
}

impl ProcessHandle {
    /// Opens a process for reading and, when permitted, writing
    pub fn open(pid: u32) -> MemoryResult<Self> {
        let path = format!("/proc/{}/mem", pid);
        let (mem, writable) = match OpenOptions::new().read(true).write(true).open(&path) {
            Ok(file) => (file, true),
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                (OpenOptions::new().read(true).open(&path)?, false)
            }
            Err(e) => return Err(e.into()),
        };
        debug!(pid, writable, "process opened");
        Ok(ProcessHandle { pid, mem, writable })
    }

    /// Get the process ID
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Whether the handle was opened with write access
    pub fn is_writable(&self) -> bool {
        self.writable
    }

    /// Current mappings of the process
    pub fn maps(&self) -> MemoryResult<MemoryMap> {
        MemoryMap::for_pid(self.pid)
    }
}

impl fmt::Debug for ProcessHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessHandle")
            .field("pid", &self.pid)
            .field("writable", &self.writable)
            .finish()
    }
}

impl MemoryAccessor for ProcessHandle {
    fn read(&self, address: Address, length: usize) -> Result<Vec<u8>, Fault> {
        let mut buffer = vec![0u8; length];
        let mut filled = 0;

        while filled < length {
            let at = address
                .checked_add(filled)
                .ok_or(Fault::Unmapped { address })?;
            match self.mem.read_at(&mut buffer[filled..], at.as_u64()) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) if filled == 0 => return Err(fault_from_io(at, &e)),
                Err(_) => break,
            }
        }

        if filled == 0 && length > 0 {
            return Err(Fault::Unmapped { address });
        }
        buffer.truncate(filled);
        Ok(buffer)
    }

    fn write(&self, address: Address, bytes: &[u8]) -> Result<(), Fault> {
        if !self.writable {
            return Err(Fault::Protection { address });
        }
        let map = self
            .maps()
            .map_err(|e| Fault::io(address, e.to_string()))?;
        if let Some((at, mapped)) = map.first_unwritable(address, bytes.len()) {
            return Err(if mapped {
                Fault::Protection { address: at }
            } else {
                Fault::Unmapped { address: at }
            });
        }
        self.mem
            .write_all_at(bytes, address.as_u64())
            .map_err(|e| fault_from_io(address, &e))
    }
}

fn fault_from_io(address: Address, error: &io::Error) -> Fault {
    match error.kind() {
        io::ErrorKind::PermissionDenied => Fault::Protection { address },
        io::ErrorKind::TimedOut => Fault::Timeout { address },
        // EIO and EFAULT: nothing mapped there
        _ if matches!(error.raw_os_error(), Some(5) | Some(14)) => Fault::Unmapped { address },
        _ => Fault::io(address, error.to_string()),
    }
}
