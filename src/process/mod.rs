//! Live process access (Linux)
//!
//! - [`ProcessHandle`] implements [`MemoryAccessor`](crate::memory::MemoryAccessor)
//!   over `/proc/<pid>/mem`
//! - [`MemoryMap`] parses `/proc/<pid>/maps` for region protection

pub mod maps;

#[cfg(target_os = "linux")]
pub mod handle;

#[cfg(target_os = "linux")]
pub use handle::ProcessHandle;
pub use maps::{MapRegion, MemoryMap};
