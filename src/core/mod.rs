//! Core module containing fundamental types for memory-tree
//!
//! This module provides the foundational building blocks used throughout
//! the crate: addresses, value kinds, decoded values and error types.

pub mod types;

// Re-export commonly used types for convenience
pub use types::{
    Address, DecodeError, EncodeError, Fault, MemoryError, MemoryResult, MemoryValue, NodeError,
    PrimitiveKind, RejectReason, SchemaId, ValueKind,
};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const AUTHORS: &str = env!("CARGO_PKG_AUTHORS");
