//! Core type definitions for memory-tree
//!
//! Addresses, value kinds, decoded values and the error types shared by every
//! layer of the engine.

mod address;
mod error;
mod kind;
mod value;

pub use address::Address;
pub use error::{
    DecodeError, EncodeError, Fault, MemoryError, MemoryResult, NodeError, RejectReason,
};
pub use kind::{PrimitiveKind, SchemaId, ValueKind};
pub use value::MemoryValue;

/// Byte offset of a field inside its owning struct
pub type Offset = usize;
/// Size of a field in bytes
pub type Size = usize;
