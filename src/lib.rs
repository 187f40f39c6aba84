//! memory-tree: bind a structural schema to a base address in a running
//! process and keep a typed tree of its fields in sync with live memory.
//!
//! The engine is split into four layers:
//! - [`codec`] turns bytes into typed values and back
//! - [`tree::Resolver`] computes node addresses and follows pointers
//! - [`tree::Refresher`] builds the node tree and re-resolves it in place
//! - [`binding`] owns one tree and exposes tick, read and write operations
//!
//! Schemas come from any [`schema::SchemaSource`]; memory from any
//! [`memory::MemoryAccessor`].

pub mod binding;
pub mod codec;
pub mod config;
pub mod core;
pub mod logging;
pub mod memory;
pub mod process;
pub mod render;
pub mod schema;
pub mod tree;

// Re-export main types from core module
pub use core::types::{
    Address, DecodeError, EncodeError, Fault, MemoryError, MemoryResult, MemoryValue, NodeError,
    PrimitiveKind, RejectReason, SchemaId, ValueKind,
};

pub use binding::{Binding, BindingOptions};
pub use codec::{Codec, Decoded};
pub use memory::{BufferMemory, MemoryAccessor, Protection};
pub use schema::{FieldDescriptor, Schema, SchemaRegistry, SchemaSource};
pub use tree::{MemoryNode, NodeAddress, NodeId, NodeValue};
