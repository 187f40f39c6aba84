//! Bound node tree
//!
//! - [`NodeTree`] arena of [`MemoryNode`]s addressed by versioned [`NodeId`]s
//! - [`Resolver`] for member offsets, pointer dereference and the cycle guard
//! - [`Refresher`] for building a tree and re-resolving it in place

pub mod node;
pub mod refresher;
pub mod resolver;

pub use node::{MemoryNode, NodeAddress, NodeId, NodeTree, NodeValue};
pub use refresher::Refresher;
pub use resolver::{Frame, Pointee, Resolver};
