//! Address resolution: offsets, pointer dereference and the cycle guard

use crate::codec::Codec;
use crate::core::types::{Address, DecodeError, MemoryValue, NodeError, SchemaId, ValueKind};
use crate::memory::{read_exact, MemoryAccessor};

/// One open (schema, address) pair on the path from the root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub schema: SchemaId,
    pub address: Address,
}

impl Frame {
    pub fn new(schema: impl Into<SchemaId>, address: Address) -> Self {
        Frame {
            schema: schema.into(),
            address,
        }
    }
}

/// Outcome of following a pointer slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pointee {
    Null,
    Target(Address),
}

/// Computes node addresses, reading pointer slots through the accessor
pub struct Resolver<'a, M: MemoryAccessor + ?Sized> {
    memory: &'a M,
    codec: Codec,
}

impl<'a, M: MemoryAccessor + ?Sized> Resolver<'a, M> {
    pub fn new(memory: &'a M, codec: Codec) -> Self {
        Resolver { memory, codec }
    }

    pub fn codec(&self) -> &Codec {
        &self.codec
    }

    pub fn memory(&self) -> &'a M {
        self.memory
    }

    /// Address of a direct member: parent address plus static offset
    pub fn member(parent: Option<Address>, offset: usize) -> Result<Address, NodeError> {
        let base = parent.ok_or(NodeError::ParentUnresolved)?;
        base.checked_add(offset)
            .ok_or(NodeError::AddressOverflow { base, offset })
    }

    /// Offset of element `index` in an array of `count` elements every `stride` bytes
    ///
    /// # Panics
    ///
    /// Panics if `index >= count`.
    pub fn element_offset(index: usize, count: usize, stride: usize) -> usize {
        assert!(
            index < count,
            "array index {} out of range for {} elements",
            index,
            count
        );
        index * stride
    }

    /// Reads the pointer stored at `slot` and interprets it
    pub fn deref(&self, slot: Address) -> Result<Pointee, NodeError> {
        let width = self.codec.pointer_width();
        let value = read_exact(self.memory, slot, width)
            .map_err(DecodeError::from)
            .and_then(|bytes| {
                self.codec
                    .decode_scalar(&ValueKind::untyped_pointer(), &bytes)
            });
        Self::interpret(slot, value)
    }

    /// Interprets an already decoded pointer slot value
    pub fn interpret(
        slot: Address,
        value: Result<MemoryValue, DecodeError>,
    ) -> Result<Pointee, NodeError> {
        match value {
            Ok(MemoryValue::Pointer(target)) if target.is_null() => Ok(Pointee::Null),
            Ok(MemoryValue::Pointer(target)) => Ok(Pointee::Target(target)),
            Ok(other) => Err(NodeError::unreadable_pointer_slot(
                slot,
                DecodeError::NotScalar(other.type_name()),
            )),
            Err(reason) => Err(NodeError::unreadable_pointer_slot(slot, reason)),
        }
    }

    /// Whether expanding `schema` at `address` would re-enter an open ancestor
    pub fn is_cyclic(frames: &[Frame], schema: &str, address: Address) -> bool {
        frames
            .iter()
            .any(|frame| frame.address == address && frame.schema == schema)
    }
}
