//! Error types for memory-tree
//!
//! Per-node failures ([`Fault`], [`DecodeError`], [`NodeError`]) are recorded
//! on the node they happened to and never abort a refresh. [`MemoryError`] is
//! what the public API returns.

use super::address::Address;
use super::kind::SchemaId;
use std::fmt;
use thiserror::Error;

/// Failure reported by a memory accessor for a single read or write
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    #[error("address {address} is not mapped")]
    Unmapped { address: Address },

    #[error("access to {address} violates page protection")]
    Protection { address: Address },

    #[error("accessor timed out at {address}")]
    Timeout { address: Address },

    #[error("accessor I/O failure at {address}: {reason}")]
    Io { address: Address, reason: String },
}

impl Fault {
    /// Address the accessor was asked to touch
    pub fn address(&self) -> Address {
        match self {
            Fault::Unmapped { address }
            | Fault::Protection { address }
            | Fault::Timeout { address }
            | Fault::Io { address, .. } => *address,
        }
    }

    /// Creates an I/O fault
    pub fn io(address: Address, reason: impl Into<String>) -> Self {
        Fault::Io {
            address,
            reason: reason.into(),
        }
    }
}

/// Why bytes could not be turned into a value of the declared kind
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("read failed: {0}")]
    Fault(#[from] Fault),

    #[error("short read: expected {expected} bytes, got {actual}")]
    ShortRead { expected: usize, actual: usize },

    #[error("unsupported width: {width} bytes")]
    UnsupportedWidth { width: usize },

    #[error("bitfield of {bit_width} bits at bit {bit_offset} does not fit a {backing_width}-byte backing")]
    InvalidBitRange {
        backing_width: u8,
        bit_offset: u8,
        bit_width: u8,
    },

    #[error("depth limit of {limit} exceeded")]
    DepthLimitExceeded { limit: usize },

    #[error("schema {0} is not known")]
    MissingSchema(SchemaId),

    #[error("{0} is a container and has no scalar value")]
    NotScalar(String),
}

impl DecodeError {
    /// Creates a short read error
    pub fn short_read(expected: usize, actual: usize) -> Self {
        DecodeError::ShortRead { expected, actual }
    }
}

/// Why a value could not be turned into bytes for a write
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    #[error("expected a {expected} value, got {found}")]
    KindMismatch { expected: String, found: String },

    #[error("value {value} does not fit in {bits} bits")]
    OutOfRange { value: String, bits: u32 },

    #[error("buffer too small: expected {expected}, got {actual}")]
    BufferTooSmall { expected: usize, actual: usize },

    #[error("{0} is a container and has no scalar encoding")]
    NotScalar(String),

    #[error("unsupported width: {width} bytes")]
    UnsupportedWidth { width: usize },

    #[error("cannot parse '{text}' as {kind}")]
    Parse { text: String, kind: String },
}

impl EncodeError {
    /// Creates a kind mismatch error
    pub fn kind_mismatch(expected: impl fmt::Display, found: impl fmt::Display) -> Self {
        EncodeError::KindMismatch {
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }

    /// Creates an out-of-range error
    pub fn out_of_range(value: impl fmt::Display, bits: u32) -> Self {
        EncodeError::OutOfRange {
            value: value.to_string(),
            bits,
        }
    }

    /// Creates a parse error
    pub fn parse(text: impl Into<String>, kind: impl fmt::Display) -> Self {
        EncodeError::Parse {
            text: text.into(),
            kind: kind.to_string(),
        }
    }
}

/// Reason recorded on a node whose value is invalid for the current generation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NodeError {
    #[error("parent address is unresolved")]
    ParentUnresolved,

    #[error("address overflow: {base} + {offset:#x}")]
    AddressOverflow { base: Address, offset: usize },

    #[error("pointer slot at {address} is unreadable: {reason}")]
    UnreadablePointerSlot {
        address: Address,
        reason: DecodeError,
    },

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

impl NodeError {
    /// Creates an unreadable pointer slot error
    pub fn unreadable_pointer_slot(address: Address, reason: impl Into<DecodeError>) -> Self {
        NodeError::UnreadablePointerSlot {
            address,
            reason: reason.into(),
        }
    }
}

/// Why a write was refused before touching memory (or refused by the accessor)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    #[error("node address is unresolved")]
    Unresolved,

    #[error("{0} is a container and is not writable as a scalar")]
    Container(String),

    #[error("{0}")]
    Fault(#[from] Fault),
}

/// Main error type for the public API
#[derive(Error, Debug)]
pub enum MemoryError {
    #[error("Schema {schema} is inconsistent: {reason}")]
    SchemaInconsistent { schema: SchemaId, reason: String },

    #[error("Write rejected: {reason}")]
    WriteRejected { reason: RejectReason },

    #[error("Encode failed: {0}")]
    Encode(#[from] EncodeError),

    #[error("Write verification failed at {address}: read-back differs from written bytes")]
    VerificationFailed { address: Address },

    #[error("Node no longer exists: {0}")]
    StaleNode(String),

    #[error("No node at path: {0}")]
    NodeNotFound(String),

    #[error("Invalid memory address: {0}")]
    InvalidAddress(String),

    #[error("Read failed: {0}")]
    Fault(#[from] Fault),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),
}

/// Result type alias for the public API
pub type MemoryResult<T> = Result<T, MemoryError>;

impl MemoryError {
    /// Creates a schema inconsistency error
    pub fn schema_inconsistent(schema: impl Into<SchemaId>, reason: impl Into<String>) -> Self {
        MemoryError::SchemaInconsistent {
            schema: schema.into(),
            reason: reason.into(),
        }
    }

    /// Creates a write rejected error
    pub fn write_rejected(reason: impl Into<RejectReason>) -> Self {
        MemoryError::WriteRejected {
            reason: reason.into(),
        }
    }

    /// Whether the error means the write never reached target memory
    pub fn is_write_rejected(&self) -> bool {
        matches!(self, MemoryError::WriteRejected { .. })
    }
}
