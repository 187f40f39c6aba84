//! Decoded memory values

use super::address::Address;
use super::kind::{PrimitiveKind, ValueKind};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A scalar decoded from target memory.
///
/// Every scalar [`ValueKind`] maps onto exactly one variant, so a decoded value
/// always carries the declared width and signedness.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum MemoryValue {
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    Pointer(Address),
    /// Bits extracted from a bitfield, right-aligned
    Bits(u64),
}

impl MemoryValue {
    /// Size in bytes of the value's own representation
    ///
    /// Pointers and bitfields depend on the binding, so they report the size of
    /// their in-process representation (`u64`).
    pub fn size(&self) -> usize {
        match self {
            MemoryValue::I8(_) | MemoryValue::U8(_) => 1,
            MemoryValue::I16(_) | MemoryValue::U16(_) => 2,
            MemoryValue::I32(_) | MemoryValue::U32(_) | MemoryValue::F32(_) => 4,
            MemoryValue::I64(_)
            | MemoryValue::U64(_)
            | MemoryValue::F64(_)
            | MemoryValue::Pointer(_)
            | MemoryValue::Bits(_) => 8,
        }
    }

    /// The primitive kind this value was decoded as, if it is a primitive
    pub fn primitive_kind(&self) -> Option<PrimitiveKind> {
        let kind = match self {
            MemoryValue::I8(_) => PrimitiveKind::I8,
            MemoryValue::I16(_) => PrimitiveKind::I16,
            MemoryValue::I32(_) => PrimitiveKind::I32,
            MemoryValue::I64(_) => PrimitiveKind::I64,
            MemoryValue::U8(_) => PrimitiveKind::U8,
            MemoryValue::U16(_) => PrimitiveKind::U16,
            MemoryValue::U32(_) => PrimitiveKind::U32,
            MemoryValue::U64(_) => PrimitiveKind::U64,
            MemoryValue::F32(_) => PrimitiveKind::F32,
            MemoryValue::F64(_) => PrimitiveKind::F64,
            MemoryValue::Pointer(_) | MemoryValue::Bits(_) => return None,
        };
        Some(kind)
    }

    /// Whether this value is the variant a field of `kind` decodes to
    pub fn matches_kind(&self, kind: &ValueKind) -> bool {
        match (kind, self) {
            (ValueKind::Primitive(p), v) => v.primitive_kind() == Some(p.normalized()),
            (ValueKind::Pointer { .. }, MemoryValue::Pointer(_)) => true,
            (ValueKind::Bitfield { .. }, MemoryValue::Bits(_)) => true,
            _ => false,
        }
    }

    /// Short name of the variant, used in error messages
    pub fn type_name(&self) -> String {
        match self {
            MemoryValue::Pointer(_) => "pointer".to_string(),
            MemoryValue::Bits(_) => "bits".to_string(),
            other => other
                .primitive_kind()
                .map(|k| k.to_string())
                .unwrap_or_default(),
        }
    }

    /// Returns the pointer target if this is a pointer value
    pub fn as_pointer(&self) -> Option<Address> {
        match self {
            MemoryValue::Pointer(addr) => Some(*addr),
            _ => None,
        }
    }
}

impl fmt::Display for MemoryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoryValue::I8(v) => write!(f, "{}", v),
            MemoryValue::I16(v) => write!(f, "{}", v),
            MemoryValue::I32(v) => write!(f, "{}", v),
            MemoryValue::I64(v) => write!(f, "{}", v),
            MemoryValue::U8(v) => write!(f, "{}", v),
            MemoryValue::U16(v) => write!(f, "{}", v),
            MemoryValue::U32(v) => write!(f, "{}", v),
            MemoryValue::U64(v) => write!(f, "{}", v),
            MemoryValue::F32(v) => write!(f, "{:?}", v),
            MemoryValue::F64(v) => write!(f, "{:?}", v),
            MemoryValue::Pointer(addr) => write!(f, "{}", addr),
            MemoryValue::Bits(v) => write!(f, "{}", v),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_size() {
        assert_eq!(MemoryValue::I32(42).size(), 4);
        assert_eq!(MemoryValue::U64(100).size(), 8);
        assert_eq!(MemoryValue::F32(1.5).size(), 4);
        assert_eq!(MemoryValue::U8(1).size(), 1);
    }

    #[test]
    fn test_matches_kind() {
        assert!(MemoryValue::F32(1.0).matches_kind(&ValueKind::primitive(PrimitiveKind::F32)));
        assert!(!MemoryValue::F64(1.0).matches_kind(&ValueKind::primitive(PrimitiveKind::F32)));
        assert!(!MemoryValue::U32(1).matches_kind(&ValueKind::primitive(PrimitiveKind::I32)));
        assert!(MemoryValue::Pointer(Address::new(8)).matches_kind(&ValueKind::untyped_pointer()));
        assert!(MemoryValue::Bits(3).matches_kind(&ValueKind::bitfield(1, 0, 2)));
        assert!(!MemoryValue::U8(3).matches_kind(&ValueKind::bitfield(1, 0, 2)));
    }

    #[test]
    fn test_display() {
        assert_eq!(MemoryValue::F32(1.0).to_string(), "1.0");
        assert_eq!(MemoryValue::I8(-3).to_string(), "-3");
        assert_eq!(MemoryValue::Pointer(Address::new(0x10)).to_string(), "0x10");
        assert_eq!(MemoryValue::U16(7).type_name(), "u16");
        assert_eq!(MemoryValue::Bits(1).type_name(), "bits");
    }

    #[test]
    fn test_serde_shape() {
        let json = serde_json::to_string(&MemoryValue::U32(5)).unwrap();
        assert_eq!(json, r#"{"type":"u32","value":5}"#);
        let back: MemoryValue = serde_json::from_str(&json).unwrap();
        assert_eq!(back, MemoryValue::U32(5));
    }
}
