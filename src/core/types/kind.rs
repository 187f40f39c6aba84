//! Value kinds a schema field can declare

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a schema known to the schema authority
pub type SchemaId = String;

/// Shape of a fixed-width scalar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PrimitiveKind {
    /// Width in bytes (1, 2, 4 or 8)
    pub width: u8,
    #[serde(default)]
    pub signed: bool,
    #[serde(default)]
    pub float: bool,
}

impl PrimitiveKind {
    pub const U8: Self = Self::int(1, false);
    pub const U16: Self = Self::int(2, false);
    pub const U32: Self = Self::int(4, false);
    pub const U64: Self = Self::int(8, false);
    pub const I8: Self = Self::int(1, true);
    pub const I16: Self = Self::int(2, true);
    pub const I32: Self = Self::int(4, true);
    pub const I64: Self = Self::int(8, true);
    pub const F32: Self = Self::float(4);
    pub const F64: Self = Self::float(8);

    const fn int(width: u8, signed: bool) -> Self {
        PrimitiveKind {
            width,
            signed,
            float: false,
        }
    }

    // Signedness is ignored for floats
    const fn float(width: u8) -> Self {
        PrimitiveKind {
            width,
            signed: false,
            float: true,
        }
    }

    /// Same kind with signedness cleared for floats, for comparisons
    pub const fn normalized(self) -> Self {
        if self.float {
            Self::float(self.width)
        } else {
            self
        }
    }

    /// Whether this combination of width, signedness and float-ness can be decoded
    pub fn is_supported(&self) -> bool {
        if self.float {
            matches!(self.width, 4 | 8)
        } else {
            matches!(self.width, 1 | 2 | 4 | 8)
        }
    }

    /// Parses the short names used in schema files and on the command line (`u8`, `i32`, `f64`, ...)
    pub fn from_name(name: &str) -> Option<Self> {
        let kind = match name {
            "u8" => Self::U8,
            "u16" => Self::U16,
            "u32" => Self::U32,
            "u64" => Self::U64,
            "i8" => Self::I8,
            "i16" => Self::I16,
            "i32" => Self::I32,
            "i64" => Self::I64,
            "f32" => Self::F32,
            "f64" => Self::F64,
            _ => return None,
        };
        Some(kind)
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = if self.float {
            'f'
        } else if self.signed {
            'i'
        } else {
            'u'
        };
        write!(f, "{}{}", prefix, u32::from(self.width) * 8)
    }
}

/// The closed set of value shapes a field can take
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValueKind {
    Primitive(PrimitiveKind),
    Pointer {
        /// Schema of the pointee; `None` for an untyped pointer that is shown but never expanded
        #[serde(default)]
        target: Option<SchemaId>,
    },
    FixedArray {
        element: Box<ValueKind>,
        count: usize,
    },
    NestedStruct {
        schema: SchemaId,
    },
    Bitfield {
        /// Width of the backing integer in bytes
        backing_width: u8,
        bit_offset: u8,
        bit_width: u8,
    },
}

impl ValueKind {
    pub fn primitive(kind: PrimitiveKind) -> Self {
        ValueKind::Primitive(kind)
    }

    pub fn pointer_to(schema: impl Into<SchemaId>) -> Self {
        ValueKind::Pointer {
            target: Some(schema.into()),
        }
    }

    pub fn untyped_pointer() -> Self {
        ValueKind::Pointer { target: None }
    }

    pub fn array(element: ValueKind, count: usize) -> Self {
        ValueKind::FixedArray {
            element: Box::new(element),
            count,
        }
    }

    pub fn nested(schema: impl Into<SchemaId>) -> Self {
        ValueKind::NestedStruct {
            schema: schema.into(),
        }
    }

    pub fn bitfield(backing_width: u8, bit_offset: u8, bit_width: u8) -> Self {
        ValueKind::Bitfield {
            backing_width,
            bit_offset,
            bit_width,
        }
    }

    /// Containers carry no scalar value of their own
    pub fn is_container(&self) -> bool {
        matches!(self, ValueKind::FixedArray { .. } | ValueKind::NestedStruct { .. })
    }

    /// Width in bytes of the scalar this kind decodes from, or `None` for containers
    pub fn scalar_width(&self, pointer_width: usize) -> Option<usize> {
        match self {
            ValueKind::Primitive(p) => Some(usize::from(p.width)),
            ValueKind::Pointer { .. } => Some(pointer_width),
            ValueKind::Bitfield { backing_width, .. } => Some(usize::from(*backing_width)),
            ValueKind::FixedArray { .. } | ValueKind::NestedStruct { .. } => None,
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKind::Primitive(p) => write!(f, "{}", p),
            ValueKind::Pointer { target: Some(t) } => write!(f, "{}*", t),
            ValueKind::Pointer { target: None } => write!(f, "void*"),
            ValueKind::FixedArray { element, count } => write!(f, "{}[{}]", element, count),
            ValueKind::NestedStruct { schema } => write!(f, "{}", schema),
            ValueKind::Bitfield {
                backing_width,
                bit_offset,
                bit_width,
            } => write!(
                f,
                "u{}:{}@{}",
                u32::from(*backing_width) * 8,
                bit_width,
                bit_offset
            ),
        }
    }
}
