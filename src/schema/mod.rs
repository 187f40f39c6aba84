//! Schema authority interface
//!
//! A schema is an ordered list of [`FieldDescriptor`]s with static offsets. The
//! engine only ever reads schemas; they are immutable for the lifetime of a
//! binding.

mod check;
mod registry;

pub use check::check_schema;
pub(crate) use check::element_stride;
pub use registry::SchemaRegistry;

use crate::core::types::{Offset, SchemaId, Size, ValueKind};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One field of a structural type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ValueKind,
    /// Byte offset from the start of the owning struct
    pub offset: Offset,
    pub size: Size,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, kind: ValueKind, offset: Offset, size: Size) -> Self {
        FieldDescriptor {
            name: name.into(),
            kind,
            offset,
            size,
        }
    }
}

/// A named structural type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    pub name: SchemaId,
    pub size: Size,
    #[serde(default)]
    pub fields: Vec<Arc<FieldDescriptor>>,
}

impl Schema {
    pub fn new(name: impl Into<SchemaId>, size: Size) -> Self {
        Schema {
            name: name.into(),
            size,
            fields: Vec::new(),
        }
    }

    /// Appends a field, builder style
    pub fn field(mut self, name: &str, kind: ValueKind, offset: Offset, size: Size) -> Self {
        self.fields
            .push(Arc::new(FieldDescriptor::new(name, kind, offset, size)));
        self
    }

    /// Looks up a field by name
    pub fn find_field(&self, name: &str) -> Option<&Arc<FieldDescriptor>> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Source of schemas, keyed by id
///
/// Implemented by whatever owns the type information (a registry loaded from
/// disk, a reverse-engineering database, ...).
pub trait SchemaSource {
    /// Returns the schema with the given id, if known
    fn schema(&self, id: &str) -> Option<&Schema>;
}

impl<T: SchemaSource + ?Sized> SchemaSource for &T {
    fn schema(&self, id: &str) -> Option<&Schema> {
        (**self).schema(id)
    }
}

impl<T: SchemaSource + ?Sized> SchemaSource for Arc<T> {
    fn schema(&self, id: &str) -> Option<&Schema> {
        (**self).schema(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::PrimitiveKind;

    #[test]
    fn test_schema_builder() {
        let schema = Schema::new("Vec3", 12)
            .field("x", ValueKind::primitive(PrimitiveKind::F32), 0, 4)
            .field("y", ValueKind::primitive(PrimitiveKind::F32), 4, 4)
            .field("z", ValueKind::primitive(PrimitiveKind::F32), 8, 4);

        assert_eq!(schema.fields.len(), 3);
        assert_eq!(schema.find_field("y").map(|f| f.offset), Some(4));
        assert!(schema.find_field("w").is_none());
    }

    #[test]
    fn test_field_json_shape() {
        let json = r#"{"name":"hp","type":{"kind":"primitive","width":4,"signed":true},"offset":16,"size":4}"#;
        let field: FieldDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(field.kind, ValueKind::primitive(PrimitiveKind::I32));
        assert_eq!(field.offset, 16);
    }
}
