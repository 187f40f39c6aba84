//! Static consistency check of every schema reachable from a root
//!
//! Runs once when a binding is opened. Anything found here is a configuration
//! error and fails the whole binding.

use super::{FieldDescriptor, SchemaSource};
use crate::core::types::{MemoryError, MemoryResult, SchemaId, ValueKind};
use std::collections::{HashSet, VecDeque};

/// Verifies that `root` and every schema it references exist and declare
/// decodable fields
pub fn check_schema(
    source: &dyn SchemaSource,
    root: &str,
    pointer_width: usize,
) -> MemoryResult<()> {
    let mut seen: HashSet<SchemaId> = HashSet::new();
    let mut pending: VecDeque<SchemaId> = VecDeque::new();

    if source.schema(root).is_none() {
        return Err(MemoryError::schema_inconsistent(root, "schema is not known"));
    }
    pending.push_back(root.to_string());

    while let Some(id) = pending.pop_front() {
        if !seen.insert(id.clone()) {
            continue;
        }
        let schema = source
            .schema(&id)
            .ok_or_else(|| MemoryError::schema_inconsistent(&id, "schema is not known"))?;

        for field in &schema.fields {
            let mut referenced = Vec::new();
            check_kind(source, &field.kind, field.size, pointer_width, &mut referenced)
                .map_err(|reason| {
                    MemoryError::schema_inconsistent(
                        &id,
                        format!("field '{}': {}", field.name, reason),
                    )
                })?;
            pending.extend(referenced);
        }
    }

    Ok(())
}

fn check_kind(
    source: &dyn SchemaSource,
    kind: &ValueKind,
    size: usize,
    pointer_width: usize,
    referenced: &mut Vec<SchemaId>,
) -> Result<(), String> {
    match kind {
        ValueKind::Primitive(p) => {
            if !p.is_supported() {
                return Err(format!("unsupported primitive {}-byte {}", p.width, p));
            }
        }
        ValueKind::Pointer { target } => {
            if let Some(target) = target {
                require_schema(source, target)?;
                referenced.push(target.clone());
            }
        }
        ValueKind::Bitfield {
            backing_width,
            bit_offset,
            bit_width,
        } => {
            if !matches!(backing_width, 1 | 2 | 4 | 8) {
                return Err(format!("unsupported bitfield backing width {}", backing_width));
            }
            let end = u32::from(*bit_offset) + u32::from(*bit_width);
            if *bit_width == 0 || end > u32::from(*backing_width) * 8 {
                return Err(format!(
                    "bit range {}..{} does not fit a {}-byte backing",
                    bit_offset, end, backing_width
                ));
            }
        }
        ValueKind::NestedStruct { schema } => {
            require_schema(source, schema)?;
            referenced.push(schema.clone());
        }
        ValueKind::FixedArray { element, count } => {
            if *count > 0 {
                if size % count != 0 {
                    return Err(format!(
                        "array size {} is not a multiple of its {} elements",
                        size, count
                    ));
                }
                check_kind(source, element, size / count, pointer_width, referenced)?;
            } else {
                check_kind(source, element, usize::MAX, pointer_width, referenced)?;
            }
        }
    }

    if let Some(width) = kind.scalar_width(pointer_width) {
        if size < width {
            return Err(format!(
                "declared size {} is smaller than the {}-byte {}",
                size, width, kind
            ));
        }
    }

    Ok(())
}

fn require_schema(source: &dyn SchemaSource, id: &str) -> Result<(), String> {
    if source.schema(id).is_some() {
        Ok(())
    } else {
        Err(format!("references unknown schema {}", id))
    }
}

/// Stride of one element of an array field
pub(crate) fn element_stride(field: &FieldDescriptor) -> usize {
    match &field.kind {
        ValueKind::FixedArray { count, .. } if *count > 0 => field.size / count,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::PrimitiveKind;
    use crate::schema::{Schema, SchemaRegistry};

    fn f32_kind() -> ValueKind {
        ValueKind::primitive(PrimitiveKind::F32)
    }

    #[test]
    fn test_consistent_graph() {
        let registry = SchemaRegistry::new()
            .with(Schema::new("Vec3", 12).field("x", f32_kind(), 0, 4))
            .with(
                Schema::new("Node", 24)
                    .field("next", ValueKind::pointer_to("Node"), 0, 8)
                    .field("pos", ValueKind::nested("Vec3"), 8, 12),
            );

        assert!(check_schema(&registry, "Node", 8).is_ok());
    }

    #[test]
    fn test_unknown_root() {
        let registry = SchemaRegistry::new();
        let err = check_schema(&registry, "Missing", 8).unwrap_err();
        assert!(matches!(err, MemoryError::SchemaInconsistent { .. }));
    }

    #[test]
    fn test_unknown_nested_schema() {
        let registry = SchemaRegistry::new().with(
            Schema::new("Player", 16).field("weapon", ValueKind::nested("Weapon"), 0, 16),
        );

        let err = check_schema(&registry, "Player", 8).unwrap_err();
        assert!(err.to_string().contains("unknown schema Weapon"));
    }

    #[test]
    fn test_unknown_schema_behind_pointer_chain() {
        let registry = SchemaRegistry::new()
            .with(Schema::new("A", 8).field("b", ValueKind::pointer_to("B"), 0, 8))
            .with(Schema::new("B", 8).field("c", ValueKind::pointer_to("C"), 0, 8));

        let err = check_schema(&registry, "A", 8).unwrap_err();
        match err {
            MemoryError::SchemaInconsistent { schema, .. } => assert_eq!(schema, "B"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_bad_bitfield() {
        let registry = SchemaRegistry::new()
            .with(Schema::new("Flags", 1).field("f", ValueKind::bitfield(1, 6, 3), 0, 1));
        assert!(check_schema(&registry, "Flags", 8).is_err());

        let registry = SchemaRegistry::new()
            .with(Schema::new("Flags", 1).field("f", ValueKind::bitfield(1, 0, 0), 0, 1));
        assert!(check_schema(&registry, "Flags", 8).is_err());
    }

    #[test]
    fn test_array_size_mismatch() {
        let registry = SchemaRegistry::new().with(Schema::new("Buf", 10).field(
            "data",
            ValueKind::array(f32_kind(), 3),
            0,
            10,
        ));
        assert!(check_schema(&registry, "Buf", 8).is_err());
    }

    #[test]
    fn test_field_smaller_than_kind() {
        let registry = SchemaRegistry::new()
            .with(Schema::new("P", 4).field("p", ValueKind::untyped_pointer(), 0, 4));
        assert!(check_schema(&registry, "P", 8).is_err());
        assert!(check_schema(&registry, "P", 4).is_ok());
    }

    #[test]
    fn test_element_stride() {
        let field = FieldDescriptor::new("a", ValueKind::array(f32_kind(), 4), 0, 32);
        assert_eq!(element_stride(&field), 8);
    }
}
