//! In-memory schema authority loadable from JSON or TOML

use super::{Schema, SchemaSource};
use crate::core::types::{MemoryResult, SchemaId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// On-disk layout: a flat list of schemas
#[derive(Debug, Default, Serialize, Deserialize)]
struct RegistryFile {
    #[serde(default)]
    schemas: Vec<Schema>,
}

/// A set of schemas keyed by name
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    schemas: HashMap<SchemaId, Schema>,
}

impl SchemaRegistry {
    /// Creates an empty registry
    pub fn new() -> Self {
        SchemaRegistry::default()
    }

    /// Adds a schema, replacing any previous schema of the same name
    pub fn insert(&mut self, schema: Schema) -> Option<Schema> {
        self.schemas.insert(schema.name.clone(), schema)
    }

    /// Builder-style insert
    pub fn with(mut self, schema: Schema) -> Self {
        self.insert(schema);
        self
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    /// Schema names in sorted order
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.schemas.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Parses a registry from a JSON document (`{"schemas": [...]}`)
    pub fn from_json_str(json: &str) -> MemoryResult<Self> {
        let file: RegistryFile = serde_json::from_str(json)?;
        Ok(Self::from_file(file))
    }

    /// Parses a registry from a TOML document (`[[schemas]]` tables)
    pub fn from_toml_str(toml_str: &str) -> MemoryResult<Self> {
        let file: RegistryFile = toml::from_str(toml_str)?;
        Ok(Self::from_file(file))
    }

    /// Loads a registry from disk, choosing the format by extension (`.toml`, otherwise JSON)
    pub fn load<P: AsRef<Path>>(path: P) -> MemoryResult<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let is_toml = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));

        let registry = if is_toml {
            Self::from_toml_str(&contents)?
        } else {
            Self::from_json_str(&contents)?
        };
        tracing::debug!(path = %path.display(), schemas = registry.len(), "loaded schema registry");
        Ok(registry)
    }

    fn from_file(file: RegistryFile) -> Self {
        let mut registry = SchemaRegistry::new();
        for schema in file.schemas {
            registry.insert(schema);
        }
        registry
    }
}

impl SchemaSource for SchemaRegistry {
    fn schema(&self, id: &str) -> Option<&Schema> {
        self.schemas.get(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{PrimitiveKind, ValueKind};
    use crate::schema::Schema;
    use tempfile::TempDir;

    const VEC3_JSON: &str = r#"{
        "schemas": [
            {
                "name": "Vec3",
                "size": 12,
                "fields": [
                    {"name": "x", "type": {"kind": "primitive", "width": 4, "float": true}, "offset": 0, "size": 4},
                    {"name": "y", "type": {"kind": "primitive", "width": 4, "float": true}, "offset": 4, "size": 4},
                    {"name": "z", "type": {"kind": "primitive", "width": 4, "float": true}, "offset": 8, "size": 4}
                ]
            }
        ]
    }"#;

    #[test]
    fn test_from_json() {
        let registry = SchemaRegistry::from_json_str(VEC3_JSON).unwrap();
        let vec3 = registry.schema("Vec3").unwrap();
        assert_eq!(vec3.size, 12);
        assert_eq!(vec3.fields[2].name, "z");
        assert_eq!(vec3.fields[2].kind, ValueKind::primitive(PrimitiveKind::F32));
    }

    #[test]
    fn test_from_toml() {
        let toml_str = r#"
            [[schemas]]
            name = "Node"
            size = 12

            [[schemas.fields]]
            name = "next"
            offset = 0
            size = 8
            type = { kind = "pointer", target = "Node" }

            [[schemas.fields]]
            name = "val"
            offset = 8
            size = 4
            type = { kind = "primitive", width = 4, signed = true }
        "#;

        let registry = SchemaRegistry::from_toml_str(toml_str).unwrap();
        let node = registry.schema("Node").unwrap();
        assert_eq!(node.fields[0].kind, ValueKind::pointer_to("Node"));
        assert_eq!(node.fields[1].kind, ValueKind::primitive(PrimitiveKind::I32));
    }

    #[test]
    fn test_load_by_extension() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("types.json");
        fs::write(&path, VEC3_JSON).unwrap();

        let registry = SchemaRegistry::load(&path).unwrap();
        assert_eq!(registry.names(), vec!["Vec3"]);
    }

    #[test]
    fn test_load_missing_file() {
        let result = SchemaRegistry::load("does-not-exist.json");
        assert!(result.is_err());
    }

    #[test]
    fn test_insert_replaces() {
        let mut registry = SchemaRegistry::new();
        assert!(registry.insert(Schema::new("A", 4)).is_none());
        assert!(registry.insert(Schema::new("A", 8)).is_some());
        assert_eq!(registry.schema("A").map(|s| s.size), Some(8));
        assert_eq!(registry.len(), 1);
    }
}
