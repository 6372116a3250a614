//! Node Type Registry
//!
//! Keyed collection of [`NodeTypeDefinition`]s persisted as a single JSON
//! object (`key → definition`). Closure tables store only the type key; the
//! registry is what callers consult for display names, colors and attribute
//! validation.
//!
//! Lookups by display name (`get_by_name`, `color_for`, `attributes_for`)
//! mirror how type pickers present types to people: by name, not by key.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::{AttributeDefinition, NodeTypeDefinition, ValidationError, DEFAULT_TYPE_COLOR};
use crate::services::error::SessionError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeTypeRegistry {
    types: BTreeMap<String, NodeTypeDefinition>,
}

impl NodeTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a registry file. A missing or unreadable file yields an empty
    /// registry and a warning.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::try_load(path) {
            Ok(registry) => {
                tracing::debug!(
                    "Loaded {} node type(s) from {}",
                    registry.len(),
                    path.display()
                );
                registry
            }
            Err(e) => {
                tracing::warn!(
                    "Could not load node types from {}: {}, starting with an empty registry",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Load a registry file, propagating I/O and parse errors
    pub fn try_load(path: impl AsRef<Path>) -> Result<Self, SessionError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Write the registry as pretty-printed UTF-8 JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SessionError> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        tracing::info!("Saved {} node type(s) to {}", self.len(), path.display());
        Ok(())
    }

    /// Display names of all types, ordered by key
    pub fn type_names(&self) -> Vec<&str> {
        self.types.values().map(|t| t.name.as_str()).collect()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    pub fn get(&self, key: &str) -> Option<&NodeTypeDefinition> {
        self.types.get(key)
    }

    /// Find a type by display name, returning its key and definition
    pub fn get_by_name(&self, name: &str) -> Option<(&str, &NodeTypeDefinition)> {
        self.types
            .iter()
            .find(|(_, t)| t.name == name)
            .map(|(key, t)| (key.as_str(), t))
    }

    /// Resolve a type reference given either as key or as display name
    pub fn resolve(&self, key_or_name: &str) -> Option<(&str, &NodeTypeDefinition)> {
        self.types
            .get_key_value(key_or_name)
            .map(|(key, t)| (key.as_str(), t))
            .or_else(|| self.get_by_name(key_or_name))
    }

    /// Color of the type with this display name, `#CCCCCC` when unknown
    pub fn color_for(&self, name: &str) -> &str {
        self.get_by_name(name)
            .map(|(_, t)| t.color.as_str())
            .unwrap_or(DEFAULT_TYPE_COLOR)
    }

    /// Attribute definitions of the type with this display name
    pub fn attributes_for(&self, name: &str) -> &[AttributeDefinition] {
        self.get_by_name(name)
            .map(|(_, t)| t.attributes.as_slice())
            .unwrap_or(&[])
    }

    /// Add a new type
    ///
    /// # Errors
    ///
    /// - `Validation` if the key or display name is empty
    /// - `TypeAlreadyExists` if the key is taken
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        definition: NodeTypeDefinition,
    ) -> Result<(), SessionError> {
        let key = key.into();
        if key.trim().is_empty() {
            return Err(ValidationError::MissingField("key".to_string()).into());
        }
        if definition.name.trim().is_empty() {
            return Err(ValidationError::MissingField("name".to_string()).into());
        }
        if self.types.contains_key(&key) {
            return Err(SessionError::type_already_exists(key));
        }

        tracing::debug!("Registered node type '{}' ({})", key, definition.name);
        self.types.insert(key, definition);
        Ok(())
    }

    /// Replace an existing type's definition
    pub fn update(&mut self, key: &str, definition: NodeTypeDefinition) -> Result<(), SessionError> {
        match self.types.get_mut(key) {
            Some(existing) => {
                *existing = definition;
                Ok(())
            }
            None => Err(ValidationError::UnknownNodeType(key.to_string()).into()),
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<NodeTypeDefinition> {
        self.types.remove(key)
    }

    /// Check an attribute object against the type stored under `key`
    pub fn validate_attributes(&self, key: &str, attributes: &Value) -> Result<(), ValidationError> {
        let definition = self
            .get(key)
            .ok_or_else(|| ValidationError::UnknownNodeType(key.to_string()))?;
        definition.validate_attributes(key, attributes)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AttributeType;
    use serde_json::json;
    use tempfile::TempDir;

    fn sample_registry() -> NodeTypeRegistry {
        serde_json::from_value(json!({
            "PLACE": {
                "name": "Miesto",
                "color": "#4CAF50",
                "attributes": [
                    { "name": "adresa", "type": "string", "required": true, "description": "Ulica a mesto" },
                    { "name": "kapacita", "type": "integer" }
                ]
            },
            "PERSON": {
                "name": "Osoba",
                "attributes": []
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_lookup_by_display_name() {
        let registry = sample_registry();

        assert_eq!(registry.type_names(), vec!["Osoba", "Miesto"]);
        let (key, place) = registry.get_by_name("Miesto").unwrap();
        assert_eq!(key, "PLACE");
        assert_eq!(place.attributes.len(), 2);
        assert!(registry.get_by_name("PLACE").is_none());
    }

    #[test]
    fn test_resolve_accepts_key_or_name() {
        let registry = sample_registry();
        assert_eq!(registry.resolve("PLACE").map(|(k, _)| k), Some("PLACE"));
        assert_eq!(registry.resolve("Osoba").map(|(k, _)| k), Some("PERSON"));
        assert!(registry.resolve("Zviera").is_none());
    }

    #[test]
    fn test_color_defaults() {
        let registry = sample_registry();
        assert_eq!(registry.color_for("Miesto"), "#4CAF50");
        assert_eq!(registry.color_for("Osoba"), DEFAULT_TYPE_COLOR);
        assert_eq!(registry.color_for("Neznámy"), DEFAULT_TYPE_COLOR);
    }

    #[test]
    fn test_attributes_for() {
        let registry = sample_registry();
        let attributes = registry.attributes_for("Miesto");
        assert_eq!(attributes[0].name, "adresa");
        assert_eq!(attributes[1].attribute_type, AttributeType::Integer);
        assert!(registry.attributes_for("Neznámy").is_empty());
    }

    #[test]
    fn test_insert_rejects_duplicates_and_blank_keys() {
        let mut registry = sample_registry();

        let err = registry
            .insert("PLACE", NodeTypeDefinition::new("Iné miesto"))
            .unwrap_err();
        assert!(matches!(err, SessionError::TypeAlreadyExists { .. }));

        let err = registry.insert(" ", NodeTypeDefinition::new("Prázdny")).unwrap_err();
        assert!(matches!(err, SessionError::Validation(_)));

        registry.insert("ANIMAL", NodeTypeDefinition::new("Zviera")).unwrap();
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.remove("ANIMAL").unwrap().name, "Zviera");
    }

    #[test]
    fn test_update_requires_existing_key() {
        let mut registry = sample_registry();
        registry
            .update("PERSON", NodeTypeDefinition::new("Človek"))
            .unwrap();
        assert_eq!(registry.get("PERSON").unwrap().name, "Človek");
        assert!(registry.update("NOPE", NodeTypeDefinition::new("x")).is_err());
    }

    #[test]
    fn test_validate_attributes() {
        let registry = sample_registry();

        assert!(registry
            .validate_attributes("PLACE", &json!({"adresa": "Hlavná 1", "uuid": "x"}))
            .is_ok());
        assert_eq!(
            registry
                .validate_attributes("PLACE", &json!({"kapacita": 10}))
                .unwrap_err(),
            ValidationError::MissingAttribute {
                node_type: "PLACE".to_string(),
                attribute: "adresa".to_string(),
            }
        );
        assert!(matches!(
            registry.validate_attributes("PLACE", &json!({"adresa": "A", "kapacita": "veľa"})),
            Err(ValidationError::AttributeTypeMismatch { .. })
        ));
        assert!(matches!(
            registry.validate_attributes("ANIMAL", &json!({})),
            Err(ValidationError::UnknownNodeType(_))
        ));
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("object_types.json");

        let registry = sample_registry();
        registry.save(&path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("\"Miesto\""));

        let loaded = NodeTypeRegistry::load(&path);
        assert_eq!(loaded, registry);
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let registry = NodeTypeRegistry::load(dir.path().join("missing.json"));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_load_malformed_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("object_types.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(NodeTypeRegistry::load(&path).is_empty());
        assert!(matches!(
            NodeTypeRegistry::try_load(&path),
            Err(SessionError::Json(_))
        ));
    }
}
