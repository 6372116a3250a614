//! Node Data Structures
//!
//! This module defines the `Node` struct held in a closure table's node registry,
//! together with the partial-update type used for in-place edits.
//!
//! # Architecture
//!
//! - **Registry, not rows**: node properties are stored once per node, keyed by
//!   name. The path relation only holds `(ancestor, descendant, depth)` triples.
//! - **Opaque attributes**: `attributes` is a JSON object owned by the node and
//!   round-tripped without interpretation. The tabular format carries it as a
//!   string-encoded blob.
//! - **Reconciliation boundary**: `is_user_defined` separates user-authored
//!   nodes from admin nodes during synchronization.
//!
//! # Examples
//!
//! ```rust
//! use datamap_core::models::Node;
//! use serde_json::json;
//!
//! // A user node with defaults (not koko, user-defined, untyped)
//! let note = Node::new("Moja poznámka");
//! assert!(note.is_user_defined);
//!
//! // An admin node with a type and attributes
//! let place = Node::new("Škola")
//!     .admin()
//!     .with_koko(true)
//!     .with_node_type("miesto")
//!     .with_attributes(json!({ "kapacita": 300 }));
//! assert_eq!(place.node_type.as_deref(), Some("miesto"));
//! ```

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

fn empty_attributes() -> Value {
    Value::Object(serde_json::Map::new())
}

fn default_user_defined() -> bool {
    true
}

/// Validation errors for node values and attribute payloads
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid node name '{0}': names must not have leading or trailing whitespace")]
    InvalidName(String),

    #[error("Attributes validation failed: {0}")]
    InvalidAttributes(String),

    #[error("Unknown node type: {0}")]
    UnknownNodeType(String),

    #[error("Node type '{node_type}' requires attribute '{attribute}'")]
    MissingAttribute { node_type: String, attribute: String },

    #[error("Attribute '{attribute}' must be of type '{expected}'")]
    AttributeTypeMismatch { attribute: String, expected: String },
}

/// A named entity in a closure table.
///
/// # Fields
///
/// - `name`: identifier, unique within one table
/// - `node_type`: optional key into the external node-type registry
/// - `attributes`: JSON object with node-owned data
/// - `is_user_defined`: created through the user-tier workflow
/// - `is_descendant_koko`: member of the completion-tracking subset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub name: String,

    #[serde(default)]
    pub node_type: Option<String>,

    #[serde(default = "empty_attributes")]
    pub attributes: Value,

    #[serde(default = "default_user_defined")]
    pub is_user_defined: bool,

    #[serde(default)]
    pub is_descendant_koko: bool,
}

impl Node {
    /// Create a node with the defaults used by `add_node`: user-defined, not koko,
    /// untyped, empty attributes.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            node_type: None,
            attributes: empty_attributes(),
            is_user_defined: true,
            is_descendant_koko: false,
        }
    }

    /// Mark the node as admin-originated (`is_user_defined = false`)
    pub fn admin(mut self) -> Self {
        self.is_user_defined = false;
        self
    }

    pub fn with_user_defined(mut self, is_user_defined: bool) -> Self {
        self.is_user_defined = is_user_defined;
        self
    }

    pub fn with_koko(mut self, is_descendant_koko: bool) -> Self {
        self.is_descendant_koko = is_descendant_koko;
        self
    }

    pub fn with_node_type(mut self, node_type: impl Into<String>) -> Self {
        self.node_type = Some(node_type.into());
        self
    }

    pub fn with_attributes(mut self, attributes: Value) -> Self {
        self.attributes = attributes;
        self
    }

    /// Validate the node's name and attribute payload
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if:
    /// - `name` is empty or only whitespace
    /// - `name` has leading or trailing whitespace
    /// - `attributes` is not a JSON object
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use datamap_core::models::Node;
    /// # use serde_json::json;
    /// assert!(Node::new("Pes").validate().is_ok());
    /// assert!(Node::new("  ").validate().is_err());
    /// assert!(Node::new("Pes").with_attributes(json!([1, 2])).validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::MissingField("name".to_string()));
        }

        if self.name.trim() != self.name {
            return Err(ValidationError::InvalidName(self.name.clone()));
        }

        if !self.attributes.is_object() {
            return Err(ValidationError::InvalidAttributes(
                "attributes must be a JSON object".to_string(),
            ));
        }

        Ok(())
    }

    /// Replace the node's attributes
    pub fn set_attributes(&mut self, attributes: Value) {
        self.attributes = attributes;
    }

    /// Merge attributes into the existing ones (shallow merge)
    pub fn merge_attributes(&mut self, updates: Value) {
        if let (Some(existing), Some(new)) = (self.attributes.as_object_mut(), updates.as_object())
        {
            for (key, value) in new {
                existing.insert(key.clone(), value.clone());
            }
        }
    }

    /// Apply a partial update. Structure and `is_user_defined` are never touched.
    pub fn apply_update(&mut self, update: &NodeUpdate) {
        if let Some(node_type) = &update.node_type {
            self.node_type = node_type.clone();
        }
        if let Some(attributes) = &update.attributes {
            self.attributes = attributes.clone();
        }
        if let Some(koko) = update.is_descendant_koko {
            self.is_descendant_koko = koko;
        }
    }
}

/// Accepts both a plain value and `null` for a double-`Option` field.
///
/// - Missing field → None (don't update)
/// - null → Some(None) (clear)
/// - "value" → Some(Some("value"))
fn deserialize_optional_field<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Some(Option::<T>::deserialize(deserializer)?))
}

/// Partial node update for in-place edits
///
/// `node_type` uses the double-`Option` pattern:
///
/// - `None`: don't change the type
/// - `Some(None)`: clear the type
/// - `Some(Some(key))`: set the type
///
/// # Examples
///
/// ```rust
/// # use datamap_core::models::NodeUpdate;
/// # use serde_json::json;
/// let update = NodeUpdate::new()
///     .with_koko(true)
///     .with_attributes(json!({ "farba": "modrá" }));
/// assert!(!update.is_empty());
///
/// let clear_type = NodeUpdate {
///     node_type: Some(None),
///     ..Default::default()
/// };
/// assert!(!clear_type.is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeUpdate {
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_optional_field"
    )]
    pub node_type: Option<Option<String>>,

    /// Replaces the attribute object wholesale
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_descendant_koko: Option<bool>,
}

impl NodeUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_node_type(mut self, node_type: impl Into<String>) -> Self {
        self.node_type = Some(Some(node_type.into()));
        self
    }

    pub fn with_attributes(mut self, attributes: Value) -> Self {
        self.attributes = Some(attributes);
        self
    }

    pub fn with_koko(mut self, is_descendant_koko: bool) -> Self {
        self.is_descendant_koko = Some(is_descendant_koko);
        self
    }

    /// Check if update contains any changes
    pub fn is_empty(&self) -> bool {
        self.node_type.is_none() && self.attributes.is_none() && self.is_descendant_koko.is_none()
    }
}
