//! Node Type Definitions
//!
//! Data structures for the external node-type taxonomy. A closure table only
//! stores a node's type key; the definitions below are what callers (type
//! editors, renderers, command executors) look that key up in.
//!
//! ## Example Registry Entry
//!
//! ```json
//! {
//!   "miesto": {
//!     "name": "Miesto",
//!     "color": "#4CAF50",
//!     "attributes": [
//!       { "name": "adresa", "type": "string", "required": true, "description": "Ulica a mesto" },
//!       { "name": "kapacita", "type": "integer", "required": false }
//!     ]
//!   }
//! }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::node::ValidationError;

/// Fallback color for unknown or uncolored types
pub const DEFAULT_TYPE_COLOR: &str = "#CCCCCC";

fn default_color() -> String {
    DEFAULT_TYPE_COLOR.to_string()
}

/// Value type of a single attribute
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AttributeType {
    String,
    Number,
    Integer,
    Boolean,
    Object,
    Array,
}

impl AttributeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttributeType::String => "string",
            AttributeType::Number => "number",
            AttributeType::Integer => "integer",
            AttributeType::Boolean => "boolean",
            AttributeType::Object => "object",
            AttributeType::Array => "array",
        }
    }

    /// Whether a JSON value is acceptable for this type
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            AttributeType::String => value.is_string(),
            AttributeType::Number => value.is_number(),
            AttributeType::Integer => value.is_i64() || value.is_u64(),
            AttributeType::Boolean => value.is_boolean(),
            AttributeType::Object => value.is_object(),
            AttributeType::Array => value.is_array(),
        }
    }
}

/// Definition of a single attribute in a node type
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AttributeDefinition {
    pub name: String,

    #[serde(rename = "type")]
    pub attribute_type: AttributeType,

    #[serde(default)]
    pub required: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Complete definition of a node type
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeTypeDefinition {
    /// Display name shown to users
    pub name: String,

    #[serde(default = "default_color")]
    pub color: String,

    #[serde(default)]
    pub attributes: Vec<AttributeDefinition>,
}

impl NodeTypeDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            color: default_color(),
            attributes: Vec::new(),
        }
    }

    /// Get an attribute definition by name
    pub fn get_attribute(&self, attribute_name: &str) -> Option<&AttributeDefinition> {
        self.attributes.iter().find(|a| a.name == attribute_name)
    }

    pub fn required_attributes(&self) -> impl Iterator<Item = &AttributeDefinition> {
        self.attributes.iter().filter(|a| a.required)
    }

    /// Check an attribute object against this definition.
    ///
    /// Required attributes must be present and every declared attribute that is
    /// present must have the declared JSON type. Undeclared keys (such as the
    /// stamped `uuid`) are allowed.
    pub fn validate_attributes(&self, type_key: &str, attributes: &Value) -> Result<(), ValidationError> {
        let object = attributes.as_object().ok_or_else(|| {
            ValidationError::InvalidAttributes("attributes must be a JSON object".to_string())
        })?;

        for definition in &self.attributes {
            match object.get(&definition.name) {
                None | Some(Value::Null) if definition.required => {
                    return Err(ValidationError::MissingAttribute {
                        node_type: type_key.to_string(),
                        attribute: definition.name.clone(),
                    });
                }
                Some(value) if !value.is_null() && !definition.attribute_type.matches(value) => {
                    return Err(ValidationError::AttributeTypeMismatch {
                        attribute: definition.name.clone(),
                        expected: definition.attribute_type.as_str().to_string(),
                    });
                }
                _ => {}
            }
        }

        Ok(())
    }
}
