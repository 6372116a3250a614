//! Tree Commands
//!
//! Structured edit commands for the admin table, in the JSON shape produced by
//! command front ends (form handlers, text interpreters):
//!
//! ```json
//! { "operation": "add_node", "node": "Pes", "parent": "Zviera",
//!   "node_type": "zviera", "attributes": { "vek": 3 } }
//! { "operation": "delete_node", "node": "Pes" }
//! { "operation": "move_node", "node": "Pes", "parent": "Cicavce" }
//! { "operation": "unknown", "error": "could not find a node name" }
//! ```
//!
//! Fields a given operation does not use are ignored, and `null` counts as
//! absent. [`execute`] never fails; it reports the result as an
//! [`OperationOutcome`] with a human-readable message.

pub mod error;

pub use error::OperationError;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::services::Session;

const KNOWN_OPERATIONS: [&str; 4] = ["add_node", "delete_node", "move_node", "unknown"];

/// One edit command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum TreeCommand {
    AddNode {
        #[serde(default)]
        node: Option<String>,
        #[serde(default)]
        parent: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        node_type: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        attributes: Option<Value>,
    },
    DeleteNode {
        #[serde(default)]
        node: Option<String>,
    },
    MoveNode {
        #[serde(default)]
        node: Option<String>,
        #[serde(default)]
        parent: Option<String>,
    },
    Unknown {
        #[serde(default)]
        error: Option<String>,
    },
}

impl TreeCommand {
    pub fn add_node(parent: impl Into<String>, node: impl Into<String>) -> Self {
        Self::AddNode {
            node: Some(node.into()),
            parent: Some(parent.into()),
            node_type: None,
            attributes: None,
        }
    }

    pub fn delete_node(node: impl Into<String>) -> Self {
        Self::DeleteNode {
            node: Some(node.into()),
        }
    }

    pub fn move_node(node: impl Into<String>, parent: impl Into<String>) -> Self {
        Self::MoveNode {
            node: Some(node.into()),
            parent: Some(parent.into()),
        }
    }

    /// The `operation` tag of this command
    pub fn operation(&self) -> &'static str {
        match self {
            Self::AddNode { .. } => "add_node",
            Self::DeleteNode { .. } => "delete_node",
            Self::MoveNode { .. } => "move_node",
            Self::Unknown { .. } => "unknown",
        }
    }

    /// Parse a command, reporting an unrecognized `operation` tag as
    /// `UnknownOperation` rather than a generic shape error
    pub fn from_json(json: &str) -> Result<Self, OperationError> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, OperationError> {
        match value.get("operation").and_then(Value::as_str) {
            Some(op) if KNOWN_OPERATIONS.contains(&op) => {}
            Some(op) => return Err(OperationError::unknown_operation(op)),
            None => return Err(OperationError::missing_field("command", "operation")),
        }
        Ok(serde_json::from_value(value)?)
    }
}

/// Result of executing a command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationOutcome {
    pub success: bool,
    pub message: String,
}

impl OperationOutcome {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

impl From<Result<String, OperationError>> for OperationOutcome {
    fn from(result: Result<String, OperationError>) -> Self {
        match result {
            Ok(message) => Self::success(message),
            Err(e) => Self::failure(e.to_string()),
        }
    }
}

/// Apply `command` to the session's admin table
///
/// # Examples
///
/// ```rust
/// use datamap_core::config::DataMapConfig;
/// use datamap_core::operations::{execute, TreeCommand};
/// use datamap_core::services::Session;
///
/// let mut session = Session::new(DataMapConfig::default())?;
///
/// let outcome = execute(&mut session, &TreeCommand::add_node("Živé", "Pes"));
/// assert!(outcome.success);
/// assert_eq!(outcome.message, "Node 'Pes' was added under 'Živé'");
///
/// let outcome = execute(&mut session, &TreeCommand::move_node("Zem", "Pes"));
/// assert!(!outcome.success);
/// # Ok::<(), datamap_core::services::SessionError>(())
/// ```
pub fn execute(session: &mut Session, command: &TreeCommand) -> OperationOutcome {
    let result = try_execute(session, command);
    match &result {
        Ok(message) => tracing::info!("{}: {}", command.operation(), message),
        Err(e) => tracing::warn!("{} rejected: {}", command.operation(), e),
    }
    result.into()
}

/// Like [`execute`], returning the success message or the error
pub fn try_execute(session: &mut Session, command: &TreeCommand) -> Result<String, OperationError> {
    match command {
        TreeCommand::AddNode {
            node,
            parent,
            node_type,
            attributes,
        } => {
            let node = required(node, "add_node", "node")?;
            let parent = required(parent, "add_node", "parent")?;
            let node_type = node_type.as_deref().filter(|t| !t.trim().is_empty());

            session.add_admin_node(parent, node, node_type, attributes.clone())?;

            Ok(match node_type {
                Some(node_type) => format!(
                    "Node '{}' of type '{}' was added under '{}'",
                    node, node_type, parent
                ),
                None => format!("Node '{}' was added under '{}'", node, parent),
            })
        }
        TreeCommand::DeleteNode { node } => {
            let node = required(node, "delete_node", "node")?;
            let removed = session.delete_admin_node(node)?;
            Ok(format!(
                "Node '{}' and its descendants were deleted ({} node(s))",
                node,
                removed.len()
            ))
        }
        TreeCommand::MoveNode { node, parent } => {
            let node = required(node, "move_node", "node")?;
            let parent = required(parent, "move_node", "parent")?;
            session.move_admin_node(node, parent)?;
            Ok(format!("Node '{}' was moved under '{}'", node, parent))
        }
        TreeCommand::Unknown { error } => Err(OperationError::Unrecognized(
            error.clone().unwrap_or_else(|| "unknown error".to_string()),
        )),
    }
}

fn required<'a>(
    value: &'a Option<String>,
    operation: &str,
    field: &str,
) -> Result<&'a str, OperationError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| OperationError::missing_field(operation, field))
}
