//! Closure Table Error Types
//!
//! Structural errors raised by closure-table operations. Every error is
//! detected before any row is touched, so a rejected operation leaves the
//! table exactly as it was.

use crate::models::ValidationError;
use thiserror::Error;

/// Errors raised by `ClosureTable` operations
///
/// # Examples
///
/// ```rust
/// use datamap_core::db::ClosureError;
///
/// let err = ClosureError::circular_move("Živé", "Pes");
/// assert_eq!(
///     err.to_string(),
///     "Node 'Živé' cannot be moved under its own descendant 'Pes'"
/// );
/// ```
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClosureError {
    /// Referenced node does not exist in the table
    #[error("Node '{node}' does not exist")]
    NodeNotFound { node: String },

    /// `add_node` was given a parent that is not in the table
    #[error("Parent node '{parent}' does not exist")]
    ParentNotFound { parent: String },

    /// Node names are unique within a table
    #[error("Node '{node}' already exists")]
    NodeAlreadyExists { node: String },

    /// A node with no ancestors has no parent link to rewrite
    #[error("Node '{node}' is a root node and cannot be moved")]
    RootCannotMove { node: String },

    /// The target parent lies inside the moved subtree (or is the node itself)
    #[error("Node '{node}' cannot be moved under its own descendant '{new_parent}'")]
    CircularMove { node: String, new_parent: String },

    /// The node value itself is invalid
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl ClosureError {
    pub fn node_not_found(node: impl Into<String>) -> Self {
        Self::NodeNotFound { node: node.into() }
    }

    pub fn parent_not_found(parent: impl Into<String>) -> Self {
        Self::ParentNotFound {
            parent: parent.into(),
        }
    }

    pub fn node_already_exists(node: impl Into<String>) -> Self {
        Self::NodeAlreadyExists { node: node.into() }
    }

    pub fn root_cannot_move(node: impl Into<String>) -> Self {
        Self::RootCannotMove { node: node.into() }
    }

    pub fn circular_move(node: impl Into<String>, new_parent: impl Into<String>) -> Self {
        Self::CircularMove {
            node: node.into(),
            new_parent: new_parent.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_not_found_error() {
        let err = ClosureError::node_not_found("Pes");
        assert!(matches!(err, ClosureError::NodeNotFound { .. }));
        assert_eq!(format!("{}", err), "Node 'Pes' does not exist");
    }

    #[test]
    fn test_parent_not_found_error() {
        let err = ClosureError::parent_not_found("Zviera");
        assert_eq!(format!("{}", err), "Parent node 'Zviera' does not exist");
    }

    #[test]
    fn test_node_already_exists_error() {
        let err = ClosureError::node_already_exists("Zem");
        assert_eq!(format!("{}", err), "Node 'Zem' already exists");
    }

    #[test]
    fn test_root_cannot_move_error() {
        let err = ClosureError::root_cannot_move("Zem");
        assert!(matches!(err, ClosureError::RootCannotMove { .. }));
        assert_eq!(
            format!("{}", err),
            "Node 'Zem' is a root node and cannot be moved"
        );
    }

    #[test]
    fn test_validation_error_conversion() {
        let err: ClosureError = ValidationError::MissingField("name".to_string()).into();
        assert_eq!(
            format!("{}", err),
            "Validation error: Missing required field: name"
        );
    }
}
