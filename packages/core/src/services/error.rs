//! Service Layer Error Types
//!
//! Errors raised by the session, synchronization and registry services. Table
//! errors are wrapped rather than flattened so callers can still match on the
//! structural cause.

use crate::db::ClosureError;
use crate::models::ValidationError;
use thiserror::Error;

/// Service operation errors
#[derive(Error, Debug)]
pub enum SessionError {
    /// A closure-table operation was rejected
    #[error(transparent)]
    Closure(#[from] ClosureError),

    /// User-tier deletes only apply to user-defined nodes
    #[error("Node '{node}' is not user-defined and cannot be deleted from the user table")]
    NotUserDefined { node: String },

    /// User nodes may only be attached under admin nodes
    #[error("Node '{parent}' is not a valid parent for a user node")]
    InvalidUserParent { parent: String },

    /// Node type keys are unique within a registry
    #[error("Node type '{key}' already exists")]
    TypeAlreadyExists { key: String },

    /// Attribute payload rejected by the node-type registry
    #[error("Node validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Configuration could not be used
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SessionError {
    pub fn not_user_defined(node: impl Into<String>) -> Self {
        Self::NotUserDefined { node: node.into() }
    }

    pub fn invalid_user_parent(parent: impl Into<String>) -> Self {
        Self::InvalidUserParent {
            parent: parent.into(),
        }
    }

    pub fn type_already_exists(key: impl Into<String>) -> Self {
        Self::TypeAlreadyExists { key: key.into() }
    }

    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}
