//! Error types for tree commands
//!
//! Command errors cover malformed commands (missing fields, unknown
//! operations) and wrap the session errors raised while applying them.

use crate::services::SessionError;
use thiserror::Error;

/// Errors that can occur while parsing or executing a `TreeCommand`
///
/// # Examples
///
/// ```rust
/// use datamap_core::operations::OperationError;
///
/// let err = OperationError::missing_field("move_node", "parent");
/// assert_eq!(err.to_string(), "Operation 'move_node' requires field 'parent'");
/// ```
#[derive(Error, Debug)]
pub enum OperationError {
    /// A field the operation needs was absent or empty
    #[error("Operation '{operation}' requires field '{field}'")]
    MissingField { operation: String, field: String },

    /// The `operation` tag names no known operation
    #[error("Unknown operation: {0}")]
    UnknownOperation(String),

    /// The command source could not interpret the request
    #[error("Command could not be processed: {0}")]
    Unrecognized(String),

    /// Command payload is not valid JSON or has the wrong shape
    #[error("Invalid command: {0}")]
    InvalidCommand(#[from] serde_json::Error),

    /// Applying the command failed
    #[error(transparent)]
    Session(#[from] SessionError),
}

impl OperationError {
    pub fn missing_field(operation: impl Into<String>, field: impl Into<String>) -> Self {
        Self::MissingField {
            operation: operation.into(),
            field: field.into(),
        }
    }

    pub fn unknown_operation(operation: impl Into<String>) -> Self {
        Self::UnknownOperation(operation.into())
    }
}
