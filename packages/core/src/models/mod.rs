//! Data Models
//!
//! This module contains the core data structures used throughout datamap:
//!
//! - `Node` - a named, typed, attributed entity in a node registry
//! - `ClosurePath` - one `(ancestor, descendant, depth)` row of the closure relation
//! - `NodeTypeDefinition` - external type taxonomy entries referenced by `node_type`

mod closure_path;
mod node;
pub mod node_type;

pub use closure_path::ClosurePath;
pub use node::{Node, NodeUpdate, ValidationError};
pub use node_type::{AttributeDefinition, AttributeType, NodeTypeDefinition, DEFAULT_TYPE_COLOR};
