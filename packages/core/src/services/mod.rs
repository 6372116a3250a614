//! Services
//!
//! This module contains the logic layered on top of the closure table:
//!
//! - `Session` - owns the admin and user tables and applies both workflows
//! - `synchronize` - reconciles a user table against the admin table
//! - `TreeView` / `completion_score` - read-only projections for presentation
//! - `NodeTypeRegistry` - node type taxonomy loaded from JSON
//!
//! Services never touch rows directly; every structural edit goes through
//! `ClosureTable` so the closure invariants are maintained in one place.

pub mod error;
pub mod node_type_registry;
pub mod session;
pub mod sync_service;
pub mod view_service;

pub use error::SessionError;
pub use node_type_registry::NodeTypeRegistry;
pub use session::Session;
pub use sync_service::{synchronize, synchronize_with_report, SyncReport};
pub use view_service::{completion_score, CompletionScore, TreeNode, TreeView};
