//! Datamap Core
//!
//! Closure-table engine for hierarchies of typed, attributed nodes, with an
//! admin/user reconciliation layer on top.
//!
//! # Architecture
//!
//! - **Closure table**: every ancestor/descendant pair is stored with its path
//!   length, so subtree and ancestor queries are filters rather than
//!   traversals. Node properties live in a registry next to the relation.
//! - **Two tiers**: the admin table is canonical; the user table is derived
//!   from it and additionally holds user-authored nodes, which survive
//!   synchronization.
//! - **Synchronous and in-memory**: tables are plain values owned by a
//!   `Session`. CSV is the exchange format.
//!
//! # Modules
//!
//! - [`models`] - Node, closure path and node type definitions
//! - [`db`] - The closure table, invariant checks and CSV exchange
//! - [`services`] - Session, synchronization, views and the type registry
//! - [`operations`] - Structured edit commands and their executor
//! - [`config`] - Session configuration

pub mod config;
pub mod db;
pub mod models;
pub mod operations;
pub mod services;

// Re-export commonly used types
pub use config::{DataMapConfig, SeedEdge};
pub use db::{ClosureError, ClosureTable};
pub use models::*;
pub use operations::{execute, OperationError, OperationOutcome, TreeCommand};
pub use services::*;
