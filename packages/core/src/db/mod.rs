//! Closure Table Layer
//!
//! In-memory storage for hierarchies of named nodes:
//!
//! - `ClosureTable`: path relation plus node registry, with the structural
//!   operations (add, delete, move, merge) and read-only queries
//! - `ClosureError`: structural errors raised by those operations
//! - `InvariantViolation`: diagnostics returned by `ClosureTable::validate`
//! - `tabular`: CSV exchange format for closure tables
//!
//! # Architecture
//!
//! A table is a plain value. It owns its rows and registry, has no interior
//! mutability and does no I/O; persistence happens only through [`tabular`].

mod closure_table;
mod error;
mod invariants;
pub mod tabular;

pub use closure_table::ClosureTable;
pub use error::ClosureError;
pub use invariants::InvariantViolation;
