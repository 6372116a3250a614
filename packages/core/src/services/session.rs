//! Session Context
//!
//! A `Session` owns one admin table and one user table and applies the two
//! editing workflows to them:
//!
//! - **Admin workflow**: structural edits to the canonical admin table. New
//!   nodes are admin-origin, carry the configured koko flag and (optionally) a
//!   stamped `uuid` attribute. With `auto_synchronize` the user table is
//!   reconciled after every edit.
//! - **User workflow**: users attach their own nodes under admin nodes and may
//!   delete only what they created.
//!
//! Presentation reads go through [`Session::combined`], the admin table
//! merged with the user table.
//!
//! # Examples
//!
//! ```rust
//! use datamap_core::config::DataMapConfig;
//! use datamap_core::services::Session;
//!
//! let mut session = Session::new(DataMapConfig::default())?;
//! session.add_admin_node("Živé", "Zviera", None, None)?;
//! session.add_user_node("Zviera", "Môj pes")?;
//!
//! session.move_admin_node("Zviera", "Zem")?;
//! assert_eq!(session.user().parent_of("Môj pes"), Some("Zviera"));
//! assert_eq!(session.combined().depth_between("Zem", "Môj pes"), Some(2));
//! # Ok::<(), datamap_core::services::SessionError>(())
//! ```

use std::borrow::Cow;
use std::path::Path;

use serde_json::Value;
use uuid::Uuid;

use crate::config::DataMapConfig;
use crate::db::{tabular, ClosureError, ClosureTable};
use crate::models::{Node, NodeUpdate, ValidationError};
use crate::services::error::SessionError;
use crate::services::node_type_registry::NodeTypeRegistry;
use crate::services::sync_service::{synchronize, synchronize_with_report, SyncReport};
use crate::services::view_service::{completion_score, CompletionScore, TreeView};

#[derive(Debug, Clone)]
pub struct Session {
    admin: ClosureTable,
    user: ClosureTable,
    config: DataMapConfig,
    registry: Option<NodeTypeRegistry>,
}

impl Session {
    /// Create a session with the admin table seeded from `config.seed` and an
    /// empty user table.
    pub fn new(config: DataMapConfig) -> Result<Self, SessionError> {
        config.validate().map_err(SessionError::invalid_config)?;

        let mut admin = ClosureTable::new();
        for edge in &config.seed {
            if !admin.contains(&edge.parent) {
                admin.add_root(seed_node(&edge.parent, &config))?;
            }
            admin.add_node(&edge.parent, seed_node(&edge.child, &config))?;
        }

        tracing::info!(
            "Created session with {} seeded admin node(s)",
            admin.node_count()
        );

        Ok(Self {
            admin,
            user: ClosureTable::new(),
            config,
            registry: None,
        })
    }

    /// Build a session around existing tables; the user table is synchronized
    /// against the admin table first.
    pub fn from_tables(config: DataMapConfig, admin: ClosureTable, user: ClosureTable) -> Self {
        let user = synchronize(&user, &admin);
        Self {
            admin,
            user,
            config,
            registry: None,
        }
    }

    /// Validate admin-added node types and attributes against `registry`
    pub fn with_registry(mut self, registry: NodeTypeRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn admin(&self) -> &ClosureTable {
        &self.admin
    }

    pub fn user(&self) -> &ClosureTable {
        &self.user
    }

    pub fn config(&self) -> &DataMapConfig {
        &self.config
    }

    pub fn registry(&self) -> Option<&NodeTypeRegistry> {
        self.registry.as_ref()
    }

    // ---------------------------------------------------------------------
    // Admin workflow
    // ---------------------------------------------------------------------

    /// Add an admin node under `parent`.
    ///
    /// With a registry attached, `node_type` may be a type key or display
    /// name; it is stored as the key and the attributes are checked against
    /// the type definition.
    ///
    /// # Errors
    ///
    /// - `Closure(NodeAlreadyExists)` if the name is taken in either table
    /// - `Closure(ParentNotFound)` if `parent` is not an admin node
    /// - `Validation` for a bad name, non-object attributes, an unknown type or
    ///   attributes that do not fit the type
    pub fn add_admin_node(
        &mut self,
        parent: &str,
        name: &str,
        node_type: Option<&str>,
        attributes: Option<Value>,
    ) -> Result<(), SessionError> {
        if self.user.contains(name) && !self.admin.contains(name) {
            return Err(ClosureError::node_already_exists(name).into());
        }

        let mut attributes = attributes.unwrap_or_else(|| Value::Object(serde_json::Map::new()));
        let node_type = match node_type {
            Some(node_type) => Some(self.check_type(node_type, &attributes)?),
            None => None,
        };

        if self.config.stamp_uuid {
            if let Some(object) = attributes.as_object_mut() {
                object.insert("uuid".to_string(), Value::String(Uuid::new_v4().to_string()));
            }
        }

        let mut node = Node::new(name)
            .admin()
            .with_koko(self.config.admin_koko_default)
            .with_attributes(attributes);
        node.node_type = node_type;

        self.admin.add_node(parent, node)?;
        tracing::info!("Admin added '{}' under '{}'", name, parent);

        self.after_admin_change();
        Ok(())
    }

    /// Delete an admin node and its subtree, returning the removed names
    pub fn delete_admin_node(&mut self, name: &str) -> Result<Vec<String>, SessionError> {
        let removed = self.admin.delete_node(name)?;
        tracing::info!("Admin deleted '{}' ({} node(s))", name, removed.len());

        self.after_admin_change();
        Ok(removed)
    }

    pub fn move_admin_node(&mut self, name: &str, new_parent: &str) -> Result<(), SessionError> {
        self.admin.move_node(name, new_parent)?;
        tracing::info!("Admin moved '{}' under '{}'", name, new_parent);

        self.after_admin_change();
        Ok(())
    }

    /// Edit an admin node's type, attributes or koko flag
    pub fn update_admin_node(&mut self, name: &str, update: &NodeUpdate) -> Result<(), SessionError> {
        let mut update = update.clone();

        if let Some(current) = self.admin.node(name) {
            let mut candidate = current.clone();
            candidate.apply_update(&update);
            if let Some(node_type) = candidate.node_type.as_deref() {
                let key = self.check_type(node_type, &candidate.attributes)?;
                if update.node_type.is_some() {
                    update.node_type = Some(Some(key));
                }
            }
        }

        self.admin.update_node(name, &update)?;
        tracing::info!("Admin updated '{}'", name);

        self.after_admin_change();
        Ok(())
    }

    /// Reconcile the user table with the admin table now
    pub fn synchronize(&mut self) -> SyncReport {
        let (user, report) = synchronize_with_report(&self.user, &self.admin);
        self.user = user;
        report
    }

    fn after_admin_change(&mut self) {
        if self.config.auto_synchronize {
            self.synchronize();
        }
    }

    /// Resolve a type reference and validate attributes against it. Without a
    /// registry the reference is stored as given.
    fn check_type(&self, node_type: &str, attributes: &Value) -> Result<String, SessionError> {
        let Some(registry) = &self.registry else {
            return Ok(node_type.to_string());
        };

        let (key, definition) = registry
            .resolve(node_type)
            .ok_or_else(|| ValidationError::UnknownNodeType(node_type.to_string()))?;
        definition.validate_attributes(key, attributes)?;
        Ok(key.to_string())
    }

    // ---------------------------------------------------------------------
    // User workflow
    // ---------------------------------------------------------------------

    /// Admin-origin nodes a user node may be attached under, sorted
    pub fn valid_user_parents(&self) -> Vec<&str> {
        self.admin
            .unique_nodes()
            .filter(|n| !n.is_user_defined)
            .map(|n| n.name.as_str())
            .collect()
    }

    /// User-defined nodes in the user table, sorted
    pub fn deletable_user_nodes(&self) -> Vec<&str> {
        self.user.user_defined_nodes().collect()
    }

    /// Attach a new user node under the admin node `parent`.
    ///
    /// The user table is rebuilt as `admin.merge(user)` plus the new node, so
    /// it picks up every current admin node.
    pub fn add_user_node(&mut self, parent: &str, name: &str) -> Result<(), SessionError> {
        match self.admin.node(parent) {
            Some(node) if !node.is_user_defined => {}
            _ => return Err(SessionError::invalid_user_parent(parent)),
        }
        if self.admin.contains(name) || self.user.contains(name) {
            return Err(ClosureError::node_already_exists(name).into());
        }

        let mut user = self.admin.merge(&self.synchronized_user());
        user.add_node(parent, Node::new(name))?;
        self.user = user;

        tracing::info!("User added '{}' under '{}'", name, parent);
        Ok(())
    }

    /// Delete a user-defined node and its subtree from the user table
    pub fn delete_user_node(&mut self, name: &str) -> Result<Vec<String>, SessionError> {
        match self.user.node(name) {
            Some(node) if node.is_user_defined => {}
            Some(_) => return Err(SessionError::not_user_defined(name)),
            None => return Err(ClosureError::node_not_found(name).into()),
        }

        let removed = self.user.delete_node(name)?;
        tracing::info!("User deleted '{}' ({} node(s))", name, removed.len());
        Ok(removed)
    }

    // ---------------------------------------------------------------------
    // Views
    // ---------------------------------------------------------------------

    /// Admin table merged with the user table
    pub fn combined(&self) -> ClosureTable {
        self.admin.merge(&self.synchronized_user())
    }

    /// The user table as it stands after synchronizing with the admin table.
    /// Without `auto_synchronize` admin edits may have left it behind.
    fn synchronized_user(&self) -> Cow<'_, ClosureTable> {
        if self.config.auto_synchronize {
            Cow::Borrowed(&self.user)
        } else {
            Cow::Owned(synchronize(&self.user, &self.admin))
        }
    }

    pub fn tree_view(&self) -> TreeView {
        TreeView::new(&self.combined())
    }

    pub fn completion_score(&self) -> CompletionScore {
        completion_score(&self.combined())
    }

    // ---------------------------------------------------------------------
    // Table replacement and persistence
    // ---------------------------------------------------------------------

    /// Replace the admin table; the user table is synchronized against it
    pub fn replace_admin(&mut self, table: ClosureTable) -> SyncReport {
        self.admin = table;
        self.synchronize()
    }

    /// Replace the user table, synchronized against the current admin table
    pub fn replace_user(&mut self, table: ClosureTable) -> SyncReport {
        let (user, report) = synchronize_with_report(&table, &self.admin);
        self.user = user;
        report
    }

    pub fn load_admin_csv(&mut self, path: impl AsRef<Path>) -> Result<SyncReport, SessionError> {
        let table = tabular::read_table_from_path(path)?;
        Ok(self.replace_admin(table))
    }

    pub fn load_user_csv(&mut self, path: impl AsRef<Path>) -> Result<SyncReport, SessionError> {
        let table = tabular::read_table_from_path(path)?;
        Ok(self.replace_user(table))
    }

    pub fn save_admin_csv(&self, path: impl AsRef<Path>) -> Result<(), SessionError> {
        Ok(tabular::write_table_to_path(&self.admin, path)?)
    }

    pub fn save_user_csv(&self, path: impl AsRef<Path>) -> Result<(), SessionError> {
        Ok(tabular::write_table_to_path(&self.user, path)?)
    }
}

fn seed_node(name: &str, config: &DataMapConfig) -> Node {
    Node::new(name)
        .admin()
        .with_koko(config.admin_koko_default)
}

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;
