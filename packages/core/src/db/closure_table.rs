//! Closure Table
//!
//! In-memory closure relation over a node registry. The relation stores every
//! ancestor/descendant pair of a forest with its path length, so "all
//! descendants", "all ancestors" and "direct children" are plain filters with
//! no recursive traversal. The price is explicit maintenance on every
//! structural edit, which is what `add_node`, `delete_node` and `move_node` do.
//!
//! # Storage
//!
//! - `nodes`: `name → Node` registry (type, attributes, flags)
//! - `paths`: sorted set of `(ancestor, descendant, depth)` rows
//!
//! Because `paths` is ordered by ancestor first, descendant lookups are range
//! scans. Ancestor lookups scan the relation.
//!
//! # Examples
//!
//! ```rust
//! use datamap_core::db::ClosureTable;
//! use datamap_core::models::Node;
//!
//! let mut table = ClosureTable::new();
//! table.add_root(Node::new("Root").admin())?;
//! table.add_node("Root", Node::new("Mid"))?;
//! table.add_node("Mid", Node::new("Leaf"))?;
//!
//! assert_eq!(table.depth_between("Root", "Leaf"), Some(2));
//!
//! let removed = table.delete_node("Mid")?;
//! assert_eq!(removed, vec!["Leaf".to_string(), "Mid".to_string()]);
//! assert_eq!(table.len(), 1);
//! # Ok::<(), datamap_core::db::ClosureError>(())
//! ```

use std::collections::{BTreeMap, BTreeSet};

use crate::models::{ClosurePath, Node, NodeUpdate, ValidationError};

use super::error::ClosureError;
use super::invariants::{self, InvariantViolation};

/// A closure table: path relation plus node registry
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClosureTable {
    nodes: BTreeMap<String, Node>,
    paths: BTreeSet<ClosurePath>,
}

impl ClosureTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Assemble a table from a registry and a set of rows without checking
    /// invariants. Duplicate rows collapse; use [`ClosureTable::validate`] to
    /// inspect the result.
    pub fn from_parts(
        nodes: impl IntoIterator<Item = Node>,
        paths: impl IntoIterator<Item = ClosurePath>,
    ) -> Self {
        Self {
            nodes: nodes
                .into_iter()
                .map(|node| (node.name.clone(), node))
                .collect(),
            paths: paths.into_iter().collect(),
        }
    }

    // ---------------------------------------------------------------------
    // Structural operations
    // ---------------------------------------------------------------------

    /// Create a new independent root (self path only).
    pub fn add_root(&mut self, node: Node) -> Result<&mut Self, ClosureError> {
        node.validate()?;
        if self.nodes.contains_key(&node.name) {
            return Err(ClosureError::node_already_exists(&node.name));
        }

        tracing::debug!("Adding root node '{}'", node.name);
        self.paths.insert(ClosurePath::self_path(&node.name));
        self.nodes.insert(node.name.clone(), node);
        Ok(self)
    }

    /// Add `node` as a direct child of `parent`.
    ///
    /// For every row `(a, parent, d)` (every ancestor of `parent`, `parent`
    /// itself included) a row `(a, node, d + 1)` is inserted, plus the self
    /// path. No existing row is modified.
    ///
    /// # Errors
    ///
    /// - `Validation` if the node value is invalid
    /// - `NodeAlreadyExists` if a node with the same name is present
    /// - `ParentNotFound` if `parent` is not in the table
    pub fn add_node(&mut self, parent: &str, node: Node) -> Result<&mut Self, ClosureError> {
        node.validate()?;
        if self.nodes.contains_key(&node.name) {
            return Err(ClosureError::node_already_exists(&node.name));
        }
        if !self.nodes.contains_key(parent) {
            return Err(ClosureError::parent_not_found(parent));
        }

        let new_rows: Vec<ClosurePath> = self
            .ancestor_rows(parent)
            .map(|row| ClosurePath::new(row.ancestor.clone(), node.name.clone(), row.depth + 1))
            .collect();

        tracing::debug!(
            "Adding node '{}' under '{}' ({} ancestor links)",
            node.name,
            parent,
            new_rows.len()
        );

        self.paths.extend(new_rows);
        self.paths.insert(ClosurePath::self_path(&node.name));
        self.nodes.insert(node.name.clone(), node);
        Ok(self)
    }

    /// Delete `node` together with its whole subtree.
    ///
    /// Every row whose ancestor or descendant lies in the subtree is removed,
    /// including the pass-through links from the subtree's ancestors.
    /// Returns the removed node names, sorted.
    pub fn delete_node(&mut self, node: &str) -> Result<Vec<String>, ClosureError> {
        if !self.nodes.contains_key(node) {
            return Err(ClosureError::node_not_found(node));
        }

        let mut doomed: BTreeSet<String> = self
            .descendant_rows(node)
            .map(|row| row.descendant.clone())
            .collect();
        doomed.insert(node.to_string());

        let before = self.paths.len();
        self.paths
            .retain(|p| !doomed.contains(&p.ancestor) && !doomed.contains(&p.descendant));
        for name in &doomed {
            self.nodes.remove(name);
        }

        tracing::debug!(
            "Deleted node '{}' with {} node(s), {} row(s) removed",
            node,
            doomed.len(),
            before - self.paths.len()
        );

        Ok(doomed.into_iter().collect())
    }

    /// Move `node` and its whole subtree under `new_parent`.
    ///
    /// Paths inside the subtree keep their depths; every link from an outside
    /// ancestor is recomputed as `depth(a, new_parent) + 1 + depth(node, s)`.
    ///
    /// # Errors
    ///
    /// - `NodeNotFound` if either node is missing
    /// - `RootCannotMove` if `node` has no ancestors
    /// - `CircularMove` if `new_parent` is `node` or one of its descendants
    ///
    /// The table is left unchanged when an error is returned.
    pub fn move_node(&mut self, node: &str, new_parent: &str) -> Result<&mut Self, ClosureError> {
        if !self.nodes.contains_key(node) {
            return Err(ClosureError::node_not_found(node));
        }
        if !self.nodes.contains_key(new_parent) {
            return Err(ClosureError::node_not_found(new_parent));
        }

        let outside_ancestors: BTreeSet<String> = self
            .ancestor_rows(node)
            .filter(|row| row.depth > 0)
            .map(|row| row.ancestor.clone())
            .collect();
        if outside_ancestors.is_empty() {
            return Err(ClosureError::root_cannot_move(node));
        }

        // Internal subtree rows, self path of `node` included
        let subtree: Vec<ClosurePath> = self.descendant_rows(node).cloned().collect();
        let members: BTreeSet<&str> = subtree.iter().map(|row| row.descendant.as_str()).collect();
        if node == new_parent || members.contains(new_parent) {
            return Err(ClosureError::circular_move(node, new_parent));
        }

        let new_links: Vec<ClosurePath> = self
            .ancestor_rows(new_parent)
            .flat_map(|upper| {
                subtree.iter().map(move |inner| {
                    ClosurePath::new(
                        upper.ancestor.clone(),
                        inner.descendant.clone(),
                        upper.depth + 1 + inner.depth,
                    )
                })
            })
            .collect();

        let members: BTreeSet<String> = members.into_iter().map(str::to_string).collect();
        self.paths.retain(|p| {
            !(outside_ancestors.contains(&p.ancestor) && members.contains(&p.descendant))
        });
        self.paths.extend(new_links);
        // Internal rows were never removed: their ancestors lie inside the subtree.

        tracing::debug!(
            "Moved node '{}' ({} node subtree) under '{}'",
            node,
            members.len(),
            new_parent
        );

        Ok(self)
    }

    /// Edit a node's properties in place. Structure is unchanged.
    pub fn update_node(&mut self, name: &str, update: &NodeUpdate) -> Result<&Node, ClosureError> {
        if let Some(attributes) = &update.attributes {
            if !attributes.is_object() {
                return Err(ValidationError::InvalidAttributes(
                    "attributes must be a JSON object".to_string(),
                )
                .into());
            }
        }

        let node = self
            .nodes
            .get_mut(name)
            .ok_or_else(|| ClosureError::node_not_found(name))?;
        node.apply_update(update);

        tracing::debug!("Updated node '{}'", name);
        Ok(&*node)
    }

    /// Row-union of this table and `other`, returned as a new table.
    ///
    /// Neither source is modified. Nodes present in both tables keep this
    /// table's registry entry and ancestor rows; if `other` disagrees about such
    /// a node, its copy is dropped and the divergence is logged.
    pub fn merge(&self, other: &ClosureTable) -> ClosureTable {
        let mut merged = self.clone();

        for path in &other.paths {
            if !self.nodes.contains_key(&path.descendant) {
                merged.paths.insert(path.clone());
            }
        }

        let mut divergent = Vec::new();
        for (name, node) in &other.nodes {
            match self.nodes.get(name) {
                None => {
                    merged.nodes.insert(name.clone(), node.clone());
                }
                Some(existing) => {
                    let ours: BTreeSet<&ClosurePath> = self.ancestor_rows(name).collect();
                    let theirs: BTreeSet<&ClosurePath> = other.ancestor_rows(name).collect();
                    if existing != node || ours != theirs {
                        divergent.push(name.as_str());
                    }
                }
            }
        }

        if !divergent.is_empty() {
            tracing::warn!(
                "Merge kept the receiving table's copy of {} divergent node(s): {}",
                divergent.len(),
                divergent.join(", ")
            );
        }

        merged
    }

    // ---------------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------------

    /// All node names, sorted
    pub fn all_nodes(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    /// All depth-1 rows (parent → child edges)
    pub fn direct_edges(&self) -> impl Iterator<Item = &ClosurePath> {
        self.paths.iter().filter(|p| p.is_direct_edge())
    }

    /// Names of nodes created through the user-tier workflow
    pub fn user_defined_nodes(&self) -> impl Iterator<Item = &str> {
        self.nodes
            .values()
            .filter(|n| n.is_user_defined)
            .map(|n| n.name.as_str())
    }

    /// One entry per node with its properties
    pub fn unique_nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Every row of the relation, sorted by `(ancestor, descendant, depth)`
    pub fn paths(&self) -> impl Iterator<Item = &ClosurePath> {
        self.paths.iter()
    }

    pub fn node(&self, name: &str) -> Option<&Node> {
        self.nodes.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    /// Proper ancestors of `name`, nearest first
    pub fn ancestors_of(&self, name: &str) -> Vec<&ClosurePath> {
        let mut rows: Vec<&ClosurePath> = self
            .paths
            .iter()
            .filter(|row| row.descendant == name && row.depth > 0)
            .collect();
        rows.sort_by_key(|row| row.depth);
        rows
    }

    /// Proper descendants of `name`, sorted by name
    pub fn descendants_of(&self, name: &str) -> Vec<&ClosurePath> {
        self.paths
            .range(ClosurePath::new(name, "", 0)..)
            .take_while(|row| row.ancestor == name)
            .filter(|row| row.depth > 0)
            .collect()
    }

    /// Direct children of `name`, sorted by name
    pub fn children_of(&self, name: &str) -> Vec<&str> {
        self.paths
            .range(ClosurePath::new(name, "", 0)..)
            .take_while(|row| row.ancestor == name)
            .filter(|row| row.is_direct_edge())
            .map(|row| row.descendant.as_str())
            .collect()
    }

    /// Direct parent of `name`, if any
    pub fn parent_of(&self, name: &str) -> Option<&str> {
        self.paths
            .iter()
            .find(|row| row.descendant == name && row.is_direct_edge())
            .map(|row| row.ancestor.as_str())
    }

    pub fn depth_between(&self, ancestor: &str, descendant: &str) -> Option<u32> {
        self.descendant_rows(ancestor)
            .find(|row| row.descendant == descendant)
            .map(|row| row.depth)
    }

    /// Nodes with no direct parent, sorted
    pub fn roots(&self) -> Vec<&str> {
        let children: BTreeSet<&str> = self
            .direct_edges()
            .map(|edge| edge.descendant.as_str())
            .collect();
        self.all_nodes()
            .filter(|name| !children.contains(name))
            .collect()
    }

    /// Number of rows in the relation
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty() && self.nodes.is_empty()
    }

    /// Check the closure invariants; an empty result means the table is valid.
    pub fn validate(&self) -> Vec<InvariantViolation> {
        invariants::check(&self.nodes, &self.paths)
    }

    // ---------------------------------------------------------------------
    // Crate-internal row access
    // ---------------------------------------------------------------------

    /// Rows whose descendant is `name` (self path included)
    pub(crate) fn ancestor_rows<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a ClosurePath> + 'a {
        self.paths.iter().filter(move |p| p.descendant == name)
    }

    /// Rows whose ancestor is `name` (self path included)
    pub(crate) fn descendant_rows<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a ClosurePath> + 'a {
        self.paths
            .range(ClosurePath::new(name, "", 0)..)
            .take_while(move |p| p.ancestor == name)
    }
}

#[cfg(test)]
#[path = "closure_table_test.rs"]
mod closure_table_test;
