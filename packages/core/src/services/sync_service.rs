//! User Table Synchronization
//!
//! Reconciles a user table against the admin table after admin-side edits.
//! The admin table is authoritative for every admin-origin node; nodes the
//! user created (`is_user_defined = true`) survive and stay attached to the
//! same parent.
//!
//! # Algorithm
//!
//! 1. Partition the user table's nodes:
//!    - *common*: admin-origin nodes still present in the admin table
//!    - *stale*: admin-origin nodes deleted upstream
//!    - *user*: user-defined nodes (a user node whose name now exists in the
//!      admin table is treated as common, with a warning)
//! 2. Extend the common set with its admin ancestors, so a node moved under a
//!    new admin node keeps a complete ancestor chain.
//! 3. Take the admin rows whose endpoints both lie in that set, with node
//!    properties copied from the admin table and `is_user_defined = false`.
//! 4. Drop stale nodes and every row that touches them.
//! 5. Re-anchor user nodes parents-first: each one's ancestor rows are its
//!    surviving parent's rows plus one. A user node whose parent was stale
//!    becomes a detached root, keeping its own user subtree.
//!
//! The result satisfies every closure invariant and synchronizing it again
//! against the same admin table yields the same table.

use std::collections::{BTreeSet, HashMap};

use crate::db::ClosureTable;
use crate::models::{ClosurePath, Node};

/// Counts describing one synchronization pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Admin-origin nodes refreshed from the admin table
    pub refreshed: usize,
    /// Admin ancestors pulled into the user table
    pub imported: usize,
    /// Admin-origin nodes removed because they no longer exist upstream
    pub removed: usize,
    /// User-defined nodes re-anchored under their parent
    pub reanchored: usize,
    /// User-defined nodes that lost their parent and became roots
    pub detached: usize,
}

/// Synchronize `user` against `admin`, returning the new user table
///
/// # Examples
///
/// ```rust
/// use datamap_core::db::ClosureTable;
/// use datamap_core::models::Node;
/// use datamap_core::services::synchronize;
///
/// let mut admin = ClosureTable::new();
/// admin.add_root(Node::new("Zem").admin())?;
/// admin.add_node("Zem", Node::new("Živé").admin())?;
///
/// let mut user = admin.clone();
/// user.add_node("Živé", Node::new("Môj pes"))?;
///
/// admin.delete_node("Živé")?;
/// let user = synchronize(&user, &admin);
///
/// assert!(!user.contains("Živé"));
/// assert_eq!(user.roots(), vec!["Môj pes", "Zem"]);
/// # Ok::<(), datamap_core::db::ClosureError>(())
/// ```
pub fn synchronize(user: &ClosureTable, admin: &ClosureTable) -> ClosureTable {
    synchronize_with_report(user, admin).0
}

/// Same as [`synchronize`], also returning what changed
pub fn synchronize_with_report(
    user: &ClosureTable,
    admin: &ClosureTable,
) -> (ClosureTable, SyncReport) {
    let mut report = SyncReport::default();

    let mut common: BTreeSet<&str> = BTreeSet::new();
    let mut user_nodes: Vec<&Node> = Vec::new();

    for node in user.unique_nodes() {
        let upstream = admin.contains(&node.name);
        match (node.is_user_defined, upstream) {
            (false, true) => {
                common.insert(node.name.as_str());
            }
            (false, false) => report.removed += 1,
            (true, true) => {
                tracing::warn!(
                    "User node '{}' collides with an admin node, keeping the admin copy",
                    node.name
                );
                common.insert(node.name.as_str());
            }
            (true, false) => user_nodes.push(node),
        }
    }
    report.refreshed = common.len();

    // Ancestor closure over the admin table
    let mut kept: BTreeSet<&str> = common.clone();
    for name in &common {
        for row in admin.ancestor_rows(name) {
            if kept.insert(row.ancestor.as_str()) {
                report.imported += 1;
            }
        }
    }

    let mut nodes: Vec<Node> = Vec::with_capacity(kept.len() + user_nodes.len());
    let mut paths: Vec<ClosurePath> = Vec::new();

    for name in &kept {
        if let Some(node) = admin.node(name) {
            nodes.push(node.clone().with_user_defined(false));
        }
        paths.extend(
            admin
                .descendant_rows(name)
                .filter(|row| kept.contains(row.descendant.as_str()))
                .cloned(),
        );
    }

    // Parents first, following direct-parent links rather than row counts so
    // an incomplete imported closure still anchors children under parents
    let user_names: BTreeSet<&str> = user_nodes.iter().map(|n| n.name.as_str()).collect();
    let mut ordered: Vec<&Node> = Vec::with_capacity(user_nodes.len());
    let mut queued: BTreeSet<&str> = BTreeSet::new();

    for node in &user_nodes {
        let mut chain: Vec<&Node> = Vec::new();
        let mut current = Some(*node);
        while let Some(n) = current {
            if queued.contains(n.name.as_str()) || chain.iter().any(|c| c.name == n.name) {
                break;
            }
            chain.push(n);
            current = user
                .parent_of(&n.name)
                .filter(|p| user_names.contains(p))
                .and_then(|p| user.node(p));
        }
        for n in chain.into_iter().rev() {
            queued.insert(n.name.as_str());
            ordered.push(n);
        }
    }

    let mut anchored: HashMap<&str, Vec<(String, u32)>> = HashMap::new();
    for node in ordered {
        let parent = user.parent_of(&node.name);

        let above: Vec<(String, u32)> = match parent {
            Some(parent) if kept.contains(parent) => admin
                .ancestor_rows(parent)
                .map(|row| (row.ancestor.clone(), row.depth))
                .collect(),
            Some(parent) => match anchored.get(parent) {
                Some(rows) => rows.clone(),
                None => Vec::new(),
            },
            None => Vec::new(),
        };

        if above.is_empty() {
            if let Some(parent) = parent {
                tracing::info!(
                    "User node '{}' lost its parent '{}', keeping it as a detached root",
                    node.name,
                    parent
                );
                report.detached += 1;
            }
        } else {
            report.reanchored += 1;
        }

        let mut rows: Vec<(String, u32)> = above
            .into_iter()
            .map(|(ancestor, depth)| (ancestor, depth + 1))
            .collect();
        rows.push((node.name.clone(), 0));

        paths.extend(
            rows.iter()
                .map(|(ancestor, depth)| ClosurePath::new(ancestor.clone(), node.name.clone(), *depth)),
        );
        anchored.insert(node.name.as_str(), rows);
        nodes.push(node.clone());
    }

    let result = ClosureTable::from_parts(nodes, paths);

    tracing::info!(
        "Synchronized user table: {} refreshed, {} imported, {} removed, {} re-anchored, {} detached",
        report.refreshed,
        report.imported,
        report.removed,
        report.reanchored,
        report.detached
    );

    (result, report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// Zem -> Živé -> {Zviera -> Pes, Rastlina}
    fn admin_table() -> ClosureTable {
        let mut admin = ClosureTable::new();
        admin.add_root(Node::new("Zem").admin().with_koko(true)).unwrap();
        admin
            .add_node("Zem", Node::new("Živé").admin().with_koko(true))
            .unwrap();
        admin
            .add_node("Živé", Node::new("Zviera").admin().with_koko(true))
            .unwrap();
        admin
            .add_node("Živé", Node::new("Rastlina").admin().with_koko(true))
            .unwrap();
        admin
            .add_node("Zviera", Node::new("Pes").admin().with_koko(true))
            .unwrap();
        admin
    }

    /// Admin table plus user nodes Môj pes (under Pes) and Šteňa (under Môj pes)
    fn user_table(admin: &ClosureTable) -> ClosureTable {
        let mut user = admin.clone();
        user.add_node("Pes", Node::new("Môj pes")).unwrap();
        user.add_node("Môj pes", Node::new("Šteňa")).unwrap();
        user
    }

    #[test]
    fn test_sync_without_admin_changes_is_identity() {
        let admin = admin_table();
        let user = user_table(&admin);

        let (synced, report) = synchronize_with_report(&user, &admin);

        assert_eq!(synced, user);
        assert_eq!(report.removed, 0);
        assert_eq!(report.reanchored, 2);
    }

    #[test]
    fn test_sync_is_idempotent() {
        let mut admin = admin_table();
        let user = user_table(&admin);
        admin.move_node("Pes", "Rastlina").unwrap();
        admin.delete_node("Zviera").unwrap();

        let once = synchronize(&user, &admin);
        let twice = synchronize(&once, &admin);

        assert_eq!(once, twice);
        assert!(once.validate().is_empty());
    }

    #[test]
    fn test_user_nodes_follow_moved_admin_parent() {
        let mut admin = admin_table();
        let user = user_table(&admin);
        admin.move_node("Pes", "Rastlina").unwrap();

        let synced = synchronize(&user, &admin);

        assert_eq!(synced.parent_of("Pes"), Some("Rastlina"));
        assert_eq!(synced.parent_of("Môj pes"), Some("Pes"));
        assert_eq!(synced.depth_between("Rastlina", "Šteňa"), Some(3));
        assert_eq!(synced.depth_between("Zviera", "Môj pes"), None);
        assert!(synced.validate().is_empty());
    }

    #[test]
    fn test_moved_under_new_admin_node_imports_ancestor() {
        let mut admin = admin_table();
        let user = user_table(&admin);
        admin
            .add_node("Živé", Node::new("Cicavce").admin().with_koko(true))
            .unwrap();
        admin.move_node("Pes", "Cicavce").unwrap();

        let (synced, report) = synchronize_with_report(&user, &admin);

        assert!(synced.contains("Cicavce"));
        assert!(!synced.node("Cicavce").unwrap().is_user_defined);
        assert_eq!(synced.depth_between("Živé", "Môj pes"), Some(3));
        assert_eq!(report.imported, 1);
        assert!(synced.validate().is_empty());
    }

    #[test]
    fn test_deleted_admin_parent_detaches_user_subtree() {
        let mut admin = admin_table();
        let user = user_table(&admin);
        admin.delete_node("Zviera").unwrap();

        let (synced, report) = synchronize_with_report(&user, &admin);

        assert!(!synced.contains("Zviera"));
        assert!(!synced.contains("Pes"));
        assert!(synced.roots().contains(&"Môj pes"));
        assert_eq!(synced.parent_of("Šteňa"), Some("Môj pes"));
        assert_eq!(report.removed, 2);
        assert_eq!(report.detached, 1);
        assert!(synced.validate().is_empty());
    }

    #[test]
    fn test_admin_properties_overwrite_user_copy() {
        let mut admin = admin_table();
        let user = user_table(&admin);
        admin
            .update_node(
                "Pes",
                &crate::models::NodeUpdate::new()
                    .with_node_type("zviera")
                    .with_attributes(json!({"plemeno": "jazvečík"})),
            )
            .unwrap();

        let synced = synchronize(&user, &admin);

        let pes = synced.node("Pes").unwrap();
        assert_eq!(pes.node_type.as_deref(), Some("zviera"));
        assert_eq!(pes.attributes["plemeno"], "jazvečík");
        assert!(!pes.is_user_defined);
    }

    #[test]
    fn test_admin_nodes_outside_user_view_are_not_imported() {
        let mut admin = admin_table();
        let user = user_table(&admin);
        admin.add_root(Node::new("Vesmír").admin()).unwrap();

        let synced = synchronize(&user, &admin);

        assert!(!synced.contains("Vesmír"));
    }

    #[test]
    fn test_incomplete_user_rows_keep_user_parent() {
        let admin = admin_table();
        let full = user_table(&admin);
        // Šteňa keeps only its direct edge, so it has fewer rows than its parent
        let user = ClosureTable::from_parts(
            full.unique_nodes().cloned(),
            full.paths()
                .filter(|p| p.descendant != "Šteňa" || p.depth <= 1)
                .cloned(),
        );
        assert!(!user.validate().is_empty());

        let (synced, report) = synchronize_with_report(&user, &admin);

        assert_eq!(synced.parent_of("Šteňa"), Some("Môj pes"));
        assert_eq!(synced.depth_between("Zem", "Šteňa"), Some(5));
        assert_eq!(synced.roots(), vec!["Zem"]);
        assert_eq!(report.detached, 0);
        assert!(synced.validate().is_empty());
    }

    #[test]
    fn test_user_parent_cycle_is_broken() {
        let admin = admin_table();
        let user = ClosureTable::from_parts(
            vec![Node::new("A"), Node::new("B")],
            vec![
                ClosurePath::new("A", "A", 0),
                ClosurePath::new("B", "B", 0),
                ClosurePath::new("A", "B", 1),
                ClosurePath::new("B", "A", 1),
            ],
        );

        let synced = synchronize(&user, &admin);

        assert_eq!(synced.parent_of("A"), Some("B"));
        assert_eq!(synced.parent_of("B"), None);
        assert!(synced.validate().is_empty());
    }

    #[test]
    fn test_sync_of_empty_user_table() {
        let admin = admin_table();
        let synced = synchronize(&ClosureTable::new(), &admin);
        assert!(synced.is_empty());
    }
}
