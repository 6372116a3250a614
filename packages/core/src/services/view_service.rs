//! Tree View Projection
//!
//! Read-only projections of a closure table for presentation layers: child
//! adjacency, root set, a nested forest of [`TreeNode`]s, an indented text
//! outline and the completion score over koko nodes.
//!
//! Views are built from the depth-1 rows only; deeper rows are not needed to
//! reconstruct the forest.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::db::ClosureTable;

/// One node of the nested forest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeNode {
    pub name: String,
    pub node_type: Option<String>,
    pub is_user_defined: bool,
    pub is_descendant_koko: bool,
    pub attributes: Value,
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    /// Number of nodes in this subtree, itself included
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(TreeNode::size).sum::<usize>()
    }

    fn write_outline(&self, f: &mut fmt::Formatter<'_>, level: usize) -> fmt::Result {
        let marker = if self.is_user_defined { '+' } else { '*' };
        write!(f, "{}{} {}", "  ".repeat(level), marker, self.name)?;
        if let Some(node_type) = &self.node_type {
            write!(f, " [{}]", node_type)?;
        }
        writeln!(f)?;
        for child in &self.children {
            child.write_outline(f, level + 1)?;
        }
        Ok(())
    }
}

/// Completed end nodes out of all end nodes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionScore {
    pub completed: usize,
    pub total: usize,
}

impl CompletionScore {
    /// Completed share in `[0, 1]`; an empty score counts as complete
    pub fn ratio(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.completed as f64 / self.total as f64
        }
    }
}

impl fmt::Display for CompletionScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} ({:.0}%)",
            self.completed,
            self.total,
            self.ratio() * 100.0
        )
    }
}

/// Presentation-ready view of a closure table
///
/// # Examples
///
/// ```rust
/// use datamap_core::db::ClosureTable;
/// use datamap_core::models::Node;
/// use datamap_core::services::TreeView;
///
/// let mut table = ClosureTable::new();
/// table.add_root(Node::new("Zem").admin())?;
/// table.add_node("Zem", Node::new("Živé").admin())?;
///
/// let view = TreeView::new(&table);
/// assert_eq!(view.roots(), &["Zem".to_string()]);
/// assert_eq!(view.edge_lines(), vec!["Zem -> Živé".to_string()]);
/// assert_eq!(view.to_string(), "* Zem\n  * Živé\n");
/// # Ok::<(), datamap_core::db::ClosureError>(())
/// ```
#[derive(Debug, Clone)]
pub struct TreeView {
    adjacency: BTreeMap<String, Vec<String>>,
    roots: Vec<String>,
    forest: Vec<TreeNode>,
}

impl TreeView {
    pub fn new(table: &ClosureTable) -> Self {
        let mut adjacency: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for edge in table.direct_edges() {
            adjacency
                .entry(edge.ancestor.clone())
                .or_default()
                .push(edge.descendant.clone());
        }
        for children in adjacency.values_mut() {
            children.sort();
            children.dedup();
        }

        let roots: Vec<String> = table.roots().into_iter().map(str::to_string).collect();

        let mut visited = BTreeSet::new();
        let forest = roots
            .iter()
            .filter_map(|root| build_subtree(table, &adjacency, root, &mut visited))
            .collect();

        Self {
            adjacency,
            roots,
            forest,
        }
    }

    /// Children of `name`, sorted
    pub fn children(&self, name: &str) -> &[String] {
        self.adjacency.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn adjacency(&self) -> &BTreeMap<String, Vec<String>> {
        &self.adjacency
    }

    /// Nodes with no parent, sorted
    pub fn roots(&self) -> &[String] {
        &self.roots
    }

    pub fn forest(&self) -> &[TreeNode] {
        &self.forest
    }

    /// One `"parent -> child"` line per direct edge
    pub fn edge_lines(&self) -> Vec<String> {
        self.adjacency
            .iter()
            .flat_map(|(parent, children)| {
                children
                    .iter()
                    .map(move |child| format!("{} -> {}", parent, child))
            })
            .collect()
    }
}

impl fmt::Display for TreeView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for tree in &self.forest {
            tree.write_outline(f, 0)?;
        }
        Ok(())
    }
}

fn build_subtree(
    table: &ClosureTable,
    adjacency: &BTreeMap<String, Vec<String>>,
    name: &str,
    visited: &mut BTreeSet<String>,
) -> Option<TreeNode> {
    if !visited.insert(name.to_string()) {
        tracing::warn!("Node '{}' reached twice while building the tree view", name);
        return None;
    }

    let node = table.node(name);
    let children = adjacency
        .get(name)
        .into_iter()
        .flatten()
        .filter_map(|child| build_subtree(table, adjacency, child, visited))
        .collect();

    Some(TreeNode {
        name: name.to_string(),
        node_type: node.and_then(|n| n.node_type.clone()),
        is_user_defined: node.map(|n| n.is_user_defined).unwrap_or(false),
        is_descendant_koko: node.map(|n| n.is_descendant_koko).unwrap_or(false),
        attributes: node
            .map(|n| n.attributes.clone())
            .unwrap_or_else(|| Value::Object(serde_json::Map::new())),
        children,
    })
}

/// Completion score over the koko subset of `table`
///
/// End nodes are koko nodes that are not the direct parent of another koko
/// node. An end node is completed once it has at least one direct child of
/// any kind.
pub fn completion_score(table: &ClosureTable) -> CompletionScore {
    let is_koko = |name: &str| table.node(name).map(|n| n.is_descendant_koko).unwrap_or(false);

    let mut has_koko_child: BTreeSet<&str> = BTreeSet::new();
    let mut has_child: BTreeSet<&str> = BTreeSet::new();
    for edge in table.direct_edges() {
        has_child.insert(edge.ancestor.as_str());
        if is_koko(edge.descendant.as_str()) {
            has_koko_child.insert(edge.ancestor.as_str());
        }
    }

    let mut score = CompletionScore::default();
    for node in table.unique_nodes().filter(|n| n.is_descendant_koko) {
        if has_koko_child.contains(node.name.as_str()) {
            continue;
        }
        score.total += 1;
        if has_child.contains(node.name.as_str()) {
            score.completed += 1;
        }
    }

    tracing::debug!("Completion score {}", score);
    score
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Node;

    /// Zem(k) -> Živé(k) -> {Pes(k) -> Môj pes, Mačka(k)}
    fn koko_table() -> ClosureTable {
        let mut table = ClosureTable::new();
        table.add_root(Node::new("Zem").admin().with_koko(true)).unwrap();
        table
            .add_node("Zem", Node::new("Živé").admin().with_koko(true))
            .unwrap();
        table
            .add_node(
                "Živé",
                Node::new("Pes").admin().with_koko(true).with_node_type("zviera"),
            )
            .unwrap();
        table
            .add_node("Živé", Node::new("Mačka").admin().with_koko(true))
            .unwrap();
        table.add_node("Pes", Node::new("Môj pes")).unwrap();
        table
    }

    #[test]
    fn test_adjacency_and_roots() {
        let mut table = koko_table();
        table.add_root(Node::new("Vesmír").admin()).unwrap();
        let view = TreeView::new(&table);

        assert_eq!(view.roots(), &["Vesmír".to_string(), "Zem".to_string()]);
        assert_eq!(view.children("Živé"), &["Mačka".to_string(), "Pes".to_string()]);
        assert!(view.children("Mačka").is_empty());
    }

    #[test]
    fn test_forest_carries_properties() {
        let view = TreeView::new(&koko_table());

        assert_eq!(view.forest().len(), 1);
        let zem = &view.forest()[0];
        assert_eq!(zem.size(), 5);

        let pes = &zem.children[0].children[1];
        assert_eq!(pes.name, "Pes");
        assert_eq!(pes.node_type.as_deref(), Some("zviera"));
        assert!(pes.is_descendant_koko);
        assert!(pes.children[0].is_user_defined);
    }

    #[test]
    fn test_outline_rendering() {
        let view = TreeView::new(&koko_table());
        assert_eq!(
            view.to_string(),
            "* Zem\n  * Živé\n    * Mačka\n    * Pes [zviera]\n      + Môj pes\n"
        );
    }

    #[test]
    fn test_edge_lines() {
        let view = TreeView::new(&koko_table());
        assert_eq!(
            view.edge_lines(),
            vec!["Pes -> Môj pes", "Zem -> Živé", "Živé -> Mačka", "Živé -> Pes"]
        );
    }

    #[test]
    fn test_forest_serializes_to_json() {
        let view = TreeView::new(&koko_table());
        let json = serde_json::to_value(view.forest()).unwrap();
        assert_eq!(json[0]["name"], "Zem");
        assert_eq!(json[0]["children"][0]["name"], "Živé");
    }

    #[test]
    fn test_completion_score_counts_end_nodes() {
        let score = completion_score(&koko_table());

        // End nodes: Pes (has a child) and Mačka (no children)
        assert_eq!(score, CompletionScore { completed: 1, total: 2 });
        assert_eq!(score.to_string(), "1/2 (50%)");
    }

    #[test]
    fn test_completion_score_without_koko_nodes() {
        let mut table = ClosureTable::new();
        table.add_root(Node::new("A")).unwrap();
        let score = completion_score(&table);
        assert_eq!(score.total, 0);
        assert_eq!(score.ratio(), 1.0);
    }

    #[test]
    fn test_default_seed_leaf_is_incomplete() {
        let mut table = ClosureTable::new();
        table.add_root(Node::new("Zem").admin().with_koko(true)).unwrap();
        table
            .add_node("Zem", Node::new("Živé").admin().with_koko(true))
            .unwrap();

        assert_eq!(
            completion_score(&table),
            CompletionScore { completed: 0, total: 1 }
        );
    }
}
