//! Closure invariant checks
//!
//! A table is valid when:
//!
//! 1. every registered node has exactly one self path at depth 0
//! 2. no `(ancestor, descendant)` pair appears twice
//! 3. every non-root node has exactly one depth-1 row
//! 4. no node is its own proper ancestor
//! 5. the relation is exactly the transitive closure of the depth-1 edges
//!
//! and every row endpoint has a registry entry.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use crate::models::{ClosurePath, Node};

/// A single broken invariant
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    MissingSelfPath { node: String },
    UnregisteredNode { node: String },
    DuplicatePath { ancestor: String, descendant: String },
    MultipleParents { node: String, parents: Vec<String> },
    Cycle { node: String },
    MissingPath { ancestor: String, descendant: String, depth: u32 },
    UnexpectedPath { ancestor: String, descendant: String, depth: u32 },
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingSelfPath { node } => write!(f, "node '{}' has no self path", node),
            Self::UnregisteredNode { node } => {
                write!(f, "node '{}' appears in paths but not in the registry", node)
            }
            Self::DuplicatePath {
                ancestor,
                descendant,
            } => write!(f, "path '{}' -> '{}' appears more than once", ancestor, descendant),
            Self::MultipleParents { node, parents } => write!(
                f,
                "node '{}' has {} direct parents: {}",
                node,
                parents.len(),
                parents.join(", ")
            ),
            Self::Cycle { node } => write!(f, "node '{}' is its own ancestor", node),
            Self::MissingPath {
                ancestor,
                descendant,
                depth,
            } => write!(
                f,
                "missing path '{}' -> '{}' at depth {}",
                ancestor, descendant, depth
            ),
            Self::UnexpectedPath {
                ancestor,
                descendant,
                depth,
            } => write!(
                f,
                "path '{}' -> '{}' at depth {} is not implied by the direct edges",
                ancestor, descendant, depth
            ),
        }
    }
}

pub(crate) fn check(
    nodes: &BTreeMap<String, Node>,
    paths: &BTreeSet<ClosurePath>,
) -> Vec<InvariantViolation> {
    let mut violations = Vec::new();

    let mut depth_of: HashMap<(&str, &str), u32> = HashMap::new();
    let mut parents: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    let mut endpoints: BTreeSet<&str> = BTreeSet::new();

    for path in paths {
        endpoints.insert(path.ancestor.as_str());
        endpoints.insert(path.descendant.as_str());

        if path.is_self_path() && path.depth > 0 {
            violations.push(InvariantViolation::Cycle {
                node: path.ancestor.clone(),
            });
        }

        let key = (path.ancestor.as_str(), path.descendant.as_str());
        if depth_of.insert(key, path.depth).is_some() {
            violations.push(InvariantViolation::DuplicatePath {
                ancestor: path.ancestor.clone(),
                descendant: path.descendant.clone(),
            });
        }

        if path.is_direct_edge() {
            parents
                .entry(path.descendant.as_str())
                .or_default()
                .push(path.ancestor.as_str());
        }
    }

    for name in nodes.keys() {
        if depth_of.get(&(name.as_str(), name.as_str())) != Some(&0) {
            violations.push(InvariantViolation::MissingSelfPath { node: name.clone() });
        }
    }

    for name in &endpoints {
        if !nodes.contains_key(*name) {
            violations.push(InvariantViolation::UnregisteredNode {
                node: name.to_string(),
            });
        }
    }

    for (node, node_parents) in &parents {
        if node_parents.len() > 1 {
            violations.push(InvariantViolation::MultipleParents {
                node: node.to_string(),
                parents: node_parents.iter().map(|p| p.to_string()).collect(),
            });
        }
    }

    for path in paths {
        if path.depth > 0
            && !path.is_self_path()
            && depth_of.get(&(path.descendant.as_str(), path.ancestor.as_str())).is_some()
        {
            violations.push(InvariantViolation::Cycle {
                node: path.ancestor.clone(),
            });
        }
    }

    // Downward closure: edge (p, c) and row (c, x, d) imply (p, x, d + 1)
    for path in paths.iter().filter(|p| p.is_direct_edge()) {
        let start = ClosurePath::new(path.descendant.as_str(), "", 0);
        for below in paths.range(start..).take_while(|r| r.ancestor == path.descendant) {
            let expected = below.depth + 1;
            match depth_of.get(&(path.ancestor.as_str(), below.descendant.as_str())) {
                Some(depth) if *depth == expected => {}
                _ => violations.push(InvariantViolation::MissingPath {
                    ancestor: path.ancestor.clone(),
                    descendant: below.descendant.clone(),
                    depth: expected,
                }),
            }
        }
    }

    // Every deeper row must be explained by the descendant's direct parent
    for path in paths.iter().filter(|p| p.depth > 1) {
        let explained = parents
            .get(path.descendant.as_str())
            .into_iter()
            .flatten()
            .any(|parent| {
                depth_of.get(&(path.ancestor.as_str(), *parent)) == Some(&(path.depth - 1))
            });
        if !explained {
            violations.push(InvariantViolation::UnexpectedPath {
                ancestor: path.ancestor.clone(),
                descendant: path.descendant.clone(),
                depth: path.depth,
            });
        }
    }

    violations
}
