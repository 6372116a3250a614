//! Closure path row
//!
//! One row of the closure relation: the tree path from `ancestor` to
//! `descendant` has `depth` edges. Depth 0 is the node's self path and depth 1
//! is a direct parent-child edge.

use serde::{Deserialize, Serialize};

/// `(ancestor, descendant, depth)` triple.
///
/// Ordering is by ancestor, then descendant, then depth, so a sorted set of
/// paths can be range-scanned by ancestor.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ClosurePath {
    pub ancestor: String,
    pub descendant: String,
    pub depth: u32,
}

impl ClosurePath {
    pub fn new(ancestor: impl Into<String>, descendant: impl Into<String>, depth: u32) -> Self {
        Self {
            ancestor: ancestor.into(),
            descendant: descendant.into(),
            depth,
        }
    }

    /// The depth-0 row every node carries
    pub fn self_path(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            ancestor: name.clone(),
            descendant: name,
            depth: 0,
        }
    }

    pub fn is_self_path(&self) -> bool {
        self.ancestor == self.descendant
    }

    pub fn is_direct_edge(&self) -> bool {
        self.depth == 1
    }

    /// True if either endpoint is `name`
    pub fn involves(&self, name: &str) -> bool {
        self.ancestor == name || self.descendant == name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_self_path() {
        let path = ClosurePath::self_path("Zem");
        assert!(path.is_self_path());
        assert_eq!(path.depth, 0);
        assert!(!path.is_direct_edge());
    }

    #[test]
    fn test_ordering_groups_by_ancestor() {
        let mut paths = vec![
            ClosurePath::new("B", "B", 0),
            ClosurePath::new("A", "C", 2),
            ClosurePath::new("A", "B", 1),
        ];
        paths.sort();
        assert_eq!(paths[0], ClosurePath::new("A", "B", 1));
        assert_eq!(paths[1], ClosurePath::new("A", "C", 2));
        assert_eq!(paths[2], ClosurePath::new("B", "B", 0));
    }

    #[test]
    fn test_involves() {
        let path = ClosurePath::new("Zem", "Živé", 1);
        assert!(path.involves("Zem"));
        assert!(path.involves("Živé"));
        assert!(!path.involves("Pes"));
    }
}
