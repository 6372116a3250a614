//! Session Configuration
//!
//! Settings that shape a [`Session`](crate::services::Session): the admin
//! seed tree and the policies applied by admin operations. Every field has a
//! default, so a config file only needs the keys it changes:
//!
//! ```json
//! {
//!   "seed": [
//!     { "parent": "Zem", "child": "Živé" },
//!     { "parent": "Zem", "child": "Neživé" }
//!   ],
//!   "stamp_uuid": false
//! }
//! ```

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::services::SessionError;

/// One parent → child edge of the admin seed tree. A parent that is never a
/// child becomes a root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedEdge {
    pub parent: String,
    pub child: String,
}

impl SeedEdge {
    pub fn new(parent: impl Into<String>, child: impl Into<String>) -> Self {
        Self {
            parent: parent.into(),
            child: child.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataMapConfig {
    /// Edges of the initial admin tree, applied in order (default: Zem → Živé)
    pub seed: Vec<SeedEdge>,
    /// Re-synchronize the user table after every admin edit (default: true)
    pub auto_synchronize: bool,
    /// Stamp a fresh `uuid` attribute on nodes added by admin operations (default: true)
    pub stamp_uuid: bool,
    /// `is_descendant_koko` for seeded and admin-added nodes (default: true)
    pub admin_koko_default: bool,
}

impl Default for DataMapConfig {
    fn default() -> Self {
        Self {
            seed: vec![SeedEdge::new("Zem", "Živé")],
            auto_synchronize: true,
            stamp_uuid: true,
            admin_koko_default: true,
        }
    }
}

impl DataMapConfig {
    /// Load a JSON config file and validate it
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SessionError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate().map_err(SessionError::invalid_config)?;
        tracing::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Check that the seed describes a forest
    pub fn validate(&self) -> Result<(), String> {
        let mut created: BTreeSet<&str> = BTreeSet::new();

        for edge in &self.seed {
            for name in [&edge.parent, &edge.child] {
                if name.trim().is_empty() {
                    return Err("seed node names must not be empty".to_string());
                }
                if name.trim() != name {
                    return Err(format!(
                        "seed node name '{}' has leading or trailing whitespace",
                        name
                    ));
                }
            }
            if edge.parent == edge.child {
                return Err(format!("seed node '{}' cannot be its own parent", edge.child));
            }

            created.insert(edge.parent.as_str());
            if !created.insert(edge.child.as_str()) {
                return Err(format!(
                    "seed node '{}' is declared before it is attached or attached twice",
                    edge.child
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = DataMapConfig::default();
        assert_eq!(config.seed, vec![SeedEdge::new("Zem", "Živé")]);
        assert!(config.auto_synchronize);
        assert!(config.stamp_uuid);
        assert!(config.admin_koko_default);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: DataMapConfig = serde_json::from_str(r#"{ "stamp_uuid": false }"#).unwrap();
        assert!(!config.stamp_uuid);
        assert!(config.auto_synchronize);
        assert_eq!(config.seed.len(), 1);
    }

    #[test]
    fn test_validate_rejects_bad_seeds() {
        let mut config = DataMapConfig::default();

        config.seed = vec![SeedEdge::new("A", "A")];
        assert!(config.validate().is_err());

        config.seed = vec![SeedEdge::new("A", "B"), SeedEdge::new("C", "B")];
        assert!(config.validate().unwrap_err().contains("'B'"));

        config.seed = vec![SeedEdge::new("A", "B"), SeedEdge::new("B", "A")];
        assert!(config.validate().is_err());

        config.seed = vec![SeedEdge::new("A", " B")];
        assert!(config.validate().is_err());

        config.seed = Vec::new();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("datamap.json");
        std::fs::write(
            &path,
            r#"{ "seed": [ { "parent": "Zem", "child": "Neživé" } ], "auto_synchronize": false }"#,
        )
        .unwrap();

        let config = DataMapConfig::load(&path).unwrap();
        assert_eq!(config.seed[0].child, "Neživé");
        assert!(!config.auto_synchronize);
    }

    #[test]
    fn test_load_invalid_seed_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("datamap.json");
        std::fs::write(
            &path,
            r#"{ "seed": [ { "parent": "A", "child": "A" } ] }"#,
        )
        .unwrap();

        let err = DataMapConfig::load(&path).unwrap_err();
        assert!(matches!(err, SessionError::InvalidConfig(_)));
    }
}
