//! Datamap Development Inspector
//!
//! Loads admin/user closure-table snapshots into a session, optionally applies
//! a batch of tree commands, prints the combined tree and completion score,
//! and writes the resulting tables back out as CSV.
//!
//! # Usage
//!
//! ```bash
//! # Start from the default seed and print it
//! cargo run --bin datamap-dev
//!
//! # Load snapshots, apply commands, write results to ./out
//! DATAMAP_ADMIN_CSV=admin_closure_table.csv \
//! DATAMAP_USER_CSV=user_closure_table.csv \
//! DATAMAP_COMMANDS=commands.json \
//! DATAMAP_OUT_DIR=out \
//!     cargo run --bin datamap-dev
//! ```
//!
//! # Environment Variables
//!
//! - `DATAMAP_CONFIG`: JSON session config (default: built-in defaults)
//! - `DATAMAP_TYPES`: node type registry JSON used to validate admin adds
//! - `DATAMAP_ADMIN_CSV`: admin table snapshot (default: seeded table)
//! - `DATAMAP_USER_CSV`: user table snapshot (default: empty)
//! - `DATAMAP_COMMANDS`: JSON array of tree commands to apply in order
//! - `DATAMAP_OUT_DIR`: directory for `admin_closure_table.csv` and
//!   `user_closure_table.csv` (nothing is written when unset)
//! - `RUST_LOG`: Logging level (e.g., "info", "debug", "trace")

use std::env;
use std::path::PathBuf;

use datamap_core::operations::{execute, OperationOutcome, TreeCommand};
use datamap_core::{DataMapConfig, NodeTypeRegistry, Session};

fn env_path(name: &str) -> Option<PathBuf> {
    env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from)
}

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("Datamap dev inspector");

    let config = match env_path("DATAMAP_CONFIG") {
        Some(path) => DataMapConfig::load(&path)?,
        None => DataMapConfig::default(),
    };

    let mut session = Session::new(config)?;
    if let Some(path) = env_path("DATAMAP_TYPES") {
        session = session.with_registry(NodeTypeRegistry::load(&path));
    }

    if let Some(path) = env_path("DATAMAP_ADMIN_CSV") {
        session.load_admin_csv(&path)?;
    }
    if let Some(path) = env_path("DATAMAP_USER_CSV") {
        let report = session.load_user_csv(&path)?;
        tracing::info!(
            "User table loaded: {} node(s) removed, {} detached",
            report.removed,
            report.detached
        );
    }

    if let Some(path) = env_path("DATAMAP_COMMANDS") {
        let content = std::fs::read_to_string(&path)?;
        let commands: Vec<serde_json::Value> = serde_json::from_str(&content)?;
        tracing::info!("Applying {} command(s) from {}", commands.len(), path.display());

        for value in commands {
            let outcome = match TreeCommand::from_value(value) {
                Ok(command) => execute(&mut session, &command),
                Err(e) => OperationOutcome::failure(e.to_string()),
            };
            let status = if outcome.success { "ok" } else { "failed" };
            println!("[{}] {}", status, outcome.message);
        }
    }

    println!();
    print!("{}", session.tree_view());
    println!();
    println!("Completion: {}", session.completion_score());

    let violations = session.user().validate();
    if !violations.is_empty() {
        tracing::warn!("User table has {} invariant violation(s)", violations.len());
    }

    if let Some(dir) = env_path("DATAMAP_OUT_DIR") {
        std::fs::create_dir_all(&dir)?;
        session.save_admin_csv(dir.join("admin_closure_table.csv"))?;
        session.save_user_csv(dir.join("user_closure_table.csv"))?;
        tracing::info!("Wrote tables to {}", dir.display());
    }

    Ok(())
}
