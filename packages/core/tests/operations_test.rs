//! Tree Command Integration Tests
//!
//! Applies JSON command batches to a session the way command front ends do,
//! including malformed and rejected commands.

use anyhow::Result;
use datamap_core::operations::{execute, OperationOutcome, TreeCommand};
use datamap_core::{DataMapConfig, NodeTypeRegistry, Session};
use serde_json::{json, Value};
use tempfile::TempDir;

fn run_batch(session: &mut Session, batch: Value) -> Vec<OperationOutcome> {
    batch
        .as_array()
        .cloned()
        .unwrap_or_default()
        .into_iter()
        .map(|value| match TreeCommand::from_value(value) {
            Ok(command) => execute(session, &command),
            Err(e) => OperationOutcome::failure(e.to_string()),
        })
        .collect()
}

#[test]
fn test_command_batch() -> Result<()> {
    let mut session = Session::new(DataMapConfig::default())?;
    session.add_user_node("Živé", "Moja záhrada")?;

    let outcomes = run_batch(
        &mut session,
        json!([
            { "operation": "add_node", "node": "Rastlina", "parent": "Živé",
              "node_type": null, "attributes": null, "error": null },
            { "operation": "add_node", "node": "Ruža", "parent": "Rastlina",
              "node_type": "kvet", "attributes": { "farba": "červená" } },
            { "operation": "move_node", "node": "Ruža", "parent": "Zem" },
            { "operation": "delete_node", "node": "Rastlina" },
            { "operation": "delete_node", "node": "Rastlina" },
            { "operation": "rename_node", "node": "Ruža" },
            { "operation": "unknown", "error": "no parent given" }
        ]),
    );

    let flags: Vec<bool> = outcomes.iter().map(|o| o.success).collect();
    assert_eq!(flags, vec![true, true, true, true, false, false, false]);
    assert_eq!(outcomes[4].message, "Node 'Rastlina' does not exist");
    assert_eq!(outcomes[5].message, "Unknown operation: rename_node");

    let ruza = session.admin().node("Ruža").expect("Ruža was moved, not deleted");
    assert_eq!(ruza.node_type.as_deref(), Some("kvet"));
    assert_eq!(ruza.attributes["farba"], "červená");
    assert!(ruza.attributes["uuid"].is_string());
    assert_eq!(session.admin().parent_of("Ruža"), Some("Zem"));

    // The user node is untouched by the admin batch
    assert_eq!(session.user().parent_of("Moja záhrada"), Some("Živé"));
    Ok(())
}

#[test]
fn test_commands_validated_against_type_registry() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let types_path = temp_dir.path().join("object_types.json");
    std::fs::write(
        &types_path,
        serde_json::to_string_pretty(&json!({
            "PLANT": {
                "name": "Rastlina",
                "color": "#4CAF50",
                "attributes": [
                    { "name": "druh", "type": "string", "required": true }
                ]
            }
        }))?,
    )?;

    let registry = NodeTypeRegistry::load(&types_path);
    assert_eq!(registry.color_for("Rastlina"), "#4CAF50");

    let mut session = Session::new(DataMapConfig::default())?.with_registry(registry);

    let outcomes = run_batch(
        &mut session,
        json!([
            { "operation": "add_node", "node": "Ruža", "parent": "Živé",
              "node_type": "Rastlina", "attributes": {} },
            { "operation": "add_node", "node": "Ruža", "parent": "Živé",
              "node_type": "Rastlina", "attributes": { "druh": "Rosa canina" } },
            { "operation": "add_node", "node": "Pes", "parent": "Živé",
              "node_type": "Zviera" }
        ]),
    );

    assert!(!outcomes[0].success);
    assert!(outcomes[0].message.contains("druh"));
    assert!(outcomes[1].success);
    assert!(!outcomes[2].success);
    assert_eq!(
        session.admin().node("Ruža").and_then(|n| n.node_type.as_deref()),
        Some("PLANT")
    );
    Ok(())
}
