//! Tabular Exchange Format
//!
//! Closure tables are exchanged as CSV, one row per `(ancestor, descendant)`
//! pair with the descendant's properties denormalized onto the row:
//!
//! ```text
//! ancestor,descendant,depth,is_descendant_koko,is_user_defined,node_type,attributes
//! Zem,Zem,0,true,false,,{}
//! Zem,Živé,1,true,false,,{}
//! Živé,Živé,0,true,false,,{}
//! ```
//!
//! `ancestor`, `descendant`, `depth` and `is_descendant_koko` are required.
//! `is_user_defined`, `node_type` and `attributes` are optional; older exports
//! without them load as admin, untyped nodes with no attributes. Booleans
//! accept `true`/`false`, `True`/`False` and `1`/`0`.
//!
//! On import each node's properties come from its self-path row when one
//! exists, otherwise from the first row that names it as descendant. A
//! malformed attribute blob is logged and replaced with `{}`. Invariant
//! violations in the imported rows are logged but do not fail the import.
//!
//! Export always writes all seven columns, sorted by ancestor then descendant,
//! with attributes as compact JSON.

use std::collections::BTreeMap;
use std::io;
use std::path::Path;

use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::closure_table::ClosureTable;
use crate::models::{ClosurePath, Node};

const COLUMNS: [&str; 7] = [
    "ancestor",
    "descendant",
    "depth",
    "is_descendant_koko",
    "is_user_defined",
    "node_type",
    "attributes",
];

#[derive(Debug, Deserialize)]
struct ClosureRecord {
    ancestor: String,
    descendant: String,
    depth: u32,
    #[serde(deserialize_with = "deserialize_flag")]
    is_descendant_koko: bool,
    #[serde(default, deserialize_with = "deserialize_optional_flag")]
    is_user_defined: Option<bool>,
    #[serde(default)]
    node_type: Option<String>,
    #[serde(default)]
    attributes: Option<String>,
}

#[derive(Debug, Serialize)]
struct ClosureRow<'a> {
    ancestor: &'a str,
    descendant: &'a str,
    depth: u32,
    is_descendant_koko: bool,
    is_user_defined: bool,
    node_type: Option<&'a str>,
    attributes: String,
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim() {
        "true" | "True" | "TRUE" | "1" => Some(true),
        "false" | "False" | "FALSE" | "0" => Some(false),
        _ => None,
    }
}

fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_flag(&raw)
        .ok_or_else(|| de::Error::custom(format!("invalid boolean value '{}'", raw)))
}

fn deserialize_optional_flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => parse_flag(&raw)
            .map(Some)
            .ok_or_else(|| de::Error::custom(format!("invalid boolean value '{}'", raw))),
    }
}

/// Decode an attribute blob, degrading to `{}` on anything but a JSON object
fn decode_attributes(node: &str, blob: Option<&str>) -> Value {
    let empty = Value::Object(serde_json::Map::new());
    let blob = match blob.map(str::trim) {
        None | Some("") => return empty,
        Some(blob) => blob,
    };

    match serde_json::from_str::<Value>(blob) {
        Ok(value @ Value::Object(_)) => value,
        Ok(_) => {
            tracing::warn!(
                "Attributes of node '{}' are not a JSON object, using empty attributes",
                node
            );
            empty
        }
        Err(e) => {
            tracing::warn!(
                "Malformed attributes for node '{}' ({}), using empty attributes",
                node,
                e
            );
            empty
        }
    }
}

fn node_from_record(record: &ClosureRecord) -> Node {
    let mut node = Node::new(record.descendant.clone())
        .with_user_defined(record.is_user_defined.unwrap_or(false))
        .with_koko(record.is_descendant_koko)
        .with_attributes(decode_attributes(
            &record.descendant,
            record.attributes.as_deref(),
        ));
    node.node_type = record
        .node_type
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string);
    node
}

/// Read a closure table from CSV
///
/// # Errors
///
/// Fails on unreadable input, a missing required column, or a field that
/// cannot be parsed (negative depth, unknown boolean spelling).
pub fn read_table<R: io::Read>(reader: R) -> Result<ClosureTable, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    let mut nodes: BTreeMap<String, (bool, Node)> = BTreeMap::new();
    let mut paths = Vec::new();
    let mut ancestors = Vec::new();

    for result in reader.deserialize() {
        let record: ClosureRecord = result?;
        let is_self_path = record.ancestor == record.descendant && record.depth == 0;

        let replace = match nodes.get(&record.descendant) {
            Some((from_self_path, _)) => is_self_path && !from_self_path,
            None => true,
        };
        if replace {
            nodes.insert(
                record.descendant.clone(),
                (is_self_path, node_from_record(&record)),
            );
        }

        ancestors.push(record.ancestor.clone());
        paths.push(ClosurePath::new(
            record.ancestor,
            record.descendant,
            record.depth,
        ));
    }

    for ancestor in ancestors {
        if !nodes.contains_key(&ancestor) {
            tracing::warn!(
                "Node '{}' appears only as an ancestor, registering it with default properties",
                ancestor
            );
            nodes.insert(ancestor.clone(), (false, Node::new(ancestor).admin()));
        }
    }

    let table = ClosureTable::from_parts(nodes.into_values().map(|(_, node)| node), paths);

    let violations = table.validate();
    if !violations.is_empty() {
        tracing::warn!(
            "Imported closure table has {} invariant violation(s)",
            violations.len()
        );
        for violation in &violations {
            tracing::warn!("  {}", violation);
        }
    }

    tracing::debug!(
        "Read closure table with {} node(s), {} row(s)",
        table.node_count(),
        table.len()
    );
    Ok(table)
}

/// Write a closure table as CSV with all seven columns
pub fn write_table<W: io::Write>(table: &ClosureTable, writer: W) -> Result<(), csv::Error> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    writer.write_record(COLUMNS)?;

    for path in table.paths() {
        // Every endpoint is registered in a valid table; fall back to defaults otherwise.
        let fallback;
        let node = match table.node(&path.descendant) {
            Some(node) => node,
            None => {
                fallback = Node::new(path.descendant.clone()).admin();
                &fallback
            }
        };

        writer.serialize(ClosureRow {
            ancestor: &path.ancestor,
            descendant: &path.descendant,
            depth: path.depth,
            is_descendant_koko: node.is_descendant_koko,
            is_user_defined: node.is_user_defined,
            node_type: node.node_type.as_deref(),
            attributes: node.attributes.to_string(),
        })?;
    }

    writer.flush()?;
    Ok(())
}

pub fn read_table_from_path(path: impl AsRef<Path>) -> Result<ClosureTable, csv::Error> {
    let path = path.as_ref();
    tracing::info!("Loading closure table from {}", path.display());
    let file = std::fs::File::open(path)?;
    read_table(io::BufReader::new(file))
}

pub fn write_table_to_path(table: &ClosureTable, path: impl AsRef<Path>) -> Result<(), csv::Error> {
    let path = path.as_ref();
    tracing::info!(
        "Writing closure table ({} rows) to {}",
        table.len(),
        path.display()
    );
    let file = std::fs::File::create(path)?;
    write_table(table, io::BufWriter::new(file))
}
