use std::collections::{BTreeMap, HashMap};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// JSON graph model handed over by the graph editor.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GraphDSL {
    pub version: String,
    pub metadata: Metadata,
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub connections: Vec<Connection>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Metadata {
    pub name: String,
    pub created: Option<String>,
    pub modified: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Node {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default)]
    pub params: HashMap<String, serde_json::Value>,

    /// User-edited constant values of input slots, keyed by slot id.
    #[serde(default, rename = "slotValues")]
    pub slot_values: BTreeMap<u32, Vec<f32>>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Connection {
    pub id: String,
    pub from: Endpoint,
    pub to: Endpoint,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct Endpoint {
    #[serde(rename = "nodeId")]
    pub node_id: String,
    #[serde(rename = "slotId")]
    pub slot_id: u32,
}

pub fn load_graph_from_path(path: impl AsRef<std::path::Path>) -> Result<GraphDSL> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read graph json at {}", path.display()))?;
    parse_graph_str(&text).with_context(|| format!("invalid graph json in {}", path.display()))
}

pub fn parse_graph_str(text: &str) -> Result<GraphDSL> {
    serde_json::from_str(text).context("failed to parse graph json")
}
