//! CMF document model: position nodes keyed by FEN plus the flat event log.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::board::STANDARD_START_FEN;
use crate::error::{CmfError, Result};
use crate::event::{de_millis, is_chronological, Event};

pub const SCHEMA_VERSION: &str = "cmf.v0.0.1";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Meta {
    pub starting_fen: String,
    #[serde(default, deserialize_with = "de_millis")]
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript_url: Option<String>,
    /// Any further metadata is carried through untouched.
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

impl Meta {
    pub fn new(starting_fen: &str) -> Self {
        Self {
            starting_fen: starting_fen.to_string(),
            duration_ms: 0,
            audio_url: None,
            transcript_url: None,
            extra: Map::new(),
        }
    }
}

/// An edge to a neighbouring position. The edge carries the SAN.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MoveRef {
    #[serde(rename = "move")]
    pub mv: String,
    pub fen: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

pub type ChildReference = MoveRef;
pub type ParentReference = MoveRef;

impl MoveRef {
    pub fn new(mv: &str, fen: &str) -> Self {
        Self {
            mv: mv.to_string(),
            fen: fen.to_string(),
            comment: None,
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PositionNode {
    pub fen: String,
    #[serde(default)]
    pub children: Vec<ChildReference>,
    #[serde(default)]
    pub parents: Vec<ParentReference>,
    /// Half-moves from the start of the game.
    #[serde(default)]
    pub move_number: u32,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

impl PositionNode {
    pub fn new(fen: &str, move_number: u32) -> Self {
        Self {
            fen: fen.to_string(),
            children: Vec::new(),
            parents: Vec::new(),
            move_number,
            extra: Map::new(),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn is_branch_point(&self) -> bool {
        self.children.len() > 1
    }

    pub fn child_by_move(&self, san: &str) -> Option<&ChildReference> {
        self.children.iter().find(|c| c.mv == san)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MoveGraph {
    #[serde(default = "default_schema")]
    pub schema: String,
    pub meta: Meta,
    pub root_node_id: String,
    #[serde(default)]
    pub nodes: HashMap<String, PositionNode>,
    #[serde(default)]
    pub events: Vec<Event>,
    /// Top-level keys this engine does not model, written back unchanged.
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

fn default_schema() -> String {
    SCHEMA_VERSION.to_string()
}

impl Default for MoveGraph {
    fn default() -> Self {
        Self::new(STANDARD_START_FEN)
    }
}

impl MoveGraph {
    /// An empty lesson holding only the root position.
    pub fn new(starting_fen: &str) -> Self {
        let mut nodes = HashMap::new();
        nodes.insert(starting_fen.to_string(), PositionNode::new(starting_fen, 0));
        Self {
            schema: default_schema(),
            meta: Meta::new(starting_fen),
            root_node_id: starting_fen.to_string(),
            nodes,
            events: Vec::new(),
            extra: Map::new(),
        }
    }

    /// Parse a document. A missing root node makes the lesson unplayable.
    pub fn from_json(json: &str) -> Result<Self> {
        let graph: MoveGraph = serde_json::from_str(json)?;
        if graph.root().is_none() {
            return Err(CmfError::RootNotFound(graph.root_node_id));
        }
        Ok(graph)
    }

    /// Read and parse a document from disk.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn node(&self, fen: &str) -> Option<&PositionNode> {
        self.nodes.get(fen)
    }

    pub fn root(&self) -> Option<&PositionNode> {
        self.nodes.get(&self.root_node_id)
    }

    pub fn events_sorted(&self) -> bool {
        is_chronological(&self.events)
    }

    /// Stable re-sort of the event log by timestamp.
    pub fn sort_events(&mut self) {
        self.events.sort_by_key(|e| e.t);
    }

    /// Events attached to `fen`, in timestamp order.
    pub fn events_for(&self, fen: &str) -> Vec<&Event> {
        let mut events: Vec<&Event> = self
            .events
            .iter()
            .filter(|e| e.fen() == Some(fen))
            .collect();
        events.sort_by_key(|e| e.t);
        events
    }
}

/// A walk through the graph. `node_ids.len() == moves.len() + 1` always holds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct GraphPath {
    pub node_ids: Vec<String>,
    pub moves: Vec<String>,
}

impl GraphPath {
    pub fn from_root(fen: &str) -> Self {
        Self {
            node_ids: vec![fen.to_string()],
            moves: Vec::new(),
        }
    }

    pub fn push(&mut self, mv: &str, fen: &str) {
        self.moves.push(mv.to_string());
        self.node_ids.push(fen.to_string());
    }

    pub fn extended(&self, mv: &str, fen: &str) -> Self {
        let mut next = self.clone();
        next.push(mv, fen);
        next
    }

    /// Number of moves in the path.
    pub fn len(&self) -> usize {
        self.moves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    pub fn last_node(&self) -> &str {
        self.node_ids.last().map(String::as_str).unwrap_or_default()
    }

    pub fn contains(&self, fen: &str) -> bool {
        self.node_ids.iter().any(|id| id == fen)
    }
}
