#![allow(dead_code)]

use cmf_core::board::{Board, STANDARD_START_FEN};
use cmf_core::MoveGraph;
use serde_json::{json, Value};

/// FEN reached by playing `sans` from `start`.
pub fn fen_after(start: &str, sans: &[&str]) -> String {
    let mut board = Board::from_fen(start).expect("valid start FEN");
    for san in sans {
        board
            .apply(Some(san), None, None, None)
            .unwrap_or_else(|e| panic!("test line is illegal: {e}"));
    }
    board.fen()
}

/// Node map for a single line from the standard start.
pub fn line_nodes(sans: &[&str]) -> Value {
    let mut fens = vec![STANDARD_START_FEN.to_string()];
    for i in 0..sans.len() {
        fens.push(fen_after(STANDARD_START_FEN, &sans[..=i]));
    }

    let mut nodes = serde_json::Map::new();
    for (i, fen) in fens.iter().enumerate() {
        let children = match sans.get(i) {
            Some(san) => json!([{ "move": san, "fen": fens[i + 1] }]),
            None => json!([]),
        };
        let parents = if i == 0 {
            json!([])
        } else {
            json!([{ "move": sans[i - 1], "fen": fens[i - 1] }])
        };
        nodes.insert(
            fen.clone(),
            json!({ "fen": fen, "children": children, "parents": parents, "moveNumber": i }),
        );
    }
    Value::Object(nodes)
}

/// A document from the standard start with the given nodes and events.
pub fn document(nodes: Value, events: Value, duration_ms: u64) -> MoveGraph {
    let doc = json!({
        "schema": "cmf.v0.0.1",
        "meta": { "startingFen": STANDARD_START_FEN, "durationMs": duration_ms },
        "rootNodeId": STANDARD_START_FEN,
        "nodes": nodes,
        "events": events,
    });
    MoveGraph::from_json(&doc.to_string()).expect("test document parses")
}

pub fn move_event(t: u64, san: &str, from: &str, to: &str, fen: &str) -> Value {
    json!({ "type": "move", "t": t, "san": san, "from": from, "to": to, "fen": fen })
}
