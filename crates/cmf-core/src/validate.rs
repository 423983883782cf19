//! Structural checks run when a lesson is loaded.
//!
//! Nothing here is fatal except a missing root: the report tells the caller
//! what playback will skip over.

use serde::Serialize;
use std::collections::HashSet;
use tracing::warn;

use crate::event::EventKind;
use crate::model::{MoveGraph, SCHEMA_VERSION};
use crate::traversal::RootBfs;

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DanglingEdge {
    pub from: String,
    pub mv: String,
    pub to: String,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub root_present: bool,
    pub schema_supported: bool,
    pub orphaned_nodes: Vec<String>,
    pub dangling_children: Vec<DanglingEdge>,
    /// Child edges whose target does not list the source as a parent.
    pub missing_parent_refs: Vec<DanglingEdge>,
    /// Adjacent event pairs whose timestamps go backwards.
    pub out_of_order_events: usize,
    pub events_on_unknown_nodes: usize,
    pub unknown_event_types: usize,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.root_present
            && self.schema_supported
            && self.orphaned_nodes.is_empty()
            && self.dangling_children.is_empty()
            && self.missing_parent_refs.is_empty()
            && self.out_of_order_events == 0
            && self.events_on_unknown_nodes == 0
            && self.unknown_event_types == 0
    }
}

pub fn validate(graph: &MoveGraph) -> ValidationReport {
    let mut report = ValidationReport {
        root_present: graph.root().is_some(),
        schema_supported: graph.schema == SCHEMA_VERSION,
        ..Default::default()
    };

    let reachable: HashSet<String> = RootBfs::run(graph).order.into_iter().collect();
    let mut orphaned: Vec<String> = graph
        .nodes
        .keys()
        .filter(|fen| !reachable.contains(*fen))
        .cloned()
        .collect();
    orphaned.sort();
    report.orphaned_nodes = orphaned;

    let mut sources: Vec<_> = graph.nodes.values().collect();
    sources.sort_by(|a, b| a.fen.cmp(&b.fen));
    for node in sources {
        for child in &node.children {
            let edge = DanglingEdge {
                from: node.fen.clone(),
                mv: child.mv.clone(),
                to: child.fen.clone(),
            };
            match graph.node(&child.fen) {
                None => report.dangling_children.push(edge),
                Some(target) if !target.parents.iter().any(|p| p.fen == node.fen) => {
                    report.missing_parent_refs.push(edge)
                }
                Some(_) => {}
            }
        }
    }

    report.out_of_order_events = graph.events.windows(2).filter(|w| w[1].t < w[0].t).count();
    for event in &graph.events {
        if matches!(event.kind, EventKind::Unknown(_)) {
            report.unknown_event_types += 1;
        } else if let Some(fen) = event.fen() {
            // Navigate targets may legitimately be positions outside the graph.
            let is_navigate = matches!(event.kind, EventKind::Navigate(_));
            if !is_navigate && !graph.nodes.contains_key(fen) {
                report.events_on_unknown_nodes += 1;
            }
        }
    }

    if !report.is_clean() {
        warn!(
            orphans = report.orphaned_nodes.len(),
            dangling = report.dangling_children.len(),
            out_of_order = report.out_of_order_events,
            "Lesson document has structural problems"
        );
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{ClearEvent, Event};
    use crate::model::{MoveRef, PositionNode};
    use serde_json::json;

    fn clear(fen: &str) -> ClearEvent {
        ClearEvent {
            fen: fen.into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_clean_graph() {
        let graph = MoveGraph::new("r");
        assert!(validate(&graph).is_clean());
    }

    #[test]
    fn test_reports_problems() {
        let mut graph = MoveGraph::new("r");
        graph.nodes.insert("o".into(), PositionNode::new("o", 1));
        graph.nodes.insert("a".into(), PositionNode::new("a", 1));
        let root = graph.nodes.get_mut("r").unwrap();
        root.children.push(MoveRef::new("m1", "a"));
        root.children.push(MoveRef::new("m2", "ghost"));
        graph.events = vec![
            Event::new(200, EventKind::Clear(clear("a"))),
            Event::new(100, EventKind::Clear(clear("nowhere"))),
            Event::new(300, EventKind::Unknown(json!({"type": "laser", "t": 300}))),
        ];
        graph.schema = "cmf.v9".into();

        let report = validate(&graph);
        assert!(!report.is_clean());
        assert!(!report.schema_supported);
        assert_eq!(report.orphaned_nodes, vec!["o".to_string()]);
        assert_eq!(report.dangling_children.len(), 1);
        assert_eq!(report.dangling_children[0].to, "ghost");
        assert_eq!(report.missing_parent_refs.len(), 1);
        assert_eq!(report.out_of_order_events, 1);
        assert_eq!(report.events_on_unknown_nodes, 1);
        assert_eq!(report.unknown_event_types, 1);
    }
}
