//! Time-weighted mainline detection.
//!
//! Lessons carry no "this is the main line" flag. The branch the narrator
//! dwelt on longest is taken as the teaching line.

use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

use crate::config::{EngineConfig, PathCriterion};
use crate::event::sorted_events;
use crate::model::{GraphPath, MoveGraph};
use crate::traversal::{find_path_to_node, get_all_paths, PathOptions};

/// Milliseconds of narration spent at each node.
///
/// A node's dwell runs from its last move event to the next move event in
/// the log, or to the end of the recording for the final move.
pub fn dwell_times(graph: &MoveGraph) -> HashMap<String, u64> {
    let moves: Vec<_> = sorted_events(&graph.events)
        .into_iter()
        .filter_map(|e| e.as_move().map(|m| (e.t, m.fen.as_str())))
        .collect();

    let mut dwell = HashMap::new();
    for (i, (t, fen)) in moves.iter().enumerate() {
        let until = moves
            .get(i + 1)
            .map(|(next, _)| *next)
            .unwrap_or(graph.meta.duration_ms);
        dwell.insert(fen.to_string(), until.saturating_sub(*t));
    }
    dwell
}

fn event_counts(graph: &MoveGraph) -> HashMap<&str, usize> {
    let mut counts = HashMap::new();
    for fen in graph.events.iter().filter_map(|e| e.fen()) {
        *counts.entry(fen).or_insert(0) += 1;
    }
    counts
}

/// A candidate line with the figures used to rank it.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ScoredPath {
    pub path: GraphPath,
    pub audio_time_ms: u64,
    pub event_count: usize,
}

impl ScoredPath {
    fn compare(&self, other: &Self, chain: &[PathCriterion]) -> Ordering {
        chain
            .iter()
            .map(|criterion| match criterion {
                PathCriterion::AudioTime => self.audio_time_ms.cmp(&other.audio_time_ms),
                PathCriterion::EventCount => self.event_count.cmp(&other.event_count),
                PathCriterion::Length => self.path.len().cmp(&other.path.len()),
            })
            .find(|o| o.is_ne())
            .unwrap_or(Ordering::Equal)
    }
}

/// Score every root-to-leaf path.
pub fn score_paths(graph: &MoveGraph, config: &EngineConfig) -> Vec<ScoredPath> {
    let dwell = dwell_times(graph);
    let counts = event_counts(graph);

    get_all_paths(
        graph,
        PathOptions {
            max_depth: config.max_path_depth,
            include_variations: false,
        },
    )
    .into_iter()
    .map(|path| {
        let audio_time_ms = path
            .node_ids
            .iter()
            .filter_map(|fen| dwell.get(fen))
            .sum();
        let event_count = path
            .node_ids
            .iter()
            .filter_map(|fen| counts.get(fen.as_str()))
            .sum();
        ScoredPath {
            path,
            audio_time_ms,
            event_count,
        }
    })
    .collect()
}

/// The whole-lesson best line, ranked by `config.tie_break`. Earlier paths
/// win exact ties.
pub fn calculate_mainline_path(graph: &MoveGraph, config: &EngineConfig) -> GraphPath {
    let mut best: Option<ScoredPath> = None;
    for candidate in score_paths(graph, config) {
        let better = match &best {
            Some(current) => candidate.compare(current, &config.tie_break).is_gt(),
            None => true,
        };
        if better {
            best = Some(candidate);
        }
    }

    best.map(|s| s.path)
        .unwrap_or_else(|| GraphPath::from_root(&graph.root_node_id))
}

/// Total dwell over `fen` and everything below it.
fn subtree_dwell(graph: &MoveGraph, fen: &str, dwell: &HashMap<String, u64>) -> u64 {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut stack = vec![fen];
    let mut total = 0;
    while let Some(current) = stack.pop() {
        if !seen.insert(current) {
            continue;
        }
        total += dwell.get(current).copied().unwrap_or(0);
        if let Some(node) = graph.node(current) {
            stack.extend(node.children.iter().map(|c| c.fen.as_str()));
        }
    }
    total
}

/// The line as it stands after `current_time_ms` of playback.
///
/// The latest move played so far fixes the current node. From there the path
/// is extended greedily, taking at each branch point the child whose subtree
/// holds the most narration time, until a leaf.
pub fn calculate_dynamic_mainline_path(
    graph: &MoveGraph,
    current_time_ms: u64,
    config: &EngineConfig,
) -> GraphPath {
    let current_fen = sorted_events(&graph.events)
        .into_iter()
        .take_while(|e| e.t <= current_time_ms)
        .filter_map(|e| e.as_move())
        .filter(|m| graph.nodes.contains_key(&m.fen))
        .last()
        .map(|m| m.fen.clone())
        .unwrap_or_else(|| graph.root_node_id.clone());

    let mut path = find_path_to_node(graph, &current_fen).unwrap_or_else(|| {
        warn!(fen = %current_fen, "Current position not reachable from root, restarting from root");
        GraphPath::from_root(&graph.root_node_id)
    });

    let dwell = dwell_times(graph);
    while path.len() < config.max_path_depth {
        let Some(node) = graph.node(path.last_node()) else {
            break;
        };

        let mut best: Option<(&str, &str, u64)> = None;
        for child in &node.children {
            if path.contains(&child.fen) || !graph.nodes.contains_key(&child.fen) {
                continue;
            }
            let score = subtree_dwell(graph, &child.fen, &dwell);
            if best.map_or(true, |(_, _, s)| score > s) {
                best = Some((child.mv.as_str(), child.fen.as_str(), score));
            }
        }

        let Some((mv, fen, score)) = best else {
            break;
        };
        if node.is_branch_point() {
            debug!(at = %node.fen, chosen = %mv, score, "Branch resolved by dwell time");
        }
        path.push(mv, fen);
    }

    path
}
