//! Read-only queries over a lesson graph.
//!
//! Every walk is iterative and keeps a visited set keyed by FEN, so merged
//! transpositions and malformed cyclic documents terminate. Missing nodes are
//! reported with a warning and treated as dead ends.

use serde::Serialize;
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::{debug, warn};

use crate::board::{same_position, Board};
use crate::config::{EngineConfig, DEFAULT_MAX_PATH_DEPTH};
use crate::event::{Annotation, EventKind};
use crate::model::{ChildReference, GraphPath, MoveGraph, PositionNode};
use crate::overlay::Overlay;

/// A node reached by replaying SAN moves from the root.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GraphIndexEntry {
    pub fen: String,
    /// Half-moves from the root along `path`.
    pub move_number: u32,
    pub path: GraphPath,
}

/// Index every reachable node by FEN, validating each edge's SAN with the
/// rules engine. Illegal edges and missing nodes end their branch.
pub fn build_graph_move_index(graph: &MoveGraph) -> HashMap<String, GraphIndexEntry> {
    let mut index = HashMap::new();

    let Some(root) = graph.root() else {
        warn!(root = %graph.root_node_id, "Root node not found, graph index is empty");
        return index;
    };
    let board = match Board::from_fen(&root.fen) {
        Ok(b) => b,
        Err(e) => {
            warn!("Cannot load root position: {e}");
            return index;
        }
    };

    let mut visited: HashSet<String> = HashSet::new();
    let mut stack = vec![(root.fen.clone(), board, GraphPath::from_root(&root.fen))];

    while let Some((fen, board, path)) = stack.pop() {
        if !visited.insert(fen.clone()) {
            continue;
        }
        let Some(node) = graph.node(&fen) else {
            warn!(%fen, "Referenced node missing from graph");
            continue;
        };

        // Reverse so the first child is explored first.
        for child in node.children.iter().rev() {
            if visited.contains(&child.fen) {
                continue;
            }
            let mv = match board.resolve_san(&child.mv) {
                Ok(mv) => mv,
                Err(e) => {
                    warn!(from = %fen, "Dropping branch: {e}");
                    continue;
                }
            };
            let mut next = board.clone();
            next.play(mv);
            if !same_position(&next.fen(), &child.fen) {
                debug!(expected = %child.fen, actual = %next.fen(), "Edge FEN differs from replayed position");
            }
            stack.push((child.fen.clone(), next, path.extended(&child.mv, &child.fen)));
        }

        index.insert(
            fen.clone(),
            GraphIndexEntry {
                fen,
                move_number: path.len() as u32,
                path,
            },
        );
    }

    index
}

/// Walk from the root matching each SAN in order. `None` on the first miss.
pub fn find_node_by_path<'a, S: AsRef<str>>(
    graph: &'a MoveGraph,
    moves: &[S],
) -> Option<&'a PositionNode> {
    let mut node = graph.root()?;
    for mv in moves {
        let child = node.child_by_move(mv.as_ref())?;
        node = graph.node(&child.fen)?;
    }
    Some(node)
}

#[derive(Debug, Clone, Copy)]
pub struct PathOptions {
    pub max_depth: usize,
    /// Record a path at every node, not just at leaves.
    pub include_variations: bool,
}

impl Default for PathOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_PATH_DEPTH,
            include_variations: false,
        }
    }
}

/// Enumerate root paths. A path is recorded at leaves (nodes with no child
/// left to explore), at every node when `include_variations` is set, and
/// where `max_depth` cuts it short.
pub fn get_all_paths(graph: &MoveGraph, opts: PathOptions) -> Vec<GraphPath> {
    let mut paths = Vec::new();
    let Some(root) = graph.root() else {
        warn!(root = %graph.root_node_id, "Root node not found, no paths");
        return paths;
    };

    let mut stack = vec![GraphPath::from_root(&root.fen)];
    while let Some(path) = stack.pop() {
        let Some(node) = graph.node(path.last_node()) else {
            continue;
        };

        let open: Vec<&ChildReference> = node
            .children
            .iter()
            .filter(|c| {
                let exists = graph.nodes.contains_key(&c.fen);
                if !exists {
                    warn!(from = %node.fen, to = %c.fen, "Child reference to missing node");
                }
                exists && !path.contains(&c.fen)
            })
            .collect();
        let capped = path.len() >= opts.max_depth;

        if opts.include_variations || open.is_empty() || capped {
            paths.push(path.clone());
        }
        if capped {
            continue;
        }
        for child in open.into_iter().rev() {
            stack.push(path.extended(&child.mv, &child.fen));
        }
    }

    paths
}

/// Annotation, text and pause state of one node at a point in time.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GraphState {
    pub fen: String,
    pub path: GraphPath,
    pub active_annotations: Vec<Annotation>,
    pub active_text: Option<String>,
    pub is_paused: bool,
    pub pause_prompt: Option<String>,
}

/// Replay the events attached to `node` up to `time_ms`.
pub fn compute_state_at_node(
    graph: &MoveGraph,
    node: &PositionNode,
    path: &GraphPath,
    time_ms: u64,
    config: &EngineConfig,
) -> GraphState {
    let mut overlay = Overlay::default();
    for event in graph.events_for(&node.fen) {
        if event.t > time_ms {
            break;
        }
        overlay.apply(event, time_ms, config.pause_window_ms);
    }

    GraphState {
        fen: node.fen.clone(),
        path: path.clone(),
        active_annotations: overlay.annotations,
        active_text: overlay.text,
        is_paused: overlay.is_paused,
        pause_prompt: overlay.pause_prompt,
    }
}

/// The authoring-order mainline: first child at every node.
pub fn get_mainline_path(graph: &MoveGraph) -> GraphPath {
    let mut path = GraphPath::from_root(&graph.root_node_id);
    let Some(mut node) = graph.root() else {
        warn!(root = %graph.root_node_id, "Root node not found, empty mainline");
        return path;
    };

    while let Some(first) = node.children.first() {
        if path.contains(&first.fen) {
            debug!(fen = %first.fen, "Mainline loops back, stopping");
            break;
        }
        let Some(next) = graph.node(&first.fen) else {
            warn!(fen = %first.fen, "Mainline child missing from graph");
            break;
        };
        path.push(&first.mv, &first.fen);
        node = next;
    }

    path
}

/// Breadth-first walk from the root: shortest distances and the edge used
/// to reach each node.
pub(crate) struct RootBfs {
    pub order: Vec<String>,
    pub depth: HashMap<String, usize>,
    via: HashMap<String, (String, String)>,
}

impl RootBfs {
    pub fn run(graph: &MoveGraph) -> Self {
        let mut bfs = RootBfs {
            order: Vec::new(),
            depth: HashMap::new(),
            via: HashMap::new(),
        };
        let Some(root) = graph.root() else {
            return bfs;
        };

        let mut queue = VecDeque::from([root.fen.clone()]);
        bfs.depth.insert(root.fen.clone(), 0);
        while let Some(fen) = queue.pop_front() {
            let d = bfs.depth[&fen];
            if let Some(node) = graph.node(&fen) {
                for child in &node.children {
                    if bfs.depth.contains_key(&child.fen) || !graph.nodes.contains_key(&child.fen) {
                        continue;
                    }
                    bfs.depth.insert(child.fen.clone(), d + 1);
                    bfs.via
                        .insert(child.fen.clone(), (fen.clone(), child.mv.clone()));
                    queue.push_back(child.fen.clone());
                }
            }
            bfs.order.push(fen);
        }
        bfs
    }

    pub fn path_to(&self, fen: &str) -> Option<GraphPath> {
        if !self.depth.contains_key(fen) {
            return None;
        }
        let mut nodes = vec![fen.to_string()];
        let mut moves = Vec::new();
        let mut cursor = fen;
        while let Some((parent, mv)) = self.via.get(cursor) {
            nodes.push(parent.clone());
            moves.push(mv.clone());
            cursor = parent;
        }
        nodes.reverse();
        moves.reverse();
        Some(GraphPath {
            node_ids: nodes,
            moves,
        })
    }
}

/// Shortest path from the root to `fen`, if it is reachable.
pub fn find_path_to_node(graph: &MoveGraph, fen: &str) -> Option<GraphPath> {
    RootBfs::run(graph).path_to(fen)
}

/// The continuations available from `fen`.
pub fn get_variations<'a>(graph: &'a MoveGraph, fen: &str) -> Vec<&'a ChildReference> {
    match graph.node(fen) {
        Some(node) => node.children.iter().collect(),
        None => {
            warn!(%fen, "Node not found");
            Vec::new()
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    pub case_sensitive: bool,
    pub max_results: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResult<'a> {
    pub node: &'a PositionNode,
    pub path: GraphPath,
    pub depth: usize,
}

/// Nodes whose narration text contains `query`, nearest to the root first.
pub fn search_nodes<'a>(
    graph: &'a MoveGraph,
    query: &str,
    opts: &SearchOptions,
) -> Vec<SearchResult<'a>> {
    if query.trim().is_empty() {
        return Vec::new();
    }
    let fold = |s: &str| {
        if opts.case_sensitive {
            s.to_string()
        } else {
            s.to_lowercase()
        }
    };
    let needle = fold(query);

    let mut matching: HashSet<&str> = HashSet::new();
    for event in &graph.events {
        if let EventKind::Text(text) = &event.kind {
            if fold(&text.text).contains(&needle) {
                matching.insert(text.fen.as_str());
            }
        }
    }

    let bfs = RootBfs::run(graph);
    let mut results = Vec::new();
    for fen in &bfs.order {
        if !matching.contains(fen.as_str()) {
            continue;
        }
        let (Some(node), Some(path)) = (graph.node(fen), bfs.path_to(fen)) else {
            continue;
        };
        results.push(SearchResult {
            node,
            depth: path.len(),
            path,
        });
        if opts.max_results.is_some_and(|max| results.len() >= max) {
            break;
        }
    }
    results
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GraphStats {
    pub total_nodes: usize,
    /// Number of child edges.
    pub total_moves: usize,
    /// Largest shortest-route distance from the root. A longer route into a
    /// merged position does not raise it.
    pub max_depth: usize,
    pub branching_factor: f64,
    pub mainline_length: usize,
    pub orphaned_nodes: usize,
}

pub fn analyze_graph(graph: &MoveGraph) -> GraphStats {
    let total_nodes = graph.nodes.len();
    let total_moves = graph.nodes.values().map(|n| n.children.len()).sum();
    let extra_branches: usize = graph
        .nodes
        .values()
        .map(|n| n.children.len().saturating_sub(1))
        .sum();

    let bfs = RootBfs::run(graph);
    let max_depth = bfs.depth.values().copied().max().unwrap_or(0);

    GraphStats {
        total_nodes,
        total_moves,
        max_depth,
        branching_factor: if total_nodes == 0 {
            0.0
        } else {
            extra_branches as f64 / total_nodes as f64
        },
        mainline_length: get_mainline_path(graph).len(),
        orphaned_nodes: total_nodes.saturating_sub(bfs.order.len()),
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NodeAnalysis {
    pub fen: String,
    /// Shortest distance from the root; `None` for orphaned nodes.
    pub depth: Option<usize>,
    pub is_leaf: bool,
    pub is_branch_point: bool,
    pub variation_count: usize,
    /// Ancestors reachable from the root.
    pub reachable_from: Vec<String>,
    /// Descendants.
    pub reachable_to: Vec<String>,
}

pub fn analyze_node(graph: &MoveGraph, fen: &str) -> Option<NodeAnalysis> {
    let Some(node) = graph.node(fen) else {
        warn!(%fen, "Node not found");
        return None;
    };

    let bfs = RootBfs::run(graph);

    // Reverse edges among reachable nodes.
    let mut parents_of: HashMap<&str, Vec<&str>> = HashMap::new();
    for parent in &bfs.order {
        if let Some(n) = graph.node(parent) {
            for child in &n.children {
                parents_of
                    .entry(child.fen.as_str())
                    .or_default()
                    .push(parent.as_str());
            }
        }
    }

    let reachable_from = collect_reachable(fen, |f| {
        parents_of.get(f).cloned().unwrap_or_default()
    });
    let reachable_to = collect_reachable(fen, |f| {
        graph
            .node(f)
            .map(|n| n.children.iter().map(|c| c.fen.as_str()).collect())
            .unwrap_or_default()
    });

    Some(NodeAnalysis {
        fen: node.fen.clone(),
        depth: bfs.depth.get(fen).copied(),
        is_leaf: node.is_leaf(),
        is_branch_point: node.is_branch_point(),
        variation_count: node.children.len(),
        reachable_from,
        reachable_to,
    })
}

/// Iterative DFS from `start` (excluded) over `next`, in discovery order.
fn collect_reachable<'a, F>(start: &'a str, next: F) -> Vec<String>
where
    F: Fn(&'a str) -> Vec<&'a str>,
{
    let mut seen: HashSet<&str> = HashSet::from([start]);
    let mut found = Vec::new();
    let mut stack = vec![start];
    while let Some(fen) = stack.pop() {
        for neighbour in next(fen) {
            if seen.insert(neighbour) {
                found.push(neighbour.to_string());
                stack.push(neighbour);
            }
        }
    }
    found
}
