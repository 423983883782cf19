//! Time-to-position table over the authoring mainline, for coarse seeking.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::board::Board;
use crate::error::{CmfError, Result};
use crate::model::MoveGraph;
use crate::traversal::get_mainline_path;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MoveIndexEntry {
    pub t: u64,
    pub fen: String,
    pub move_number: u32,
}

/// Replay the mainline's move events with the rules engine.
///
/// The first entry is the starting position at `t = 0`. An illegal move means
/// the document is corrupt and fails the whole build.
pub fn build_move_index(graph: &MoveGraph) -> Result<Vec<MoveIndexEntry>> {
    if graph.root().is_none() {
        return Err(CmfError::RootNotFound(graph.root_node_id.clone()));
    }

    let mut board = Board::from_fen(&graph.meta.starting_fen)?;
    let mut index = vec![MoveIndexEntry {
        t: 0,
        fen: graph.meta.starting_fen.clone(),
        move_number: 0,
    }];

    let mainline = get_mainline_path(graph);
    let mut reached: HashSet<&str> = HashSet::new();

    for fen in &mainline.node_ids {
        for event in graph.events_for(fen) {
            let Some(mv) = event.as_move() else {
                continue;
            };

            // A node narrated again after navigating back is already on the board.
            if !reached.insert(fen.as_str()) {
                index.push(MoveIndexEntry {
                    t: event.t,
                    fen: board.fen(),
                    move_number: board.move_number(),
                });
                continue;
            }

            board
                .apply(
                    Some(mv.san.as_str()),
                    mv.from.as_deref(),
                    mv.to.as_deref(),
                    mv.promo.as_deref(),
                )
                .map_err(|reason| CmfError::IllegalMainlineMove {
                    node: fen.clone(),
                    mv: describe_move(&mv.san, mv.from.as_deref(), mv.to.as_deref()),
                    reason,
                })?;

            index.push(MoveIndexEntry {
                t: event.t,
                fen: board.fen(),
                move_number: board.move_number(),
            });
        }
    }

    index.sort_by_key(|e| e.t);
    Ok(index)
}

fn describe_move(san: &str, from: Option<&str>, to: Option<&str>) -> String {
    match (from, to) {
        (Some(f), Some(t)) if san.is_empty() => format!("{f}{t}"),
        (Some(f), Some(t)) => format!("{san} ({f}{t})"),
        _ => san.to_string(),
    }
}

/// Last entry at or before `t`.
pub fn position_at(index: &[MoveIndexEntry], t: u64) -> Option<&MoveIndexEntry> {
    let after = index.partition_point(|e| e.t <= t);
    after.checked_sub(1).map(|i| &index[i])
}
