//! Timeline reconciliation: everything the player renders at a given
//! millisecond of audio.
//!
//! State is rebuilt from `t = 0` on every call; nothing carries over between
//! calls.

use serde::Serialize;
use tracing::warn;

use crate::board::Board;
use crate::config::EngineConfig;
use crate::error::Result;
use crate::event::{sorted_events, Annotation, EventKind};
use crate::model::MoveGraph;
use crate::move_index::{build_move_index, position_at, MoveIndexEntry};
use crate::overlay::Overlay;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TimelineState {
    pub fen: String,
    pub active_annotations: Vec<Annotation>,
    pub active_text: Option<String>,
    pub is_paused: bool,
    pub pause_prompt: Option<String>,
}

/// Replay every event with `t <= time_ms` in stable timestamp order.
///
/// `navigate` reloads the board from its FEN; `move` builds on whatever the
/// board currently holds and is skipped with a warning when illegal.
pub fn compute_state_at_time(graph: &MoveGraph, time_ms: u64, config: &EngineConfig) -> TimelineState {
    let mut fen = graph.meta.starting_fen.clone();
    let mut board = match Board::from_fen(&fen) {
        Ok(b) => Some(b),
        Err(e) => {
            warn!("Starting position unusable, moves will be skipped: {e}");
            None
        }
    };
    let mut overlay = Overlay::default();

    for event in sorted_events(&graph.events) {
        if event.t > time_ms {
            break;
        }
        match &event.kind {
            EventKind::Navigate(nav) => {
                if nav.fen.is_empty() {
                    warn!(t = event.t, "Navigate event without a FEN, ignoring");
                    continue;
                }
                fen = nav.fen.clone();
                board = match Board::from_fen(&fen) {
                    Ok(b) => Some(b),
                    Err(e) => {
                        warn!(t = event.t, "Navigate target unusable: {e}");
                        None
                    }
                };
            }
            EventKind::Move(mv) => {
                let Some(b) = board.as_mut() else {
                    warn!(t = event.t, san = %mv.san, "No usable position, skipping move");
                    continue;
                };
                match b.apply(
                    Some(mv.san.as_str()),
                    mv.from.as_deref(),
                    mv.to.as_deref(),
                    mv.promo.as_deref(),
                ) {
                    Ok(()) => fen = b.fen(),
                    Err(e) => warn!(t = event.t, "Skipping move event: {e}"),
                }
            }
            _ => overlay.apply(event, time_ms, config.pause_window_ms),
        }
    }

    TimelineState {
        fen,
        active_annotations: overlay.annotations,
        active_text: overlay.text,
        is_paused: overlay.is_paused,
        pause_prompt: overlay.pause_prompt,
    }
}

/// A loaded lesson ready for playback: the document plus its seek index.
#[derive(Debug, Clone)]
pub struct Timeline<'a> {
    graph: &'a MoveGraph,
    index: Vec<MoveIndexEntry>,
    config: EngineConfig,
}

impl<'a> Timeline<'a> {
    /// Builds the move index once; fails if the mainline is corrupt.
    pub fn load(graph: &'a MoveGraph, config: EngineConfig) -> Result<Self> {
        let index = build_move_index(graph)?;
        Ok(Self {
            graph,
            index,
            config,
        })
    }

    pub fn index(&self) -> &[MoveIndexEntry] {
        &self.index
    }

    pub fn state_at(&self, time_ms: u64) -> TimelineState {
        compute_state_at_time(self.graph, time_ms, &self.config)
    }

    /// Coarse mainline position for seek previews.
    pub fn seek(&self, time_ms: u64) -> Option<&MoveIndexEntry> {
        position_at(&self.index, time_ms)
    }
}
