//! Lesson authoring.
//!
//! A [`RecordingSession`] is owned by whoever drives the recording clock. It
//! exists from the first move to [`RecordingSession::finish`]. Every method
//! validates before it touches anything, so nodes, events and the current
//! path always change together or not at all.

use tracing::{debug, info};

use crate::board::Board;
use crate::error::{CmfError, Result};
use crate::event::{
    AnnotateEvent, Annotation, ArrowPayload, ClearEvent, Event, EventKind, MoveEvent,
    NavigateEvent, NavigationType, PausePointEvent, SquarePayload, TextEvent,
};
use crate::model::{GraphPath, MoveGraph, MoveRef, PositionNode};
use crate::traversal::find_path_to_node;

const LEGAL_POLICY: &str = "strict";

#[derive(Debug, Clone)]
pub struct RecordingSession {
    graph: MoveGraph,
    board: Board,
    path: GraphPath,
    last_t: u64,
    pause_points: usize,
}

impl RecordingSession {
    pub fn start(starting_fen: &str) -> Result<Self> {
        let board = Board::from_fen(starting_fen)?;
        info!(fen = %starting_fen, "Recording session started");
        Ok(Self {
            graph: MoveGraph::new(starting_fen),
            board,
            path: GraphPath::from_root(starting_fen),
            last_t: 0,
            pause_points: 0,
        })
    }

    pub fn graph(&self) -> &MoveGraph {
        &self.graph
    }

    pub fn current_fen(&self) -> &str {
        self.path.last_node()
    }

    pub fn current_path(&self) -> &GraphPath {
        &self.path
    }

    fn check_time(&self, t: u64) -> Result<()> {
        if t < self.last_t {
            return Err(CmfError::Session(format!(
                "timestamp {t} is before the previous event at {}",
                self.last_t
            )));
        }
        Ok(())
    }

    fn record(&mut self, t: u64, kind: EventKind) {
        self.graph.events.push(Event::new(t, kind));
        self.last_t = t;
    }

    /// Play a move given in SAN. Returns the new position's FEN.
    pub fn play_san(&mut self, san: &str, t: u64) -> Result<String> {
        self.check_time(t)?;
        let mv = self.board.resolve_san(san).map_err(CmfError::Session)?;
        self.play(mv, None, t)
    }

    /// Play a move given as coordinates. Returns the new position's FEN.
    pub fn play_coords(&mut self, from: &str, to: &str, promo: Option<&str>, t: u64) -> Result<String> {
        self.check_time(t)?;
        let mv = self
            .board
            .resolve_coords(from, to, promo)
            .map_err(CmfError::Session)?;
        let coords = (from.to_string(), to.to_string(), promo.map(str::to_string));
        self.play(mv, Some(coords), t)
    }

    fn play(
        &mut self,
        mv: shakmaty::Move,
        coords: Option<(String, String, Option<String>)>,
        t: u64,
    ) -> Result<String> {
        let parent_fen = self.current_fen().to_string();
        let parent = self
            .graph
            .node(&parent_fen)
            .ok_or_else(|| CmfError::Session(format!("current node {parent_fen} missing")))?;

        let san = self.board.san_of(&mv);
        let color = self.board.side_to_move();
        let move_number = parent.move_number / 2 + 1;
        let mut next = self.board.clone();
        next.play(mv);

        // Reuse an existing edge so re-playing a move after navigating back
        // lands on the same node.
        let existing = parent.child_by_move(&san).map(|c| c.fen.clone());
        let child_fen = existing.clone().unwrap_or_else(|| next.fen());
        let child_depth = parent.move_number + 1;

        if existing.is_none() {
            if let Some(p) = self.graph.nodes.get_mut(&parent_fen) {
                p.children.push(MoveRef::new(&san, &child_fen));
            }
        }
        let child = self
            .graph
            .nodes
            .entry(child_fen.clone())
            .or_insert_with(|| PositionNode::new(&child_fen, child_depth));
        if !child.parents.iter().any(|p| p.fen == parent_fen && p.mv == san) {
            child.parents.push(MoveRef::new(&san, &parent_fen));
        }

        let (from, to, promo) = match coords {
            Some((f, to, p)) => (Some(f), Some(to), p),
            None => (None, None, None),
        };
        debug!(%san, fen = %child_fen, t, "Move recorded");
        self.record(
            t,
            EventKind::Move(MoveEvent {
                san: san.clone(),
                from,
                to,
                promo,
                fen: child_fen.clone(),
                color: Some(color.to_string()),
                move_number: Some(move_number),
                legal_policy: Some(LEGAL_POLICY.to_string()),
                ..Default::default()
            }),
        );
        self.path.push(&san, &child_fen);
        self.board = next;

        Ok(child_fen)
    }

    /// Jump to any reachable node.
    pub fn navigate(&mut self, fen: &str, navigation_type: NavigationType, t: u64) -> Result<()> {
        self.check_time(t)?;
        let path = find_path_to_node(&self.graph, fen)
            .ok_or_else(|| CmfError::Session(format!("node {fen} is not reachable")))?;
        self.jump(path, navigation_type, None, t)
    }

    /// Step back one move along the current path.
    pub fn back(&mut self, t: u64) -> Result<()> {
        self.check_time(t)?;
        if self.path.is_empty() {
            return Err(CmfError::Session("already at the starting position".into()));
        }
        let mut path = self.path.clone();
        path.moves.pop();
        path.node_ids.pop();
        let target = path.len() as u32;
        self.jump(path, NavigationType::Back, Some(target), t)
    }

    /// Return to the starting position.
    pub fn to_start(&mut self, t: u64) -> Result<()> {
        self.check_time(t)?;
        let path = GraphPath::from_root(&self.graph.root_node_id);
        self.jump(path, NavigationType::Start, Some(0), t)
    }

    fn jump(
        &mut self,
        path: GraphPath,
        navigation_type: NavigationType,
        target_move_index: Option<u32>,
        t: u64,
    ) -> Result<()> {
        let fen = path.last_node().to_string();
        let board = Board::from_fen(&fen)?;
        self.record(
            t,
            EventKind::Navigate(NavigateEvent {
                fen,
                navigation_type,
                target_move_index,
                ..Default::default()
            }),
        );
        self.path = path;
        self.board = board;
        Ok(())
    }

    /// Draw on the current position.
    pub fn annotate(&mut self, annotations: &[Annotation], note: Option<&str>, t: u64) -> Result<()> {
        self.check_time(t)?;
        let mut event = AnnotateEvent {
            fen: self.current_fen().to_string(),
            note: note.map(str::to_string),
            ..Default::default()
        };
        for annotation in annotations {
            match annotation.clone() {
                Annotation::Arrow { from, to, color } => event.arrows.push(ArrowPayload::Object {
                    from,
                    to,
                    color: Some(color),
                }),
                Annotation::Circle { square, color } => event.circles.push(SquarePayload::Object {
                    square,
                    color: Some(color),
                }),
                Annotation::Highlight { square, color } => {
                    event.highlights.push(SquarePayload::Object {
                        square,
                        color: Some(color),
                    })
                }
            }
        }
        self.record(t, EventKind::Annotate(event));
        Ok(())
    }

    pub fn clear(&mut self, t: u64) -> Result<()> {
        self.check_time(t)?;
        let fen = self.current_fen().to_string();
        self.record(
            t,
            EventKind::Clear(ClearEvent {
                fen,
                ..Default::default()
            }),
        );
        Ok(())
    }

    pub fn text(&mut self, text: &str, t: u64) -> Result<()> {
        self.check_time(t)?;
        let fen = self.current_fen().to_string();
        self.record(
            t,
            EventKind::Text(TextEvent {
                fen,
                text: text.to_string(),
                ..Default::default()
            }),
        );
        Ok(())
    }

    /// Returns the new pause point's id.
    pub fn pause_point(&mut self, prompt: Option<&str>, t: u64) -> Result<String> {
        self.check_time(t)?;
        self.pause_points += 1;
        let id = format!("pause-{}", self.pause_points);
        let fen = self.current_fen().to_string();
        self.record(
            t,
            EventKind::PausePoint(PausePointEvent {
                id: id.clone(),
                fen,
                prompt: prompt.map(str::to_string),
                ..Default::default()
            }),
        );
        Ok(id)
    }

    /// End the recording. The duration never ends before the last event.
    pub fn finish(mut self, duration_ms: u64) -> MoveGraph {
        self.graph.meta.duration_ms = duration_ms.max(self.last_t);
        info!(
            nodes = self.graph.nodes.len(),
            events = self.graph.events.len(),
            duration_ms = self.graph.meta.duration_ms,
            "Recording session finished"
        );
        self.graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::STANDARD_START_FEN;

    #[test]
    fn test_illegal_move_changes_nothing() {
        let mut session = RecordingSession::start(STANDARD_START_FEN).unwrap();
        session.play_san("e4", 100).unwrap();
        let before = session.graph().clone();

        assert!(session.play_san("e4", 200).is_err());
        assert!(session.play_coords("a1", "a5", None, 200).is_err());
        assert_eq!(session.graph(), &before);
        assert_eq!(session.current_path().len(), 1);
    }

    #[test]
    fn test_time_cannot_go_backwards() {
        let mut session = RecordingSession::start(STANDARD_START_FEN).unwrap();
        session.play_san("e4", 500).unwrap();
        assert!(session.text("late", 400).is_err());
        assert_eq!(session.graph().events.len(), 1);
    }

    #[test]
    fn test_replaying_after_back_reuses_node() {
        let mut session = RecordingSession::start(STANDARD_START_FEN).unwrap();
        let first = session.play_san("e4", 100).unwrap();
        session.back(200).unwrap();
        assert_eq!(session.current_fen(), STANDARD_START_FEN);

        let again = session.play_san("e4", 300).unwrap();
        assert_eq!(first, again);
        let root = session.graph().root().unwrap();
        assert_eq!(root.children.len(), 1);
        assert_eq!(session.graph().node(&first).unwrap().parents.len(), 1);
    }

    #[test]
    fn test_back_at_start_fails() {
        let mut session = RecordingSession::start(STANDARD_START_FEN).unwrap();
        assert!(session.back(0).is_err());
        assert!(session.graph().events.is_empty());
    }

    #[test]
    fn test_finish_extends_duration() {
        let mut session = RecordingSession::start(STANDARD_START_FEN).unwrap();
        session.play_san("d4", 4_000).unwrap();
        let id = session.pause_point(Some("What now?"), 5_000).unwrap();
        assert_eq!(id, "pause-1");
        let graph = session.finish(1_000);
        assert_eq!(graph.meta.duration_ms, 5_000);
    }
}
