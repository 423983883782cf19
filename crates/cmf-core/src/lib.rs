//! CMF lesson engine.
//!
//! A lesson is a graph of chess positions keyed by FEN plus a flat, timed
//! event log. This crate answers what the board, the drawings and the
//! narration look like at any millisecond of the recording, and provides
//! read-only queries over the graph for navigation UI.

pub mod board;
pub mod config;
pub mod error;
pub mod event;
pub mod import;
pub mod mainline;
pub mod model;
pub mod move_index;
pub mod overlay;
pub mod session;
pub mod timeline;
pub mod traversal;
pub mod validate;

pub use config::{EngineConfig, PathCriterion};
pub use error::{CmfError, Result};
pub use event::{Annotation, Event, EventKind, NavigationType};
pub use mainline::{calculate_dynamic_mainline_path, calculate_mainline_path};
pub use model::{GraphPath, MoveGraph, PositionNode};
pub use move_index::{build_move_index, MoveIndexEntry};
pub use session::RecordingSession;
pub use timeline::{compute_state_at_time, Timeline, TimelineState};
pub use validate::{validate, ValidationReport};
