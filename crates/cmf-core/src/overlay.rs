//! Annotation, narration text and pause accumulation.
//!
//! Both the timeline reconciler and node-local state go through
//! [`Overlay::apply`] so playback and explore mode render identically.

use tracing::warn;

use crate::event::{Annotation, Event, EventKind};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overlay {
    pub annotations: Vec<Annotation>,
    pub text: Option<String>,
    pub is_paused: bool,
    pub pause_prompt: Option<String>,
}

impl Overlay {
    /// Fold one event (with `event.t <= time_ms`) into the overlay.
    /// Event types that do not touch the overlay are ignored.
    pub fn apply(&mut self, event: &Event, time_ms: u64, pause_window_ms: u64) {
        match &event.kind {
            EventKind::Annotate(a) => {
                let arrows = a.arrows.iter().map(|p| (p.normalize(), "arrow"));
                let circles = a.circles.iter().map(|p| (p.normalize_circle(), "circle"));
                let highlights = a
                    .highlights
                    .iter()
                    .map(|p| (p.normalize_highlight(), "highlight"));

                for (annotation, kind) in arrows.chain(circles).chain(highlights) {
                    match annotation {
                        Some(annotation) => self.annotations.push(annotation),
                        None => warn!(t = event.t, "Skipping malformed {kind} payload"),
                    }
                }
            }
            EventKind::Clear(_) => self.annotations.clear(),
            EventKind::Text(text) => self.text = Some(text.text.clone()),
            EventKind::PausePoint(pause) => {
                if time_ms.saturating_sub(event.t) <= pause_window_ms {
                    self.is_paused = true;
                    self.pause_prompt = pause.prompt.clone();
                }
            }
            EventKind::Move(_)
            | EventKind::Navigate(_)
            | EventKind::BranchStart(_)
            | EventKind::BranchEnd(_)
            | EventKind::Unknown(_) => {}
        }
    }
}
