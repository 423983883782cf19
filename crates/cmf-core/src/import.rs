//! PGN import: a lightweight regex parser that turns a game into an evenly timed lesson.
//!
//! Only the mainline is imported. Moves are spaced evenly along the timeline
//! so the result plays back like a recording.

use regex::Regex;
use serde_json::Value as JsonValue;
use tracing::warn;

use crate::board::STANDARD_START_FEN;
use crate::error::{CmfError, Result};
use crate::model::MoveGraph;
use crate::session::RecordingSession;

pub const DEFAULT_MS_PER_MOVE: u64 = 2_000;

/// Headers copied into the lesson metadata.
const CARRIED_HEADERS: &[(&str, &str)] = &[
    ("White", "white"),
    ("Black", "black"),
    ("Event", "event"),
    ("Result", "result"),
];

/// Build a lesson from a PGN mainline. Import stops at the first illegal move.
pub fn import_pgn(pgn: &str, ms_per_move: u64) -> Result<MoveGraph> {
    let header_re = Regex::new(r#"\[(\w+)\s+"([^"]*)"\]"#).map_err(regex_error)?;

    let mut starting_fen = STANDARD_START_FEN.to_string();
    let mut carried = Vec::new();
    for cap in header_re.captures_iter(pgn) {
        let key = &cap[1];
        let value = cap[2].to_string();
        if key == "FEN" && !value.is_empty() {
            starting_fen = value;
        } else if let Some((_, meta_key)) = CARRIED_HEADERS.iter().find(|(h, _)| *h == key) {
            carried.push((meta_key.to_string(), value));
        }
    }

    let moves = extract_moves(pgn)?;
    if moves.is_empty() {
        return Err(CmfError::Session("PGN contains no moves".into()));
    }

    let mut session = RecordingSession::start(&starting_fen)?;
    let mut played: u64 = 0;
    for san in &moves {
        let t = (played + 1) * ms_per_move;
        if let Err(e) = session.play_san(san, t) {
            warn!(ply = played + 1, %san, "Stopping PGN import: {e}");
            break;
        }
        played += 1;
    }

    let mut graph = session.finish((played + 1) * ms_per_move);
    for (key, value) in carried {
        graph.meta.extra.insert(key, JsonValue::String(value));
    }
    Ok(graph)
}

/// SAN moves from PGN text, with headers, comments and (nested) variations removed.
fn extract_moves(pgn: &str) -> Result<Vec<String>> {
    let header_re = Regex::new(r"\[[^\]]*\]").map_err(regex_error)?;
    let no_headers = header_re.replace_all(pgn, "");

    let comment_re = Regex::new(r"\{[^}]*\}").map_err(regex_error)?;
    let mut text = comment_re.replace_all(&no_headers, "").into_owned();

    // Innermost variations first until none are left.
    let variation_re = Regex::new(r"\([^()]*\)").map_err(regex_error)?;
    while variation_re.is_match(&text) {
        text = variation_re.replace_all(&text, "").into_owned();
    }

    let move_re = Regex::new(r"[KQRBN]?[a-h]?[1-8]?x?[a-h][1-8](?:=[QRBN])?[+#]?|O-O-O|O-O")
        .map_err(regex_error)?;

    Ok(move_re
        .find_iter(&text)
        .map(|m| m.as_str().to_string())
        .collect())
}

fn regex_error(e: regex::Error) -> CmfError {
    CmfError::Session(format!("PGN pattern error: {e}"))
}
