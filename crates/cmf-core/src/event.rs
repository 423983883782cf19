//! Timed lesson events and annotation payloads.
//!
//! Events live in one flat log next to the position graph. They reference
//! positions by FEN and carry the only record of when things happened.
//!
//! Each event is parsed on its own. One that does not fit its type is kept
//! verbatim as [`EventKind::Unknown`], so a bad entry never blocks the lesson
//! and is written back unchanged.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value as JsonValue};
use tracing::warn;

pub const DEFAULT_ANNOTATION_COLOR: &str = "yellow";

/// One entry of the event log.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// Milliseconds from the start of the recording.
    pub t: u64,
    pub kind: EventKind,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum EventKind {
    #[serde(rename = "move")]
    Move(MoveEvent),
    #[serde(rename = "annotate")]
    Annotate(AnnotateEvent),
    #[serde(rename = "text")]
    Text(TextEvent),
    #[serde(rename = "pausepoint")]
    PausePoint(PausePointEvent),
    #[serde(rename = "clear")]
    Clear(ClearEvent),
    #[serde(rename = "navigate")]
    Navigate(NavigateEvent),
    #[serde(rename = "branch.start")]
    BranchStart(BranchEvent),
    #[serde(rename = "branch.end")]
    BranchEnd(BranchEvent),
    /// An entry of unknown type, or one whose fields do not parse. Playback
    /// ignores it; the raw JSON is written back as it was read.
    #[serde(skip)]
    Unknown(JsonValue),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MoveEvent {
    #[serde(default)]
    pub san: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promo: Option<String>,
    /// Position after the move.
    #[serde(default)]
    pub fen: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub move_number: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legal_policy: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AnnotateEvent {
    #[serde(default)]
    pub fen: String,
    #[serde(default, deserialize_with = "null_as_empty", skip_serializing_if = "Vec::is_empty")]
    pub arrows: Vec<ArrowPayload>,
    #[serde(default, deserialize_with = "null_as_empty", skip_serializing_if = "Vec::is_empty")]
    pub circles: Vec<SquarePayload>,
    #[serde(default, deserialize_with = "null_as_empty", skip_serializing_if = "Vec::is_empty")]
    pub highlights: Vec<SquarePayload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TextEvent {
    #[serde(default)]
    pub fen: String,
    #[serde(default)]
    pub text: String,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PausePointEvent {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub fen: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ClearEvent {
    #[serde(default)]
    pub fen: String,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NavigateEvent {
    #[serde(default)]
    pub fen: String,
    #[serde(default)]
    pub navigation_type: NavigationType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_move_index: Option<u32>,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NavigationType {
    #[default]
    ToNode,
    ToMoveIndex,
    Back,
    Forward,
    Start,
    Latest,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BranchEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fen: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch_id: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

/// Arrow payloads come either as `{from,to,color?}` objects or as
/// `[from, to, color?]` tuples from older recordings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ArrowPayload {
    Object {
        from: String,
        to: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        color: Option<String>,
    },
    Tuple(Vec<String>),
    Raw(JsonValue),
}

/// Circle/highlight payloads come either as `{square,color?}` or a bare square.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum SquarePayload {
    Object {
        square: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        color: Option<String>,
    },
    Bare(String),
    Raw(JsonValue),
}

/// A normalized, renderable annotation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Annotation {
    Arrow {
        from: String,
        to: String,
        color: String,
    },
    Circle {
        square: String,
        color: String,
    },
    Highlight {
        square: String,
        color: String,
    },
}

fn color_or_default(color: Option<&str>) -> String {
    match color.map(str::trim) {
        Some(c) if !c.is_empty() => c.to_string(),
        _ => DEFAULT_ANNOTATION_COLOR.to_string(),
    }
}

fn is_square(s: &str) -> bool {
    let b = s.as_bytes();
    b.len() == 2 && (b'a'..=b'h').contains(&b[0]) && (b'1'..=b'8').contains(&b[1])
}

impl ArrowPayload {
    /// `None` for malformed payloads.
    pub fn normalize(&self) -> Option<Annotation> {
        let (from, to, color) = match self {
            ArrowPayload::Object { from, to, color } => {
                (from.as_str(), to.as_str(), color.as_deref())
            }
            ArrowPayload::Tuple(parts) if parts.len() >= 2 => (
                parts[0].as_str(),
                parts[1].as_str(),
                parts.get(2).map(String::as_str),
            ),
            _ => return None,
        };
        if !is_square(from) || !is_square(to) {
            return None;
        }
        Some(Annotation::Arrow {
            from: from.to_string(),
            to: to.to_string(),
            color: color_or_default(color),
        })
    }
}

impl SquarePayload {
    fn parts(&self) -> Option<(&str, Option<&str>)> {
        let (square, color) = match self {
            SquarePayload::Object { square, color } => (square.as_str(), color.as_deref()),
            SquarePayload::Bare(square) => (square.as_str(), None),
            SquarePayload::Raw(_) => return None,
        };
        is_square(square).then_some((square, color))
    }

    pub fn normalize_circle(&self) -> Option<Annotation> {
        self.parts().map(|(square, color)| Annotation::Circle {
            square: square.to_string(),
            color: color_or_default(color),
        })
    }

    pub fn normalize_highlight(&self) -> Option<Annotation> {
        self.parts().map(|(square, color)| Annotation::Highlight {
            square: square.to_string(),
            color: color_or_default(color),
        })
    }
}

impl Event {
    pub fn new(t: u64, kind: EventKind) -> Self {
        Self { t, kind }
    }

    /// The position this event is attached to, if any.
    pub fn fen(&self) -> Option<&str> {
        match &self.kind {
            EventKind::Move(e) => Some(e.fen.as_str()),
            EventKind::Annotate(e) => Some(e.fen.as_str()),
            EventKind::Text(e) => Some(e.fen.as_str()),
            EventKind::PausePoint(e) => Some(e.fen.as_str()),
            EventKind::Clear(e) => Some(e.fen.as_str()),
            EventKind::Navigate(e) => Some(e.fen.as_str()),
            EventKind::BranchStart(e) | EventKind::BranchEnd(e) => e.fen.as_deref(),
            EventKind::Unknown(_) => None,
        }
        .filter(|fen| !fen.is_empty())
    }

    pub fn type_name(&self) -> &'static str {
        match &self.kind {
            EventKind::Move(_) => "move",
            EventKind::Annotate(_) => "annotate",
            EventKind::Text(_) => "text",
            EventKind::PausePoint(_) => "pausepoint",
            EventKind::Clear(_) => "clear",
            EventKind::Navigate(_) => "navigate",
            EventKind::BranchStart(_) => "branch.start",
            EventKind::BranchEnd(_) => "branch.end",
            EventKind::Unknown(_) => "unknown",
        }
    }

    pub fn as_move(&self) -> Option<&MoveEvent> {
        match &self.kind {
            EventKind::Move(m) => Some(m),
            _ => None,
        }
    }
}

impl Event {
    /// Parse one log entry. Never fails: entries without a usable `t` or
    /// with fields that do not fit their type become `Unknown`.
    pub fn from_value(raw: JsonValue) -> Self {
        let t = raw
            .get("t")
            .and_then(JsonValue::as_f64)
            .filter(|t| t.is_finite() && *t >= 0.0)
            .map(|t| t.round() as u64);
        let Some(t) = t else {
            warn!(event = %raw, "Event has no usable timestamp, keeping it unparsed");
            return Self::new(0, EventKind::Unknown(raw));
        };

        let mut body = raw.clone();
        if let Some(fields) = body.as_object_mut() {
            fields.remove("t");
        }
        match EventKind::deserialize(&body) {
            Ok(kind) => Self::new(t, kind),
            Err(e) => {
                let type_name = raw.get("type").and_then(JsonValue::as_str).unwrap_or("?");
                warn!(t, event_type = type_name, "Keeping malformed or unknown event unparsed: {e}");
                Self::new(t, EventKind::Unknown(raw))
            }
        }
    }
}

impl<'de> Deserialize<'de> for Event {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        JsonValue::deserialize(deserializer).map(Event::from_value)
    }
}

impl Serialize for Event {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Timed<'a> {
            t: u64,
            #[serde(flatten)]
            kind: &'a EventKind,
        }

        match &self.kind {
            EventKind::Unknown(raw) => raw.serialize(serializer),
            kind => Timed { t: self.t, kind }.serialize(serializer),
        }
    }
}

/// An explicit `null` list reads as empty.
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Stable sort by timestamp; equal timestamps keep log order.
pub fn sorted_events(events: &[Event]) -> Vec<&Event> {
    let mut sorted: Vec<&Event> = events.iter().collect();
    sorted.sort_by_key(|e| e.t);
    sorted
}

/// True when the log is already in non-decreasing `t` order.
pub fn is_chronological(events: &[Event]) -> bool {
    events.windows(2).all(|w| w[0].t <= w[1].t)
}

/// Accepts integer or fractional millisecond values, rounding fractions.
pub(crate) fn de_millis<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = f64::deserialize(deserializer)?;
    if !raw.is_finite() || raw < 0.0 {
        return Err(serde::de::Error::custom(format!(
            "timestamp must be a non-negative number, got {raw}"
        )));
    }
    Ok(raw.round() as u64)
}
