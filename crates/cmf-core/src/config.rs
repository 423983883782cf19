//! Engine tuning parameters, loadable from environment variables.

use std::env;
use std::str::FromStr;

use tracing::warn;

/// Window after a pause point during which the player reports itself paused.
pub const DEFAULT_PAUSE_WINDOW_MS: u64 = 500;

/// Recursion cap for path enumeration on malformed documents.
pub const DEFAULT_MAX_PATH_DEPTH: usize = 100;

/// One comparison step in the best-path ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathCriterion {
    /// Total narration time spent on the path's nodes.
    AudioTime,
    /// Number of events attached to the path's nodes.
    EventCount,
    /// Number of moves in the path.
    Length,
}

impl FromStr for PathCriterion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "audio" | "audio_time" | "time" => Ok(PathCriterion::AudioTime),
            "events" | "event_count" => Ok(PathCriterion::EventCount),
            "length" | "len" => Ok(PathCriterion::Length),
            other => Err(format!("unknown path criterion '{other}'")),
        }
    }
}

#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// How long (ms) a pause point keeps `is_paused` set after its timestamp
    pub pause_window_ms: u64,

    /// Maximum depth explored by path enumeration
    pub max_path_depth: usize,

    /// Lexicographic tie-break chain for `calculate_mainline_path`
    pub tie_break: Vec<PathCriterion>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            pause_window_ms: DEFAULT_PAUSE_WINDOW_MS,
            max_path_depth: DEFAULT_MAX_PATH_DEPTH,
            tie_break: vec![
                PathCriterion::AudioTime,
                PathCriterion::EventCount,
                PathCriterion::Length,
            ],
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let pause_window_ms = env::var("CMF_PAUSE_WINDOW_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.pause_window_ms);

        let max_path_depth = env::var("CMF_MAX_PATH_DEPTH")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.max_path_depth);

        let tie_break = match env::var("CMF_MAINLINE_TIEBREAK") {
            Ok(raw) => match parse_tie_break(&raw) {
                Ok(chain) => chain,
                Err(e) => {
                    warn!("Ignoring CMF_MAINLINE_TIEBREAK={raw}: {e}");
                    defaults.tie_break
                }
            },
            Err(_) => defaults.tie_break,
        };

        Self {
            pause_window_ms,
            max_path_depth,
            tie_break,
        }
    }
}

/// Parse a comma-separated criterion list such as `audio,events,length`.
pub fn parse_tie_break(raw: &str) -> Result<Vec<PathCriterion>, String> {
    let chain = raw
        .split(',')
        .filter(|s| !s.trim().is_empty())
        .map(str::parse)
        .collect::<Result<Vec<PathCriterion>, String>>()?;

    if chain.is_empty() {
        return Err("empty criterion list".into());
    }
    Ok(chain)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.pause_window_ms, 500);
        assert_eq!(config.max_path_depth, 100);
        assert_eq!(config.tie_break[0], PathCriterion::AudioTime);
    }

    #[test]
    fn test_parse_tie_break() {
        let chain = parse_tie_break("length, audio").unwrap();
        assert_eq!(chain, vec![PathCriterion::Length, PathCriterion::AudioTime]);
        assert!(parse_tie_break("audio,bogus").is_err());
        assert!(parse_tie_break(" , ").is_err());
    }
}
