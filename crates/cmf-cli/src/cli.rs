//! CLI argument definitions for the `cmf` lesson tool.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Inspect and play back CMF chess lessons. All output is JSON on stdout.
#[derive(Parser, Debug)]
#[command(name = "cmf")]
#[command(author, version, about = "Inspect and play back CMF chess lessons", long_about = None)]
pub struct Cli {
    /// Pause indicator window in milliseconds
    #[arg(long, global = true, env = "CMF_PAUSE_WINDOW_MS")]
    pub pause_window_ms: Option<u64>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Reconciled board, annotations and narration at a point in time
    State {
        file: PathBuf,
        /// Playback position in milliseconds
        time_ms: u64,
    },

    /// Annotation and narration state of a single node
    Node {
        file: PathBuf,
        fen: String,
        /// Playback position in milliseconds (defaults to the end of the lesson)
        #[arg(long)]
        at: Option<u64>,
    },

    /// Mainline seek index
    Index {
        file: PathBuf,
        /// Only print the entry in effect at this time
        #[arg(long)]
        at: Option<u64>,
    },

    /// Best line through the lesson
    Mainline {
        file: PathBuf,
        /// Resolve the line as it stands after this much playback
        #[arg(long)]
        at: Option<u64>,
        /// Print the authoring-order mainline instead
        #[arg(long, conflicts_with = "at")]
        authored: bool,
    },

    /// Enumerate root paths
    Paths {
        file: PathBuf,
        /// Include a path for every node, not only leaves
        #[arg(long)]
        variations: bool,
        #[arg(long)]
        max_depth: Option<usize>,
    },

    /// Find nodes by narration text
    Search {
        file: PathBuf,
        text: String,
        #[arg(long)]
        case_sensitive: bool,
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Graph statistics
    Stats { file: PathBuf },

    /// Reachability and depth of one node
    Analyze { file: PathBuf, fen: String },

    /// Structural checks
    Validate {
        file: PathBuf,
        /// Write the document back with its events sorted by time
        #[arg(long)]
        fix_order: bool,
    },

    /// Convert a PGN mainline into a lesson document
    ImportPgn {
        file: PathBuf,
        #[arg(long, default_value_t = cmf_core::import::DEFAULT_MS_PER_MOVE)]
        ms_per_move: u64,
    },
}
