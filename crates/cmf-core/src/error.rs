//! Engine error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CmfError {
    #[error("Root node not found: {0}")]
    RootNotFound(String),

    #[error("Illegal mainline move '{mv}' at node {node}: {reason}")]
    IllegalMainlineMove {
        node: String,
        mv: String,
        reason: String,
    },

    #[error("Invalid FEN '{fen}': {reason}")]
    InvalidFen { fen: String, reason: String },

    #[error("Recording session error: {0}")]
    Session(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CmfError>;
