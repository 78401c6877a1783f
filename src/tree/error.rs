use std::fmt;

use thiserror::Error;

use super::context::Cancelled;

/// The kind of node stored at a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Directory,
    File,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Directory => write!(f, "directory"),
            NodeKind::File => write!(f, "file"),
        }
    }
}

/// Errors produced by tree construction and by handle operations.
#[derive(Debug, Error)]
pub enum TreeError {
    #[error("path not found: {path:?}")]
    NotFound { path: String },

    /// The request implied a directory but the path holds a file.
    #[error("invalid request for {path:?}: not a directory")]
    Invalid { path: String },

    /// Insertion of one kind at a path already holding the other kind.
    #[error("cannot add {kind} at {path:?}: a {existing} already exists there")]
    Conflict {
        path: String,
        kind: NodeKind,
        existing: NodeKind,
    },

    #[error("request context cancelled")]
    Cancelled,

    /// A file's content loader failed.
    #[error("loading content: {0}")]
    Load(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<Cancelled> for TreeError {
    fn from(_: Cancelled) -> Self {
        TreeError::Cancelled
    }
}

/// Result type for tree operations.
pub type Result<T> = std::result::Result<T, TreeError>;
