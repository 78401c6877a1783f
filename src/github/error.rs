use thiserror::Error;

use crate::tree::{Cancelled, TreeError};
use crate::util::SpawnAfterDoneError;

/// Errors from parsing a project identifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProjectError {
    #[error("bad project name: {0}")]
    BadProjectName(String),

    #[error("bad ref {0:?}: ref must have a 'heads/' or 'tags/' prefix")]
    BadRef(String),
}

/// Errors from talking to the git host or building a tree from it.
#[derive(Debug, Error)]
pub enum GithubError {
    #[error("{0}")]
    Project(#[from] ProjectError),

    #[error("not found: {0}")]
    NotFound(String),

    /// The request could not be sent or its body could not be read.
    #[error("{op} {path}: {message}")]
    Request {
        op: &'static str,
        path: String,
        message: String,
    },

    /// The host answered with an unexpected status.
    #[error("{op} {path}: unexpected status code {status}")]
    Status {
        op: &'static str,
        path: String,
        status: u16,
    },

    #[error("unexpected encoding: {0}")]
    UnsupportedEncoding(String),

    #[error("decoding content of {path}: {message}")]
    Decode { path: String, message: String },

    #[error("no download URL for {0}")]
    MissingDownloadUrl(String),

    #[error("adding {path}: {source}")]
    Tree {
        path: String,
        #[source]
        source: TreeError,
    },

    #[error("{0}")]
    Spawn(#[from] SpawnAfterDoneError),

    #[error("request context cancelled")]
    Cancelled,
}

impl From<Cancelled> for GithubError {
    fn from(_: Cancelled) -> Self {
        GithubError::Cancelled
    }
}

/// Result type for git host operations.
pub type Result<T> = std::result::Result<T, GithubError>;
