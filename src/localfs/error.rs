use std::path::PathBuf;

use thiserror::Error;

use crate::tree::TreeError;

#[derive(Debug, Error)]
pub enum LocalError {
    #[error("not a git repository (or any parent): {}", .0.display())]
    NotGitRepository(PathBuf),

    #[error("no remote of {} matches project {project}", .root.display())]
    NoMatchingRemote { root: PathBuf, project: String },

    #[error("reading git config {}: {message}", .path.display())]
    GitConfig { path: PathBuf, message: String },

    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    Tree(#[from] TreeError),
}

pub type Result<T> = std::result::Result<T, LocalError>;
