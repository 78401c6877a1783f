use thiserror::Error;

use crate::binfs::BinfsError;
use crate::config::ConfigError;
use crate::github::GithubError;
use crate::glob_filter::PatternError;
use crate::localfs::LocalError;
use crate::tree::TreeError;

/// Errors from opening a project.
#[derive(Debug, Error)]
pub enum Error {
    #[error("project type not supported: {0}")]
    UnsupportedProject(String),

    #[error("{0}")]
    Pattern(#[from] PatternError),

    #[error("{0}")]
    Github(#[from] GithubError),

    #[error("{0}")]
    Tree(#[from] TreeError),

    #[error("{0}")]
    Binfs(#[from] BinfsError),

    #[error("{0}")]
    Local(#[from] LocalError),

    #[error("{0}")]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, Error>;
