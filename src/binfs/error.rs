use thiserror::Error;

use crate::tree::TreeError;

#[derive(Debug, Error)]
pub enum BinfsError {
    #[error("packed tree is from encoding version {version}; this build supports versions 1 to {supported}")]
    UnsupportedVersion { version: u32, supported: u32 },

    #[error("decoding packed tree: {0}")]
    Decode(String),

    #[error("encoding tree: {0}")]
    Encode(String),

    #[error("project {0} registered multiple times")]
    AlreadyRegistered(String),

    #[error("{0}")]
    Tree(#[from] TreeError),
}

pub type Result<T> = std::result::Result<T, BinfsError>;
