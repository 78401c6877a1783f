//! Records exchanged with the git hosting API.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use super::error::{GithubError, Result};

/// Repository metadata; only the default branch is used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub default_branch: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TreeEntryKind {
    Tree,
    Blob,
    /// Submodule commits and anything else the API may add.
    #[serde(other)]
    Other,
}

/// One entry of a recursive tree listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeEntry {
    pub path: String,
    #[serde(rename = "type")]
    pub kind: TreeEntryKind,
    #[serde(default)]
    pub size: Option<u64>,
    pub sha: String,
}

/// Response of the recursive tree call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeListing {
    pub sha: String,
    pub tree: Vec<TreeEntry>,
    #[serde(default)]
    pub truncated: bool,
}

/// A blob fetched by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blob {
    pub encoding: String,
    pub content: String,
}

impl Blob {
    pub fn decode(&self) -> Result<Bytes> {
        decode_content(&self.encoding, &self.content)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    File,
    Dir,
    Symlink,
    Submodule,
    #[serde(other)]
    Other,
}

/// An entry returned by the directory contents call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentEntry {
    pub path: String,
    #[serde(rename = "type")]
    pub kind: ContentKind,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub download_url: Option<String>,
    /// Inline content; only present when a single file is requested.
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub encoding: Option<String>,
}

impl ContentEntry {
    /// Decode the inline content of a single-file response.
    pub fn decode_content(&self) -> Result<Bytes> {
        match (&self.encoding, &self.content) {
            (Some(encoding), Some(content)) => decode_content(encoding, content),
            (None, Some(content)) => Ok(Bytes::from(content.clone().into_bytes())),
            (_, None) => Err(GithubError::Decode {
                path: self.path.clone(),
                message: "response carries no content".to_string(),
            }),
        }
    }
}

/// The contents call returns a listing for a directory and a single record for a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Contents {
    Directory(Vec<ContentEntry>),
    File(ContentEntry),
}

/// Decode content in one of the transfer encodings the API reports.
pub fn decode_content(encoding: &str, content: &str) -> Result<Bytes> {
    match encoding {
        "base64" => {
            // The API wraps base64 content across lines.
            let compact: String = content.chars().filter(|c| !c.is_ascii_whitespace()).collect();
            STANDARD
                .decode(compact)
                .map(Bytes::from)
                .map_err(|e| GithubError::Decode {
                    path: String::new(),
                    message: e.to_string(),
                })
        }
        "utf-8" | "utf8" => Ok(Bytes::from(content.to_string().into_bytes())),
        other => Err(GithubError::UnsupportedEncoding(other.to_string())),
    }
}

/// Encode content the way the API transfers it.
pub fn encode_base64(content: &[u8]) -> String {
    STANDARD.encode(content)
}
