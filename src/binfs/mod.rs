//! Packed trees: a whole tree, structure and content, in one byte buffer.
//!
//! A packed tree is produced once by [`encode`] and later served without any
//! remote access, either directly through [`decode`] or by project name
//! through a [`Registry`].
//!
//! The buffer holds a bincode-encoded [`Storage`] record. Changing that
//! record needs a new [`ENCODE_VERSION`] and a decoder for it.

mod error;
mod registry;

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

pub use error::{BinfsError, Result};
pub use registry::Registry;

use crate::fsutil;
use crate::tree::{content_loader, PathTree, RequestContext};

/// Encoding version written by [`encode`].
pub const ENCODE_VERSION: u32 = 1;

/// Everything stored for one tree. Sorted collections keep the encoding
/// independent of the order the tree was built in.
#[derive(Debug, Default, Serialize, Deserialize)]
struct Storage {
    dirs: BTreeSet<String>,
    files: BTreeMap<String, Vec<u8>>,
}

/// Pack `tree`. Every file is read to the end under `ctx`, so lazy files
/// are fetched as part of packing.
pub async fn encode(ctx: &RequestContext, tree: &PathTree) -> Result<Vec<u8>> {
    let mut storage = Storage::default();
    for entry in fsutil::walk(tree)? {
        if entry.is_dir() {
            storage.dirs.insert(entry.path);
        } else {
            let content = tree
                .open_with_context(&entry.path, ctx)?
                .read_to_end()
                .await?;
            storage.files.insert(entry.path, content);
        }
    }
    debug!(
        dirs = storage.dirs.len(),
        files = storage.files.len(),
        "packing tree"
    );
    bincode::serialize(&storage).map_err(|e| BinfsError::Encode(e.to_string()))
}

/// Rebuild a tree packed with encoding `version`.
pub fn decode(data: &[u8], version: u32) -> Result<PathTree> {
    match version {
        1 => decode_v1(data),
        _ => Err(BinfsError::UnsupportedVersion {
            version,
            supported: ENCODE_VERSION,
        }),
    }
}

fn decode_v1(data: &[u8]) -> Result<PathTree> {
    let storage: Storage =
        bincode::deserialize(data).map_err(|e| BinfsError::Decode(e.to_string()))?;

    let mut tree = PathTree::new();
    for dir in &storage.dirs {
        tree.add_directory(dir)?;
    }
    for (path, content) in storage.files {
        let size = content.len() as u64;
        tree.add_file(&path, size, content_loader(content))?;
    }
    Ok(tree)
}
