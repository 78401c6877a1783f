//! Trees served from a local git checkout.
//!
//! Used during development: instead of fetching a project from its remote,
//! serve the working copy of a checkout whose remote is that project. File
//! content is read from disk on first access and fixed from then on.

mod error;
mod remote;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use tokio::fs;
use tracing::{debug, info};

pub use error::{LocalError, Result};
pub use remote::{git_root, project_name, remote_urls, strip_ref, subdir};

use crate::glob_filter::Patterns;
use crate::tree::{loader, Loader, PathTree, TreeError};

/// Serve the part of the checkout containing `local_path` that `project`
/// names. The checkout must have a remote matching the project; any `@ref`
/// on the project is ignored.
pub async fn load_tree(project: &str, local_path: &Path, glob: &Patterns) -> Result<PathTree> {
    let root = git_root(local_path).await?;
    let remotes = remote_urls(&root).await?;
    let sub = subdir(project, &remotes).ok_or_else(|| LocalError::NoMatchingRemote {
        root: root.clone(),
        project: project.to_string(),
    })?;
    let base = root.join(&sub);

    let metadata = fs::metadata(&base).await.map_err(|source| LocalError::Io {
        path: base.clone(),
        source,
    })?;

    let mut tree = PathTree::new();
    if metadata.is_file() {
        let name = sub.rsplit('/').next().unwrap_or(&sub);
        if glob.matches(name, false) {
            tree.add_file(name, metadata.len(), file_loader(base.clone()))?;
        }
    } else {
        add_directory_contents(&mut tree, &base, glob).await?;
    }

    info!(
        project,
        root = %base.display(),
        files = tree.file_count(),
        "loaded local checkout"
    );
    Ok(tree)
}

async fn add_directory_contents(tree: &mut PathTree, base: &Path, glob: &Patterns) -> Result<()> {
    let mut pending = vec![String::new()];
    while let Some(rel_dir) = pending.pop() {
        let abs_dir = base.join(&rel_dir);
        let io_err = |source: std::io::Error| LocalError::Io {
            path: abs_dir.clone(),
            source,
        };
        let mut read_dir = fs::read_dir(&abs_dir).await.map_err(io_err)?;

        while let Some(entry) = read_dir.next_entry().await.map_err(io_err)? {
            let name = entry.file_name().to_string_lossy().to_string();
            if name == ".git" {
                continue;
            }
            let rel_path = if rel_dir.is_empty() {
                name
            } else {
                format!("{}/{}", rel_dir, name)
            };
            let file_type = entry.file_type().await.map_err(io_err)?;

            if file_type.is_dir() {
                if glob.matches(&rel_path, true) {
                    tree.add_directory(&rel_path)?;
                    pending.push(rel_path);
                }
            } else if file_type.is_file() {
                if glob.matches(&rel_path, false) {
                    let size = entry.metadata().await.map_err(io_err)?.len();
                    tree.add_file(&rel_path, size, file_loader(entry.path()))?;
                }
            } else {
                debug!(path = %rel_path, "skipping special file");
            }
        }
    }
    Ok(())
}

fn file_loader(path: PathBuf) -> Loader {
    let path = Arc::new(path);
    loader(move |_ctx| {
        let path = Arc::clone(&path);
        async move {
            fs::read(path.as_path())
                .await
                .map(Bytes::from)
                .map_err(|e| TreeError::Load(format!("reading {}: {}", path.display(), e)))
        }
    })
}
