//! Tree construction from a single recursive listing.
//!
//! One remote call lists every entry under the ref. Files get loaders that
//! fetch their blob on first read, so each file costs one more call only if
//! it is actually read.

use std::sync::Arc;

use tracing::warn;

use super::error::{GithubError, Result};
use super::host::GitHost;
use super::project::ResolvedProject;
use super::types::TreeEntryKind;
use crate::glob_filter::Patterns;
use crate::tree::{loader, Loader, PathTree, RequestContext, TreeError};

pub struct MetadataTreeBuilder {
    host: Arc<dyn GitHost>,
    project: Arc<ResolvedProject>,
    glob: Patterns,
}

impl MetadataTreeBuilder {
    pub fn new(host: Arc<dyn GitHost>, project: ResolvedProject, glob: Patterns) -> Self {
        Self {
            host,
            project: Arc::new(project),
            glob,
        }
    }

    pub async fn build(&self, ctx: &RequestContext) -> Result<PathTree> {
        let project = &self.project;
        let listing = self
            .host
            .recursive_tree(ctx, &project.owner, &project.repo, &project.git_ref)
            .await?;
        if listing.truncated {
            warn!(
                owner = %project.owner,
                repo = %project.repo,
                "tree listing was truncated by the host; some files are missing"
            );
        }

        let mut tree = PathTree::new();
        for entry in listing.tree {
            let is_dir = match entry.kind {
                TreeEntryKind::Tree => true,
                TreeEntryKind::Blob => false,
                TreeEntryKind::Other => continue,
            };
            let Some(path) = project.relative_path(&entry.path, is_dir) else {
                continue;
            };
            if !self.glob.matches(path, is_dir) {
                continue;
            }

            let added = if is_dir {
                tree.add_directory(path)
            } else {
                let size = entry.size.unwrap_or(0);
                tree.add_file(path, size, self.blob_loader(entry.sha.clone()))
            };
            added.map_err(|source| GithubError::Tree {
                path: path.to_string(),
                source,
            })?;
        }
        Ok(tree)
    }

    fn blob_loader(&self, sha: String) -> Loader {
        let host = Arc::clone(&self.host);
        let project = Arc::clone(&self.project);
        loader(move |ctx| {
            let host = Arc::clone(&host);
            let project = Arc::clone(&project);
            let sha = sha.clone();
            async move {
                let blob = host
                    .blob(&ctx, &project.owner, &project.repo, &sha)
                    .await
                    .map_err(|e| match e {
                        GithubError::Cancelled => TreeError::Cancelled,
                        e => TreeError::Load(format!("failed getting blob {}: {}", sha, e)),
                    })?;
                blob.decode().map_err(|e| TreeError::Load(e.to_string()))
            }
        })
    }
}
