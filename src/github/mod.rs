//! Trees served from a GitHub repository.
//!
//! A project name such as `github.com/owner/repo/sub/dir@tags/v1.0` is parsed
//! into a [`Project`], resolved to a concrete ref, and turned into a
//! [`PathTree`] by one of two builders:
//!
//! - [`MetadataTreeBuilder`] lists the whole tree in one call and fetches
//!   file content on first read.
//! - [`EagerTreeBuilder`] walks the subtree directory by directory and
//!   downloads every file before returning.
//!
//! Remote calls go through the [`GitHost`] trait. [`GithubClient`] talks to
//! the REST API; [`MemoryHost`] serves a repository held in memory.

mod client;
mod eager_tree;
mod error;
mod host;
pub mod memory_host;
mod metadata_tree;
mod project;
mod types;

use std::sync::Arc;
use std::time::Instant;

use tracing::info;

pub use client::{GithubClient, DEFAULT_API_URL};
pub use eager_tree::EagerTreeBuilder;
pub use error::{GithubError, ProjectError, Result};
pub use host::GitHost;
pub use memory_host::{CallCounts, MemoryHost, MemoryHostBuilder};
pub use metadata_tree::MetadataTreeBuilder;
pub use project::{Project, ResolvedProject};
pub use types::{
    Blob, ContentEntry, ContentKind, Contents, Repository, TreeEntry, TreeEntryKind, TreeListing,
};

use crate::glob_filter::Patterns;
use crate::tree::{PathTree, RequestContext};
use crate::util::RequestLimiter;

/// Parse `name`, resolve its ref and build the tree.
///
/// With `prefetch` the subtree is walked and every file downloaded up front,
/// with at most `limiter`'s limit of remote calls in flight. Otherwise the
/// tree is built from one recursive listing and files load on first read.
pub async fn load_tree(
    ctx: &RequestContext,
    host: Arc<dyn GitHost>,
    name: &str,
    prefetch: bool,
    glob: Patterns,
    limiter: RequestLimiter,
) -> Result<PathTree> {
    let start = Instant::now();
    let project = Project::parse(name)?.resolve(ctx, host.as_ref()).await?;

    let tree = if prefetch {
        EagerTreeBuilder::new(host, project.clone(), glob, limiter)
            .build(ctx)
            .await?
    } else {
        MetadataTreeBuilder::new(host, project.clone(), glob)
            .build(ctx)
            .await?
    };

    info!(
        owner = %project.owner,
        repo = %project.repo,
        git_ref = %project.git_ref,
        files = tree.file_count(),
        prefetch,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "loaded project"
    );
    Ok(tree)
}
