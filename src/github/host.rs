use async_trait::async_trait;
use bytes::Bytes;

use super::error::Result;
use super::types::{Blob, Contents, TreeListing};
use crate::tree::RequestContext;

/// The remote operations needed to build a tree.
///
/// Every call takes the request context it runs under; a cancelled context
/// makes the call fail with `GithubError::Cancelled`.
#[async_trait]
pub trait GitHost: Send + Sync {
    /// Name of the repository's default branch.
    async fn default_branch(&self, ctx: &RequestContext, owner: &str, repo: &str) -> Result<String>;

    /// Complete recursive listing of the tree at `git_ref`.
    async fn recursive_tree(
        &self,
        ctx: &RequestContext,
        owner: &str,
        repo: &str,
        git_ref: &str,
    ) -> Result<TreeListing>;

    /// A single blob by id.
    async fn blob(&self, ctx: &RequestContext, owner: &str, repo: &str, sha: &str) -> Result<Blob>;

    /// Immediate children of a directory, or the file record when `path` is a file.
    /// `git_ref` carries no `heads/` or `tags/` prefix.
    async fn contents(
        &self,
        ctx: &RequestContext,
        owner: &str,
        repo: &str,
        path: &str,
        git_ref: &str,
    ) -> Result<Contents>;

    /// Raw bytes behind a download URL from a contents listing.
    async fn download(&self, ctx: &RequestContext, url: &str) -> Result<Bytes>;
}
