//! In-memory `GitHost` for tests and fixtures.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use sha2::{Digest, Sha256};

use super::error::{GithubError, Result};
use super::host::GitHost;
use super::types::{
    encode_base64, Blob, ContentEntry, ContentKind, Contents, TreeEntry, TreeEntryKind,
    TreeListing,
};
use crate::tree::RequestContext;

const DOWNLOAD_SCHEME: &str = "memory://";

/// Number of calls made per operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub default_branch: usize,
    pub recursive_tree: usize,
    pub blob: usize,
    pub contents: usize,
    pub download: usize,
}

#[derive(Default)]
struct Counters {
    default_branch: AtomicUsize,
    recursive_tree: AtomicUsize,
    blob: AtomicUsize,
    contents: AtomicUsize,
    download: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

/// Decrements the in-flight count when a call ends.
struct InFlight<'a>(&'a Counters);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Builder for constructing a [`MemoryHost`].
pub struct MemoryHostBuilder {
    owner: String,
    repo: String,
    default_branch: String,
    refs: BTreeSet<String>,
    files: BTreeMap<String, Bytes>,
    dirs: BTreeSet<String>,
    failing: HashSet<String>,
    latency: Option<Duration>,
}

impl Default for MemoryHostBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryHostBuilder {
    pub fn new() -> Self {
        Self {
            owner: "owner".to_string(),
            repo: "repo".to_string(),
            default_branch: "main".to_string(),
            refs: BTreeSet::new(),
            files: BTreeMap::new(),
            dirs: BTreeSet::new(),
            failing: HashSet::new(),
            latency: None,
        }
    }

    /// The only repository served. Defaults to `owner/repo`.
    pub fn repository(mut self, owner: &str, repo: &str) -> Self {
        self.owner = owner.to_string();
        self.repo = repo.to_string();
        self
    }

    pub fn default_branch(mut self, branch: &str) -> Self {
        self.default_branch = branch.to_string();
        self
    }

    /// Serve the same content under an extra ref, e.g. `tags/v1.0`.
    pub fn git_ref(mut self, git_ref: &str) -> Self {
        self.refs.insert(git_ref.to_string());
        self
    }

    /// Add a file; its parent directories are implied.
    pub fn file(mut self, path: &str, content: impl Into<Bytes>) -> Self {
        self.files
            .insert(path.trim_matches('/').to_string(), content.into());
        self
    }

    /// Add a directory, possibly empty.
    pub fn dir(mut self, path: &str) -> Self {
        self.dirs.insert(path.trim_matches('/').to_string());
        self
    }

    /// Make every call touching `path` fail with a server error.
    pub fn fail(mut self, path: &str) -> Self {
        self.failing.insert(path.trim_matches('/').to_string());
        self
    }

    /// Delay every call by `latency`.
    pub fn latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn build(mut self) -> MemoryHost {
        self.refs.insert(format!("heads/{}", self.default_branch));

        let explicit: Vec<String> = self.dirs.iter().cloned().collect();
        let mut dirs = self.dirs;
        for path in self.files.keys().chain(explicit.iter()) {
            let mut current = path.as_str();
            while let Some((parent, _)) = current.rsplit_once('/') {
                dirs.insert(parent.to_string());
                current = parent;
            }
        }

        let blobs = self
            .files
            .iter()
            .map(|(path, content)| (blob_id(content), path.clone()))
            .collect();

        MemoryHost {
            inner: Arc::new(HostData {
                owner: self.owner,
                repo: self.repo,
                default_branch: self.default_branch,
                refs: self.refs,
                files: self.files,
                dirs,
                blobs,
                failing: self.failing,
                latency: self.latency,
                counters: Counters::default(),
            }),
        }
    }
}

fn blob_id(content: &[u8]) -> String {
    format!("{:x}", Sha256::digest(content))
}

// =============================================================================
// MemoryHost
// =============================================================================

struct HostData {
    owner: String,
    repo: String,
    default_branch: String,
    refs: BTreeSet<String>,
    files: BTreeMap<String, Bytes>,
    dirs: BTreeSet<String>,
    blobs: HashMap<String, String>,
    failing: HashSet<String>,
    latency: Option<Duration>,
    counters: Counters,
}

/// A single in-memory repository served through the `GitHost` operations.
///
/// Cloning shares the repository and the call counters.
#[derive(Clone)]
pub struct MemoryHost {
    inner: Arc<HostData>,
}

impl MemoryHost {
    pub fn builder() -> MemoryHostBuilder {
        MemoryHostBuilder::new()
    }

    pub fn calls(&self) -> CallCounts {
        let c = &self.inner.counters;
        CallCounts {
            default_branch: c.default_branch.load(Ordering::SeqCst),
            recursive_tree: c.recursive_tree.load(Ordering::SeqCst),
            blob: c.blob.load(Ordering::SeqCst),
            contents: c.contents.load(Ordering::SeqCst),
            download: c.download.load(Ordering::SeqCst),
        }
    }

    /// Highest number of calls that were running at the same time.
    pub fn peak_in_flight(&self) -> usize {
        self.inner.counters.peak_in_flight.load(Ordering::SeqCst)
    }

    /// Count the call, track concurrency, and apply the configured latency.
    async fn enter<'a>(
        &'a self,
        ctx: &RequestContext,
        counter: &AtomicUsize,
    ) -> Result<InFlight<'a>> {
        ctx.check()?;
        counter.fetch_add(1, Ordering::SeqCst);
        let counters = &self.inner.counters;
        let now = counters.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        counters.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        let guard = InFlight(counters);
        if let Some(latency) = self.inner.latency {
            ctx.guard(tokio::time::sleep(latency)).await?;
        }
        Ok(guard)
    }

    fn check_repo(&self, owner: &str, repo: &str) -> Result<()> {
        if owner == self.inner.owner && repo == self.inner.repo {
            Ok(())
        } else {
            Err(GithubError::NotFound(format!("{}/{}", owner, repo)))
        }
    }

    fn check_failing(&self, op: &'static str, path: &str) -> Result<()> {
        if self.inner.failing.contains(path) {
            Err(GithubError::Status {
                op,
                path: path.to_string(),
                status: 500,
            })
        } else {
            Ok(())
        }
    }

    fn content_entry(&self, path: &str) -> ContentEntry {
        match self.inner.files.get(path) {
            Some(content) => ContentEntry {
                path: path.to_string(),
                kind: ContentKind::File,
                size: content.len() as u64,
                download_url: Some(format!("{}{}", DOWNLOAD_SCHEME, path)),
                content: None,
                encoding: None,
            },
            None => ContentEntry {
                path: path.to_string(),
                kind: ContentKind::Dir,
                size: 0,
                download_url: None,
                content: None,
                encoding: None,
            },
        }
    }
}

fn parent_of(path: &str) -> &str {
    path.rsplit_once('/').map(|(parent, _)| parent).unwrap_or("")
}

#[async_trait]
impl GitHost for MemoryHost {
    async fn default_branch(&self, ctx: &RequestContext, owner: &str, repo: &str) -> Result<String> {
        let _flight = self.enter(ctx, &self.inner.counters.default_branch).await?;
        self.check_repo(owner, repo)?;
        Ok(self.inner.default_branch.clone())
    }

    async fn recursive_tree(
        &self,
        ctx: &RequestContext,
        owner: &str,
        repo: &str,
        git_ref: &str,
    ) -> Result<TreeListing> {
        let _flight = self.enter(ctx, &self.inner.counters.recursive_tree).await?;
        self.check_repo(owner, repo)?;
        if !self.inner.refs.contains(git_ref) {
            return Err(GithubError::NotFound(git_ref.to_string()));
        }

        let mut entries: Vec<TreeEntry> = self
            .inner
            .dirs
            .iter()
            .map(|path| TreeEntry {
                path: path.clone(),
                kind: TreeEntryKind::Tree,
                size: None,
                sha: blob_id(path.as_bytes()),
            })
            .chain(self.inner.files.iter().map(|(path, content)| TreeEntry {
                path: path.clone(),
                kind: TreeEntryKind::Blob,
                size: Some(content.len() as u64),
                sha: blob_id(content),
            }))
            .collect();
        entries.sort_by(|a, b| a.path.cmp(&b.path));

        Ok(TreeListing {
            sha: blob_id(git_ref.as_bytes()),
            tree: entries,
            truncated: false,
        })
    }

    async fn blob(&self, ctx: &RequestContext, owner: &str, repo: &str, sha: &str) -> Result<Blob> {
        let _flight = self.enter(ctx, &self.inner.counters.blob).await?;
        self.check_repo(owner, repo)?;
        let path = self
            .inner
            .blobs
            .get(sha)
            .ok_or_else(|| GithubError::NotFound(sha.to_string()))?;
        self.check_failing("get blob", path)?;
        let content = self
            .inner
            .files
            .get(path)
            .ok_or_else(|| GithubError::NotFound(sha.to_string()))?;
        Ok(Blob {
            encoding: "base64".to_string(),
            content: encode_base64(content),
        })
    }

    async fn contents(
        &self,
        ctx: &RequestContext,
        owner: &str,
        repo: &str,
        path: &str,
        git_ref: &str,
    ) -> Result<Contents> {
        let _flight = self.enter(ctx, &self.inner.counters.contents).await?;
        self.check_repo(owner, repo)?;
        let known_ref = self.inner.refs.contains(&format!("heads/{}", git_ref))
            || self.inner.refs.contains(&format!("tags/{}", git_ref));
        if !known_ref {
            return Err(GithubError::NotFound(git_ref.to_string()));
        }
        let path = path.trim_matches('/');
        self.check_failing("get contents", path)?;

        if let Some(content) = self.inner.files.get(path) {
            return Ok(Contents::File(ContentEntry {
                content: Some(encode_base64(content)),
                encoding: Some("base64".to_string()),
                ..self.content_entry(path)
            }));
        }
        if !path.is_empty() && !self.inner.dirs.contains(path) {
            return Err(GithubError::NotFound(path.to_string()));
        }

        let children = self
            .inner
            .dirs
            .iter()
            .chain(self.inner.files.keys())
            .filter(|child| !child.is_empty() && parent_of(child) == path)
            .map(|child| self.content_entry(child))
            .collect();
        Ok(Contents::Directory(children))
    }

    async fn download(&self, ctx: &RequestContext, url: &str) -> Result<Bytes> {
        let _flight = self.enter(ctx, &self.inner.counters.download).await?;
        let path = url
            .strip_prefix(DOWNLOAD_SCHEME)
            .ok_or_else(|| GithubError::NotFound(url.to_string()))?;
        self.check_failing("download", path)?;
        self.inner
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| GithubError::NotFound(url.to_string()))
    }
}

/// A small repository used across the crate's tests.
#[cfg(test)]
pub(crate) fn fixture() -> MemoryHostBuilder {
    MemoryHost::builder()
        .file("README.md", "readme")
        .file("internal/other.txt", "other")
        .file("internal/testdata/f01", "")
        .file("internal/testdata/d1/d11/f111", "f111 content")
        .file("internal/testdata/d2/f21", "f21 content")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lists_directories_and_files() {
        let host = fixture().build();
        let ctx = RequestContext::background();

        let root = host.contents(&ctx, "owner", "repo", "", "main").await.unwrap();
        let Contents::Directory(entries) = root else {
            panic!("expected a directory");
        };
        let paths: Vec<_> = entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["internal", "README.md"]);

        let file = host
            .contents(&ctx, "owner", "repo", "internal/testdata/d2/f21", "main")
            .await
            .unwrap();
        let Contents::File(entry) = file else {
            panic!("expected a file");
        };
        assert_eq!(entry.decode_content().unwrap(), "f21 content");
        assert_eq!(host.calls().contents, 2);
    }

    #[tokio::test]
    async fn tree_and_blobs() {
        let host = fixture().build();
        let ctx = RequestContext::background();
        let listing = host
            .recursive_tree(&ctx, "owner", "repo", "heads/main")
            .await
            .unwrap();
        let f111 = listing
            .tree
            .iter()
            .find(|e| e.path == "internal/testdata/d1/d11/f111")
            .unwrap();
        assert_eq!(f111.size, Some(12));
        let blob = host.blob(&ctx, "owner", "repo", &f111.sha).await.unwrap();
        assert_eq!(blob.decode().unwrap(), "f111 content");
        assert!(listing
            .tree
            .iter()
            .any(|e| e.path == "internal/testdata/d1" && e.kind == TreeEntryKind::Tree));
    }

    #[tokio::test]
    async fn unknown_repository_and_ref() {
        let host = fixture().build();
        let ctx = RequestContext::background();
        assert!(matches!(
            host.default_branch(&ctx, "other", "repo").await,
            Err(GithubError::NotFound(_))
        ));
        assert!(matches!(
            host.recursive_tree(&ctx, "owner", "repo", "heads/nope").await,
            Err(GithubError::NotFound(_))
        ));
    }
}
