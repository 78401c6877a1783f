//! Tree construction by recursive directory listing with eager downloads.
//!
//! Each directory is listed with one contents call. Subdirectories are walked
//! by their own tasks and files are downloaded by their own tasks, so the
//! listing fans out across the whole subtree. Remote calls go through a
//! shared [`RequestLimiter`], which bounds how many run at once. A directory
//! task only finishes after all of its child tasks finished.
//!
//! Any failure fails the whole construction. The first error reported is
//! returned; later ones are logged and dropped.

use std::sync::{Arc, Mutex, PoisonError};

use futures::future::BoxFuture;
use futures::FutureExt;
use tracing::debug;

use super::error::{GithubError, Result};
use super::host::GitHost;
use super::project::ResolvedProject;
use super::types::{ContentEntry, ContentKind, Contents};
use crate::glob_filter::Patterns;
use crate::tree::{content_loader, PathTree, RequestContext, TreeError};
use crate::util::{ErrorSlot, JoinBarrier, RequestLimiter};

pub struct EagerTreeBuilder {
    inner: Arc<Inner>,
}

struct Inner {
    host: Arc<dyn GitHost>,
    project: ResolvedProject,
    glob: Patterns,
    limiter: RequestLimiter,
    tree: Mutex<PathTree>,
    errors: ErrorSlot<GithubError>,
}

impl EagerTreeBuilder {
    pub fn new(
        host: Arc<dyn GitHost>,
        project: ResolvedProject,
        glob: Patterns,
        limiter: RequestLimiter,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                host,
                project,
                glob,
                limiter,
                tree: Mutex::new(PathTree::new()),
                errors: ErrorSlot::new(),
            }),
        }
    }

    /// Walk and download the whole subtree. Returns only after every spawned
    /// task finished; on failure no tree is returned.
    pub async fn build(self, ctx: &RequestContext) -> Result<PathTree> {
        let root = self.inner.project.root().to_string();
        Arc::clone(&self.inner).walk(ctx.clone(), root).await;

        if let Some(err) = self.inner.errors.take() {
            return Err(err);
        }
        let mut tree = self.inner.tree.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(std::mem::take(&mut *tree))
    }
}

impl Inner {
    /// List `dir` and wait for every task it spawned.
    fn walk(self: Arc<Self>, ctx: RequestContext, dir: String) -> BoxFuture<'static, ()> {
        async move {
            let children = JoinBarrier::new();
            if let Err(err) = self.list(&ctx, &dir, &children).await {
                self.errors.report(err);
            }
            children.done();
            children.wait().await;
        }
        .boxed()
    }

    async fn list(self: &Arc<Self>, ctx: &RequestContext, dir: &str, children: &JoinBarrier) -> Result<()> {
        debug!(path = %dir, "listing directory contents");
        let project = &self.project;
        let contents = {
            let _permit = ctx.guard(self.limiter.acquire()).await?;
            self.host
                .contents(ctx, &project.owner, &project.repo, dir, project.contents_ref())
                .await?
        };

        match contents {
            Contents::Directory(entries) => {
                for entry in entries {
                    self.spawn_child(ctx, entry, children)?;
                }
            }
            Contents::File(entry) => {
                let Some(path) = project.relative_path(&entry.path, false) else {
                    return Ok(());
                };
                if !self.glob.matches(path, false) {
                    return Ok(());
                }
                let content = entry.decode_content()?;
                self.insert(path, |tree| {
                    tree.add_file(path, entry.size, content_loader(content))
                })?;
            }
        }
        Ok(())
    }

    fn spawn_child(
        self: &Arc<Self>,
        ctx: &RequestContext,
        entry: ContentEntry,
        children: &JoinBarrier,
    ) -> Result<()> {
        let is_dir = match entry.kind {
            ContentKind::Dir => true,
            ContentKind::File => false,
            _ => return Ok(()),
        };
        let Some(path) = self.project.relative_path(&entry.path, is_dir) else {
            return Ok(());
        };
        if !self.glob.matches(path, is_dir) {
            return Ok(());
        }
        let path = path.to_string();

        if is_dir {
            self.insert(&path, |tree| tree.add_directory(&path))?;
            children.spawn(Arc::clone(self).walk(ctx.clone(), entry.path))?;
        } else {
            let this = Arc::clone(self);
            let ctx = ctx.clone();
            children.spawn(async move {
                if let Err(err) = this.download(&ctx, &path, entry).await {
                    this.errors.report(err);
                }
            })?;
        }
        Ok(())
    }

    async fn download(&self, ctx: &RequestContext, path: &str, entry: ContentEntry) -> Result<()> {
        let url = entry
            .download_url
            .as_deref()
            .ok_or_else(|| GithubError::MissingDownloadUrl(entry.path.clone()))?;
        let content = {
            let _permit = ctx.guard(self.limiter.acquire()).await?;
            self.host.download(ctx, url).await?
        };
        self.insert(path, |tree| {
            tree.add_file(path, entry.size, content_loader(content))
        })
    }

    fn insert<F>(&self, path: &str, add: F) -> Result<()>
    where
        F: FnOnce(&mut PathTree) -> std::result::Result<(), TreeError>,
    {
        let mut tree = self.tree.lock().unwrap_or_else(PoisonError::into_inner);
        add(&mut tree).map_err(|source| GithubError::Tree {
            path: path.to_string(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fsutil;
    use crate::github::memory_host::fixture;
    use crate::github::{MemoryHost, MetadataTreeBuilder, Project};
    use std::time::Duration;

    async fn build(
        host: &MemoryHost,
        name: &str,
        glob: &[&str],
        limiter: RequestLimiter,
    ) -> Result<PathTree> {
        let ctx = RequestContext::background();
        let project = Project::parse(name)?.resolve(&ctx, host).await?;
        let glob = Patterns::new(glob.iter().copied()).unwrap();
        EagerTreeBuilder::new(Arc::new(host.clone()), project, glob, limiter)
            .build(&ctx)
            .await
    }

    #[tokio::test]
    async fn downloads_everything_up_front() {
        let host = fixture().build();
        let tree = build(
            &host,
            "github.com/owner/repo/internal/testdata",
            &[],
            RequestLimiter::unbounded(),
        )
        .await
        .unwrap();

        assert_eq!(host.calls().download, 3);
        // Root, d1, d1/d11, d2.
        assert_eq!(host.calls().contents, 4);
        assert!(tree.open("d1").unwrap().is_dir());
        assert!(tree.open("d1/d11").unwrap().is_dir());
        assert!(!tree.contains("other.txt"));

        assert_eq!(tree.open("d2/f21").unwrap().read_to_end().await.unwrap(), b"f21 content");
        assert_eq!(tree.open("f01").unwrap().read_to_end().await.unwrap(), b"");
        assert_eq!(host.calls().download, 3);
        assert_eq!(host.calls().blob, 0);
    }

    #[tokio::test]
    async fn glob_filters_entries() {
        let host = fixture().build();
        let tree = build(
            &host,
            "github.com/owner/repo/internal/testdata",
            &["*/*1"],
            RequestLimiter::unbounded(),
        )
        .await
        .unwrap();
        assert!(tree.open("d1/d11").is_ok());
        assert!(tree.open("d2/f21").is_ok());
        assert!(tree.open("f01").is_err());
        // d1/d11/f111 is too deep for the pattern and is never downloaded.
        assert_eq!(host.calls().download, 1);
    }

    #[tokio::test]
    async fn bounded_concurrency() {
        let mut builder = MemoryHost::builder().latency(Duration::from_millis(5));
        for d in 0..4 {
            for f in 0..5 {
                builder = builder.file(&format!("d{}/f{}", d, f), format!("{}-{}", d, f));
            }
        }
        let host = builder.build();

        let tree = build(&host, "github.com/owner/repo", &[], RequestLimiter::new(3))
            .await
            .unwrap();
        assert_eq!(tree.file_count(), 20);
        assert!(host.peak_in_flight() <= 3);
        assert_eq!(
            tree.open("d3/f4").unwrap().read_to_end().await.unwrap(),
            b"3-4"
        );
    }

    #[tokio::test]
    async fn any_failure_fails_construction() {
        let host = fixture().fail("internal/testdata/d1/d11/f111").build();
        let result = build(
            &host,
            "github.com/owner/repo/internal/testdata",
            &[],
            RequestLimiter::unbounded(),
        )
        .await;
        assert!(matches!(result, Err(GithubError::Status { status: 500, .. })));
        // Sibling work still ran to completion.
        assert_eq!(host.calls().download, 3);
    }

    #[tokio::test]
    async fn failed_listing_reports_one_error() {
        let host = fixture()
            .fail("internal/testdata/d1")
            .fail("internal/testdata/d2")
            .build();
        let result = build(
            &host,
            "github.com/owner/repo/internal/testdata",
            &[],
            RequestLimiter::unbounded(),
        )
        .await;
        assert!(matches!(
            result,
            Err(GithubError::Status { op: "get contents", .. })
        ));
    }

    #[tokio::test]
    async fn single_file_subpath() {
        let host = fixture().build();
        let tree = build(
            &host,
            "github.com/owner/repo/internal/testdata/d2/f21",
            &[],
            RequestLimiter::unbounded(),
        )
        .await
        .unwrap();
        assert_eq!(tree.open("f21").unwrap().read_to_end().await.unwrap(), b"f21 content");
        assert_eq!(host.calls().download, 0);
    }

    #[tokio::test]
    async fn double_star_does_not_cross_directories() {
        let host = fixture().build();
        for pattern in ["**/f111", "d1/**"] {
            let tree = build(
                &host,
                "github.com/owner/repo/internal/testdata",
                &[pattern],
                RequestLimiter::unbounded(),
            )
            .await
            .unwrap();
            assert!(tree.contains("d1"), "{}", pattern);
            assert!(!tree.contains("d1/d11/f111"), "{}", pattern);
        }
        assert_eq!(host.calls().download, 0);
    }

    #[tokio::test]
    async fn matches_metadata_strategy() {
        let host = fixture().dir("internal/testdata/empty").build();
        let ctx = RequestContext::background();
        for glob in [
            vec![],
            vec!["*/*1"],
            vec!["d2/*", "f01"],
            vec!["**/f111"],
            vec!["**/**/**"],
        ] {
            for name in ["github.com/owner/repo", "github.com/owner/repo/internal/testdata"] {
                let project = Project::parse(name)
                    .unwrap()
                    .resolve(&ctx, &host)
                    .await
                    .unwrap();
                let patterns = Patterns::new(glob.iter().copied()).unwrap();
                let eager = EagerTreeBuilder::new(
                    Arc::new(host.clone()),
                    project.clone(),
                    patterns.clone(),
                    RequestLimiter::new(2),
                )
                .build(&ctx)
                .await
                .unwrap();
                let lazy = MetadataTreeBuilder::new(Arc::new(host.clone()), project, patterns)
                    .build(&ctx)
                    .await
                    .unwrap();

                let diff = fsutil::diff(&ctx, &eager, &lazy).await.unwrap();
                assert!(diff.is_empty(), "{} {:?}:\n{}", name, glob, diff);
            }
        }
    }
}
