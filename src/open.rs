//! Opening a project by name.

use std::path::PathBuf;
use std::sync::Arc;

use reqwest::Client;
use tracing::debug;

use crate::binfs::Registry;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::github::{self, GitHost, GithubClient, Project, DEFAULT_API_URL};
use crate::glob_filter::Patterns;
use crate::localfs;
use crate::tree::{PathTree, RequestContext};
use crate::util::RequestLimiter;

const DEFAULT_MAX_CONCURRENT_REQUESTS: usize = 16;

/// How [`open`] finds and builds a project's tree.
#[derive(Debug, Clone)]
pub struct Options {
    client: Option<Client>,
    api_url: String,
    token: Option<String>,
    local: Option<PathBuf>,
    prefetch: bool,
    glob: Vec<String>,
    registry: Option<Arc<Registry>>,
    max_concurrent_requests: Option<usize>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            client: None,
            api_url: DEFAULT_API_URL.to_string(),
            token: None,
            local: None,
            prefetch: false,
            glob: Vec::new(),
            registry: None,
            max_concurrent_requests: Some(DEFAULT_MAX_CONCURRENT_REQUESTS),
        }
    }
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    /// Options taken from a configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            api_url: config.github.api_url.clone(),
            token: config.github.token.clone(),
            prefetch: config.tree.prefetch,
            glob: config.tree.glob.clone(),
            max_concurrent_requests: config
                .network
                .max_concurrent_requests
                .value()
                .map(|v| v as usize),
            ..Self::default()
        }
    }

    /// HTTP client for remote requests, e.g. one carrying credentials.
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Serve the project from the local checkout containing `path` instead
    /// of its remote.
    pub fn with_local(mut self, path: impl Into<PathBuf>) -> Self {
        self.local = Some(path.into());
        self
    }

    pub fn with_prefetch(mut self, prefetch: bool) -> Self {
        self.prefetch = prefetch;
        self
    }

    /// Only include paths matching one of `patterns`.
    pub fn with_glob<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.glob = patterns.into_iter().map(Into::into).collect();
        self
    }

    /// Serve registered projects from `registry` without remote access.
    pub fn with_registry(mut self, registry: Arc<Registry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Bound on concurrent remote calls while prefetching; `None` removes it.
    pub fn with_max_concurrent_requests(mut self, limit: Option<usize>) -> Self {
        self.max_concurrent_requests = limit;
        self
    }

    pub fn prefetch(&self) -> bool {
        self.prefetch
    }

    pub fn glob(&self) -> &[String] {
        &self.glob
    }

    fn limiter(&self) -> RequestLimiter {
        match self.max_concurrent_requests {
            Some(limit) => RequestLimiter::new(limit),
            None => RequestLimiter::unbounded(),
        }
    }

    fn github_client(&self) -> GithubClient {
        let client = GithubClient::with_client(self.client.clone().unwrap_or_default(), &self.api_url);
        match &self.token {
            Some(token) => client.with_token(token.clone()),
            None => client,
        }
    }
}

/// Open the tree of `project`.
///
/// A local checkout configured with [`Options::with_local`] wins, then a
/// packed tree registered under the exact project name, then the remote
/// host.
pub async fn open(ctx: &RequestContext, project: &str, options: &Options) -> Result<PathTree> {
    if let Some(local) = &options.local {
        let glob = Patterns::new(&options.glob)?;
        debug!(project, local = %local.display(), "opening from local checkout");
        return Ok(localfs::load_tree(project, local, &glob).await?);
    }
    open_with_host(ctx, project, Arc::new(options.github_client()), options).await
}

/// Like [`open`] without the local checkout, with remote calls going to
/// `host`.
pub async fn open_with_host(
    ctx: &RequestContext,
    project: &str,
    host: Arc<dyn GitHost>,
    options: &Options,
) -> Result<PathTree> {
    if let Some(tree) = options.registry.as_ref().and_then(|r| r.lookup(project)) {
        debug!(project, "opening from registry");
        return Ok(tree);
    }
    if !Project::matches(project) {
        return Err(Error::UnsupportedProject(project.to_string()));
    }
    let glob = Patterns::new(&options.glob)?;
    let tree = github::load_tree(ctx, host, project, options.prefetch, glob, options.limiter()).await?;
    Ok(tree)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binfs::{encode, ENCODE_VERSION};
    use crate::config::{GithubConfig, Limit, NetworkConfig, TreeConfig};
    use crate::github::memory_host::fixture;
    use crate::tree::content_loader;
    use tempfile::TempDir;

    #[tokio::test]
    async fn opens_remote_project() {
        let host = fixture().build();
        let ctx = RequestContext::background();
        for prefetch in [false, true] {
            let options = Options::new().with_prefetch(prefetch).with_glob(["*/*1"]);
            let tree = open_with_host(
                &ctx,
                "github.com/owner/repo/internal/testdata",
                Arc::new(host.clone()),
                &options,
            )
            .await
            .unwrap();
            assert_eq!(tree.file_count(), 1);
            assert_eq!(
                tree.open("d2/f21").unwrap().read_to_end().await.unwrap(),
                b"f21 content"
            );
        }
    }

    #[tokio::test]
    async fn registry_wins_over_remote() {
        let ctx = RequestContext::background();
        let mut packed = PathTree::new();
        packed.add_file("packed", 6, content_loader("packed")).unwrap();
        let registry = Arc::new(Registry::new());
        registry
            .register(
                "github.com/owner/repo",
                ENCODE_VERSION,
                &encode(&ctx, &packed).await.unwrap(),
            )
            .unwrap();

        let host = fixture().build();
        let options = Options::new().with_registry(registry);
        let tree = open_with_host(&ctx, "github.com/owner/repo", Arc::new(host.clone()), &options)
            .await
            .unwrap();
        assert!(tree.contains("packed"));
        assert_eq!(host.calls(), Default::default());

        // Another ref of the same repository is not registered.
        let tree = open_with_host(
            &ctx,
            "github.com/owner/repo@heads/main",
            Arc::new(host.clone()),
            &options,
        )
        .await
        .unwrap();
        assert!(tree.contains("README.md"));
    }

    #[tokio::test]
    async fn unsupported_project() {
        let host = fixture().build();
        let result = open_with_host(
            &RequestContext::background(),
            "gitlab.com/owner/repo",
            Arc::new(host),
            &Options::new(),
        )
        .await;
        assert!(matches!(result, Err(Error::UnsupportedProject(_))));
    }

    #[tokio::test]
    async fn bad_glob() {
        let host = fixture().build();
        let result = open_with_host(
            &RequestContext::background(),
            "github.com/owner/repo",
            Arc::new(host),
            &Options::new().with_glob(["["]),
        )
        .await;
        assert!(matches!(result, Err(Error::Pattern(_))));
    }

    #[tokio::test]
    async fn local_checkout_wins() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join(".git")).unwrap();
        std::fs::write(
            tmp.path().join(".git/config"),
            "[remote \"origin\"]\n\turl = git@github.com:owner/repo.git\n",
        )
        .unwrap();
        std::fs::write(tmp.path().join("local.txt"), "local").unwrap();

        let options = Options::new().with_local(tmp.path());
        let tree = open(&RequestContext::background(), "github.com/owner/repo", &options)
            .await
            .unwrap();
        assert_eq!(tree.open("local.txt").unwrap().read_to_end().await.unwrap(), b"local");

        assert!(matches!(
            open(&RequestContext::background(), "github.com/owner/other", &options).await,
            Err(Error::Local(_))
        ));
    }

    #[test]
    fn from_config() {
        let config = Config {
            github: GithubConfig {
                api_url: "http://localhost:1234".to_string(),
                token: Some("t".to_string()),
            },
            network: NetworkConfig {
                max_concurrent_requests: Limit::Disabled,
            },
            tree: TreeConfig {
                prefetch: true,
                glob: vec!["*.md".to_string()],
            },
        };
        let options = Options::from_config(&config);
        assert!(options.prefetch());
        assert_eq!(options.glob(), ["*.md".to_string()]);
        assert_eq!(options.limiter().limit(), None);
        assert_eq!(options.github_client().base_url(), "http://localhost:1234");

        let defaults = Options::from_config(&Config::default());
        assert_eq!(defaults.limiter().limit(), Some(16));
    }
}
