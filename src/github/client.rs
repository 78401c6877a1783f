use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::{Client, IntoUrl, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;

use super::error::{GithubError, Result};
use super::host::GitHost;
use super::types::{Blob, Contents, Repository, TreeListing};
use crate::tree::RequestContext;

/// Base URL of the public GitHub REST API.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

const API_MEDIA_TYPE: &str = "application/vnd.github+json";

/// A `GitHost` over the GitHub REST API.
///
/// The client itself does not bound concurrency; callers that fan out hold a
/// `RequestLimiter` permit around each call.
#[derive(Debug, Clone)]
pub struct GithubClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl GithubClient {
    /// A client for the public API with a default HTTP client.
    pub fn new() -> Self {
        Self::with_client(Client::new(), DEFAULT_API_URL)
    }

    /// A client using `client` against the API at `base_url`.
    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
        }
    }

    /// Authenticate requests with a bearer token.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// An API URL under `/repos/{owner}/{repo}`. Every segment of `rest` is
    /// split on `/` and percent-encoded, so names containing `#`, `?` or `%`
    /// reach the host intact.
    fn repo_url(&self, op: &'static str, owner: &str, repo: &str, rest: &[&str]) -> Result<Url> {
        let bad_url = |message: String| GithubError::Request {
            op,
            path: format!("{}/{}", owner, repo),
            message,
        };
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| bad_url(format!("bad API URL {:?}: {}", self.base_url, e)))?;
        url.path_segments_mut()
            .map_err(|()| bad_url(format!("API URL {:?} cannot have a path", self.base_url)))?
            .pop_if_empty()
            .extend(["repos", owner, repo])
            .extend(
                rest.iter()
                    .flat_map(|part| part.split('/'))
                    .filter(|segment| !segment.is_empty()),
            );
        Ok(url)
    }

    fn get(&self, url: impl IntoUrl) -> RequestBuilder {
        let request = self
            .client
            .get(url)
            .header(USER_AGENT, concat!("gitfs/", env!("CARGO_PKG_VERSION")));
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(
        &self,
        ctx: &RequestContext,
        op: &'static str,
        path: &str,
        request: RequestBuilder,
    ) -> Result<Response> {
        let response = ctx
            .guard(request.send())
            .await?
            .map_err(|e| GithubError::Request {
                op,
                path: path.to_string(),
                message: e.to_string(),
            })?;

        match response.status() {
            StatusCode::OK => Ok(response),
            StatusCode::NOT_FOUND => Err(GithubError::NotFound(path.to_string())),
            status => Err(GithubError::Status {
                op,
                path: path.to_string(),
                status: status.as_u16(),
            }),
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        ctx: &RequestContext,
        op: &'static str,
        path: &str,
        request: RequestBuilder,
    ) -> Result<T> {
        let response = self
            .send(ctx, op, path, request.header(ACCEPT, API_MEDIA_TYPE))
            .await?;
        ctx.guard(response.json::<T>())
            .await?
            .map_err(|e| GithubError::Request {
                op,
                path: path.to_string(),
                message: format!("failed to parse response: {}", e),
            })
    }
}

impl Default for GithubClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GitHost for GithubClient {
    async fn default_branch(&self, ctx: &RequestContext, owner: &str, repo: &str) -> Result<String> {
        let url = self.repo_url("get repository", owner, repo, &[])?;
        let path = format!("{}/{}", owner, repo);
        let repository: Repository = self
            .get_json(ctx, "get repository", &path, self.get(url))
            .await?;
        Ok(repository.default_branch)
    }

    async fn recursive_tree(
        &self,
        ctx: &RequestContext,
        owner: &str,
        repo: &str,
        git_ref: &str,
    ) -> Result<TreeListing> {
        let url = self.repo_url("get git tree", owner, repo, &["git/trees", git_ref])?;
        let request = self.get(url).query(&[("recursive", "1")]);
        self.get_json(ctx, "get git tree", git_ref, request).await
    }

    async fn blob(&self, ctx: &RequestContext, owner: &str, repo: &str, sha: &str) -> Result<Blob> {
        let url = self.repo_url("get blob", owner, repo, &["git/blobs", sha])?;
        self.get_json(ctx, "get blob", sha, self.get(url)).await
    }

    async fn contents(
        &self,
        ctx: &RequestContext,
        owner: &str,
        repo: &str,
        path: &str,
        git_ref: &str,
    ) -> Result<Contents> {
        let url = self.repo_url("get contents", owner, repo, &["contents", path])?;
        let request = self.get(url).query(&[("ref", git_ref)]);
        self.get_json(ctx, "get contents", path, request).await
    }

    async fn download(&self, ctx: &RequestContext, url: &str) -> Result<Bytes> {
        let response = self.send(ctx, "download", url, self.get(url)).await?;
        ctx.guard(response.bytes())
            .await?
            .map_err(|e| GithubError::Request {
                op: "download",
                path: url.to_string(),
                message: e.to_string(),
            })
    }
}
