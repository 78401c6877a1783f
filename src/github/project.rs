//! Project identifiers of the form `github.com/owner/repo(/subpath)?(@ref)?`.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use super::error::{ProjectError, Result};
use super::host::GitHost;
use crate::tree::RequestContext;

static PROJECT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^github\.com/([^@/]+)/([^@/]+)(/([^@]*))?(@([^#]+))?$")
        .expect("project pattern is valid")
});

static SEMVER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^v?[0-9]+(\.[0-9]+){0,2}$").expect("semver pattern is valid"));

const HEADS_PREFIX: &str = "heads/";
const TAGS_PREFIX: &str = "tags/";

/// A parsed project identifier whose ref may still be unresolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    pub owner: String,
    pub repo: String,
    /// Subpath inside the repository, with a trailing `/`, or empty.
    pub path: String,
    /// Normalized ref (`heads/...` or `tags/...`), or `None` for the default branch.
    pub git_ref: Option<String>,
}

impl Project {
    /// True if `name` looks like a project identifier this module serves.
    pub fn matches(name: &str) -> bool {
        PROJECT_RE.is_match(name)
    }

    pub fn parse(name: &str) -> std::result::Result<Self, ProjectError> {
        let captures = PROJECT_RE
            .captures(name)
            .ok_or_else(|| ProjectError::BadProjectName(name.to_string()))?;
        let group = |i: usize| captures.get(i).map_or("", |m| m.as_str());

        let mut path = group(4).to_string();
        if !path.is_empty() && !path.ends_with('/') {
            path.push('/');
        }

        let git_ref = match group(6) {
            "" => None,
            r if SEMVER_RE.is_match(r) => Some(format!("{}{}", TAGS_PREFIX, r)),
            r if r.starts_with(HEADS_PREFIX) || r.starts_with(TAGS_PREFIX) => Some(r.to_string()),
            r => return Err(ProjectError::BadRef(r.to_string())),
        };

        Ok(Self {
            owner: group(1).to_string(),
            repo: group(2).to_string(),
            path,
            git_ref,
        })
    }

    /// Fill in the default branch when no ref was given. Costs one remote
    /// call in that case and none otherwise.
    pub async fn resolve(self, ctx: &RequestContext, host: &dyn GitHost) -> Result<ResolvedProject> {
        let git_ref = match self.git_ref {
            Some(git_ref) => git_ref,
            None => {
                let branch = host.default_branch(ctx, &self.owner, &self.repo).await?;
                debug!(owner = %self.owner, repo = %self.repo, %branch, "resolved default branch");
                format!("{}{}", HEADS_PREFIX, branch)
            }
        };
        Ok(ResolvedProject {
            owner: self.owner,
            repo: self.repo,
            path: self.path,
            git_ref,
        })
    }
}

/// A project with a concrete ref.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedProject {
    pub owner: String,
    pub repo: String,
    pub path: String,
    pub git_ref: String,
}

impl ResolvedProject {
    /// The ref without its `heads/` or `tags/` prefix, as the contents API expects it.
    pub fn contents_ref(&self) -> &str {
        self.git_ref
            .strip_prefix(HEADS_PREFIX)
            .or_else(|| self.git_ref.strip_prefix(TAGS_PREFIX))
            .unwrap_or(&self.git_ref)
    }

    /// The subpath as a repository path (no trailing `/`).
    pub fn root(&self) -> &str {
        self.path.trim_end_matches('/')
    }

    /// Map a repository path to a path in the served tree, or `None` when it
    /// lies outside the subpath. When the subpath names a single file, that
    /// file is served under its own name.
    pub fn relative_path<'a>(&self, repo_path: &'a str, is_dir: bool) -> Option<&'a str> {
        if self.path.is_empty() {
            return Some(repo_path);
        }
        if let Some(rest) = repo_path.strip_prefix(self.path.as_str()) {
            return Some(rest);
        }
        if !is_dir && repo_path == self.root() {
            return Some(repo_path.rsplit('/').next().unwrap_or(repo_path));
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_valid_projects() {
        let cases = [
            ("github.com/x/y", "x", "y", "", None),
            ("github.com/x/y/", "x", "y", "", None),
            ("github.com/x/y/static", "x", "y", "static/", None),
            ("github.com/x/y/a/b/", "x", "y", "a/b/", None),
            ("github.com/x/y@heads/main", "x", "y", "", Some("heads/main")),
            ("github.com/x/y/p@tags/v1.2", "x", "y", "p/", Some("tags/v1.2")),
            ("github.com/x/y@v1.2.3", "x", "y", "", Some("tags/v1.2.3")),
            ("github.com/x/y@1", "x", "y", "", Some("tags/1")),
            ("github.com/x/y@v0.1", "x", "y", "", Some("tags/v0.1")),
        ];
        for (name, owner, repo, path, git_ref) in cases {
            let p = Project::parse(name).unwrap();
            assert_eq!(p.owner, owner, "{}", name);
            assert_eq!(p.repo, repo, "{}", name);
            assert_eq!(p.path, path, "{}", name);
            assert_eq!(p.git_ref.as_deref(), git_ref, "{}", name);
        }
    }

    #[test]
    fn parse_invalid_projects() {
        for name in ["git.com/x/y", "github.com/x", "github.com/x@y/z", "github.com//y"] {
            assert!(
                matches!(Project::parse(name), Err(ProjectError::BadProjectName(_))),
                "{}",
                name
            );
            assert!(!Project::matches(name));
        }
        for name in ["github.com/x/y@main", "github.com/x/y@v1.2.3.4", "github.com/x/y@refs/heads/x"] {
            assert!(
                matches!(Project::parse(name), Err(ProjectError::BadRef(_))),
                "{}",
                name
            );
        }
    }

    #[test]
    fn contents_ref_strips_prefix() {
        let mut p = ResolvedProject {
            owner: "x".into(),
            repo: "y".into(),
            path: String::new(),
            git_ref: "heads/main".into(),
        };
        assert_eq!(p.contents_ref(), "main");
        p.git_ref = "tags/v1".into();
        assert_eq!(p.contents_ref(), "v1");
    }

    #[test]
    fn relative_paths() {
        let p = ResolvedProject {
            owner: "x".into(),
            repo: "y".into(),
            path: "static/".into(),
            git_ref: "heads/main".into(),
        };
        assert_eq!(p.relative_path("static/a/b", false), Some("a/b"));
        assert_eq!(p.relative_path("static", true), None);
        assert_eq!(p.relative_path("staticx/a", false), None);
        assert_eq!(p.relative_path("other/a", true), None);

        let single = ResolvedProject {
            path: "dir/file.txt/".into(),
            ..p
        };
        assert_eq!(single.relative_path("dir/file.txt", false), Some("file.txt"));
    }
}
