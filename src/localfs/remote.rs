use std::path::{Path, PathBuf};

use configparser::ini::Ini;
use reqwest::Url;
use tokio::fs;

use super::error::{LocalError, Result};

const GIT_DIR: &str = ".git";

/// The closest directory at or above `path` that contains a `.git` entry.
pub async fn git_root(path: &Path) -> Result<PathBuf> {
    let start = fs::canonicalize(path).await.map_err(|source| LocalError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut current = Some(start.as_path());
    while let Some(dir) = current {
        if fs::metadata(dir.join(GIT_DIR)).await.is_ok() {
            return Ok(dir.to_path_buf());
        }
        current = dir.parent();
    }
    Err(LocalError::NotGitRepository(start))
}

/// Remote URLs configured for the checkout at `root`.
pub async fn remote_urls(root: &Path) -> Result<Vec<String>> {
    let config_path = git_dir(root).await?.join("config");
    let text = read_to_string(&config_path).await?;

    let mut ini = Ini::new_cs();
    ini.read(text).map_err(|message| LocalError::GitConfig {
        path: config_path.clone(),
        message,
    })?;

    let mut sections = ini.sections();
    sections.sort();
    Ok(sections
        .iter()
        .filter(|section| section.starts_with("remote "))
        .filter_map(|section| ini.get(section, "url"))
        .collect())
}

/// The git directory of a checkout. A `.git` file (worktrees and
/// submodules) points at the real one with a `gitdir:` line; for worktrees
/// the shared config lives in the directory named by `commondir`.
async fn git_dir(root: &Path) -> Result<PathBuf> {
    let dot_git = root.join(GIT_DIR);
    let metadata = fs::metadata(&dot_git).await.map_err(|source| LocalError::Io {
        path: dot_git.clone(),
        source,
    })?;
    if metadata.is_dir() {
        return Ok(dot_git);
    }

    let text = read_to_string(&dot_git).await?;
    let target = text
        .lines()
        .find_map(|line| line.strip_prefix("gitdir:"))
        .map(str::trim)
        .ok_or_else(|| LocalError::GitConfig {
            path: dot_git.clone(),
            message: "missing gitdir line".to_string(),
        })?;
    let dir = root.join(target);

    match fs::read_to_string(dir.join("commondir")).await {
        Ok(common) => Ok(dir.join(common.trim())),
        Err(_) => Ok(dir),
    }
}

async fn read_to_string(path: &Path) -> Result<String> {
    fs::read_to_string(path).await.map_err(|source| LocalError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Normalize a remote URL to `host/owner/repo`.
///
/// Accepts URLs with a scheme (`https://`, `ssh://`, `git://`) and the scp
/// form `user@host:owner/repo`. A trailing `.git` and any user or port are
/// dropped. Returns `None` for anything else.
pub fn project_name(url: &str) -> Option<String> {
    let (host, path) = if url.contains("://") {
        let parsed = Url::parse(url).ok()?;
        let host = parsed.host_str()?.to_string();
        (host, parsed.path().to_string())
    } else {
        let (user_host, path) = url.split_once(':')?;
        let host = user_host.rsplit('@').next().unwrap_or(user_host);
        (host.to_string(), path.to_string())
    };

    let path = path.trim_matches('/');
    let path = path.strip_suffix(".git").unwrap_or(path);
    if host.is_empty() || path.is_empty() {
        return None;
    }
    Some(format!("{}/{}", host, path))
}

/// Drop an `@ref` suffix from a project identifier.
pub fn strip_ref(project: &str) -> &str {
    project.split_once('@').map_or(project, |(name, _)| name)
}

/// The subdirectory of the checkout that `project` names, if one of
/// `remotes` is the project's repository.
pub fn subdir(project: &str, remotes: &[String]) -> Option<String> {
    let project = strip_ref(project).trim_end_matches('/');
    remotes.iter().filter_map(|url| project_name(url)).find_map(|remote| {
        if project == remote {
            Some(String::new())
        } else {
            project
                .strip_prefix(&format!("{}/", remote))
                .map(str::to_string)
        }
    })
}
