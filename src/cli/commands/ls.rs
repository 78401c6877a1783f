use clap::Args;

use super::open_project;
use crate::cli::{GlobalArgs, OutputSink, Result};
use crate::fsutil;
use crate::tree::normalize_path;
use crate::{PathTree, RequestContext};

/// Arguments for the ls command.
#[derive(Args, Debug)]
pub struct LsArgs {
    /// Project identifier, e.g. github.com/owner/repo/dir@v1.0.0.
    pub project: String,

    /// Only list this path and what is under it.
    pub path: Option<String>,

    /// Show sizes.
    #[arg(short, long)]
    pub long: bool,

    #[command(flatten)]
    pub output: OutputSink,
}

impl LsArgs {
    pub async fn run(self, global: &GlobalArgs) -> Result<()> {
        let ctx = RequestContext::background();
        let tree = open_project(&ctx, global, &self.project).await?;
        let lines = list(&tree, self.path.as_deref().unwrap_or(""), self.long)?;
        if !lines.is_empty() {
            self.output.write_str(&lines.join("\n")).await?;
        }
        Ok(())
    }
}

/// One line per path under `path`. Directories end with `/`.
fn list(tree: &PathTree, path: &str, long: bool) -> Result<Vec<String>> {
    let path = normalize_path(path);
    let format = |path: &str, is_dir: bool, size: u64| {
        let name = if is_dir {
            format!("{}/", path)
        } else {
            path.to_string()
        };
        if long {
            format!("{:>10} {}", size, name)
        } else {
            name
        }
    };

    let handle = tree.open(path)?;
    if !handle.is_dir() {
        return Ok(vec![format(path, false, handle.stat().size)]);
    }

    let prefix = format!("{}/", path);
    Ok(fsutil::walk(tree)?
        .into_iter()
        .filter(|entry| path.is_empty() || entry.path.starts_with(&prefix))
        .map(|entry| format(&entry.path, entry.is_dir(), entry.info.size))
        .collect())
}
