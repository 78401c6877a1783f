use clap::Args;

use super::open_project;
use crate::cli::{GlobalArgs, OutputSink, Result};
use crate::tree::{normalize_path, TreeError};
use crate::{PathTree, RequestContext};

/// Arguments for the cat command.
#[derive(Args, Debug)]
pub struct CatArgs {
    /// Project identifier, e.g. github.com/owner/repo/dir@v1.0.0.
    pub project: String,

    /// Path of the file inside the project.
    pub path: String,

    #[command(flatten)]
    pub output: OutputSink,
}

impl CatArgs {
    pub async fn run(self, global: &GlobalArgs) -> Result<()> {
        let ctx = RequestContext::background();
        let tree = open_project(&ctx, global, &self.project).await?;
        let content = read_file(&ctx, &tree, &self.path).await?;
        self.output.write_bytes(&content).await?;
        Ok(())
    }
}

/// Content of the file at `path`. Directories have no content to print.
async fn read_file(ctx: &RequestContext, tree: &PathTree, path: &str) -> Result<Vec<u8>> {
    let mut handle = tree.open_with_context(path, ctx)?;
    if handle.is_dir() {
        return Err(TreeError::Invalid {
            path: normalize_path(path).to_string(),
        }
        .into());
    }
    Ok(handle.read_to_end().await?)
}
