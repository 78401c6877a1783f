use std::path::PathBuf;

use clap::Args;
use tracing::info;

use super::open_project;
use crate::binfs::{encode, ENCODE_VERSION};
use crate::cli::{GlobalArgs, Result};
use crate::RequestContext;

/// Arguments for the pack command.
#[derive(Args, Debug)]
pub struct PackArgs {
    /// Project identifier, e.g. github.com/owner/repo/dir@v1.0.0.
    pub project: String,

    /// File to write the packed tree to.
    #[arg(short = 'o', long = "output-file")]
    pub output_file: PathBuf,
}

impl PackArgs {
    pub async fn run(self, global: &GlobalArgs) -> Result<()> {
        let ctx = RequestContext::background();
        let tree = open_project(&ctx, global, &self.project).await?;
        let data = encode(&ctx, &tree).await?;
        tokio::fs::write(&self.output_file, &data).await?;
        info!(
            project = %self.project,
            output = %self.output_file.display(),
            bytes = data.len(),
            "packed project"
        );
        println!("{}", ENCODE_VERSION);
        Ok(())
    }
}
