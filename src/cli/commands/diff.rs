use std::path::PathBuf;

use clap::Args;

use super::open_project;
use crate::binfs::{decode, ENCODE_VERSION};
use crate::cli::{CliError, GlobalArgs, OutputSink, Result};
use crate::fsutil;
use crate::RequestContext;

/// Arguments for the diff command.
#[derive(Args, Debug)]
pub struct DiffArgs {
    /// Project identifier, e.g. github.com/owner/repo/dir@v1.0.0.
    pub project: String,

    /// Packed file to compare against.
    #[arg(long)]
    pub packed: PathBuf,

    /// Encoding version of the packed file.
    #[arg(long = "encode-version", default_value_t = ENCODE_VERSION)]
    pub encode_version: u32,

    #[command(flatten)]
    pub output: OutputSink,
}

impl DiffArgs {
    pub async fn run(self, global: &GlobalArgs) -> Result<()> {
        let ctx = RequestContext::background();
        let tree = open_project(&ctx, global, &self.project).await?;
        let data = tokio::fs::read(&self.packed).await?;
        let packed = decode(&data, self.encode_version)?;

        let diff = fsutil::diff(&ctx, &tree, &packed).await?;
        if diff.is_empty() {
            return Ok(());
        }
        self.output.write_str(diff.to_string().trim_end()).await?;
        Err(CliError::TreesDiffer(diff.len()))
    }
}
