//! CLI command implementations.

mod cat;
mod diff;
mod ls;
mod pack;

pub use cat::CatArgs;
pub use diff::DiffArgs;
pub use ls::LsArgs;
pub use pack::PackArgs;

use crate::cli::{GlobalArgs, Result};
use crate::{PathTree, RequestContext};

/// Open `project` with the options from configuration and flags.
async fn open_project(ctx: &RequestContext, global: &GlobalArgs, project: &str) -> Result<PathTree> {
    let options = global.to_options()?;
    Ok(crate::open(ctx, project, &options).await?)
}
