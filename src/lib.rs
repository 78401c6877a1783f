//! gitfs - a read-only file tree over a git repository subtree.
//!
//! A project such as `github.com/owner/repo/static@v1.2.3` names a
//! repository, an optional directory inside it and an optional ref. Opening
//! it yields a [`PathTree`] that serves the files under that directory:
//!
//! ```no_run
//! # async fn run() -> gitfs::Result<()> {
//! use gitfs::{Options, RequestContext};
//!
//! let ctx = RequestContext::background();
//! let tree = gitfs::open(&ctx, "github.com/owner/repo/static@v1.2.3", &Options::new()).await?;
//! let index = tree.open("index.html")?.read_to_end().await?;
//! # let _ = index;
//! # Ok(())
//! # }
//! ```
//!
//! Trees can also come from a local checkout of the repository
//! ([`localfs`]) or from a packed copy registered ahead of time ([`binfs`]).

pub mod binfs;
pub mod cli;
pub mod config;
mod error;
pub mod fsutil;
pub mod github;
pub mod glob_filter;
pub mod localfs;
mod open;
pub mod tree;
pub mod util;

pub use error::{Error, Result};
pub use open::{open, open_with_host, Options};
pub use tree::{FileInfo, Handle, PathTree, RequestContext, TreeError};
