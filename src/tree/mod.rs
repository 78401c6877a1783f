//! The virtual file tree.
//!
//! A [`PathTree`] maps normalized paths to directory and file nodes. File
//! nodes wrap a [`LazyFile`] whose content is loaded on first read and then
//! cached for every handle opened on it.

mod context;
mod dir;
mod error;
mod file;
mod handle;
mod info;
mod path_tree;

pub use context::{Cancelled, RequestContext};
pub use dir::{DirEntry, DirHandle, Directory};
pub use error::{NodeKind, Result, TreeError};
pub use file::{content_loader, loader, FileHandle, LazyFile, LoadFuture, Loader};
pub use handle::Handle;
pub use info::{FileInfo, DIR_MODE, FILE_MODE};
pub use path_tree::{normalize_path, Node, PathTree};
