//! Path-indexed tree of directories and lazily loaded files.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use super::context::RequestContext;
use super::dir::{DirEntry, DirHandle, Directory};
use super::error::{NodeKind, Result, TreeError};
use super::file::{FileHandle, LazyFile, Loader};
use super::handle::Handle;

/// A node stored in a [`PathTree`].
#[derive(Debug, Clone)]
pub enum Node {
    Directory(Arc<Directory>),
    File(Arc<LazyFile>),
}

impl Node {
    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Directory(_) => NodeKind::Directory,
            Node::File(_) => NodeKind::File,
        }
    }
}

/// Strip leading and trailing separators. The root is the empty string.
pub fn normalize_path(path: &str) -> &str {
    path.trim_matches('/')
}

fn parent_of(path: &str) -> &str {
    path.rsplit_once('/').map(|(parent, _)| parent).unwrap_or("")
}

fn base_name(path: &str) -> &str {
    path.rsplit_once('/').map(|(_, name)| name).unwrap_or(path)
}

/// A read-only file tree.
///
/// Every stored path has all of its ancestors stored as directories, and the
/// root directory always exists. The tree is filled during construction and
/// only read afterwards; cloning it is cheap and clones share file content
/// caches.
#[derive(Debug, Clone)]
pub struct PathTree {
    nodes: HashMap<String, Node>,
}

impl Default for PathTree {
    fn default() -> Self {
        Self::new()
    }
}

impl PathTree {
    pub fn new() -> Self {
        let mut nodes = HashMap::new();
        nodes.insert(String::new(), Node::Directory(Arc::new(Directory::new(""))));
        Self { nodes }
    }

    /// Add a directory and any missing ancestors. Adding an existing directory
    /// is a no-op; adding over a file is an error that leaves the tree as it was.
    pub fn add_directory(&mut self, path: &str) -> Result<()> {
        let path = normalize_path(path);
        match self.nodes.get(path) {
            Some(Node::Directory(_)) => return Ok(()),
            Some(Node::File(_)) => return Err(conflict(path, NodeKind::Directory, NodeKind::File)),
            None => {}
        }
        self.ensure_parents(path)?;
        let dir = Directory::new(base_name(path));
        self.insert(path, Node::Directory(Arc::new(dir)))
    }

    /// Add a file and any missing ancestors. Adding a file where a file
    /// already exists keeps the existing one; adding over a directory is an
    /// error that leaves the tree as it was.
    pub fn add_file(&mut self, path: &str, declared_size: u64, loader: Loader) -> Result<()> {
        let path = normalize_path(path);
        match self.nodes.get(path) {
            Some(Node::File(_)) => return Ok(()),
            Some(Node::Directory(_)) => {
                return Err(conflict(path, NodeKind::File, NodeKind::Directory))
            }
            None => {}
        }
        self.ensure_parents(path)?;
        let file = LazyFile::new(base_name(path), declared_size, loader);
        self.insert(path, Node::File(Arc::new(file)))
    }

    /// Check the whole ancestor chain before creating the missing parts, so a
    /// failure never leaves new directories behind.
    fn ensure_parents(&mut self, path: &str) -> Result<()> {
        let mut missing = Vec::new();
        let mut current = path;
        while !current.is_empty() {
            current = parent_of(current);
            match self.nodes.get(current) {
                Some(Node::Directory(_)) => break,
                Some(Node::File(_)) => {
                    return Err(conflict(current, NodeKind::Directory, NodeKind::File))
                }
                None => missing.push(current),
            }
        }
        for dir in missing.into_iter().rev() {
            self.insert(dir, Node::Directory(Arc::new(Directory::new(base_name(dir)))))?;
        }
        Ok(())
    }

    /// Store `node` at `path` and register it with its parent directory.
    fn insert(&mut self, path: &str, node: Node) -> Result<()> {
        let entry = match &node {
            Node::Directory(dir) => DirEntry::Directory(dir.name().to_string()),
            Node::File(file) => DirEntry::File(Arc::clone(file)),
        };
        let parent = parent_of(path);
        match self.nodes.get_mut(parent) {
            Some(Node::Directory(dir)) => Arc::make_mut(dir).push(entry),
            Some(Node::File(_)) => {
                return Err(conflict(parent, NodeKind::Directory, NodeKind::File))
            }
            None => {
                return Err(TreeError::NotFound {
                    path: parent.to_string(),
                })
            }
        }
        self.nodes.insert(path.to_string(), node);
        Ok(())
    }

    /// Open `name` with a background context.
    pub fn open(&self, name: &str) -> Result<Handle> {
        self.open_with_context(name, &RequestContext::background())
    }

    /// Open `name`, binding file handles to `ctx`. A trailing separator
    /// requires the target to be a directory.
    pub fn open_with_context(&self, name: &str, ctx: &RequestContext) -> Result<Handle> {
        let path = normalize_path(name);
        let wants_dir = name.ends_with('/');
        match self.nodes.get(path) {
            None => {
                debug!(path = %name, "open: path not found");
                Err(TreeError::NotFound {
                    path: path.to_string(),
                })
            }
            Some(Node::File(_)) if wants_dir => {
                debug!(path = %name, "open: directory requested but path is a file");
                Err(TreeError::Invalid {
                    path: path.to_string(),
                })
            }
            Some(Node::Directory(dir)) => Ok(Handle::Directory(DirHandle::new(Arc::clone(dir)))),
            Some(Node::File(file)) => Ok(Handle::File(FileHandle::new(
                Arc::clone(file),
                ctx.clone(),
            ))),
        }
    }

    pub fn get(&self, path: &str) -> Option<&Node> {
        self.nodes.get(normalize_path(path))
    }

    pub fn contains(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    /// All stored paths, in no particular order. Includes the root ("").
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    /// Number of stored nodes, including the root.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when only the root directory exists.
    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    pub fn file_count(&self) -> usize {
        self.nodes
            .values()
            .filter(|node| matches!(node, Node::File(_)))
            .count()
    }
}

fn conflict(path: &str, kind: NodeKind, existing: NodeKind) -> TreeError {
    TreeError::Conflict {
        path: path.to_string(),
        kind,
        existing,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{content_loader, loader, FileInfo};
    use bytes::Bytes;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn names(infos: Vec<FileInfo>) -> Vec<(String, bool)> {
        infos.into_iter().map(|i| (i.name, i.is_dir)).collect()
    }

    fn assert_ancestors_are_dirs(tree: &PathTree) {
        for path in tree.paths() {
            let mut current = path;
            while !current.is_empty() {
                current = parent_of(current);
                assert!(
                    matches!(tree.get(current), Some(Node::Directory(_))),
                    "ancestor {:?} of {:?} is not a directory",
                    current,
                    path
                );
            }
        }
    }

    #[test]
    fn ancestors_always_exist() {
        let mut tree = PathTree::new();
        tree.add_file("x/y/z/file", 1, content_loader("1")).unwrap();
        tree.add_directory("/x/w/").unwrap();
        tree.add_file("top", 0, content_loader("")).unwrap();
        tree.add_directory("p/q/r/s").unwrap();
        tree.add_file("p/q/f", 0, content_loader("")).unwrap();

        assert_ancestors_are_dirs(&tree);
        assert!(matches!(tree.get("x/y/z"), Some(Node::Directory(_))));
        assert!(matches!(tree.get("p/q/r"), Some(Node::Directory(_))));
        assert_eq!(tree.file_count(), 3);
    }

    #[tokio::test]
    async fn conflicting_kinds_leave_tree_unchanged() {
        let mut tree = PathTree::new();
        tree.add_file("a/f", 3, content_loader("abc")).unwrap();
        tree.add_directory("a/d").unwrap();
        let before = tree.len();

        assert!(matches!(
            tree.add_directory("a/f"),
            Err(TreeError::Conflict { existing: NodeKind::File, .. })
        ));
        assert!(matches!(
            tree.add_file("a/d", 1, content_loader("x")),
            Err(TreeError::Conflict { existing: NodeKind::Directory, .. })
        ));
        assert!(matches!(
            tree.add_file("a/f/g/h", 1, content_loader("x")),
            Err(TreeError::Conflict { .. })
        ));

        assert_eq!(tree.len(), before);
        assert!(!tree.contains("a/f/g"));
        assert_eq!(tree.open("a/f").unwrap().read_to_end().await.unwrap(), b"abc");
        assert_eq!(tree.open("a").unwrap().readdir(0).len(), 2);
    }

    #[test]
    fn re_adding_same_kind_is_a_noop() {
        let mut tree = PathTree::new();
        tree.add_directory("d").unwrap();
        tree.add_directory("d/").unwrap();
        tree.add_file("d/f", 1, content_loader("1")).unwrap();
        tree.add_file("d/f", 2, content_loader("22")).unwrap();

        let entries = tree.open("d").unwrap().readdir(-1);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].size, 1);
        assert_eq!(tree.open("").unwrap().readdir(-1).len(), 1);
    }

    #[test]
    fn readdir_counts() {
        let mut tree = PathTree::new();
        for name in ["d/a", "d/b", "d/c"] {
            tree.add_file(name, 0, content_loader("")).unwrap();
        }
        let dir = tree.open("d").unwrap();
        assert_eq!(dir.readdir(-1).len(), 3);
        assert_eq!(dir.readdir(0).len(), 3);
        assert_eq!(dir.readdir(1).len(), 1);
        assert_eq!(dir.readdir(2).len(), 2);
        assert_eq!(dir.readdir(3).len(), 3);
        assert_eq!(dir.readdir(4).len(), 3);

        let file = tree.open("d/a").unwrap();
        assert!(file.readdir(-1).is_empty());
    }

    #[test]
    fn readdir_keeps_insertion_order() {
        let mut tree = PathTree::new();
        tree.add_file("z", 0, content_loader("")).unwrap();
        tree.add_directory("m").unwrap();
        tree.add_file("a", 0, content_loader("")).unwrap();
        let listed = names(tree.open("/").unwrap().readdir(-1));
        assert_eq!(
            listed,
            vec![
                ("z".to_string(), false),
                ("m".to_string(), true),
                ("a".to_string(), false)
            ]
        );
    }

    #[test]
    fn open_normalizes_and_checks_kind() {
        let mut tree = PathTree::new();
        tree.add_file("dir/file", 4, content_loader("data")).unwrap();

        assert!(matches!(tree.open("dir/file/"), Err(TreeError::Invalid { .. })));
        assert!(!tree.open("dir/file").unwrap().is_dir());
        assert!(tree.open("/dir/file").is_ok());
        assert!(tree.open("/dir/").unwrap().is_dir());
        assert!(tree.open("dir").unwrap().is_dir());
        assert!(matches!(tree.open("nope"), Err(TreeError::NotFound { .. })));
        assert!(matches!(tree.open("dir/nope/"), Err(TreeError::NotFound { .. })));
    }

    #[test]
    fn empty_tree_has_a_root() {
        let tree = PathTree::new();
        assert!(tree.is_empty());
        let root = tree.open("").unwrap();
        assert!(root.is_dir());
        assert!(root.readdir(-1).is_empty());
        assert!(tree.open("/").unwrap().is_dir());
    }

    #[tokio::test]
    async fn directory_handles_read_nothing() {
        let mut tree = PathTree::new();
        tree.add_directory("d").unwrap();
        let mut dir = tree.open("d").unwrap();
        let mut buf = [0u8; 8];
        assert_eq!(dir.read(&mut buf).await.unwrap(), 0);
        assert_eq!(dir.seek(std::io::SeekFrom::Start(5)).await.unwrap(), 0);
        let info = dir.stat();
        assert!(info.is_dir);
        assert_eq!(info.size, 0);
        assert_eq!(info.mod_time, std::time::SystemTime::UNIX_EPOCH);
    }

    #[tokio::test]
    async fn nested_file_scenario() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mut tree = PathTree::new();
        tree.add_file(
            "a/b/c",
            5,
            loader(move |_ctx| {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Ok(Bytes::from_static(b"hello")) }
            }),
        )
        .unwrap();
        tree.add_directory("a/d").unwrap();

        let listed = names(tree.open("a").unwrap().readdir(-1));
        assert_eq!(listed, vec![("b".to_string(), true), ("d".to_string(), true)]);

        let entries = tree.open("a/b").unwrap().readdir(-1);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "c");
        assert!(!entries[0].is_dir);
        assert_eq!(entries[0].size, 5);

        assert_eq!(tree.open("a/b/c").unwrap().read_to_end().await.unwrap(), b"hello");
        assert_eq!(tree.open("a/b/c").unwrap().read_to_end().await.unwrap(), b"hello");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn open_with_context_binds_file_handles() {
        let mut tree = PathTree::new();
        tree.add_file("f", 1, content_loader("x")).unwrap();

        let ctx = RequestContext::background();
        ctx.cancel();
        let mut handle = tree.open_with_context("f", &ctx).unwrap();
        assert!(matches!(handle.read_to_end().await, Err(TreeError::Cancelled)));

        handle.close();
        assert_eq!(handle.read_to_end().await.unwrap(), b"x");
    }

    #[tokio::test]
    async fn clones_share_content_cache() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mut tree = PathTree::new();
        tree.add_file(
            "f",
            1,
            loader(move |_ctx| {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Ok(Bytes::from_static(b"x")) }
            }),
        )
        .unwrap();
        let copy = tree.clone();

        tree.open("f").unwrap().read_to_end().await.unwrap();
        copy.open("f").unwrap().read_to_end().await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
