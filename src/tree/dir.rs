use std::sync::Arc;

use super::file::LazyFile;
use super::info::FileInfo;

/// A child entry recorded in its parent directory.
#[derive(Debug, Clone)]
pub enum DirEntry {
    Directory(String),
    File(Arc<LazyFile>),
}

impl DirEntry {
    pub fn name(&self) -> &str {
        match self {
            DirEntry::Directory(name) => name,
            DirEntry::File(file) => file.name(),
        }
    }

    pub fn info(&self) -> FileInfo {
        match self {
            DirEntry::Directory(name) => FileInfo::directory(name.clone()),
            DirEntry::File(file) => file.info(),
        }
    }
}

/// A directory node. Children are kept in insertion order.
#[derive(Debug, Clone)]
pub struct Directory {
    name: String,
    entries: Vec<DirEntry>,
}

impl Directory {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn entries(&self) -> &[DirEntry] {
        &self.entries
    }

    pub(crate) fn push(&mut self, entry: DirEntry) {
        self.entries.push(entry);
    }

    pub fn info(&self) -> FileInfo {
        FileInfo::directory(self.name.clone())
    }
}

/// An open directory.
#[derive(Debug, Clone)]
pub struct DirHandle {
    dir: Arc<Directory>,
}

impl DirHandle {
    pub(crate) fn new(dir: Arc<Directory>) -> Self {
        Self { dir }
    }

    pub fn stat(&self) -> FileInfo {
        self.dir.info()
    }

    /// List up to `n` entries, or all of them when `n <= 0`. Asking for more
    /// entries than exist returns all of them.
    pub fn readdir(&self, n: isize) -> Vec<FileInfo> {
        let entries = self.dir.entries();
        let count = if n <= 0 {
            entries.len()
        } else {
            entries.len().min(n as usize)
        };
        entries[..count].iter().map(DirEntry::info).collect()
    }
}
