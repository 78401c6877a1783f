use std::io::SeekFrom;

use super::context::RequestContext;
use super::dir::DirHandle;
use super::error::Result;
use super::file::FileHandle;
use super::info::FileInfo;

/// An open node returned by [`PathTree::open`](super::PathTree::open).
///
/// Directory handles read zero bytes and always seek to 0; file handles list
/// no entries.
#[derive(Debug)]
pub enum Handle {
    Directory(DirHandle),
    File(FileHandle),
}

impl Handle {
    pub fn is_dir(&self) -> bool {
        matches!(self, Handle::Directory(_))
    }

    pub fn stat(&self) -> FileInfo {
        match self {
            Handle::Directory(dir) => dir.stat(),
            Handle::File(file) => file.stat(),
        }
    }

    pub async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        match self {
            Handle::Directory(_) => Ok(0),
            Handle::File(file) => file.read(buf).await,
        }
    }

    pub async fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        match self {
            Handle::Directory(_) => Ok(0),
            Handle::File(file) => file.seek(pos).await,
        }
    }

    pub async fn read_to_end(&mut self) -> Result<Vec<u8>> {
        match self {
            Handle::Directory(_) => Ok(Vec::new()),
            Handle::File(file) => file.read_to_end().await,
        }
    }

    pub fn readdir(&self, n: isize) -> Vec<FileInfo> {
        match self {
            Handle::Directory(dir) => dir.readdir(n),
            Handle::File(_) => Vec::new(),
        }
    }

    pub fn close(&mut self) {
        if let Handle::File(file) = self {
            file.close();
        }
    }

    /// Rebind to `ctx`. File handles get an independent copy of their cursor.
    pub fn with_context(&self, ctx: RequestContext) -> Handle {
        match self {
            Handle::Directory(dir) => Handle::Directory(dir.clone()),
            Handle::File(file) => Handle::File(file.with_context(ctx)),
        }
    }
}
