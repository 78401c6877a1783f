//! Lazily loaded file content.
//!
//! A [`LazyFile`] owns a content loader and a cache cell that is filled at
//! most once. Every [`FileHandle`] opened on the file reads through its own
//! cursor over the shared cached bytes.

use std::fmt;
use std::future::Future;
use std::io::{Cursor, Read, Seek, SeekFrom};
use std::pin::Pin;
use std::sync::{Arc, OnceLock};
use std::time::Instant;

use bytes::Bytes;
use tokio::sync::Mutex;
use tracing::debug;

use super::context::RequestContext;
use super::error::Result;
use super::info::FileInfo;

// =============================================================================
// Loader
// =============================================================================

/// A boxed future returned by a [`Loader`].
pub type LoadFuture = Pin<Box<dyn Future<Output = Result<Bytes>> + Send>>;

/// Produces a file's full content. Loaders may be called more than once if an
/// earlier call failed, so they must be idempotent.
pub type Loader = Arc<dyn Fn(RequestContext) -> LoadFuture + Send + Sync>;

/// Build a [`Loader`] from an async closure.
pub fn loader<F, Fut>(f: F) -> Loader
where
    F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Bytes>> + Send + 'static,
{
    Arc::new(move |ctx| Box::pin(f(ctx)))
}

/// A loader over content that is already in memory.
pub fn content_loader(content: impl Into<Bytes>) -> Loader {
    let content = content.into();
    loader(move |_ctx| {
        let content = content.clone();
        async move { Ok(content) }
    })
}

// =============================================================================
// LazyFile
// =============================================================================

/// A file node whose content is fetched on first read and cached afterwards.
pub struct LazyFile {
    name: String,
    declared_size: u64,
    loader: Loader,
    content: OnceLock<Bytes>,
    load_lock: Mutex<()>,
}

impl LazyFile {
    pub fn new(name: impl Into<String>, declared_size: u64, loader: Loader) -> Self {
        Self {
            name: name.into(),
            declared_size,
            loader,
            content: OnceLock::new(),
            load_lock: Mutex::new(()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The size announced when the file was added.
    pub fn declared_size(&self) -> u64 {
        self.declared_size
    }

    pub fn is_loaded(&self) -> bool {
        self.content.get().is_some()
    }

    /// File metadata. Once content is cached the reported size is the actual
    /// content length; before that it is the declared size.
    pub fn info(&self) -> FileInfo {
        let size = match self.content.get() {
            Some(content) => content.len() as u64,
            None => self.declared_size,
        };
        FileInfo::file(self.name.clone(), size)
    }

    /// Return the cached content, invoking the loader under the per-file lock
    /// if nothing is cached yet. A failed load leaves the cache empty.
    pub async fn load_content(&self, ctx: &RequestContext) -> Result<Bytes> {
        if let Some(content) = self.content.get() {
            return Ok(content.clone());
        }

        let _guard = ctx.guard(self.load_lock.lock()).await?;
        if let Some(content) = self.content.get() {
            return Ok(content.clone());
        }

        let start = Instant::now();
        let content = ctx.guard((self.loader)(ctx.clone())).await??;
        debug!(
            file = %self.name,
            bytes = content.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "loaded file content"
        );
        Ok(self.content.get_or_init(|| content).clone())
    }

    /// Open a handle bound to a background context.
    pub fn open(self: &Arc<Self>) -> FileHandle {
        FileHandle::new(Arc::clone(self), RequestContext::background())
    }
}

impl fmt::Debug for LazyFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyFile")
            .field("name", &self.name)
            .field("declared_size", &self.declared_size)
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

// =============================================================================
// FileHandle
// =============================================================================

/// An open file. Each handle owns its own read position.
pub struct FileHandle {
    file: Arc<LazyFile>,
    ctx: RequestContext,
    cursor: Option<Cursor<Bytes>>,
}

impl FileHandle {
    pub(crate) fn new(file: Arc<LazyFile>, ctx: RequestContext) -> Self {
        Self {
            file,
            ctx,
            cursor: None,
        }
    }

    pub fn stat(&self) -> FileInfo {
        self.file.info()
    }

    pub fn context(&self) -> &RequestContext {
        &self.ctx
    }

    async fn cursor(&mut self) -> Result<&mut Cursor<Bytes>> {
        self.ctx.check()?;
        let cursor = match self.cursor.take() {
            Some(cursor) => cursor,
            None => Cursor::new(self.file.load_content(&self.ctx).await?),
        };
        Ok(self.cursor.insert(cursor))
    }

    pub async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        Ok(self.cursor().await?.read(buf)?)
    }

    pub async fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        Ok(self.cursor().await?.seek(pos)?)
    }

    /// Read from the current position to the end of the content.
    pub async fn read_to_end(&mut self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.cursor().await?.read_to_end(&mut out)?;
        Ok(out)
    }

    /// Drop the cursor and context so the handle starts over on next use.
    pub fn close(&mut self) {
        self.cursor = None;
        self.ctx = RequestContext::background();
    }

    /// A new handle on the same file bound to `ctx`. The new handle starts at
    /// this handle's position but moves independently of it.
    pub fn with_context(&self, ctx: RequestContext) -> FileHandle {
        FileHandle {
            file: Arc::clone(&self.file),
            ctx,
            cursor: self.cursor.clone(),
        }
    }
}

impl fmt::Debug for FileHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileHandle")
            .field("file", &self.file.name)
            .field("position", &self.cursor.as_ref().map(|c| c.position()))
            .finish()
    }
}
