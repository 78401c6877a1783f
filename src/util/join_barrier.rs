//! Completion tracking for spawned tasks.
//!
//! A [`JoinBarrier`] spawns tasks and lets a caller wait until every task has
//! finished and no more tasks will be added.

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

/// Error returned when `spawn()` is called after `done()`.
#[derive(Debug, Clone)]
pub struct SpawnAfterDoneError;

impl std::fmt::Display for SpawnAfterDoneError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "spawn() called after done()")
    }
}

impl std::error::Error for SpawnAfterDoneError {}

struct BarrierInner {
    pending: AtomicUsize,
    done: AtomicBool,
    notify: Notify,
}

impl BarrierInner {
    fn is_settled(&self) -> bool {
        self.done.load(Ordering::SeqCst) && self.pending.load(Ordering::SeqCst) == 0
    }
}

/// Decrements the pending count when a task ends, including by panic.
struct PendingGuard(Arc<BarrierInner>);

impl Drop for PendingGuard {
    fn drop(&mut self) {
        let prev = self.0.pending.fetch_sub(1, Ordering::SeqCst);
        if prev == 1 && self.0.done.load(Ordering::SeqCst) {
            self.0.notify.notify_waiters();
        }
    }
}

/// Waits for a dynamic set of spawned tasks.
///
/// Spawn tasks with `spawn()`, then call `done()` once no more will be
/// added. `wait()` returns when `done()` has been called and every spawned
/// task has finished.
pub struct JoinBarrier {
    inner: Arc<BarrierInner>,
}

impl JoinBarrier {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(BarrierInner {
                pending: AtomicUsize::new(0),
                done: AtomicBool::new(false),
                notify: Notify::new(),
            }),
        }
    }

    /// Spawn `task` onto the runtime and track it.
    ///
    /// # Errors
    ///
    /// Returns `SpawnAfterDoneError` if `done()` has already been called.
    pub fn spawn<F>(&self, task: F) -> Result<(), SpawnAfterDoneError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if self.inner.done.load(Ordering::SeqCst) {
            return Err(SpawnAfterDoneError);
        }
        self.inner.pending.fetch_add(1, Ordering::SeqCst);

        let guard = PendingGuard(Arc::clone(&self.inner));
        tokio::spawn(async move {
            let _guard = guard;
            task.await;
        });
        Ok(())
    }

    /// Mark that no more tasks will be spawned.
    pub fn done(&self) {
        self.inner.done.store(true, Ordering::SeqCst);
        if self.inner.pending.load(Ordering::SeqCst) == 0 {
            self.inner.notify.notify_waiters();
        }
    }

    /// Number of spawned tasks that have not finished.
    pub fn pending(&self) -> usize {
        self.inner.pending.load(Ordering::SeqCst)
    }

    /// Wait until `done()` was called and all tasks finished.
    pub async fn wait(&self) {
        loop {
            let notified = self.inner.notify.notified();
            if self.inner.is_settled() {
                return;
            }
            notified.await;
        }
    }
}

impl Default for JoinBarrier {
    fn default() -> Self {
        Self::new()
    }
}
