//! Bounded dispatch of remote requests.
//!
//! A [`RequestLimiter`] hands out at most `limit` [`RequestPermit`]s at a
//! time. Further callers queue in FIFO order and are woken as permits are
//! dropped.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::oneshot;

// =============================================================================
// RequestPermit
// =============================================================================

/// A granted slot. Returned to the limiter when dropped.
pub struct RequestPermit {
    inner: Option<Arc<Inner>>,
}

impl Drop for RequestPermit {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.take() {
            inner.release();
        }
    }
}

/// A queued acquire. If it is abandoned after a slot was already handed to
/// it, the slot is released again.
struct Waiting {
    inner: Arc<Inner>,
    receiver: Option<oneshot::Receiver<()>>,
}

impl Drop for Waiting {
    fn drop(&mut self) {
        if let Some(mut receiver) = self.receiver.take() {
            receiver.close();
            if receiver.try_recv().is_ok() {
                self.inner.release();
            }
        }
    }
}

// =============================================================================
// Internal State
// =============================================================================

struct State {
    limit: usize,
    in_use: usize,
    waiters: VecDeque<oneshot::Sender<()>>,
}

struct Inner {
    state: Mutex<State>,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Take a slot immediately, or enqueue and return the receiver to wait on.
    fn try_acquire(&self) -> Option<oneshot::Receiver<()>> {
        let mut state = self.lock();
        if state.in_use < state.limit {
            state.in_use += 1;
            None
        } else {
            let (sender, receiver) = oneshot::channel();
            state.waiters.push_back(sender);
            Some(receiver)
        }
    }

    /// Free a slot and hand it to the first waiter still listening.
    fn release(&self) {
        let mut state = self.lock();
        state.in_use = state.in_use.saturating_sub(1);
        while state.in_use < state.limit {
            let Some(waiter) = state.waiters.pop_front() else {
                break;
            };
            // A waiter that gave up has dropped its receiver; skip it.
            if waiter.send(()).is_ok() {
                state.in_use += 1;
            }
        }
    }
}

// =============================================================================
// RequestLimiter
// =============================================================================

/// Limits the number of concurrently outstanding requests.
///
/// # Examples
///
/// ```
/// use gitfs::util::RequestLimiter;
///
/// # async fn example() {
/// let limiter = RequestLimiter::new(2);
/// let first = limiter.acquire().await;
/// let _second = limiter.acquire().await;
/// assert_eq!(limiter.in_use(), 2);
///
/// drop(first);
/// assert_eq!(limiter.in_use(), 1);
/// # }
/// ```
#[derive(Clone)]
pub struct RequestLimiter {
    inner: Option<Arc<Inner>>,
}

impl RequestLimiter {
    /// A limiter allowing `limit` concurrent requests. A limit of 0 is
    /// treated as 1.
    pub fn new(limit: usize) -> Self {
        Self {
            inner: Some(Arc::new(Inner {
                state: Mutex::new(State {
                    limit: limit.max(1),
                    in_use: 0,
                    waiters: VecDeque::new(),
                }),
            })),
        }
    }

    /// A limiter that never makes callers wait.
    pub fn unbounded() -> Self {
        Self { inner: None }
    }

    /// Wait for a free slot.
    ///
    /// If this future is dropped while queued, the slot it would have
    /// received goes to the next waiter.
    pub async fn acquire(&self) -> RequestPermit {
        let Some(inner) = &self.inner else {
            return RequestPermit { inner: None };
        };
        if let Some(receiver) = inner.try_acquire() {
            let mut waiting = Waiting {
                inner: Arc::clone(inner),
                receiver: Some(receiver),
            };
            if let Some(receiver) = waiting.receiver.as_mut() {
                // The sender lives in the queue, which is only dropped with `inner`.
                let _ = receiver.await;
            }
            waiting.receiver = None;
        }
        RequestPermit {
            inner: Some(Arc::clone(inner)),
        }
    }

    /// Number of permits currently held.
    pub fn in_use(&self) -> usize {
        self.inner.as_ref().map_or(0, |inner| inner.lock().in_use)
    }

    /// The configured bound, or `None` when unbounded.
    pub fn limit(&self) -> Option<usize> {
        self.inner.as_ref().map(|inner| inner.lock().limit)
    }

    /// Number of callers queued for a permit.
    pub fn waiting_count(&self) -> usize {
        self.inner.as_ref().map_or(0, |inner| inner.lock().waiters.len())
    }
}

impl Default for RequestLimiter {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl std::fmt::Debug for RequestLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestLimiter")
            .field("limit", &self.limit())
            .field("in_use", &self.in_use())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
