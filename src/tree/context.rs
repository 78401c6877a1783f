//! Cancellable request context.
//!
//! Every remote call and every lazy content load receives a [`RequestContext`].
//! Cancelling the context aborts calls that are waiting on it and makes later
//! calls on the same context fail immediately.

use std::fmt;
use std::future::Future;

use tokio_util::sync::CancellationToken;

/// Error returned when work is attempted on a cancelled context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled;

impl fmt::Display for Cancelled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "request context cancelled")
    }
}

impl std::error::Error for Cancelled {}

/// A request-scoped cancellation handle.
///
/// Cloning is cheap; clones observe the same cancellation state.
#[derive(Clone, Default)]
pub struct RequestContext {
    token: CancellationToken,
}

impl RequestContext {
    /// A context that is never cancelled unless [`cancel`](Self::cancel) is called on it.
    pub fn background() -> Self {
        Self::default()
    }

    /// Wrap an existing cancellation token.
    pub fn from_token(token: CancellationToken) -> Self {
        Self { token }
    }

    /// A child context: cancelled when `self` is, but cancelling it leaves `self` alone.
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
        }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Fails with [`Cancelled`] if the context is already cancelled.
    pub fn check(&self) -> Result<(), Cancelled> {
        if self.token.is_cancelled() {
            Err(Cancelled)
        } else {
            Ok(())
        }
    }

    /// Completes once the context is cancelled.
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    /// Run `fut` until it completes or the context is cancelled, whichever comes first.
    pub async fn guard<F: Future>(&self, fut: F) -> Result<F::Output, Cancelled> {
        self.check()?;
        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(Cancelled),
            output = fut => Ok(output),
        }
    }
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
