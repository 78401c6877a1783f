//! Concurrency helpers shared by the tree builders.

pub mod error_slot;
pub mod join_barrier;
pub mod request_limiter;

pub use error_slot::ErrorSlot;
pub use join_barrier::{JoinBarrier, SpawnAfterDoneError};
pub use request_limiter::{RequestLimiter, RequestPermit};
