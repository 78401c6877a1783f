//! Whole-tree helpers: recursive listing and structural comparison.

mod diff;
mod walk;

pub use diff::{diff, DiffKind, FsDiff, PathDiff};
pub use walk::{walk, WalkEntry};
