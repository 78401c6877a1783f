use std::fmt::Display;
use std::sync::{Mutex, PoisonError};

use tracing::warn;

/// Keeps the first reported error. Later reports are logged and dropped.
///
/// Reporting never blocks on anything but a short internal lock, so tasks
/// can report and carry on to completion.
#[derive(Debug)]
pub struct ErrorSlot<E> {
    first: Mutex<Option<E>>,
}

impl<E: Display> ErrorSlot<E> {
    pub fn new() -> Self {
        Self {
            first: Mutex::new(None),
        }
    }

    pub fn report(&self, err: E) {
        let mut first = self.first.lock().unwrap_or_else(PoisonError::into_inner);
        if first.is_none() {
            *first = Some(err);
        } else {
            warn!(error = %err, "discarding error after an earlier failure");
        }
    }

    pub fn is_set(&self) -> bool {
        self.first
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    pub fn take(&self) -> Option<E> {
        self.first
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

impl<E: Display> Default for ErrorSlot<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn keeps_first_error() {
        let slot = ErrorSlot::new();
        assert!(!slot.is_set());
        slot.report("first".to_string());
        slot.report("second".to_string());
        assert!(slot.is_set());
        assert_eq!(slot.take(), Some("first".to_string()));
        assert_eq!(slot.take(), None);
    }

    #[tokio::test]
    async fn concurrent_reports_keep_exactly_one() {
        let slot = Arc::new(ErrorSlot::new());
        let mut handles = Vec::new();
        for i in 0..8 {
            let slot = Arc::clone(&slot);
            handles.push(tokio::spawn(async move { slot.report(format!("error {}", i)) }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert!(slot.take().unwrap().starts_with("error "));
        assert!(slot.take().is_none());
    }
}
