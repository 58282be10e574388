use std::fmt;
use std::sync::{Mutex, PoisonError};

use tracing::warn;

use crate::protocol::{ExchangeFailure, Response};

/// Callback receiving the outcome of an exchange's header phase.
pub type OnComplete = Box<dyn FnOnce(Result<Response, ExchangeFailure>) + Send>;

/// Holds the completion callback of one exchange and fires it at most once.
pub struct CompletionSlot {
    callback: Mutex<Option<OnComplete>>,
}

impl fmt::Debug for CompletionSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionSlot").field("fired", &self.is_fired()).finish()
    }
}

impl CompletionSlot {
    pub fn new<F>(callback: F) -> Self
    where
        F: FnOnce(Result<Response, ExchangeFailure>) + Send + 'static,
    {
        Self { callback: Mutex::new(Some(Box::new(callback))) }
    }

    pub fn is_fired(&self) -> bool {
        self.callback.lock().unwrap_or_else(PoisonError::into_inner).is_none()
    }

    /// Invokes the callback with `result`, unless it already ran.
    ///
    /// Returns false, dropping `result`, on every call after the first.
    pub fn fire(&self, result: Result<Response, ExchangeFailure>) -> bool {
        // the lock is released before the callback runs
        let callback = self.callback.lock().unwrap_or_else(PoisonError::into_inner).take();
        match callback {
            Some(callback) => {
                callback(result);
                true
            }
            None => {
                match result {
                    Ok(response) => warn!(status = response.status_code(), "completion already fired, drop late response"),
                    Err(failure) => warn!(cause = %failure, "completion already fired, drop late error"),
                }
                false
            }
        }
    }
}
