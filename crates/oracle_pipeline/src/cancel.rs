//! Per-run cancellation signal.
//!
//! A [`CancelHandle`] lives in the service's active-run registry; the run
//! holds the matching [`CancelToken`]. Async stages race their future against
//! [`CancelToken::cancelled`]; the blocking simulation polls the shared flag
//! between trial chunks.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;

/// Reason reported when a run exceeds its deadline.
pub const TIMED_OUT: &str = "timed out";

/// Sending side, owned by whoever may cancel the run.
#[derive(Debug)]
pub struct CancelHandle {
    reason: watch::Sender<Option<String>>,
    flag: Arc<AtomicBool>,
}

/// Receiving side, owned by the run.
#[derive(Debug, Clone)]
pub struct CancelToken {
    reason: watch::Receiver<Option<String>>,
    flag: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

/// Create a linked handle/token pair; the token fires by itself after `timeout`.
pub fn cancel_pair(timeout: Option<Duration>) -> (CancelHandle, CancelToken) {
    let (tx, rx) = watch::channel(None);
    let flag = Arc::new(AtomicBool::new(false));
    let handle = CancelHandle {
        reason: tx,
        flag: Arc::clone(&flag),
    };
    let token = CancelToken {
        reason: rx,
        flag,
        deadline: timeout.map(|t| Instant::now() + t),
    };
    (handle, token)
}

impl CancelHandle {
    /// Request cancellation. The first reason wins; returns whether this call was first.
    pub fn cancel(&self, reason: impl Into<String>) -> bool {
        let reason = reason.into();
        let first = self.reason.send_if_modified(|current| {
            if current.is_some() {
                return false;
            }
            *current = Some(reason);
            true
        });
        self.flag.store(true, Ordering::Relaxed);
        first
    }
}

impl CancelToken {
    /// Flag polled by blocking work.
    pub fn flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.flag)
    }

    /// Reason, if cancellation was requested.
    pub fn reason(&self) -> Option<String> {
        self.reason.borrow().clone()
    }

    /// Resolve with the reason once cancelled or past the deadline.
    ///
    /// Never resolves if neither happens.
    pub async fn cancelled(&self) -> String {
        let mut rx = self.reason.clone();
        let requested = async move {
            let outcome = rx
                .wait_for(Option::is_some)
                .await
                .map(|reason| (*reason).clone().unwrap_or_default());
            match outcome {
                Ok(reason) => reason,
                // handle dropped without cancelling
                Err(_) => std::future::pending::<String>().await,
            }
        };

        let reason = match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    reason = requested => reason,
                    _ = tokio::time::sleep_until(deadline) => TIMED_OUT.to_string(),
                }
            }
            None => requested.await,
        };
        self.flag.store(true, Ordering::Relaxed);
        reason
    }
}
