// src/cancel.rs

//! Cooperative cancellation token.
//!
//! The token is armed when a build run starts and can be signalled at most
//! once; signalling again is a no-op. The scheduler checks it at dispatch
//! boundaries and actions may either poll [`CancelToken::is_cancelled`] or
//! await [`CancelToken::cancelled`]. Nothing is ever force-terminated
//! through the token itself; honouring it is up to each observer.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Notify;

#[derive(Debug, Default)]
struct Inner {
    cancelled: AtomicBool,
    notify: Notify,
}

/// Clonable handle to shared cancellation state.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal cancellation. Idempotent: only the first call fires the
    /// notification, later calls do nothing.
    pub fn cancel(&self) {
        if !self.inner.cancelled.swap(true, Ordering::SeqCst) {
            self.inner.notify.notify_waiters();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Wait until the token is cancelled. Returns immediately if it already
    /// is.
    pub async fn cancelled(&self) {
        // The Notified future receives wakeups from notify_waiters() as soon
        // as it is created, so checking the flag after creating it closes the
        // race with a concurrent cancel().
        let notified = self.inner.notify.notified();
        if self.is_cancelled() {
            return;
        }
        notified.await;
    }
}
