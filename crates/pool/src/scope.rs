// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A cooperative cancellation signal, cheap to clone and safe to poll from
//! many tasks at once.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

struct Inner {
    cancelled: AtomicBool,
    notify: Notify,
    /// The task watching a parent scope on this child's behalf, set only by
    /// [`CancellationScope::child`]. Aborted on drop so a child that's never
    /// explicitly cancelled doesn't leave its watcher parked forever.
    watcher: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(handle) = self.watcher.lock().take() {
            handle.abort();
        }
    }
}

/// Handed to every task a pool runs. A task that wants to exit promptly on
/// drain should race its own work against [`CancellationScope::cancelled`].
#[derive(Clone)]
pub struct CancellationScope(Arc<Inner>);

impl CancellationScope {
    pub fn new() -> Self {
        Self(Arc::new(Inner {
            cancelled: AtomicBool::new(false),
            notify: Notify::new(),
            watcher: Mutex::new(None),
        }))
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.cancelled.load(Ordering::Acquire)
    }

    /// Resolves once this scope has been cancelled. Registers interest with
    /// the inner `Notify` before checking the flag, so a `cancel()` racing
    /// with this call can never be missed.
    pub async fn cancelled(&self) {
        let notified = self.0.notify.notified();
        if self.is_cancelled() {
            return;
        }
        notified.await;
    }

    pub fn cancel(&self) {
        self.0.cancelled.store(true, Ordering::Release);
        self.0.notify.notify_waiters();
    }

    /// A new scope that cancels itself as soon as either it or `self` is
    /// cancelled. Used to give each submitted task its own cancellation
    /// signal (for a per-task deadline) while still honoring a pool-wide
    /// drain cancelling every task at once.
    ///
    /// The watcher task holds only a weak reference to the child, so a
    /// child that's never cancelled and simply goes out of scope (the
    /// common case: the command it belongs to finishes normally) doesn't
    /// keep the watcher — or the `Arc` it would otherwise hold alive —
    /// parked forever. `Inner`'s `Drop` aborts the watcher explicitly as
    /// soon as the last handle to the child is gone, so there's no reliance
    /// on ever observing the parent's cancellation at all.
    pub fn child(&self) -> CancellationScope {
        let child = CancellationScope::new();
        let parent = self.clone();
        let weak_child = Arc::downgrade(&child.0);
        let handle = tokio::spawn(async move {
            parent.cancelled().await;
            if let Some(inner) = weak_child.upgrade() {
                inner.cancelled.store(true, Ordering::Release);
                inner.notify.notify_waiters();
            }
        });
        *child.0.watcher.lock() = Some(handle);
        child
    }
}

impl Default for CancellationScope {
    fn default() -> Self {
        Self::new()
    }
}
