// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Bounded-concurrency, bounded-queue worker pool with panic isolation and a
//! deadline-aware drain.
//!
//! A single dispatch loop pulls tasks off a bounded channel (the queue depth
//! bound) and, for each one, waits for a semaphore permit (the concurrency
//! bound) before spawning it. A panicking task only ever fails that one
//! spawned unit of work; the dispatch loop and every other in-flight task
//! are unaffected.

mod scope;
mod task;

pub use scope::CancellationScope;
pub use task::Task;

use futures_util::FutureExt;
use parking_lot::Mutex;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, thiserror::Error, PartialEq, Eq)]
pub enum DrainError {
    #[error("drain deadline exceeded with tasks still in flight")]
    DeadlineExceeded,
}

struct Shared {
    running: AtomicUsize,
    accepting: AtomicBool,
}

/// Bounded-concurrency, bounded-queue worker pool.
pub struct WorkerPool {
    sender: Mutex<Option<mpsc::Sender<Task>>>,
    dispatch_handle: Mutex<Option<JoinHandle<()>>>,
    shared: Arc<Shared>,
    root_scope: CancellationScope,
    concurrency: usize,
    queue_depth: usize,
}

impl WorkerPool {
    pub fn new(concurrency: usize, queue_depth: usize) -> Self {
        let concurrency = concurrency.max(1);
        let queue_depth = queue_depth.max(1);
        let (sender, receiver) = mpsc::channel(queue_depth);
        let shared = Arc::new(Shared {
            running: AtomicUsize::new(0),
            accepting: AtomicBool::new(true),
        });
        let root_scope = CancellationScope::new();
        let semaphore = Arc::new(Semaphore::new(concurrency));
        let dispatch_handle = tokio::spawn(dispatch_loop(
            receiver,
            semaphore,
            shared.clone(),
            root_scope.clone(),
        ));

        Self {
            sender: Mutex::new(Some(sender)),
            dispatch_handle: Mutex::new(Some(dispatch_handle)),
            shared,
            root_scope,
            concurrency,
            queue_depth,
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn queue_depth(&self) -> usize {
        self.queue_depth
    }

    /// Non-blocking. Returns `false` if the pool has stopped accepting work
    /// or the queue is full.
    pub fn submit(&self, task: Task) -> bool {
        if !self.shared.accepting.load(Ordering::Acquire) {
            return false;
        }
        match self.sender.lock().as_ref() {
            Some(sender) => sender.try_send(task).is_ok(),
            None => false,
        }
    }

    pub fn stop_accepting(&self) {
        self.shared.accepting.store(false, Ordering::Release);
    }

    pub fn is_accepting(&self) -> bool {
        self.shared.accepting.load(Ordering::Acquire)
    }

    pub fn running_count(&self) -> usize {
        self.shared.running.load(Ordering::SeqCst)
    }

    /// Whether a prior [`Self::drain`]/[`Self::shutdown`] timed out and cancelled
    /// every in-flight task's [`CancellationScope`].
    pub fn is_cancelled(&self) -> bool {
        self.root_scope.is_cancelled()
    }

    /// Closes the queue and waits for every accepted task to finish, up to
    /// `deadline`. Calling `drain` without a prior [`Self::stop_accepting`]
    /// auto-transitions to stopped-accepting first. Intended to be called
    /// exactly once; a second call observes an already-drained pool and
    /// returns immediately.
    pub async fn drain(&self, deadline: Duration) -> Result<(), DrainError> {
        self.stop_accepting();
        let sender = self.sender.lock().take();
        drop(sender);
        let dispatch_handle = self.dispatch_handle.lock().take();
        let shared = self.shared.clone();

        let wait = async move {
            if let Some(handle) = dispatch_handle {
                let _ = handle.await;
            }
            while shared.running.load(Ordering::SeqCst) > 0 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        };

        match tokio::time::timeout(deadline, wait).await {
            Ok(()) => Ok(()),
            Err(_) => {
                self.root_scope.cancel();
                Err(DrainError::DeadlineExceeded)
            }
        }
    }

    /// `StopAccepting` followed by `Drain`, per the pool's contract.
    pub async fn shutdown(&self, deadline: Duration) -> Result<(), DrainError> {
        self.stop_accepting();
        self.drain(deadline).await
    }
}

async fn dispatch_loop(
    mut receiver: mpsc::Receiver<Task>,
    semaphore: Arc<Semaphore>,
    shared: Arc<Shared>,
    scope: CancellationScope,
) {
    while let Some(task) = receiver.recv().await {
        let permit = match semaphore.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => break,
        };
        shared.running.fetch_add(1, Ordering::SeqCst);
        let shared = shared.clone();
        let scope = scope.clone();
        tokio::spawn(async move {
            let _permit = permit;
            let outcome = AssertUnwindSafe(task.into_future(scope)).catch_unwind().await;
            if outcome.is_err() {
                tracing::error!("worker task panicked; pool continues");
            }
            shared.running.fetch_sub(1, Ordering::SeqCst);
        });
    }
}

#[cfg(test)]
#[path = "pool_tests.rs"]
mod tests;
