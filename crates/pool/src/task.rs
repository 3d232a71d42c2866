// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::scope::CancellationScope;
use std::future::Future;
use std::pin::Pin;

type BoxFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// An opaque unit of work submitted to a [`crate::WorkerPool`]: a callable
/// plus the cancellation scope it runs under. A task has no identity beyond
/// its own lifetime — any result it produces is the closure's responsibility
/// to deliver (typically by capturing a `oneshot::Sender`).
pub struct Task {
    run: Box<dyn FnOnce(CancellationScope) -> BoxFuture + Send>,
}

impl Task {
    pub fn new<F, Fut>(body: F) -> Self
    where
        F: FnOnce(CancellationScope) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self {
            run: Box::new(move |scope| Box::pin(body(scope))),
        }
    }

    pub(crate) fn into_future(self, scope: CancellationScope) -> BoxFuture {
        (self.run)(scope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn task_runs_its_body_with_the_given_scope() {
        let ran = Arc::new(AtomicBool::new(false));
        let ran2 = ran.clone();
        let task = Task::new(move |scope| async move {
            assert!(!scope.is_cancelled());
            ran2.store(true, Ordering::SeqCst);
        });
        task.into_future(CancellationScope::new()).await;
        assert!(ran.load(Ordering::SeqCst));
    }
}
