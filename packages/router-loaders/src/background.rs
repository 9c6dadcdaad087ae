//! Lazy loads that run without an executor-provided spawner.

use std::{
    cell::RefCell,
    future::Future,
    pin::Pin,
    task::{Context, Poll, Waker},
};

use futures_util::{future::LocalBoxFuture, stream::FuturesUnordered, StreamExt};

/// Tasks owned by the coordinator, driven by [`DataLoaderHandle::run_background`].
///
/// [`DataLoaderHandle::run_background`]: crate::DataLoaderHandle::run_background
#[derive(Default)]
pub(crate) struct BackgroundTasks {
    tasks: RefCell<FuturesUnordered<LocalBoxFuture<'static, ()>>>,
    // Spawned while the tasks are being polled.
    incoming: RefCell<Vec<LocalBoxFuture<'static, ()>>>,
    driver: RefCell<Option<Waker>>,
}

impl BackgroundTasks {
    pub(crate) fn spawn(&self, task: LocalBoxFuture<'static, ()>) {
        self.incoming.borrow_mut().push(task);
        if let Some(driver) = self.driver.borrow_mut().take() {
            driver.wake();
        }
    }

    pub(crate) fn len(&self) -> usize {
        let running = self.tasks.try_borrow().map(|tasks| tasks.len()).unwrap_or(0);
        running + self.incoming.borrow().len()
    }

    pub(crate) fn clear(&self) {
        self.incoming.borrow_mut().clear();
        if let Ok(mut tasks) = self.tasks.try_borrow_mut() {
            tasks.clear();
        }
    }

    /// Resolves once every task spawned so far, and every task they spawn, finished.
    pub(crate) fn run(&self) -> RunBackground<'_> {
        RunBackground { background: self }
    }

    fn poll_tasks(&self, cx: &mut Context<'_>) -> Poll<()> {
        let Ok(mut tasks) = self.tasks.try_borrow_mut() else {
            // Another driver is polling, check back later.
            *self.driver.borrow_mut() = Some(cx.waker().clone());
            return Poll::Pending;
        };

        loop {
            tasks.extend(self.incoming.borrow_mut().drain(..));
            let polled = tasks.poll_next_unpin(cx);
            if !self.incoming.borrow().is_empty() {
                continue;
            }
            match polled {
                Poll::Ready(Some(())) => continue,
                Poll::Ready(None) => return Poll::Ready(()),
                Poll::Pending => {
                    *self.driver.borrow_mut() = Some(cx.waker().clone());
                    return Poll::Pending;
                }
            }
        }
    }
}

/// Returned by [`BackgroundTasks::run`].
pub(crate) struct RunBackground<'a> {
    background: &'a BackgroundTasks,
}

impl Future for RunBackground<'_> {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        self.background.poll_tasks(cx)
    }
}
