use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{oneshot, watch};

use crate::error::ServiceError;
use crate::types::Progress;

/// Receives per-item progress from a bulk operation.
pub trait ProgressSink {
    fn report(&mut self, done: usize, total: usize);

    /// Checked before each item; a cancelled operation stops at the next item boundary.
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// Sink for callers that run operations inline and do not track progress.
#[derive(Debug, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&mut self, _done: usize, _total: usize) {}
}

#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Worker side of a [`Task`].
#[derive(Debug)]
pub struct TaskContext {
    progress: watch::Sender<Progress>,
    cancel: CancelFlag,
}

impl ProgressSink for TaskContext {
    fn report(&mut self, done: usize, total: usize) {
        self.progress.send_replace(Progress { done, total });
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Caller side of a submitted operation: progress stream, cancellation and result.
#[derive(Debug)]
pub struct Task<T> {
    progress: watch::Receiver<Progress>,
    cancel: CancelFlag,
    result: oneshot::Receiver<T>,
}

impl<T> Task<T> {
    pub fn progress(&self) -> watch::Receiver<Progress> {
        self.progress.clone()
    }

    pub fn current_progress(&self) -> Progress {
        *self.progress.borrow()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    pub async fn join(self) -> Result<T, ServiceError> {
        self.result.await.map_err(|_| ServiceError::TaskDropped)
    }
}

pub(crate) fn channel<T>() -> (TaskContext, oneshot::Sender<T>, Task<T>) {
    let (progress_tx, progress_rx) = watch::channel(Progress::default());
    let (result_tx, result_rx) = oneshot::channel();
    let cancel = CancelFlag::default();

    (
        TaskContext {
            progress: progress_tx,
            cancel: cancel.clone(),
        },
        result_tx,
        Task {
            progress: progress_rx,
            cancel,
            result: result_rx,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn progress_and_result_reach_the_caller() {
        let (mut context, reply, task) = channel::<usize>();

        context.report(1, 4);
        assert_eq!(task.current_progress(), Progress { done: 1, total: 4 });

        context.report(4, 4);
        reply.send(7).expect("send result");

        let progress = task.progress();
        assert_eq!(*progress.borrow(), Progress { done: 4, total: 4 });
        assert_eq!(task.join().await.expect("join"), 7);
    }

    #[tokio::test]
    async fn cancellation_is_visible_to_the_worker() {
        let (context, _reply, task) = channel::<()>();
        assert!(!context.is_cancelled());

        task.cancel();
        assert!(context.is_cancelled());
    }

    #[tokio::test]
    async fn dropped_worker_side_is_reported() {
        let (context, reply, task) = channel::<()>();
        drop(context);
        drop(reply);

        assert!(matches!(task.join().await, Err(ServiceError::TaskDropped)));
    }
}
