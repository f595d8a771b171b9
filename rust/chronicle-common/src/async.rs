//! Background-work aggregation for the Notification Router and its
//! observers (spec §5, §9).
//!
//! Saving a fact fans out into a batch of independent jobs — one incremental
//! re-evaluation per matching `Inverse`, one eager evaluation per
//! newly-registered child collection — each spawned the moment it's ready
//! rather than awaited in place, so a synchronous router dispatch can kick
//! off async work without blocking on it. [`TaskQueue`] is what lets
//! `Observer::loaded`/`processed` wait for that whole batch to drain without
//! tracking the jobs individually.

use std::future::Future;

use thiserror::Error;
use tokio::task::JoinSet;

use crate::ConditionalSend;

/// Errors that can occur while draining a [`TaskQueue`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// A queued job failed to rejoin (it panicked or was cancelled).
    #[error("unable to rejoin pending task")]
    JoinError,
}

/// Aggregates the fire-and-forget jobs one save notification fans out into,
/// so a caller can await the moment all of them have drained without
/// observing any individual job's result — what backs `Observer::loaded`
/// and `Observer::processed`.
#[derive(Default)]
pub struct TaskQueue {
    jobs: JoinSet<Result<(), TaskError>>,
}

impl TaskQueue {
    /// Queues `job` to run immediately, draining the next time
    /// [`drain`](Self::drain) is called.
    pub fn spawn<F>(&mut self, job: F)
    where
        F: Future<Output = Result<(), TaskError>> + ConditionalSend + 'static,
    {
        self.jobs.spawn(job);
    }

    /// Waits for every queued job to finish, returning the first error
    /// encountered (if any). The queue is empty again once this resolves,
    /// even if a job queued by one of the jobs being drained raced in
    /// behind it — that one waits for the next `drain` call.
    pub async fn drain(&mut self) -> Result<(), TaskError> {
        while let Some(result) = self.jobs.join_next().await {
            result.map_err(|_| TaskError::JoinError)??;
        }
        Ok(())
    }

    /// Jobs still queued or in flight.
    pub fn pending(&self) -> usize {
        self.jobs.len()
    }
}

impl std::fmt::Debug for TaskQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskQueue").field("pending", &self.jobs.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn draining_an_empty_queue_resolves_immediately() {
        let mut queue = TaskQueue::default();
        assert_eq!(queue.pending(), 0);
        queue.drain().await.unwrap();
    }

    #[tokio::test]
    async fn a_batch_of_incremental_deltas_all_run_before_drain_resolves() {
        let delivered = Arc::new(AtomicUsize::new(0));
        let mut queue = TaskQueue::default();
        for _ in 0..10 {
            let delivered = delivered.clone();
            queue.spawn(async move {
                delivered.fetch_add(1, Ordering::SeqCst);
                Ok(())
            });
        }
        assert_eq!(queue.pending(), 10);

        queue.drain().await.unwrap();

        assert_eq!(delivered.load(Ordering::SeqCst), 10);
        assert_eq!(queue.pending(), 0);
    }

    #[tokio::test]
    async fn a_job_queued_during_drain_waits_for_the_next_drain() {
        let mut queue = TaskQueue::default();
        queue.spawn(async { Ok(()) });
        queue.drain().await.unwrap();

        // Nothing queued this round, but a caller mid-evaluation could still
        // spawn into the same queue; drain must tolerate that without
        // reporting stale pending work.
        assert_eq!(queue.pending(), 0);
        queue.spawn(async { Ok(()) });
        assert_eq!(queue.pending(), 1);
        queue.drain().await.unwrap();
    }

    #[tokio::test]
    async fn one_failed_delta_fails_the_whole_drain() {
        let mut queue = TaskQueue::default();
        queue.spawn(async { Err(TaskError::JoinError) });
        assert!(queue.drain().await.is_err());
    }
}
