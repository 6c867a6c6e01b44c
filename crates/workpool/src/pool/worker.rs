use crate::{DelayStrategy, Task, TaskResult};
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;

/// The receiving half of a queue shared by several consumers.
///
/// Tokio's [`mpsc::Receiver`] has a single owner, so competing consumers take
/// turns through an async mutex. The lock is held for exactly one `recv`.
pub(crate) type SharedReceiver<T> = Arc<Mutex<mpsc::Receiver<T>>>;

/// Receives the next item from a shared queue, or `None` once the queue is
/// closed and empty.
pub(crate) async fn recv_shared<T>(rx: &SharedReceiver<T>) -> Option<T> {
    rx.lock().await.recv().await
}

/// Worker task that pulls [`Task`]s off the shared submission queue and
/// publishes a [`TaskResult`] for each.
///
/// This function is designed to be spawned as a Tokio task. It runs until one
/// of:
///
/// - the submission queue is closed and drained (normal termination),
/// - `shutdown_token` is cancelled (tasks still queued are abandoned; the
///   task in hand finishes first),
/// - the result queue's receiver is gone.
///
/// # Arguments
///
/// - `worker_id`: 1-based identifier, stamped into every result.
/// - `tasks`: Submission queue shared with the other workers.
/// - `results`: This worker's handle on the result queue. The queue closes
///   once every worker and the pool have dropped theirs.
/// - `delay`: Source of the simulated per-task latency.
/// - `shutdown_token`: Cancellation shared by the whole pool.
pub(crate) async fn worker_loop<T, D>(
    worker_id: usize,
    tasks: SharedReceiver<Task<T>>,
    results: mpsc::Sender<TaskResult>,
    delay: Arc<D>,
    shutdown_token: CancellationToken,
) where
    T: Send + 'static,
    D: DelayStrategy,
{
    #[cfg(feature = "tracing")]
    tracing::trace!("Worker {worker_id} started");

    loop {
        // Cancellation wins when both are ready so nothing is dequeued after
        // the signal.
        let next = tokio::select! {
            biased;
            () = shutdown_token.cancelled() => {
                #[cfg(feature = "tracing")]
                tracing::debug!("Worker {worker_id} observed cancellation");
                break;
            }
            next = recv_shared(&tasks) => next,
        };

        let Some(task) = next else {
            #[cfg(feature = "tracing")]
            tracing::debug!("Worker {worker_id} found submission queue closed");
            break;
        };

        #[cfg(feature = "tracing")]
        tracing::debug!("Worker {worker_id} processing task {}", task.id);

        // A dequeued task always runs to completion.
        tokio::time::sleep(delay.next_delay()).await;

        let result = TaskResult::completed(task.id, worker_id);

        // A send with room available goes through even if cancellation has
        // fired meanwhile; a send stuck on a full queue does not.
        tokio::select! {
            biased;
            sent = results.send(result) => {
                if let Err(_e) = sent {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(
                        "Worker {worker_id} dropped result for task {}: result receiver is gone",
                        _e.0.task_id
                    );
                    break;
                }
            }
            () = shutdown_token.cancelled() => {
                #[cfg(feature = "tracing")]
                tracing::debug!("Worker {worker_id} abandoned result for task {} on cancellation", task.id);
                break;
            }
        }
    }

    #[cfg(feature = "tracing")]
    tracing::trace!("Worker {worker_id} stopped");
}
