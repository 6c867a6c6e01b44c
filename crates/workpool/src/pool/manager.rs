//! Asynchronous worker pool with bounded queues and ordered shutdown.
//!
//! This module defines the [`WorkerPool`] struct, which owns a bounded
//! submission queue, a bounded result queue, and the set of worker tasks
//! sitting between them. Workers compete for submitted tasks (the first idle
//! worker wins), and every task enqueued before [`WorkerPool::stop`] produces
//! exactly one result unless cancellation preempts it.
//!
//! Shutdown is strictly ordered:
//!
//! 1. close the submission queue,
//! 2. wait for every worker to drain it and exit,
//! 3. close the result queue.
//!
//! Each worker owns its own sender on the result queue and the pool drops its
//! own only after step 2, so a result can never be sent into a closed queue.

use crate::{
    DelayStrategy, Error, PoolConfig, PoolState, Result, Task, TaskResult, UniformDelay,
    pool::worker::{SharedReceiver, recv_shared, worker_loop},
};
use core::{pin::Pin, time::Duration};
use futures::{Stream, stream};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::{
    sync::{
        Mutex as AsyncMutex,
        mpsc::{self, error::TrySendError},
    },
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;

/// The shared, lazily produced sequence of results returned by
/// [`WorkerPool::results`].
pub type ResultStream = Pin<Box<dyn Stream<Item = TaskResult> + Send>>;

/// A fixed-size pool of asynchronous workers processing [`Task`]s.
///
/// Tasks are submitted through a bounded queue (submitters are suspended when
/// it is full) and results are published to a second bounded queue (workers
/// are suspended when the consumer falls behind). The pool supports both
/// cooperative cancellation, via the [`CancellationToken`] given to
/// [`start`](Self::start), and graceful shutdown via [`stop`](Self::stop).
///
/// The payload type `T` is opaque to the pool. The delay strategy `D` decides
/// how long each task takes to "process".
pub struct WorkerPool<T, D = UniformDelay> {
    config: PoolConfig,
    delay: Arc<D>,
    lifecycle: Mutex<Lifecycle<T>>,
    // Held across the join in `stop`, so concurrent or resumed stops queue up
    // behind it.
    workers: AsyncMutex<Workers>,
    results: SharedReceiver<TaskResult>,
}

/// Control-plane bookkeeping. Never locked across an `.await`.
struct Lifecycle<T> {
    state: PoolState,
    task_tx: Option<mpsc::Sender<Task<T>>>,
    // Handed to the workers on start.
    task_rx: Option<mpsc::Receiver<Task<T>>>,
    // Held until every worker has exited.
    result_tx: Option<mpsc::Sender<TaskResult>>,
    shutdown_token: Option<CancellationToken>,
}

/// Worker handles not yet joined. A handle is removed only once its worker
/// has been observed to exit.
struct Workers {
    handles: Vec<(usize, JoinHandle<()>)>,
    failed: Option<usize>,
}

impl<T> WorkerPool<T, UniformDelay>
where
    T: Send + 'static,
{
    /// Creates a pool of `worker_count` workers whose tasks each take a
    /// random time of up to one second.
    ///
    /// No workers run until [`start`](Self::start) is called.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidWorkerCount`] if `worker_count` is zero.
    pub fn new(worker_count: usize) -> Result<Self> {
        Self::with_delay(worker_count, UniformDelay::default())
    }
}

impl<T, D> WorkerPool<T, D>
where
    T: Send + 'static,
    D: DelayStrategy,
{
    /// Creates a pool of `worker_count` workers using the given delay
    /// strategy.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidWorkerCount`] if `worker_count` is zero.
    pub fn with_delay(worker_count: usize, delay: D) -> Result<Self> {
        Ok(Self::with_config(PoolConfig::new(worker_count)?, delay))
    }

    /// Creates a pool from an already validated [`PoolConfig`].
    pub fn with_config(config: PoolConfig, delay: D) -> Self {
        let (task_tx, task_rx) = mpsc::channel(config.queue_capacity());
        let (result_tx, result_rx) = mpsc::channel(config.queue_capacity());

        Self {
            config,
            delay: Arc::new(delay),
            lifecycle: Mutex::new(Lifecycle {
                state: PoolState::Created,
                task_tx: Some(task_tx),
                task_rx: Some(task_rx),
                result_tx: Some(result_tx),
                shutdown_token: None,
            }),
            workers: AsyncMutex::new(Workers {
                handles: Vec::with_capacity(config.worker_count()),
                failed: None,
            }),
            results: Arc::new(AsyncMutex::new(result_rx)),
        }
    }

    /// Spawns the worker tasks.
    ///
    /// Each worker is bound to a child of `shutdown_token`: cancelling the
    /// token (or any of its parents) makes every worker exit at its next
    /// suspension point. Returns immediately.
    ///
    /// # Errors
    ///
    /// - [`Error::NoRuntime`] if called outside a Tokio runtime.
    /// - [`Error::AlreadyStarted`] if the pool is running or stopping.
    /// - [`Error::PoolClosed`] if the pool has been stopped.
    pub fn start(&self, shutdown_token: CancellationToken) -> Result<()> {
        if tokio::runtime::Handle::try_current().is_err() {
            return Err(Error::NoRuntime);
        }

        let mut lifecycle = self.lifecycle.lock();
        match lifecycle.state {
            PoolState::Created => {}
            PoolState::Started | PoolState::Stopping => return Err(Error::AlreadyStarted),
            PoolState::Stopped => return Err(Error::PoolClosed),
        }

        // Only `stop` locks the worker set, and never before the pool is started.
        let mut workers = self.workers.try_lock().map_err(|_| Error::AlreadyStarted)?;
        let task_rx = lifecycle.task_rx.take().ok_or(Error::PoolClosed)?;
        let result_tx = lifecycle.result_tx.clone().ok_or(Error::PoolClosed)?;
        let token = shutdown_token.child_token();
        let tasks: SharedReceiver<Task<T>> = Arc::new(AsyncMutex::new(task_rx));

        for worker_id in 1..=self.config.worker_count() {
            let handle = tokio::spawn(worker_loop(
                worker_id,
                Arc::clone(&tasks),
                result_tx.clone(),
                Arc::clone(&self.delay),
                token.clone(),
            ));
            workers.handles.push((worker_id, handle));
        }

        lifecycle.state = PoolState::Started;
        lifecycle.shutdown_token = Some(token);

        #[cfg(feature = "tracing")]
        tracing::info!(
            "Started {} workers (queue capacity {})",
            self.config.worker_count(),
            self.config.queue_capacity()
        );

        Ok(())
    }

    /// Enqueues a task, waiting for room if the submission queue is full.
    ///
    /// Safe to call concurrently from any number of tasks.
    ///
    /// # Errors
    ///
    /// - [`Error::NotStarted`] if the pool has not been started.
    /// - [`Error::PoolClosed`] if [`stop`](Self::stop) has closed the
    ///   submission queue.
    /// - [`Error::Cancelled`] if the pool is cancelled before the task is
    ///   enqueued. A caller suspended on a full queue is woken up by
    ///   cancellation rather than left waiting on workers that have exited.
    pub async fn submit(&self, task: Task<T>) -> Result<()> {
        let (sender, token) = self.submission_handle()?;

        tokio::select! {
            biased;
            () = token.cancelled() => Err(Error::Cancelled),
            sent = sender.send(task) => sent.map_err(|_| Error::PoolClosed),
        }
    }

    /// Enqueues a task only if the submission queue has room right now.
    ///
    /// # Errors
    ///
    /// Same as [`submit`](Self::submit), plus [`Error::QueueFull`] when the
    /// queue is at capacity.
    pub fn try_submit(&self, task: Task<T>) -> Result<()> {
        let (sender, token) = self.submission_handle()?;
        if token.is_cancelled() {
            return Err(Error::Cancelled);
        }

        sender.try_send(task).map_err(|e| match e {
            TrySendError::Full(_) => Error::QueueFull,
            TrySendError::Closed(_) => Error::PoolClosed,
        })
    }

    /// Enqueues a task, waiting at most `timeout` for room in the queue.
    ///
    /// # Errors
    ///
    /// Same as [`submit`](Self::submit), plus [`Error::SubmitTimeout`] when
    /// the queue stays full for the whole `timeout`.
    pub async fn submit_timeout(&self, task: Task<T>, timeout: Duration) -> Result<()> {
        tokio::time::timeout(timeout, self.submit(task))
            .await
            .unwrap_or(Err(Error::SubmitTimeout(timeout)))
    }

    /// Returns the result queue as a lazily produced stream.
    ///
    /// The stream ends once [`stop`](Self::stop) has joined every worker and
    /// closed the queue. All streams returned by this method (and
    /// [`next_result`](Self::next_result)) share one queue: each result is
    /// delivered to exactly one consumer.
    pub fn results(&self) -> ResultStream {
        Box::pin(stream::unfold(
            Arc::clone(&self.results),
            |rx| async move {
                let next = recv_shared(&rx).await;
                next.map(|result| (result, rx))
            },
        ))
    }

    /// Waits for the next result, or `None` once the result queue is closed
    /// and drained.
    pub async fn next_result(&self) -> Option<TaskResult> {
        recv_shared(&self.results).await
    }

    /// Gracefully shuts the pool down.
    ///
    /// - Closes the submission queue so that no further task is accepted.
    /// - Waits for every worker to drain the queue (or observe cancellation)
    ///   and exit.
    /// - Closes the result queue, ending every [`ResultStream`] once buffered
    ///   results are consumed.
    ///
    /// Workers that still have results to publish wait for room in the result
    /// queue, so a caller that stops with more than
    /// [`queue_capacity`](Self::queue_capacity) results outstanding must drain
    /// concurrently (or cancel) for this to complete.
    ///
    /// If a previous `stop` was abandoned mid-way (e.g. dropped by a
    /// timeout), calling `stop` again resumes waiting for the workers and
    /// closes the result queue. Once the pool is stopped, `stop` is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WorkerPanicked`] if a worker terminated abnormally.
    /// The result queue is closed regardless.
    pub async fn stop(&self) -> Result<()> {
        // === Phase 1: Close the submission queue ===
        {
            let mut lifecycle = self.lifecycle.lock();
            match lifecycle.state {
                PoolState::Stopped => return Ok(()),
                PoolState::Created => {
                    lifecycle.task_tx = None;
                    lifecycle.task_rx = None;
                    lifecycle.result_tx = None;
                    lifecycle.state = PoolState::Stopped;
                    return Ok(());
                }
                PoolState::Started => {
                    #[cfg(feature = "tracing")]
                    tracing::info!("Closing submission queue");
                    lifecycle.state = PoolState::Stopping;
                    lifecycle.task_tx = None;
                }
                PoolState::Stopping => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!("Resuming shutdown");
                }
            }
        }

        // === Phase 2: Wait for every worker to exit ===
        let failed = {
            let mut workers = self.workers.lock().await;

            #[cfg(feature = "tracing")]
            tracing::debug!("Waiting for {} workers to exit", workers.handles.len());

            // Handles stay in the set while awaited so that a dropped `stop`
            // leaves them for the next one.
            while let Some((worker_id, handle)) = workers.handles.last_mut() {
                let worker_id = *worker_id;
                let outcome = handle.await;
                workers.handles.pop();

                if let Err(_e) = outcome {
                    #[cfg(feature = "tracing")]
                    tracing::error!("Worker {worker_id} terminated abnormally: {_e}");
                    workers.failed.get_or_insert(worker_id);
                }
            }

            workers.failed
        };

        // === Phase 3: Close the result queue ===
        {
            let mut lifecycle = self.lifecycle.lock();
            lifecycle.result_tx = None;
            lifecycle.state = PoolState::Stopped;
        }

        #[cfg(feature = "tracing")]
        tracing::info!("Worker pool stopped");

        match failed {
            Some(worker_id) => Err(Error::WorkerPanicked { worker_id }),
            None => Ok(()),
        }
    }

    pub fn state(&self) -> PoolState {
        self.lifecycle.lock().state
    }

    pub const fn worker_count(&self) -> usize {
        self.config.worker_count()
    }

    pub const fn queue_capacity(&self) -> usize {
        self.config.queue_capacity()
    }

    pub const fn config(&self) -> &PoolConfig {
        &self.config
    }

    fn submission_handle(&self) -> Result<(mpsc::Sender<Task<T>>, CancellationToken)> {
        let lifecycle = self.lifecycle.lock();
        match (lifecycle.state, &lifecycle.task_tx, &lifecycle.shutdown_token) {
            (PoolState::Created, _, _) => Err(Error::NotStarted),
            (PoolState::Started, Some(sender), Some(token)) => Ok((sender.clone(), token.clone())),
            _ => Err(Error::PoolClosed),
        }
    }
}

impl<T, D> Drop for WorkerPool<T, D> {
    fn drop(&mut self) {
        // Workers must not outlive the pool that owns their queues.
        if let Some(token) = self.lifecycle.get_mut().shutdown_token.take() {
            token.cancel();
        }
    }
}
