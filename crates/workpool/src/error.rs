//! Error types for the worker pool.
//!
//! This module defines the central `Error` enum, which captures every
//! recoverable failure a caller of [`WorkerPool`] can observe. Queue
//! backpressure is not an error: a full submission queue simply suspends the
//! caller of [`WorkerPool::submit`].
//!
//! ## Error Cases
//! - `InvalidWorkerCount` / `InvalidQueueCapacity`: construction was given
//!   sizes the pool cannot honor.
//! - `NoRuntime`: `start` was called outside a Tokio runtime.
//! - `NotStarted` / `AlreadyStarted`: lifecycle misuse.
//! - `PoolClosed`: the submission queue has been closed by `stop`.
//! - `Cancelled`: the pool's cancellation token fired before a task could be
//!   enqueued.
//! - `QueueFull` / `SubmitTimeout`: outcomes of the bounded submit variants.
//! - `WorkerPanicked`: a worker task terminated abnormally.
//!
//! [`WorkerPool`]: crate::WorkerPool
//! [`WorkerPool::submit`]: crate::WorkerPool::submit

use core::time::Duration;

pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for the worker pool.
#[derive(Clone, thiserror::Error, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// The pool was asked to run with zero workers.
    #[error("Invalid worker count: {0} (must be greater than 0)")]
    InvalidWorkerCount(usize),

    /// The queue capacity was zero or could not be derived from the worker
    /// count.
    #[error("Invalid queue capacity: {reason}")]
    InvalidQueueCapacity { reason: String },

    /// Workers can only be spawned from within a Tokio runtime.
    #[error("Worker pool requires an active Tokio runtime")]
    NoRuntime,

    /// `submit` was called before `start`.
    #[error("Worker pool has not been started")]
    NotStarted,

    /// `start` was called on a pool that is already running.
    #[error("Worker pool has already been started")]
    AlreadyStarted,

    /// The submission queue has been closed.
    #[error("Worker pool is closed")]
    PoolClosed,

    /// The pool was cancelled before the task could be enqueued.
    #[error("Worker pool was cancelled")]
    Cancelled,

    /// The submission queue is at capacity.
    #[error("Submission queue is full")]
    QueueFull,

    /// The submission queue stayed at capacity for the whole timeout.
    #[error("Submit timed out after {0:?}")]
    SubmitTimeout(Duration),

    /// A worker task panicked or was aborted.
    #[error("Worker {worker_id} terminated abnormally")]
    WorkerPanicked { worker_id: usize },
}
