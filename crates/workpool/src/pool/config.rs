use crate::{Error, Result};
use tokio::sync::Semaphore;

/// Sizing for a [`WorkerPool`].
///
/// Both queues share the same capacity. By default it is twice the worker
/// count, which lets every worker hold one task in flight while another is
/// buffered behind it.
///
/// [`WorkerPool`]: crate::WorkerPool
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PoolConfig {
    worker_count: usize,
    queue_capacity: usize,
}

impl PoolConfig {
    /// Creates a configuration for `worker_count` workers with the default
    /// queue capacity of `2 * worker_count`.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidWorkerCount`] if `worker_count` is zero.
    /// - [`Error::InvalidQueueCapacity`] if the default capacity overflows or
    ///   exceeds [`Semaphore::MAX_PERMITS`].
    pub fn new(worker_count: usize) -> Result<Self> {
        if worker_count == 0 {
            return Err(Error::InvalidWorkerCount(worker_count));
        }

        let queue_capacity =
            worker_count
                .checked_mul(2)
                .ok_or_else(|| Error::InvalidQueueCapacity {
                    reason: format!("overflow computing capacity for {worker_count} workers"),
                })?;

        Ok(Self {
            worker_count,
            queue_capacity: check_capacity(queue_capacity)?,
        })
    }

    /// Overrides the capacity of both the submission and result queues.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidQueueCapacity`] if `queue_capacity` is zero or
    /// exceeds [`Semaphore::MAX_PERMITS`].
    pub fn with_queue_capacity(self, queue_capacity: usize) -> Result<Self> {
        Ok(Self {
            queue_capacity: check_capacity(queue_capacity)?,
            ..self
        })
    }

    pub const fn worker_count(&self) -> usize {
        self.worker_count
    }

    pub const fn queue_capacity(&self) -> usize {
        self.queue_capacity
    }
}

/// Bounded Tokio channels are backed by a semaphore and cannot hold more than
/// `MAX_PERMITS` items.
fn check_capacity(queue_capacity: usize) -> Result<usize> {
    if queue_capacity == 0 {
        return Err(Error::InvalidQueueCapacity {
            reason: "capacity must be greater than 0".to_string(),
        });
    }

    if queue_capacity > Semaphore::MAX_PERMITS {
        return Err(Error::InvalidQueueCapacity {
            reason: format!(
                "capacity {queue_capacity} exceeds the maximum of {}",
                Semaphore::MAX_PERMITS
            ),
        });
    }

    Ok(queue_capacity)
}
