/// Lifecycle of a [`WorkerPool`].
///
/// Transitions only move forward: `Created -> Started -> Stopping -> Stopped`.
/// A pool stopped before it was started goes straight from `Created` to
/// `Stopped`.
///
/// [`WorkerPool`]: crate::WorkerPool
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PoolState {
    /// Queues are allocated; no workers are running.
    Created,
    /// Workers are running and the submission queue accepts tasks.
    Started,
    /// The submission queue is closed; workers are draining it.
    Stopping,
    /// Every worker has exited and the result queue is closed.
    Stopped,
}

impl PoolState {
    /// Whether results may still be produced in this state.
    pub const fn is_running(self) -> bool {
        matches!(self, Self::Started | Self::Stopping)
    }
}
