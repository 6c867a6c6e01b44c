/// Identifier assigned to a [`Task`] by the submitting caller.
pub type TaskId = u64;

/// A unit of work submitted to a [`WorkerPool`].
///
/// The payload `T` is opaque to the pool: it is carried to exactly one worker
/// and never inspected.
///
/// [`WorkerPool`]: crate::WorkerPool
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Task<T> {
    pub id: TaskId,
    pub data: T,
}

impl<T> Task<T> {
    pub const fn new(id: TaskId, data: T) -> Self {
        Self { id, data }
    }
}

impl Task<()> {
    /// Creates a task with no payload.
    pub const fn empty(id: TaskId) -> Self {
        Self { id, data: () }
    }
}

/// The outcome of processing a single [`Task`].
///
/// `task_id` refers back to the task that produced this result; the result
/// does not own the task.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TaskResult {
    pub task_id: TaskId,
    pub worker_id: usize,
    pub output: String,
}

impl TaskResult {
    /// Builds the result a worker publishes once it has processed `task_id`.
    pub fn completed(task_id: TaskId, worker_id: usize) -> Self {
        Self {
            task_id,
            worker_id,
            output: format!("Task {task_id} completed by worker {worker_id}"),
        }
    }
}
