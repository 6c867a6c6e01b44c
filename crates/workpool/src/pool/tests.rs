use crate::{
    CancellationToken, DelayStrategy, Error, FixedDelay, PoolConfig, PoolState, Task, TaskId,
    UniformDelay, WorkerPool,
};
use core::time::Duration;
use futures::{StreamExt, future::join_all};
use std::collections::HashSet;
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};
use tokio::sync::Semaphore;

fn fast_pool(workers: usize) -> WorkerPool<u64, FixedDelay> {
    WorkerPool::with_delay(workers, FixedDelay(Duration::from_millis(1))).unwrap()
}

struct PanickingDelay;

impl DelayStrategy for PanickingDelay {
    fn next_delay(&self) -> Duration {
        panic!("delay source failed");
    }
}

struct CountingDelay {
    calls: AtomicUsize,
}

impl DelayStrategy for CountingDelay {
    fn next_delay(&self) -> Duration {
        self.calls.fetch_add(1, Ordering::Relaxed);
        Duration::ZERO
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn three_workers_process_three_tasks() {
    let pool = WorkerPool::with_delay(3, UniformDelay::new(Duration::from_millis(50))).unwrap();
    pool.start(CancellationToken::new()).unwrap();

    for id in 1..=3 {
        pool.submit(Task::new(id, format!("task{id}"))).await.unwrap();
    }
    pool.stop().await.unwrap();

    let results: Vec<_> = pool.results().collect().await;
    assert_eq!(results.len(), 3);

    let ids: HashSet<TaskId> = results.iter().map(|r| r.task_id).collect();
    assert_eq!(ids, HashSet::from([1, 2, 3]));

    for result in &results {
        assert!((1..=3).contains(&result.worker_id));
        assert_eq!(
            result.output,
            format!(
                "Task {} completed by worker {}",
                result.task_id, result.worker_id
            )
        );
    }
}

#[tokio::test]
async fn stop_without_tasks_yields_no_results() {
    let pool = fast_pool(1);
    pool.start(CancellationToken::new()).unwrap();
    pool.stop().await.unwrap();

    assert!(pool.results().collect::<Vec<_>>().await.is_empty());
    assert_eq!(pool.state(), PoolState::Stopped);
}

#[tokio::test]
async fn stop_before_start_closes_both_queues() {
    let pool = fast_pool(2);
    pool.stop().await.unwrap();

    assert_eq!(pool.state(), PoolState::Stopped);
    assert!(pool.next_result().await.is_none());
    assert_eq!(pool.submit(Task::new(1, 1)).await, Err(Error::PoolClosed));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn every_task_submitted_before_stop_produces_one_result() {
    const TOTAL: u64 = 100;

    let pool = fast_pool(4);
    pool.start(CancellationToken::new()).unwrap();

    // More tasks than the result queue holds, so drain while submitting.
    let drain = tokio::spawn(pool.results().map(|r| r.task_id).collect::<Vec<_>>());

    for id in 0..TOTAL {
        pool.submit(Task::new(id, id * 2)).await.unwrap();
    }
    pool.stop().await.unwrap();

    let ids = drain.await.unwrap();
    assert_eq!(ids.len(), TOTAL as usize);
    let unique: HashSet<_> = ids.into_iter().collect();
    assert_eq!(unique, (0..TOTAL).collect::<HashSet<_>>());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_submitters_lose_and_duplicate_nothing() {
    const SUBMITTERS: u64 = 20;

    let pool = Arc::new(fast_pool(5));
    pool.start(CancellationToken::new()).unwrap();

    let drain = tokio::spawn(pool.results().map(|r| r.task_id).collect::<Vec<_>>());

    let submitters = (0..SUBMITTERS).map(|id| {
        let pool = Arc::clone(&pool);
        tokio::spawn(async move { pool.submit(Task::new(id, id)).await })
    });
    for outcome in join_all(submitters).await {
        outcome.unwrap().unwrap();
    }
    pool.stop().await.unwrap();

    let ids = drain.await.unwrap();
    assert_eq!(ids.len(), SUBMITTERS as usize);
    let unique: HashSet<_> = ids.into_iter().collect();
    assert_eq!(unique, (0..SUBMITTERS).collect::<HashSet<_>>());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn competing_consumers_each_receive_distinct_results() {
    let pool = fast_pool(4);
    pool.start(CancellationToken::new()).unwrap();

    let first = tokio::spawn(pool.results().map(|r| r.task_id).collect::<Vec<_>>());
    let second = tokio::spawn(pool.results().map(|r| r.task_id).collect::<Vec<_>>());

    for id in 0..50 {
        pool.submit(Task::new(id, id)).await.unwrap();
    }
    pool.stop().await.unwrap();

    let mut all = first.await.unwrap();
    all.extend(second.await.unwrap());
    assert_eq!(all.len(), 50);
    let unique: HashSet<_> = all.into_iter().collect();
    assert_eq!(unique, (0..50).collect::<HashSet<_>>());
}

#[tokio::test]
async fn nothing_follows_the_end_of_results() {
    let pool = fast_pool(2);
    pool.start(CancellationToken::new()).unwrap();
    pool.submit(Task::new(1, 1)).await.unwrap();
    pool.stop().await.unwrap();

    assert_eq!(pool.results().count().await, 1);
    assert!(pool.next_result().await.is_none());
    assert!(pool.next_result().await.is_none());
    assert_eq!(pool.results().count().await, 0);
}

#[tokio::test(start_paused = true)]
async fn submit_blocks_once_queue_and_workers_are_saturated() {
    let pool = WorkerPool::with_delay(2, FixedDelay(Duration::from_secs(3600))).unwrap();
    let token = CancellationToken::new();
    pool.start(token.clone()).unwrap();

    // Queue capacity (4) plus one task in flight per worker (2).
    for id in 1..=6 {
        pool.submit(Task::new(id, ())).await.unwrap();
    }

    let blocked =
        tokio::time::timeout(Duration::from_millis(100), pool.submit(Task::new(7, ()))).await;
    assert!(blocked.is_err(), "submit should wait for room, not fail");

    assert_eq!(pool.try_submit(Task::new(8, ())), Err(Error::QueueFull));

    let timeout = Duration::from_millis(50);
    assert_eq!(
        pool.submit_timeout(Task::new(9, ()), timeout).await,
        Err(Error::SubmitTimeout(timeout))
    );

    // The two tasks in hand still complete; the four queued ones are dropped.
    token.cancel();
    pool.stop().await.unwrap();
    let ids: HashSet<_> = pool.results().map(|r| r.task_id).collect().await;
    assert_eq!(ids, HashSet::from([1, 2]));
}

#[tokio::test(start_paused = true)]
async fn cancellation_abandons_only_queued_tasks() {
    let pool = WorkerPool::with_delay(2, FixedDelay(Duration::from_millis(100))).unwrap();
    let token = CancellationToken::new();
    pool.start(token.clone()).unwrap();

    for id in 1..=6 {
        pool.submit(Task::new(id, ())).await.unwrap();
    }

    // Tasks 1 and 2 finish at 100ms; 3 and 4 are mid-flight at 150ms while
    // 5 and 6 are still queued.
    tokio::time::sleep(Duration::from_millis(150)).await;
    token.cancel();
    pool.stop().await.unwrap();

    let ids: HashSet<_> = pool.results().map(|r| r.task_id).collect().await;
    assert_eq!(ids, HashSet::from([1, 2, 3, 4]));
}

#[tokio::test(start_paused = true)]
async fn task_in_hand_completes_after_cancellation() {
    let pool = WorkerPool::with_delay(1, FixedDelay(Duration::from_millis(100))).unwrap();
    let token = CancellationToken::new();
    pool.start(token.clone()).unwrap();

    pool.submit(Task::new(1, ())).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    token.cancel();
    pool.stop().await.unwrap();

    let results: Vec<_> = pool.results().collect().await;
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].task_id, 1);
}

#[tokio::test(start_paused = true)]
async fn abandoned_stop_is_resumed_by_the_next_one() {
    let pool = WorkerPool::with_delay(1, FixedDelay(Duration::from_secs(10))).unwrap();
    pool.start(CancellationToken::new()).unwrap();
    pool.submit(Task::new(1, ())).await.unwrap();

    let first = tokio::time::timeout(Duration::from_millis(10), pool.stop()).await;
    assert!(first.is_err());
    assert_eq!(pool.state(), PoolState::Stopping);
    assert_eq!(pool.submit(Task::new(2, ())).await, Err(Error::PoolClosed));

    pool.stop().await.unwrap();
    assert_eq!(pool.state(), PoolState::Stopped);

    let ids: Vec<_> = tokio::time::timeout(
        Duration::from_secs(60),
        pool.results().map(|r| r.task_id).collect(),
    )
    .await
    .expect("result stream should end once stop completes");
    assert_eq!(ids, [1]);
}

#[tokio::test]
async fn panicking_worker_is_reported_and_results_still_close() {
    let pool = WorkerPool::with_delay(1, PanickingDelay).unwrap();
    pool.start(CancellationToken::new()).unwrap();
    pool.submit(Task::new(1, ())).await.unwrap();

    assert_eq!(
        pool.stop().await,
        Err(Error::WorkerPanicked { worker_id: 1 })
    );
    assert_eq!(pool.state(), PoolState::Stopped);
    assert_eq!(pool.results().count().await, 0);
}

#[tokio::test(start_paused = true)]
async fn cancellation_wakes_a_blocked_submitter() {
    let config = PoolConfig::new(1).unwrap().with_queue_capacity(1).unwrap();
    let pool = Arc::new(WorkerPool::with_config(
        config,
        FixedDelay(Duration::from_secs(3600)),
    ));
    let token = CancellationToken::new();
    pool.start(token.clone()).unwrap();

    // One task in flight, one queued.
    pool.submit(Task::new(1, ())).await.unwrap();
    pool.submit(Task::new(2, ())).await.unwrap();

    let blocked = tokio::spawn({
        let pool = Arc::clone(&pool);
        async move { pool.submit(Task::new(3, ())).await }
    });
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(!blocked.is_finished());

    token.cancel();
    assert_eq!(blocked.await.unwrap(), Err(Error::Cancelled));
    assert_eq!(pool.try_submit(Task::new(4, ())), Err(Error::Cancelled));

    pool.stop().await.unwrap();
}

#[tokio::test]
async fn lifecycle_misuse_is_reported() {
    let pool = fast_pool(1);
    assert_eq!(pool.state(), PoolState::Created);
    assert_eq!(pool.submit(Task::new(1, 1)).await, Err(Error::NotStarted));

    pool.start(CancellationToken::new()).unwrap();
    assert_eq!(pool.state(), PoolState::Started);
    assert_eq!(
        pool.start(CancellationToken::new()),
        Err(Error::AlreadyStarted)
    );

    pool.stop().await.unwrap();
    assert_eq!(pool.state(), PoolState::Stopped);
    assert_eq!(pool.submit(Task::new(2, 2)).await, Err(Error::PoolClosed));
    assert_eq!(pool.try_submit(Task::new(3, 3)), Err(Error::PoolClosed));
    assert_eq!(pool.start(CancellationToken::new()), Err(Error::PoolClosed));

    // A second stop is a no-op.
    pool.stop().await.unwrap();
    assert_eq!(pool.state(), PoolState::Stopped);
}

#[test]
fn zero_workers_are_rejected() {
    assert!(matches!(
        WorkerPool::<()>::new(0),
        Err(Error::InvalidWorkerCount(0))
    ));
}

#[test]
fn start_requires_a_runtime() {
    let pool = WorkerPool::<()>::new(1).unwrap();
    assert_eq!(pool.start(CancellationToken::new()), Err(Error::NoRuntime));
    assert_eq!(pool.state(), PoolState::Created);
}

#[test]
fn oversized_pool_is_rejected() {
    assert!(matches!(
        WorkerPool::<()>::new(Semaphore::MAX_PERMITS),
        Err(Error::InvalidQueueCapacity { .. })
    ));
}

#[tokio::test]
async fn default_pool_sizes_queues_from_worker_count() {
    let pool = WorkerPool::<()>::new(4).unwrap();
    assert_eq!(pool.worker_count(), 4);
    assert_eq!(pool.queue_capacity(), 8);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn delay_strategy_is_consulted_once_per_task() {
    let delay = Arc::new(CountingDelay {
        calls: AtomicUsize::new(0),
    });
    let pool = WorkerPool::with_delay(2, Arc::clone(&delay)).unwrap();
    pool.start(CancellationToken::new()).unwrap();

    for id in 0..4 {
        pool.submit(Task::new(id, ())).await.unwrap();
    }
    pool.stop().await.unwrap();

    assert_eq!(pool.results().count().await, 4);
    assert_eq!(delay.calls.load(Ordering::Relaxed), 4);
}

#[tokio::test]
async fn dropping_a_pool_leaves_the_callers_token_alone() {
    let token = CancellationToken::new();
    {
        let pool = fast_pool(2);
        pool.start(token.clone()).unwrap();
    }
    assert!(!token.is_cancelled());
}
