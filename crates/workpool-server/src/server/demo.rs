//! End-to-end demonstration of the worker pool lifecycle.
//!
//! [`run_demo`] builds a pool from [`DemoConfig`], starts it, drains results
//! concurrently, submits every task, and stops the pool. A deadline watcher
//! cancels the pool if the run takes longer than `stop_after`, in which case
//! the stop completes with whatever had been produced.

use crate::server::{
    config::DemoConfig,
    telemetry::{
        increment_results_received, increment_submit_errors, increment_tasks_submitted,
        record_result_elapsed,
    },
};
use futures::StreamExt;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use workpool::{DelayStrategy, Task, UniformDelay, WorkerPool};

/// Counts reported at the end of a demo run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DemoSummary {
    pub submitted: u64,
    pub rejected: u64,
    pub received: u64,
    pub deadline_hit: bool,
}

/// Runs the demo with tasks taking a random time of up to
/// `config.max_delay`.
pub async fn run_demo(
    config: &DemoConfig,
    shutdown_token: CancellationToken,
) -> anyhow::Result<DemoSummary> {
    run_demo_with_delay(config, UniformDelay::new(config.max_delay), shutdown_token).await
}

/// Runs the demo with an explicit delay strategy.
///
/// Cancelling `shutdown_token` (e.g. on Ctrl+C) cancels the pool: pending
/// submissions are rejected and queued tasks abandoned.
pub async fn run_demo_with_delay<D: DelayStrategy>(
    config: &DemoConfig,
    delay: D,
    shutdown_token: CancellationToken,
) -> anyhow::Result<DemoSummary> {
    let started = Instant::now();
    let pool: WorkerPool<u64, D> = WorkerPool::with_config(config.pool, delay);
    let pool_token = shutdown_token.child_token();
    pool.start(pool_token.clone())?;

    let deadline = tokio::spawn({
        let token = pool_token.clone();
        let stop_after = config.stop_after;
        async move {
            tokio::select! {
                () = token.cancelled() => false,
                () = tokio::time::sleep(stop_after) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!("Deadline of {stop_after:?} reached, cancelling the pool");
                    token.cancel();
                    true
                }
            }
        }
    });

    // Results are drained while submitting: more tasks than the result queue
    // holds would otherwise stall the workers.
    let drain = tokio::spawn(pool.results().fold(0_u64, move |received, result| async move {
        increment_results_received();
        record_result_elapsed(started.elapsed().as_secs_f64() * 1_000.0);

        #[cfg(feature = "tracing")]
        tracing::info!("Result: {}", result.output);
        #[cfg(not(feature = "tracing"))]
        let _ = result;

        received + 1
    }));

    let mut summary = DemoSummary::default();
    for id in 1..=config.num_tasks {
        match pool.submit(Task::new(id, id)).await {
            Ok(()) => {
                increment_tasks_submitted();
                summary.submitted += 1;
            }
            Err(_e) => {
                // Every submission after a rejection would be rejected too.
                #[cfg(feature = "tracing")]
                tracing::warn!("Task {id} not submitted: {_e}");
                increment_submit_errors();
                summary.rejected = config.num_tasks - id + 1;
                break;
            }
        }
    }

    if let Err(e) = pool.stop().await {
        // Release the drain and deadline tasks before bailing out.
        pool_token.cancel();
        return Err(e.into());
    }
    summary.received = drain.await?;

    // Release the deadline watcher if it has not fired.
    pool_token.cancel();
    summary.deadline_hit = deadline.await?;

    #[cfg(feature = "tracing")]
    tracing::info!(
        "Demo finished in {:?}: {} submitted, {} rejected, {} results",
        started.elapsed(),
        summary.submitted,
        summary.rejected,
        summary.received
    );

    Ok(summary)
}
