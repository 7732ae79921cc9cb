//! Bounded-parallelism fan-out over collection tasks.
//!
//! The pipeline runs three nested layers (teams, then repositories /
//! persons / filters within a team), each with its own worker bound and
//! independent cancellation. A layer never aborts because one child failed:
//! failures are captured per task and reported alongside the successful
//! results.
//!
//! # Execution model
//!
//! Tasks are spawned up front and gated by a FIFO semaphore, so with a
//! limit of 1 the layer degrades to strict sequential execution with
//! identical semantics — that is the troubleshooting switch
//! (`parallel_collection.enabled = false`).
//!
//! Results are collected in completion order. No ordering is guaranteed
//! across workers within a layer; only pagination inside a single upstream
//! query preserves upstream order.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{CollectError, CollectResult};

/// A captured per-task failure. The parent layer keeps going.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TaskFailure {
    /// Task name, e.g. `repo:acme/api` or `person:alice`.
    pub task: String,
    /// Human-readable reason.
    pub message: String,
    /// Whether retries were already exhausted on a transient condition.
    pub transient: bool,
}

impl TaskFailure {
    fn from_error(task: String, err: &CollectError) -> Self {
        Self {
            task,
            message: err.to_string(),
            transient: err.is_transient(),
        }
    }
}

/// What a layer produced: every successful result plus every failure.
#[derive(Debug)]
pub struct LayerOutcome<T> {
    /// Successful task outputs, in completion order.
    pub results: Vec<T>,
    /// Failures, one per failed task.
    pub errors: Vec<TaskFailure>,
}

impl<T> LayerOutcome<T> {
    /// An outcome with nothing in it, for layers with no tasks.
    pub const fn empty() -> Self {
        Self {
            results: Vec::new(),
            errors: Vec::new(),
        }
    }
}

/// Run a set of named tasks with at most `limit` in flight.
///
/// Cancellation is observed at two points: before a task starts (a pending
/// task that sees a cancelled token never runs its future) and while it
/// runs (the future is dropped, abandoning any in-flight request). Either
/// way the task is recorded as a failure, not silently skipped.
pub async fn run_layer<T, Fut>(
    layer: &str,
    limit: usize,
    cancel: &CancellationToken,
    tasks: Vec<(String, Fut)>,
) -> LayerOutcome<T>
where
    T: Send + 'static,
    Fut: Future<Output = CollectResult<T>> + Send + 'static,
{
    if tasks.is_empty() {
        return LayerOutcome::empty();
    }

    debug!(layer, tasks = tasks.len(), limit, "starting fan-out layer");
    let semaphore = Arc::new(Semaphore::new(limit.max(1)));
    let mut set = JoinSet::new();

    for (name, fut) in tasks {
        let semaphore = Arc::clone(&semaphore);
        let cancel = cancel.clone();
        set.spawn(async move {
            let Ok(_permit) = semaphore.acquire_owned().await else {
                return (name, Err(CollectError::Cancelled));
            };
            if cancel.is_cancelled() {
                return (name, Err(CollectError::Cancelled));
            }
            let result = tokio::select! {
                () = cancel.cancelled() => Err(CollectError::Cancelled),
                res = fut => res,
            };
            (name, result)
        });
    }

    let mut outcome = LayerOutcome::empty();
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((_, Ok(value))) => outcome.results.push(value),
            Ok((name, Err(err))) => {
                warn!(layer, task = %name, error = %err, "task failed");
                outcome.errors.push(TaskFailure::from_error(name, &err));
            }
            Err(join_err) => {
                // A panicked worker is a bug, but the layer still reports
                // it instead of tearing down the run.
                warn!(layer, error = %join_err, "task panicked");
                outcome.errors.push(TaskFailure {
                    task: format!("{layer}:join"),
                    message: join_err.to_string(),
                    transient: false,
                });
            }
        }
    }

    debug!(
        layer,
        ok = outcome.results.len(),
        failed = outcome.errors.len(),
        "layer finished"
    );
    outcome
}

/// Sleep for a retry backoff, waking early on cancellation.
///
/// Returns `Err(Cancelled)` when the token fires first, so retry loops can
/// use `?` and unwind cleanly through every suspension point.
pub async fn backoff_sleep(
    cancel: &CancellationToken,
    delay: std::time::Duration,
) -> CollectResult<()> {
    tokio::select! {
        () = cancel.cancelled() => Err(CollectError::Cancelled),
        () = tokio::time::sleep(delay) => Ok(()),
    }
}
