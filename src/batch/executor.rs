//! Bounded-concurrency batch executor.

use super::collector::{collect, TaskOutcome};
use super::config::BatchConfig;
use super::task::{linear_tasks, mirror_pairs, pairwise_tasks, Task};
use crate::{Error, ErrorContext, Result};
use futures::FutureExt;
use std::any::Any;
use std::fmt::Debug;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};
use uuid::Uuid;

type SharedQueue<I> = Arc<Mutex<mpsc::Receiver<Task<I>>>>;

/// Runs a work function over a batch of tasks with at most `concurrency`
/// invocations active at once.
///
/// Outputs come back in task-index order. The first failure (by completion time)
/// ends the batch: the caller gets it immediately as [`Error::Task`], the batch
/// token is cancelled and workers stop pulling new tasks. Invocations already
/// running finish in the background; their results are discarded.
#[derive(Debug, Clone, Default)]
pub struct BatchExecutor {
    config: BatchConfig,
}

impl BatchExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: BatchConfig) -> Self {
        Self { config }
    }

    /// Executor with the default buffer sizing and `n` workers.
    pub fn with_concurrency(n: usize) -> Self {
        Self::with_config(BatchConfig::new().with_concurrency(n))
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Run `f` once per task.
    pub async fn run<I, O, F, Fut>(&self, tasks: Vec<Task<I>>, f: F) -> Result<Vec<O>>
    where
        I: Debug + Send + 'static,
        O: Send + 'static,
        F: Fn(I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<O>> + Send + 'static,
    {
        self.run_with_cancel(tasks, move |input, _| f(input)).await
    }

    /// Like [`BatchExecutor::run`], but `f` also receives the batch token, which is
    /// cancelled when the batch fails or the returned future is dropped.
    pub async fn run_with_cancel<I, O, F, Fut>(&self, tasks: Vec<Task<I>>, f: F) -> Result<Vec<O>>
    where
        I: Debug + Send + 'static,
        O: Send + 'static,
        F: Fn(I, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<O>> + Send + 'static,
    {
        let total = tasks.len();
        if total == 0 {
            return Ok(Vec::new());
        }

        let batch_id = Uuid::new_v4().to_string();
        let workers = self.config.workers_for(total);
        let capacity = self.config.buffer_for(total);
        let start = Instant::now();
        debug!(batch_id = %batch_id, tasks = total, workers, "batch started");

        let (task_tx, task_rx) = mpsc::channel(capacity);
        for task in tasks {
            task_tx.try_send(task).map_err(|_| {
                Error::runtime_with_context(
                    "task queue rejected a task",
                    ErrorContext::new()
                        .with_details(format!("capacity {} for {} tasks", capacity, total))
                        .with_source("batch_executor"),
                )
            })?;
        }
        drop(task_tx);

        let queue: SharedQueue<I> = Arc::new(Mutex::new(task_rx));
        let (result_tx, mut result_rx) = mpsc::channel(capacity);
        let token = CancellationToken::new();
        let _cancel_on_drop = token.clone().drop_guard();
        let f = Arc::new(f);

        for worker in 0..workers {
            tokio::spawn(worker_loop(
                worker,
                Arc::clone(&queue),
                result_tx.clone(),
                Arc::clone(&f),
                token.clone(),
            ));
        }
        drop(result_tx);

        let out = collect(&mut result_rx, total, &token).await;
        match &out {
            Ok(_) => debug!(
                batch_id = %batch_id,
                tasks = total,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "batch finished"
            ),
            Err(e) => warn!(
                batch_id = %batch_id,
                tasks = total,
                failed_task = ?e.task_index(),
                error = %e,
                "batch failed"
            ),
        }
        out
    }

    /// One task per input; outputs in input order.
    pub async fn run_linear<I, O, F, Fut>(&self, inputs: Vec<I>, f: F) -> Result<Vec<O>>
    where
        I: Debug + Send + 'static,
        O: Send + 'static,
        F: Fn(I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<O>> + Send + 'static,
    {
        self.run(linear_tasks(inputs), f).await
    }

    /// `f(points[i], points[j])` for every `i < j`, mirrored into a symmetric
    /// `n × n` matrix whose diagonal is `O::default()`. `(i, i)` is never dispatched.
    pub async fn run_pairwise<P, O, F, Fut>(&self, points: Vec<P>, f: F) -> Result<Vec<Vec<O>>>
    where
        P: Clone + Send + Sync + 'static,
        O: Clone + Default + Send + 'static,
        F: Fn(P, P) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<O>> + Send + 'static,
    {
        let n = points.len();
        let points = Arc::new(points);
        let values = self
            .run(pairwise_tasks(n), move |pair| {
                f(points[pair.i].clone(), points[pair.j].clone())
            })
            .await?;
        Ok(mirror_pairs(n, values))
    }
}

async fn worker_loop<I, O, F, Fut>(
    worker: usize,
    queue: SharedQueue<I>,
    results: mpsc::Sender<TaskOutcome<O>>,
    f: Arc<F>,
    token: CancellationToken,
) where
    I: Debug + Send + 'static,
    O: Send + 'static,
    F: Fn(I, CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<O>> + Send + 'static,
{
    loop {
        if token.is_cancelled() {
            break;
        }
        let next = queue.lock().await.recv().await;
        let Some(Task { index, input }) = next else {
            break;
        };
        if token.is_cancelled() {
            break;
        }

        let label = format!("{:?}", input);
        let call = AssertUnwindSafe(async { f(input, token.clone()).await });
        let result = call
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| Err(panic_error(index, payload)));

        let outcome = match result {
            Ok(output) => TaskOutcome::success(index, output),
            Err(e) => TaskOutcome::failure(index, Some(label), e),
        };
        // Capacity covers every task, so a failed send means the collector is gone.
        if results.try_send(outcome).is_err() {
            break;
        }
    }
    trace!(worker, "batch worker exited");
}

fn panic_error(index: usize, payload: Box<dyn Any + Send>) -> Error {
    let msg = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string());
    Error::runtime_with_context(
        format!("work function panicked: {}", msg),
        ErrorContext::new()
            .with_details(format!("task {}", index))
            .with_source("batch_executor"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_run_linear_keeps_order() {
        let exec = BatchExecutor::with_concurrency(4);
        let out = exec
            .run_linear((0..20u64).collect(), |n| async move {
                tokio::time::sleep(Duration::from_millis(20 - n)).await;
                Ok(n * 10)
            })
            .await
            .unwrap();
        assert_eq!(out, (0..20u64).map(|n| n * 10).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let exec = BatchExecutor::new();
        let out: Vec<u8> = exec
            .run_linear(Vec::<u8>::new(), |n| async move { Ok(n) })
            .await
            .unwrap();
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_panic_becomes_task_error() {
        let exec = BatchExecutor::with_concurrency(2);
        let err = exec
            .run_linear(vec![1, 2, 3], |n: i32| async move {
                if n == 2 {
                    panic!("bad input");
                }
                Ok(n)
            })
            .await
            .unwrap_err();
        assert_eq!(err.task_index(), Some(1));
        assert!(err.to_string().contains("bad input"));
    }

    #[tokio::test]
    async fn test_pairwise_matrix() {
        let exec = BatchExecutor::with_concurrency(3);
        let m = exec
            .run_pairwise(vec![1i64, 4, 9], |a, b| async move { Ok((a - b).abs()) })
            .await
            .unwrap();
        assert_eq!(m, vec![vec![0, 3, 8], vec![3, 0, 5], vec![8, 5, 0]]);
    }
}
