//! 批处理模块：提供有界并发的批量执行、有序结果收集与快速失败。
//!
//! # Batch Execution Module
//!
//! Fans a collection of independent tasks out over a bounded pool of Tokio
//! workers and fans the results back in, in the caller's original order.
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`BatchExecutor`] | Bounded worker pool with fail-fast collection |
//! | [`BatchConfig`] | Worker count and queue capacity |
//! | [`OrderedCollector`] | Writes outcomes into index slots, stops on first failure |
//! | [`Task`] | An input and its output position |
//! | [`linear_tasks`] / [`pairwise_tasks`] | Task enumeration strategies |
//!
//! ## Example
//!
//! ```rust
//! use geo_batch::batch::BatchExecutor;
//!
//! # #[tokio::main] async fn main() -> geo_batch::Result<()> {
//! let exec = BatchExecutor::with_concurrency(2);
//! let lens = exec
//!     .run_linear(vec!["A", "B", "C"], |s: &'static str| async move { Ok(s.len()) })
//!     .await?;
//! assert_eq!(lens, vec![1, 1, 1]);
//! # Ok(()) }
//! ```
//!
//! ## Failure semantics
//!
//! - The work function is invoked at most once per task
//! - The first failure to *complete* is reported, wrapped as [`crate::Error::Task`]
//! - The batch token passed by [`BatchExecutor::run_with_cancel`] is cancelled on
//!   failure and when the batch future is dropped
//! - Queues hold every task and result, so workers never block on a gone collector

mod collector;
mod config;
mod executor;
mod task;

pub use collector::{OrderedCollector, TaskOutcome};
pub use config::{default_concurrency, BatchConfig, CONCURRENCY_ENV, MAX_DEFAULT_CONCURRENCY};
pub use executor::BatchExecutor;
pub use task::{linear_tasks, pair_count, pairwise_tasks, Pair, Task};
