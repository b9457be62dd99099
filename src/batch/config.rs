//! Batch executor configuration.

use crate::{Error, ErrorContext, Result};

/// Upper bound of the default worker count.
pub const MAX_DEFAULT_CONCURRENCY: usize = 20;

/// Environment variable overriding the worker count.
pub const CONCURRENCY_ENV: &str = "GEO_BATCH_CONCURRENCY";

/// `min(2 × available parallelism, 20)`, at least one.
pub fn default_concurrency() -> usize {
    let cpus = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    (cpus * 2).clamp(1, MAX_DEFAULT_CONCURRENCY)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchConfig {
    /// Maximum number of work-function invocations running at once.
    pub concurrency: usize,
    /// Capacity of the task and result queues; `None` sizes them to the task count.
    pub buffer_capacity: Option<usize>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            buffer_capacity: None,
        }
    }
}

impl BatchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Worker count; zero is raised to one.
    pub fn with_concurrency(mut self, n: usize) -> Self {
        self.concurrency = n.max(1);
        self
    }

    pub fn with_buffer_capacity(mut self, n: usize) -> Self {
        self.buffer_capacity = Some(n);
        self
    }

    /// Queue capacity for a batch of `tasks`: never below the task count, never zero.
    pub fn buffer_for(&self, tasks: usize) -> usize {
        self.buffer_capacity.unwrap_or(tasks).max(tasks).max(1)
    }

    /// Number of workers actually spawned for `tasks` tasks.
    pub fn workers_for(&self, tasks: usize) -> usize {
        self.concurrency.max(1).min(tasks)
    }

    /// Defaults, with `GEO_BATCH_CONCURRENCY` applied when set.
    pub fn from_env() -> Result<Self> {
        Self::default().apply_env_from(|k| std::env::var(k).ok())
    }

    pub(crate) fn apply_env_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(raw) = lookup(CONCURRENCY_ENV) {
            let n: usize = raw.trim().parse().map_err(|_| {
                Error::configuration_with_context(
                    format!("invalid {}: '{}'", CONCURRENCY_ENV, raw),
                    ErrorContext::new()
                        .with_field_path("concurrency")
                        .with_details("expected a positive integer")
                        .with_source("env"),
                )
            })?;
            if n == 0 {
                return Err(Error::configuration_with_context(
                    "concurrency must be greater than zero",
                    ErrorContext::new()
                        .with_field_path("concurrency")
                        .with_source("env"),
                ));
            }
            self.concurrency = n;
        }
        Ok(self)
    }
}
