//! Ordered result collection with fail-fast error propagation.

use crate::{Error, ErrorContext, Result};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// What a worker reports for one task.
#[derive(Debug)]
pub struct TaskOutcome<O> {
    pub index: usize,
    /// Rendering of the task input, attached to the batch error on failure.
    pub input: Option<String>,
    pub result: Result<O>,
}

impl<O> TaskOutcome<O> {
    pub fn success(index: usize, output: O) -> Self {
        Self {
            index,
            input: None,
            result: Ok(output),
        }
    }

    pub fn failure(index: usize, input: Option<String>, error: Error) -> Self {
        Self {
            index,
            input,
            result: Err(error),
        }
    }
}

/// Places outcomes into their index slots; the first failure ends collection.
#[derive(Debug)]
pub struct OrderedCollector<O> {
    slots: Vec<Option<O>>,
    filled: usize,
}

impl<O> OrderedCollector<O> {
    pub fn new(expected: usize) -> Self {
        let mut slots = Vec::with_capacity(expected);
        slots.resize_with(expected, || None);
        Self { slots, filled: 0 }
    }

    pub fn expected(&self) -> usize {
        self.slots.len()
    }

    pub fn filled(&self) -> usize {
        self.filled
    }

    pub fn is_complete(&self) -> bool {
        self.filled == self.slots.len()
    }

    /// Record one outcome. A failed outcome comes back as [`Error::Task`].
    pub fn accept(&mut self, outcome: TaskOutcome<O>) -> Result<()> {
        let TaskOutcome {
            index,
            input,
            result,
        } = outcome;
        let output = result.map_err(|e| Error::task(index, input, e))?;
        let expected = self.slots.len();
        let slot = self.slots.get_mut(index).ok_or_else(|| {
            Error::runtime_with_context(
                format!("task index {} out of range", index),
                ErrorContext::new()
                    .with_details(format!("batch has {} tasks", expected))
                    .with_source("ordered_collector"),
            )
        })?;
        if slot.is_some() {
            return Err(Error::runtime_with_context(
                format!("task index {} reported twice", index),
                ErrorContext::new().with_source("ordered_collector"),
            ));
        }
        *slot = Some(output);
        self.filled += 1;
        Ok(())
    }

    /// The ordered outputs; fails if any slot is still empty.
    pub fn finish(self) -> Result<Vec<O>> {
        if !self.is_complete() {
            return Err(Error::runtime_with_context(
                format!(
                    "result stream ended after {} of {} tasks",
                    self.filled,
                    self.slots.len()
                ),
                ErrorContext::new().with_source("ordered_collector"),
            ));
        }
        Ok(self.slots.into_iter().flatten().collect())
    }
}

/// Drain `rx` until `expected` outcomes have arrived or one fails.
///
/// On failure `cancel` is triggered and the error returned at once; later
/// outcomes are left in the channel and dropped with it.
pub(crate) async fn collect<O>(
    rx: &mut mpsc::Receiver<TaskOutcome<O>>,
    expected: usize,
    cancel: &CancellationToken,
) -> Result<Vec<O>> {
    let mut collector = OrderedCollector::new(expected);
    while !collector.is_complete() {
        let Some(outcome) = rx.recv().await else {
            break;
        };
        if let Err(e) = collector.accept(outcome) {
            cancel.cancel();
            debug!(
                collected = collector.filled(),
                expected,
                error = %e,
                "batch failed fast"
            );
            return Err(e);
        }
    }
    collector.finish()
}
