//! Cooperative batch runner that spreads per-item work across frames.

use std::collections::VecDeque;
use std::fmt;
use std::task::Poll;
use std::time::{Duration, Instant};

/// Roughly one frame at 60 Hz.
pub const FRAME_BUDGET: Duration = Duration::from_millis(16);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ProcessId(u64);

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Hands out increasing process ids. Owned by whatever schedules processes.
#[derive(Debug, Default)]
pub struct ProcessIds {
    next: u64,
}

impl ProcessIds {
    pub fn next_id(&mut self) -> ProcessId {
        self.next += 1;
        ProcessId(self.next)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProcessState {
    Running,
    Cancelled,
    Completed,
    Failed,
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ProcessError<E> {
    /// Raised only by `stop()`. Callers treat it as a no-op.
    #[error("process was cancelled")]
    Cancelled,
    #[error("process failed: {0}")]
    Failed(E),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BatchMode {
    /// Checks the budget after every item.
    Sequential,
    /// Runs this many items, then checks the budget.
    Batched(usize),
}

impl BatchMode {
    fn slice_len(self) -> usize {
        match self {
            Self::Sequential => 1,
            Self::Batched(size) => size.max(1),
        }
    }
}

pub struct LongProcess<T, E> {
    id: ProcessId,
    items: VecDeque<T>,
    mode: BatchMode,
    stop_requested: bool,
    processed: usize,
    outcome: Option<Result<(), ProcessError<E>>>,
}

impl<T, E: Clone> LongProcess<T, E> {
    pub fn new(id: ProcessId, items: impl IntoIterator<Item = T>, mode: BatchMode) -> Self {
        let items = items.into_iter().collect::<VecDeque<_>>();
        tracing::debug!(process = %id, items = items.len(), ?mode, "long process started");
        Self {
            id,
            items,
            mode,
            stop_requested: false,
            processed: 0,
            outcome: None,
        }
    }

    pub fn id(&self) -> ProcessId {
        self.id
    }

    pub fn state(&self) -> ProcessState {
        match &self.outcome {
            None => ProcessState::Running,
            Some(Ok(())) => ProcessState::Completed,
            Some(Err(ProcessError::Cancelled)) => ProcessState::Cancelled,
            Some(Err(ProcessError::Failed(_))) => ProcessState::Failed,
        }
    }

    pub fn processed(&self) -> usize {
        self.processed
    }

    /// Requests cancellation; observed at the next slice boundary.
    pub fn stop(&mut self) {
        if self.outcome.is_none() {
            self.stop_requested = true;
        }
    }

    pub fn remaining(&self) -> impl ExactSizeIterator<Item = &T> {
        self.items.iter()
    }

    pub fn into_remaining(self) -> Vec<T> {
        self.items.into()
    }

    /// Processes items in order until `budget` has elapsed or the list is exhausted.
    ///
    /// A finished process keeps returning the same outcome.
    pub fn step(
        &mut self,
        budget: Duration,
        mut op: impl FnMut(T) -> Result<(), E>,
    ) -> Poll<Result<(), ProcessError<E>>> {
        if let Some(outcome) = &self.outcome {
            return Poll::Ready(outcome.clone());
        }

        let started = Instant::now();
        loop {
            if self.stop_requested {
                tracing::debug!(process = %self.id, processed = self.processed, "long process cancelled");
                return self.finish(Err(ProcessError::Cancelled));
            }

            for _ in 0..self.mode.slice_len() {
                let Some(item) = self.items.pop_front() else {
                    break;
                };
                if let Err(error) = op(item) {
                    tracing::debug!(process = %self.id, processed = self.processed, "long process failed");
                    return self.finish(Err(ProcessError::Failed(error)));
                }
                self.processed += 1;
            }

            if self.items.is_empty() {
                tracing::debug!(process = %self.id, processed = self.processed, "long process completed");
                return self.finish(Ok(()));
            }

            if started.elapsed() >= budget {
                return Poll::Pending;
            }
        }
    }

    fn finish(
        &mut self,
        outcome: Result<(), ProcessError<E>>,
    ) -> Poll<Result<(), ProcessError<E>>> {
        self.outcome = Some(outcome.clone());
        Poll::Ready(outcome)
    }
}
