//! Error types for the shared counter and the runs that drive it.

use std::fmt;

use snafu::Snafu;

/// Errors raised by [`SharedCounter`](crate::SharedCounter) itself.
///
/// Neither variant is expected in a healthy process. They exist so that a
/// worker never silently drops an increment.
#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
#[snafu(visibility(pub))]
pub enum CounterError {
    /// The guard around the value was poisoned by a panicking holder.
    #[snafu(display("counter lock poisoned at value {value}"))]
    Poisoned {
        /// Value observed through the poisoned guard.
        value: u64,
    },

    /// The value is already at `u64::MAX`.
    #[snafu(display("counter overflow"))]
    Overflow,
}

/// Why a single worker did not complete its batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureCause {
    /// The worker returned an error.
    Errored(String),
    /// The worker panicked.
    Panicked(String),
    /// The worker task was cancelled by the runtime before completing.
    Cancelled,
}

impl fmt::Display for FailureCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureCause::Errored(msg) => write!(f, "errored: {msg}"),
            FailureCause::Panicked(msg) => write!(f, "panicked: {msg}"),
            FailureCause::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// A failure of one worker, identified by its dispatch index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerFailure {
    /// Index of the worker within the run.
    pub worker: usize,
    /// What went wrong.
    pub cause: FailureCause,
}

impl fmt::Display for WorkerFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "worker {} {}", self.worker, self.cause)
    }
}

/// Errors surfaced to the caller of a run.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum RunError {
    /// Invalid configuration, or the run was driven out of order.
    #[snafu(display("misuse: {reason}"))]
    Misuse {
        /// Description of the misuse.
        reason: String,
    },

    /// One or more workers did not complete cleanly.
    ///
    /// `partial` is the counter value after every worker was joined. It is
    /// not authoritative.
    #[snafu(display(
        "{} of {workers} workers failed (partial value {partial}): {}",
        failures.len(),
        render_failures(failures)
    ))]
    WorkerFailed {
        /// Every failure collected at the join barrier.
        failures: Vec<WorkerFailure>,
        /// Total number of workers dispatched.
        workers: usize,
        /// Counter value observed after joining.
        partial: u64,
    },

    /// The join barrier was interrupted before every worker completed.
    #[snafu(display("join interrupted with {pending} of {workers} workers still pending"))]
    InterruptedWait {
        /// Workers the barrier had not joined yet.
        pending: usize,
        /// Total number of workers dispatched.
        workers: usize,
    },

    /// The runtime that drives workers could not be started.
    #[snafu(display("failed to start worker runtime: {source}"))]
    Runtime {
        /// The underlying I/O error.
        source: std::io::Error,
    },
}

impl RunError {
    /// Shorthand for a [`RunError::Misuse`].
    pub fn misuse(reason: impl Into<String>) -> Self {
        RunError::Misuse { reason: reason.into() }
    }

    /// Returns the per-worker failures, if this is a worker failure.
    pub fn failures(&self) -> Option<&[WorkerFailure]> {
        match self {
            RunError::WorkerFailed { failures, .. } => Some(failures),
            _ => None,
        }
    }
}

fn render_failures(failures: &[WorkerFailure]) -> String {
    failures.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worker_failed_display_lists_every_failure() {
        let err = RunError::WorkerFailed {
            failures: vec![
                WorkerFailure { worker: 0, cause: FailureCause::Errored("boom".into()) },
                WorkerFailure { worker: 3, cause: FailureCause::Cancelled },
            ],
            workers: 4,
            partial: 2500,
        };
        assert_eq!(
            err.to_string(),
            "2 of 4 workers failed (partial value 2500): worker 0 errored: boom; worker 3 cancelled"
        );
        assert_eq!(err.failures().map(<[_]>::len), Some(2));
    }

    #[test]
    fn misuse_has_no_failures() {
        let err = RunError::misuse("workers must be positive");
        assert_eq!(err.to_string(), "misuse: workers must be positive");
        assert!(err.failures().is_none());
    }
}
