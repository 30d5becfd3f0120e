//! One coordination run: dispatch, join barrier, and final read.
//!
//! A run moves through `Created -> Dispatched -> Joined -> Finalized`.
//! The counter's value is only trusted once the run has been joined, and
//! [`Run::finalize`] consumes the run so nothing can follow it.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::task::JoinError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::config::RunConfig;
use crate::counter::SharedCounter;
use crate::error::FailureCause;
use crate::error::RunError;
use crate::error::WorkerFailure;
use crate::worker::WorkerTask;

/// Where a run is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    /// Counter exists, no worker has been dispatched.
    Created,
    /// Workers are running or have not yet been joined.
    Dispatched,
    /// Every worker has reported completion.
    Joined,
    /// The final value has been read. Terminal.
    Finalized,
}

impl RunPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunPhase::Created => "created",
            RunPhase::Dispatched => "dispatched",
            RunPhase::Joined => "joined",
            RunPhase::Finalized => "finalized",
        }
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a run in which every worker completed cleanly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunReport {
    /// Parameters the run was started with.
    pub config: RunConfig,
    /// Counter value read after the join barrier.
    pub value: u64,
}

type WorkerHandle = JoinHandle<Result<u64, String>>;

/// A single run of `N` workers against one shared counter.
#[derive(Debug)]
pub struct Run {
    config: RunConfig,
    counter: Arc<SharedCounter>,
    phase: RunPhase,
    // `None` once the worker has been joined.
    handles: Vec<Option<WorkerHandle>>,
    failures: Vec<WorkerFailure>,
}

impl Run {
    /// Validates `config` and creates a run around a fresh counter.
    pub fn new(config: RunConfig) -> Result<Self, RunError> {
        Self::with_counter(config, Arc::new(SharedCounter::new()))
    }

    /// Like [`Run::new`] but counts into a caller-provided counter.
    ///
    /// The counter must start at zero. It is left untouched if either the
    /// counter or `config` is rejected.
    pub fn with_counter(config: RunConfig, counter: Arc<SharedCounter>) -> Result<Self, RunError> {
        config.validate()?;
        let start = counter.get();
        if start != 0 {
            return Err(RunError::misuse(format!("run counter must start at 0, found {start}")));
        }
        debug!(workers = config.workers, increments = config.increments_per_worker, "run created");
        Ok(Self {
            config,
            counter,
            phase: RunPhase::Created,
            handles: Vec::with_capacity(config.workers),
            failures: Vec::new(),
        })
    }

    pub fn config(&self) -> RunConfig {
        self.config
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    /// The counter this run increments. Reads are snapshots until joined.
    pub fn counter(&self) -> &Arc<SharedCounter> {
        &self.counter
    }

    /// Spawns every worker onto the blocking pool of the current runtime.
    ///
    /// Each worker gets its own [`WorkerTask`] and runs `work` on it. The
    /// task is expected to return the number of increments it applied.
    pub fn dispatch<F, E>(&mut self, work: F) -> Result<(), RunError>
    where
        F: Fn(WorkerTask) -> Result<u64, E> + Send + Sync + 'static,
        E: fmt::Display,
    {
        self.expect_phase(RunPhase::Created, "dispatch")?;
        let runtime = Handle::try_current()
            .map_err(|_| RunError::misuse("dispatch requires a running tokio runtime"))?;

        let work = Arc::new(work);
        for id in 0..self.config.workers {
            let task = WorkerTask::new(id, Arc::clone(&self.counter), self.config.increments_per_worker);
            let work = Arc::clone(&work);
            let handle = runtime.spawn_blocking(move || (*work)(task).map_err(|e| e.to_string()));
            self.handles.push(Some(handle));
        }

        self.phase = RunPhase::Dispatched;
        debug!(workers = self.config.workers, "run dispatched");
        Ok(())
    }

    /// Waits until every dispatched worker has completed or failed.
    ///
    /// Failures are collected, not returned early, so no worker is left
    /// running behind a failed one. If `interrupt` fires first the wait
    /// returns [`RunError::InterruptedWait`] and the run stays dispatched;
    /// calling `join` again resumes waiting on the remaining workers.
    pub async fn join(&mut self, interrupt: &CancellationToken) -> Result<(), RunError> {
        self.expect_phase(RunPhase::Dispatched, "join")?;

        for worker in 0..self.handles.len() {
            let Some(handle) = self.handles[worker].as_mut() else {
                continue;
            };

            let joined = tokio::select! {
                biased;
                joined = handle => Some(joined),
                () = interrupt.cancelled() => None,
            };
            let Some(joined) = joined else {
                return Err(self.interrupted());
            };

            self.handles[worker] = None;
            if let Some(cause) = classify(joined, self.config.increments_per_worker) {
                warn!(worker, %cause, "worker failed");
                self.failures.push(WorkerFailure { worker, cause });
            }
        }

        self.phase = RunPhase::Joined;
        debug!(failures = self.failures.len(), "run joined");
        Ok(())
    }

    /// Reads the counter. Only valid once the run has been joined.
    pub fn value(&self) -> Result<u64, RunError> {
        self.expect_phase(RunPhase::Joined, "read the final value")?;
        Ok(self.counter.get())
    }

    /// Ends the run, returning the final value if every worker succeeded.
    pub fn finalize(mut self) -> Result<RunReport, RunError> {
        let value = self.value()?;
        self.phase = RunPhase::Finalized;

        if !self.failures.is_empty() {
            return Err(RunError::WorkerFailed {
                failures: std::mem::take(&mut self.failures),
                workers: self.config.workers,
                partial: value,
            });
        }

        let expected = self.config.expected_total()?;
        if value != expected {
            return Err(RunError::misuse(format!(
                "workers reported success but the counter holds {value}, expected {expected}"
            )));
        }

        info!(value, workers = self.config.workers, "run finalized");
        Ok(RunReport { config: self.config, value })
    }

    fn expect_phase(&self, expected: RunPhase, action: &str) -> Result<(), RunError> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(RunError::misuse(format!("cannot {action} a run that is {}", self.phase)))
        }
    }

    fn interrupted(&self) -> RunError {
        let pending = self.handles.iter().flatten().count();
        warn!(pending, workers = self.config.workers, "join barrier interrupted");
        RunError::InterruptedWait {
            pending,
            workers: self.config.workers,
        }
    }
}

fn classify(joined: Result<Result<u64, String>, JoinError>, expected: u64) -> Option<FailureCause> {
    match joined {
        Ok(Ok(applied)) if applied == expected => None,
        Ok(Ok(applied)) => Some(FailureCause::Errored(format!(
            "applied {applied} of {expected} increments"
        ))),
        Ok(Err(msg)) => Some(FailureCause::Errored(msg)),
        Err(err) if err.is_panic() => Some(FailureCause::Panicked(panic_message(err.into_panic()))),
        Err(_) => Some(FailureCause::Cancelled),
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    match payload.downcast::<String>() {
        Ok(msg) => *msg,
        Err(payload) => match payload.downcast::<&'static str>() {
            Ok(msg) => (*msg).to_string(),
            Err(_) => "non-string panic payload".to_string(),
        },
    }
}
