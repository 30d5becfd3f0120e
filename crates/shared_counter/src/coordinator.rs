//! Fan-out/fan-in over a shared counter.

use std::fmt;

use tokio::runtime::Builder;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;

use crate::config::RunConfig;
use crate::error::RunError;
use crate::run::Run;
use crate::run::RunReport;
use crate::worker::WorkerTask;

/// Runs `N` workers of `k` increments each and reports the joined total.
///
/// ```no_run
/// # async fn demo() -> Result<(), shared_counter::RunError> {
/// use shared_counter::{Coordinator, RunConfig};
///
/// let coordinator = Coordinator::new(RunConfig::new(4, 1000))?;
/// let report = coordinator.run().await?;
/// assert_eq!(report.value, 4000);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Coordinator {
    config: RunConfig,
    interrupt: CancellationToken,
}

impl Coordinator {
    /// Validates `config` up front so a bad run never dispatches.
    pub fn new(config: RunConfig) -> Result<Self, RunError> {
        config.validate()?;
        Ok(Self {
            config,
            interrupt: CancellationToken::new(),
        })
    }

    /// Uses `interrupt` to break out of the join barrier.
    pub fn with_interrupt(mut self, interrupt: CancellationToken) -> Self {
        self.interrupt = interrupt;
        self
    }

    pub fn config(&self) -> RunConfig {
        self.config
    }

    /// A handle that interrupts the current and every later join when cancelled.
    pub fn interrupt_handle(&self) -> CancellationToken {
        self.interrupt.clone()
    }

    /// Runs every worker to completion and returns the final value.
    pub async fn run(&self) -> Result<RunReport, RunError> {
        self.run_with(WorkerTask::run).await
    }

    /// Same as [`run`](Self::run) with a custom body for each worker.
    pub async fn run_with<F, E>(&self, work: F) -> Result<RunReport, RunError>
    where
        F: Fn(WorkerTask) -> Result<u64, E> + Send + Sync + 'static,
        E: fmt::Display,
    {
        let mut run = Run::new(self.config)?;
        run.dispatch(work)?;
        run.join(&self.interrupt).await?;
        run.finalize()
    }

    /// Blocking form of [`run`](Self::run) that drives its own runtime.
    ///
    /// Must not be called from inside a tokio runtime.
    pub fn run_blocking(&self) -> Result<RunReport, RunError> {
        if Handle::try_current().is_ok() {
            return Err(RunError::misuse("run_blocking called from inside a tokio runtime"));
        }
        let runtime = Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(|source| RunError::Runtime { source })?;
        runtime.block_on(self.run())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_rejects_zero_workers() {
        let err = Coordinator::new(RunConfig::new(0, 1000)).unwrap_err();
        assert!(matches!(err, RunError::Misuse { .. }), "{err}");
    }

    #[test]
    fn run_blocking_single_increment() {
        let report = Coordinator::new(RunConfig::new(1, 1)).unwrap().run_blocking().unwrap();
        assert_eq!(report.value, 1);
    }

    #[tokio::test]
    async fn run_blocking_inside_runtime_is_misuse() {
        let coordinator = Coordinator::new(RunConfig::default()).unwrap();
        let err = coordinator.run_blocking().unwrap_err();
        assert!(matches!(err, RunError::Misuse { .. }), "{err}");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn cancelled_handle_interrupts_join() {
        let coordinator = Coordinator::new(RunConfig::new(2, 10)).unwrap();
        coordinator.interrupt_handle().cancel();
        let err = coordinator
            .run_with(|task: WorkerTask| {
                std::thread::sleep(std::time::Duration::from_millis(100));
                task.run()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, RunError::InterruptedWait { workers: 2, .. }), "{err}");
    }
}
