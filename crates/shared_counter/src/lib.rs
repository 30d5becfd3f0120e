//! A counter shared by a fixed set of parallel workers, with a join barrier
//! that guards the final read.
//!
//! [`Coordinator`] is the usual entry point. [`Run`] exposes the individual
//! steps (dispatch, join, finalize) for callers that need to interleave
//! their own logic, for example retrying an interrupted join.

mod config;
mod coordinator;
mod counter;
mod error;
mod run;
mod worker;

pub use config::RunConfig;
pub use config::DEFAULT_INCREMENTS_PER_WORKER;
pub use config::DEFAULT_WORKERS;
pub use coordinator::Coordinator;
pub use counter::SharedCounter;
pub use error::CounterError;
pub use error::FailureCause;
pub use error::RunError;
pub use error::WorkerFailure;
pub use run::Run;
pub use run::RunPhase;
pub use run::RunReport;
pub use worker::WorkerTask;

pub use tokio_util::sync::CancellationToken;
