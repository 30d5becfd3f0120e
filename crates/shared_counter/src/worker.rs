//! A single worker's batch of increments.

use std::sync::Arc;

use tracing::debug;
use tracing::debug_span;

use crate::counter::SharedCounter;
use crate::error::CounterError;

/// One unit of work bound to a shared counter.
///
/// The task holds a clone of the `Arc`, never the counter itself. It is
/// consumed by [`run`](WorkerTask::run) so it cannot be run twice.
#[derive(Debug)]
pub struct WorkerTask {
    id: usize,
    counter: Arc<SharedCounter>,
    increments: u64,
}

impl WorkerTask {
    pub fn new(id: usize, counter: Arc<SharedCounter>, increments: u64) -> Self {
        Self { id, counter, increments }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn increments(&self) -> u64 {
        self.increments
    }

    pub fn counter(&self) -> &SharedCounter {
        &self.counter
    }

    /// Performs every increment in order and returns how many were applied.
    ///
    /// Stops at the first failed increment and returns its error.
    pub fn run(self) -> Result<u64, CounterError> {
        let _span = debug_span!("worker", id = self.id).entered();
        for _ in 0..self.increments {
            self.counter.increment()?;
        }
        debug!(increments = self.increments, "worker finished");
        Ok(self.increments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_applies_every_increment() {
        let counter = Arc::new(SharedCounter::new());
        let task = WorkerTask::new(0, Arc::clone(&counter), 250);
        assert_eq!(task.run(), Ok(250));
        assert_eq!(counter.get(), 250);
    }

    #[test]
    fn tasks_share_one_counter() {
        let counter = Arc::new(SharedCounter::new());
        for id in 0..3 {
            WorkerTask::new(id, Arc::clone(&counter), 10).run().unwrap();
        }
        assert_eq!(counter.get(), 30);
        assert_eq!(Arc::strong_count(&counter), 1);
    }
}
