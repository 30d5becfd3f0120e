//! Parameters of a single coordination run.

use serde::Deserialize;
use serde::Serialize;

use crate::error::RunError;

/// Default number of workers.
pub const DEFAULT_WORKERS: usize = 4;
/// Default number of increments each worker performs.
pub const DEFAULT_INCREMENTS_PER_WORKER: u64 = 1000;

/// How many workers to dispatch and how much work each one does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Number of workers `N`.
    pub workers: usize,
    /// Increments performed by each worker, `k`.
    pub increments_per_worker: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            increments_per_worker: DEFAULT_INCREMENTS_PER_WORKER,
        }
    }
}

impl RunConfig {
    pub fn new(workers: usize, increments_per_worker: u64) -> Self {
        Self { workers, increments_per_worker }
    }

    /// Rejects zero workers, zero increments, and totals that overflow `u64`.
    pub fn validate(&self) -> Result<(), RunError> {
        if self.workers == 0 {
            return Err(RunError::misuse("worker count must be positive"));
        }
        if self.increments_per_worker == 0 {
            return Err(RunError::misuse("increments per worker must be positive"));
        }
        self.expected_total().map(|_| ())
    }

    /// The value the counter must hold after a clean join, `N * k`.
    pub fn expected_total(&self) -> Result<u64, RunError> {
        u64::try_from(self.workers)
            .ok()
            .and_then(|workers| workers.checked_mul(self.increments_per_worker))
            .ok_or_else(|| {
                RunError::misuse(format!(
                    "{} workers x {} increments overflows the counter",
                    self.workers, self.increments_per_worker
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_four_by_one_thousand() {
        let config = RunConfig::default();
        assert_eq!(config, RunConfig::new(4, 1000));
        assert_eq!(config.expected_total().unwrap(), 4000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn json_round_trip() {
        let config = RunConfig::new(64, 100_000);
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(json, r#"{"workers":64,"increments_per_worker":100000}"#);
        assert_eq!(serde_json::from_str::<RunConfig>(&json).unwrap(), config);
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config: RunConfig = serde_json::from_str(r#"{"workers":8}"#).unwrap();
        assert_eq!(config, RunConfig::new(8, DEFAULT_INCREMENTS_PER_WORKER));

        let config: RunConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, RunConfig::new(4, 1000));
    }

    #[test]
    fn zero_workers_is_misuse() {
        let err = RunConfig::new(0, 1000).validate().unwrap_err();
        assert!(matches!(err, RunError::Misuse { .. }), "{err}");
    }

    #[test]
    fn zero_increments_is_misuse() {
        let err = RunConfig::new(4, 0).validate().unwrap_err();
        assert!(matches!(err, RunError::Misuse { .. }), "{err}");
    }

    #[test]
    fn overflowing_total_is_misuse() {
        let err = RunConfig::new(2, u64::MAX).validate().unwrap_err();
        assert!(matches!(err, RunError::Misuse { .. }), "{err}");
    }
}
