//! A counter shared between concurrently running workers.

use std::sync::Mutex;
use std::sync::PoisonError;

use crate::error::CounterError;

/// An integer guarded by a mutex.
///
/// Share it across workers with an `Arc`; callers need no extra locking.
#[derive(Debug, Default)]
pub struct SharedCounter {
    value: Mutex<u64>,
}

impl SharedCounter {
    /// Creates a counter starting at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one to the value inside a single critical section.
    pub fn increment(&self) -> Result<u64, CounterError> {
        let mut value = self.value.lock().map_err(|poisoned| CounterError::Poisoned {
            value: **poisoned.get_ref(),
        })?;
        *value = value.checked_add(1).ok_or(CounterError::Overflow)?;
        Ok(*value)
    }

    /// Returns the current value.
    ///
    /// Exact once every writer has been joined. While writers are running it
    /// is only a snapshot.
    pub fn get(&self) -> u64 {
        *self.value.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;

    #[test]
    fn starts_at_zero() {
        assert_eq!(SharedCounter::new().get(), 0);
    }

    #[test]
    fn increment_returns_new_value() {
        let counter = SharedCounter::new();
        assert_eq!(counter.increment(), Ok(1));
        assert_eq!(counter.increment(), Ok(2));
        assert_eq!(counter.get(), 2);
    }

    #[test]
    fn overflow_is_rejected() {
        let counter = SharedCounter { value: Mutex::new(u64::MAX) };
        assert_eq!(counter.increment(), Err(CounterError::Overflow));
        assert_eq!(counter.get(), u64::MAX);
    }

    #[test]
    fn poisoned_lock_surfaces_as_error() {
        let counter = Arc::new(SharedCounter::new());
        counter.increment().unwrap();

        let poisoner = Arc::clone(&counter);
        let _ = thread::spawn(move || {
            let _guard = poisoner.value.lock().unwrap();
            panic!("poison the counter");
        })
        .join();

        assert_eq!(counter.increment(), Err(CounterError::Poisoned { value: 1 }));
        // Reads still see the last applied value.
        assert_eq!(counter.get(), 1);
    }

    #[test]
    fn concurrent_increments_are_not_lost() {
        let counter = Arc::new(SharedCounter::new());
        let mut handles = vec![];

        for _ in 0..8 {
            let counter = Arc::clone(&counter);
            handles.push(thread::spawn(move || {
                for _ in 0..10_000 {
                    counter.increment().unwrap();
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(counter.get(), 80_000);
    }
}
