//! Blocking wait hooks for the synchronous retry path.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Performs the blocking wait between synchronous retry attempts.
pub trait Sleeper: Send + Sync + fmt::Debug {
    /// Block the calling thread for `wait`.
    fn sleep(&self, wait: Duration);
}

/// Sleeps with [`std::thread::sleep`].
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, wait: Duration) {
        std::thread::sleep(wait);
    }
}

/// Records every requested wait and returns immediately.
///
/// Clones share the same record, so keep one handle and give the other to
/// the executor.
///
/// # Examples
///
/// ```rust
/// use holdfast_core::retry::{RecordingSleeper, RetryExecutor, RetryPolicy};
/// use std::time::Duration;
///
/// let sleeper = RecordingSleeper::new();
/// let executor = RetryExecutor::with_sleeper(sleeper.clone());
///
/// let _ = executor.run(
///     || Err::<(), _>(std::io::Error::other("down")),
///     &RetryPolicy::default(),
/// );
///
/// assert_eq!(sleeper.total(), Duration::from_millis(350));
/// ```
#[derive(Debug, Default, Clone)]
pub struct RecordingSleeper {
    waits: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingSleeper {
    /// Create a sleeper with an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every wait requested so far, in order.
    pub fn waits(&self) -> Vec<Duration> {
        self.waits
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Sum of all requested waits.
    pub fn total(&self) -> Duration {
        self.waits().into_iter().sum()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, wait: Duration) {
        self.waits
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(wait);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_sleeper_shares_record() {
        let sleeper = RecordingSleeper::new();
        let handle = sleeper.clone();

        sleeper.sleep(Duration::from_millis(5));
        sleeper.sleep(Duration::from_millis(7));

        assert_eq!(
            handle.waits(),
            vec![Duration::from_millis(5), Duration::from_millis(7)]
        );
        assert_eq!(handle.total(), Duration::from_millis(12));
    }
}
