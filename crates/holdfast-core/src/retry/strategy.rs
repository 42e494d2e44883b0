//! The seam between the retry executor and the policy driving it.

use std::error::Error;
use std::time::Duration;

/// Decides how often to attempt an operation, how long to wait between
/// attempts, and which failures are worth retrying at all.
///
/// [`RetryPolicy`](super::RetryPolicy) is the standard implementation.
/// Implement this trait directly when the classification logic needs state
/// of its own, or wrap a `RetryPolicy` and delegate the timing to it.
///
/// # Examples
///
/// ```rust
/// use holdfast_core::retry::{BackoffStrategy, RetryExecutor, RetryPolicy};
/// use std::error::Error;
/// use std::io;
/// use std::time::Duration;
///
/// /// Retries only I/O timeouts.
/// struct TimeoutsOnly {
///     inner: RetryPolicy,
/// }
///
/// impl BackoffStrategy for TimeoutsOnly {
///     fn max_retries(&self) -> u32 {
///         self.inner.max_retries()
///     }
///
///     fn initial_wait(&self) -> Duration {
///         self.inner.initial_wait()
///     }
///
///     fn next_wait(&self, previous: Duration) -> Duration {
///         self.inner.next_wait(previous)
///     }
///
///     fn should_retry(&self, error: &(dyn Error + 'static)) -> bool {
///         error
///             .downcast_ref::<io::Error>()
///             .is_some_and(|e| e.kind() == io::ErrorKind::TimedOut)
///     }
/// }
///
/// let strategy = TimeoutsOnly { inner: RetryPolicy::default() };
/// let result = RetryExecutor::new().run(
///     || Err::<(), _>(io::Error::new(io::ErrorKind::InvalidData, "malformed")),
///     &strategy,
/// );
/// assert!(result.unwrap_err().is_non_retryable());
/// ```
pub trait BackoffStrategy: Send + Sync {
    /// Total number of attempts, including the first one. At least 1.
    fn max_retries(&self) -> u32;

    /// Wait between the first and the second attempt.
    fn initial_wait(&self) -> Duration;

    /// Wait that follows a wait of `previous`.
    fn next_wait(&self, previous: Duration) -> Duration;

    /// Whether `error` should be retried.
    ///
    /// Returning `false` aborts the sequence immediately: the failure is
    /// handed back to the caller without waiting.
    fn should_retry(&self, error: &(dyn Error + 'static)) -> bool {
        let _ = error;
        true
    }
}

impl<S: BackoffStrategy + ?Sized> BackoffStrategy for &S {
    fn max_retries(&self) -> u32 {
        (**self).max_retries()
    }

    fn initial_wait(&self) -> Duration {
        (**self).initial_wait()
    }

    fn next_wait(&self, previous: Duration) -> Duration {
        (**self).next_wait(previous)
    }

    fn should_retry(&self, error: &(dyn Error + 'static)) -> bool {
        (**self).should_retry(error)
    }
}

/// The waits a strategy prescribes between consecutive attempts.
///
/// Yields `max_retries - 1` durations: one before every attempt after the
/// first, and nothing after the last attempt.
///
/// # Examples
///
/// ```rust
/// use holdfast_core::retry::RetryPolicy;
/// use std::time::Duration;
///
/// let policy = RetryPolicy::default();
/// let waits: Vec<_> = policy.backoff().collect();
/// assert_eq!(
///     waits,
///     vec![
///         Duration::from_millis(50),
///         Duration::from_millis(100),
///         Duration::from_millis(200),
///     ]
/// );
/// ```
#[derive(Debug, Clone)]
pub struct Backoff<S> {
    strategy: S,
    next: Duration,
    remaining: u32,
}

impl<S: BackoffStrategy> Backoff<S> {
    /// Start the wait schedule of `strategy`.
    pub fn new(strategy: S) -> Self {
        let next = strategy.initial_wait();
        let remaining = strategy.max_retries().saturating_sub(1);
        Self {
            strategy,
            next,
            remaining,
        }
    }

    /// Number of waits left in the schedule.
    pub fn remaining(&self) -> u32 {
        self.remaining
    }
}

impl<S: BackoffStrategy> Iterator for Backoff<S> {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        let wait = self.next;
        self.next = self.strategy.next_wait(wait);
        Some(wait)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.remaining as usize;
        (remaining, Some(remaining))
    }
}

impl<S: BackoffStrategy> ExactSizeIterator for Backoff<S> {}
