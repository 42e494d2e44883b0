//! Runs fallible operations under a [`BackoffStrategy`].

use super::sleeper::{Sleeper, ThreadSleeper};
use super::strategy::{Backoff, BackoffStrategy};
use crate::error::RetryError;
use std::error::Error;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Re-invokes an operation until it succeeds, the strategy rejects a
/// failure, or the attempt budget is spent.
///
/// Control flow, shared by the blocking and the async path:
///
/// 1. Run the operation. On success, return at once.
/// 2. If the strategy's `should_retry` rejects the failure, return it as
///    [`RetryError::NonRetryable`] without waiting.
/// 3. If attempts remain, wait for the next backoff delay and go to 1.
///    Otherwise return [`RetryError::Exhausted`] with the latest failure.
///
/// No wait follows the final attempt.
///
/// # Examples
///
/// ```rust
/// use holdfast_core::retry::{RetryExecutor, RetryPolicy};
/// use std::sync::atomic::{AtomicU32, Ordering};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let attempts = AtomicU32::new(0);
/// let value = RetryExecutor::new()
///     .run_async(
///         || async {
///             if attempts.fetch_add(1, Ordering::SeqCst) < 2 {
///                 Err(std::io::Error::other("not yet"))
///             } else {
///                 Ok(42)
///             }
///         },
///         &RetryPolicy::default(),
///     )
///     .await?;
///
/// assert_eq!(value, 42);
/// assert_eq!(attempts.load(Ordering::SeqCst), 3);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct RetryExecutor {
    sleeper: Arc<dyn Sleeper>,
}

impl Default for RetryExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl RetryExecutor {
    /// Executor whose blocking path sleeps the calling thread.
    pub fn new() -> Self {
        Self::with_sleeper(ThreadSleeper)
    }

    /// Executor whose blocking path waits through `sleeper`.
    pub fn with_sleeper(sleeper: impl Sleeper + 'static) -> Self {
        Self {
            sleeper: Arc::new(sleeper),
        }
    }

    /// Run `operation` on the calling thread, blocking during backoff waits.
    ///
    /// Must not be called from an async worker thread; use
    /// [`run_async`](Self::run_async) there.
    ///
    /// # Panics
    ///
    /// Panics before invoking `operation` if `strategy` allows zero attempts.
    pub fn run<S, F, T, E>(&self, mut operation: F, strategy: &S) -> Result<T, RetryError<E>>
    where
        S: BackoffStrategy + ?Sized,
        F: FnMut() -> Result<T, E>,
        E: Error + 'static,
    {
        let max_attempts = strategy.max_retries();
        assert!(max_attempts >= 1, "retry strategy must allow at least one attempt");

        let mut waits = Backoff::new(strategy);
        let mut attempt = 0;

        loop {
            attempt += 1;
            let err = match operation() {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            match next_step(strategy, &mut waits, err, attempt, max_attempts) {
                Step::Wait(wait, _) => self.sleeper.sleep(wait),
                Step::Stop(err) => return Err(err),
            }
        }
    }

    /// Run `operation`, suspending during the operation itself and during
    /// each backoff wait.
    pub async fn run_async<S, F, Fut, T, E>(
        &self,
        operation: F,
        strategy: &S,
    ) -> Result<T, RetryError<E>>
    where
        S: BackoffStrategy + ?Sized,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Error + 'static,
    {
        drive_async(operation, strategy, None).await
    }

    /// Like [`run_async`](Self::run_async), but gives up as soon as `cancel`
    /// fires, abandoning a pending attempt or backoff wait.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use holdfast_core::retry::{RetryExecutor, RetryPolicy};
    /// use tokio_util::sync::CancellationToken;
    ///
    /// # #[tokio::main]
    /// # async fn main() {
    /// let cancel = CancellationToken::new();
    /// cancel.cancel();
    ///
    /// let result = RetryExecutor::new()
    ///     .run_async_with_cancel(
    ///         || async { Ok::<_, std::io::Error>(1) },
    ///         &RetryPolicy::default(),
    ///         &cancel,
    ///     )
    ///     .await;
    ///
    /// assert!(result.unwrap_err().is_cancelled());
    /// # }
    /// ```
    pub async fn run_async_with_cancel<S, F, Fut, T, E>(
        &self,
        operation: F,
        strategy: &S,
        cancel: &CancellationToken,
    ) -> Result<T, RetryError<E>>
    where
        S: BackoffStrategy + ?Sized,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Error + 'static,
    {
        drive_async(operation, strategy, Some(cancel)).await
    }
}

enum Step<E: Error + 'static> {
    Wait(Duration, E),
    Stop(RetryError<E>),
}

/// Classify a failed attempt: wait and try again, or stop with an error.
fn next_step<S, E>(
    strategy: &S,
    waits: &mut Backoff<&S>,
    err: E,
    attempt: u32,
    max_attempts: u32,
) -> Step<E>
where
    S: BackoffStrategy + ?Sized,
    E: Error + 'static,
{
    if !strategy.should_retry(&err) {
        tracing::debug!(attempt, error = %err, "failure is not retryable");
        return Step::Stop(RetryError::NonRetryable(err));
    }

    match waits.next() {
        Some(wait) => {
            tracing::debug!(
                attempt,
                max_attempts,
                wait_ms = wait.as_millis() as u64,
                error = %err,
                "attempt failed, retrying"
            );
            Step::Wait(wait, err)
        }
        None => {
            tracing::warn!(attempts = attempt, error = %err, "retries exhausted");
            Step::Stop(RetryError::Exhausted {
                attempts: attempt,
                last: err,
            })
        }
    }
}

async fn drive_async<S, F, Fut, T, E>(
    mut operation: F,
    strategy: &S,
    cancel: Option<&CancellationToken>,
) -> Result<T, RetryError<E>>
where
    S: BackoffStrategy + ?Sized,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Error + 'static,
{
    let max_attempts = strategy.max_retries();
    assert!(max_attempts >= 1, "retry strategy must allow at least one attempt");

    let mut waits = Backoff::new(strategy);
    let mut last: Option<E> = None;
    let mut attempt = 0;

    loop {
        let outcome = match cancel {
            Some(token) => tokio::select! {
                biased;
                _ = token.cancelled() => None,
                outcome = operation() => Some(outcome),
            },
            None => Some(operation().await),
        };
        let Some(outcome) = outcome else {
            tracing::debug!(attempts = attempt, "retry cancelled during attempt");
            return Err(RetryError::Cancelled {
                attempts: attempt,
                last,
            });
        };
        attempt += 1;

        let err = match outcome {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        let (wait, err) = match next_step(strategy, &mut waits, err, attempt, max_attempts) {
            Step::Wait(wait, err) => (wait, err),
            Step::Stop(err) => return Err(err),
        };

        let cancelled = match cancel {
            Some(token) => tokio::select! {
                biased;
                _ = token.cancelled() => true,
                _ = tokio::time::sleep(wait) => false,
            },
            None => {
                tokio::time::sleep(wait).await;
                false
            }
        };
        if cancelled {
            tracing::debug!(attempts = attempt, "retry cancelled during backoff");
            return Err(RetryError::Cancelled {
                attempts: attempt,
                last: Some(err),
            });
        }
        last = Some(err);
    }
}
