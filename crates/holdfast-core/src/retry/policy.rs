//! Clamped exponential retry policy.

use super::strategy::{Backoff, BackoffStrategy};
use std::error::Error;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Predicate deciding whether a failure is worth another attempt.
pub type RetryPredicate = Arc<dyn Fn(&(dyn Error + 'static)) -> bool + Send + Sync>;

/// Exponential retry policy whose parameters always stay within safe bounds.
///
/// Every parameter is clamped whenever it is assigned (constructor,
/// builder, setters and deserialization), so no sequence of updates can push
/// a policy out of range:
///
/// | parameter        | range           | default |
/// |------------------|-----------------|---------|
/// | `max_retries`    | 1 ..= 12        | 4       |
/// | `initial_wait`   | 20 ms ..= 400 ms| 50 ms   |
/// | `backoff_factor` | 1.0 ..= 4.0     | 2.0     |
///
/// `max_retries` counts every attempt, the first one included.
///
/// Waits grow multiplicatively with no jitter: each wait is the previous
/// one times `backoff_factor`, truncated to whole milliseconds. Only the
/// initial wait and the factor are bounded, not the compounded wait.
///
/// # Examples
///
/// ```rust
/// use holdfast_core::retry::RetryPolicy;
/// use std::time::Duration;
///
/// let policy = RetryPolicy::builder()
///     .max_retries(100)
///     .initial_wait(Duration::from_millis(5))
///     .backoff_factor(10.0)
///     .build();
///
/// assert_eq!(policy.max_retries(), 12);
/// assert_eq!(policy.initial_wait(), Duration::from_millis(20));
/// assert_eq!(policy.backoff_factor(), 4.0);
/// ```
#[derive(Clone)]
pub struct RetryPolicy {
    max_retries: u32,
    initial_wait: Duration,
    backoff_factor: f64,
    should_retry: Option<RetryPredicate>,
}

impl RetryPolicy {
    /// Lowest accepted attempt budget.
    pub const MIN_RETRIES: u32 = 1;
    /// Highest accepted attempt budget.
    pub const MAX_RETRIES: u32 = 12;
    /// Attempt budget used when none is configured.
    pub const DEFAULT_MAX_RETRIES: u32 = 4;

    /// Shortest accepted initial wait.
    pub const MIN_INITIAL_WAIT: Duration = Duration::from_millis(20);
    /// Longest accepted initial wait.
    pub const MAX_INITIAL_WAIT: Duration = Duration::from_millis(400);
    /// Initial wait used when none is configured.
    pub const DEFAULT_INITIAL_WAIT: Duration = Duration::from_millis(50);

    /// Smallest accepted backoff factor (constant waits).
    pub const MIN_BACKOFF_FACTOR: f64 = 1.0;
    /// Largest accepted backoff factor.
    pub const MAX_BACKOFF_FACTOR: f64 = 4.0;
    /// Backoff factor used when none is configured.
    pub const DEFAULT_BACKOFF_FACTOR: f64 = 2.0;

    /// Create a policy, clamping each parameter into range.
    pub fn new(max_retries: u32, initial_wait: Duration, backoff_factor: f64) -> Self {
        let mut policy = Self::default();
        policy.set_max_retries(max_retries);
        policy.set_initial_wait(initial_wait);
        policy.set_backoff_factor(backoff_factor);
        policy
    }

    /// Create a new builder for configuring a policy.
    pub fn builder() -> RetryPolicyBuilder {
        RetryPolicyBuilder::default()
    }

    /// Total number of attempts, the first one included.
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Wait between the first and the second attempt.
    pub fn initial_wait(&self) -> Duration {
        self.initial_wait
    }

    /// Multiplier applied to the wait after each retryable failure.
    pub fn backoff_factor(&self) -> f64 {
        self.backoff_factor
    }

    /// Set the attempt budget, clamped to `1..=12`.
    pub fn set_max_retries(&mut self, max_retries: u32) {
        self.max_retries = max_retries.clamp(Self::MIN_RETRIES, Self::MAX_RETRIES);
    }

    /// Set the initial wait, truncated to whole milliseconds and clamped to
    /// `20ms..=400ms`.
    pub fn set_initial_wait(&mut self, initial_wait: Duration) {
        let millis = u64::try_from(initial_wait.as_millis()).unwrap_or(u64::MAX);
        self.initial_wait =
            Duration::from_millis(millis).clamp(Self::MIN_INITIAL_WAIT, Self::MAX_INITIAL_WAIT);
    }

    /// Set the backoff factor, clamped to `1.0..=4.0`. NaN resets it to the
    /// default.
    pub fn set_backoff_factor(&mut self, backoff_factor: f64) {
        self.backoff_factor = if backoff_factor.is_nan() {
            Self::DEFAULT_BACKOFF_FACTOR
        } else {
            backoff_factor.clamp(Self::MIN_BACKOFF_FACTOR, Self::MAX_BACKOFF_FACTOR)
        };
    }

    /// Install the predicate classifying failures as retryable or not.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use holdfast_core::retry::RetryPolicy;
    /// use std::io;
    ///
    /// let mut policy = RetryPolicy::default();
    /// policy.set_should_retry(|error| {
    ///     error
    ///         .downcast_ref::<io::Error>()
    ///         .is_some_and(|e| e.kind() != io::ErrorKind::InvalidInput)
    /// });
    ///
    /// assert!(!policy.should_retry(&io::Error::from(io::ErrorKind::InvalidInput)));
    /// assert!(policy.should_retry(&io::Error::from(io::ErrorKind::TimedOut)));
    /// ```
    pub fn set_should_retry<F>(&mut self, predicate: F)
    where
        F: Fn(&(dyn Error + 'static)) -> bool + Send + Sync + 'static,
    {
        self.should_retry = Some(Arc::new(predicate));
    }

    /// Remove any installed predicate; every failure is retried again.
    pub fn clear_should_retry(&mut self) {
        self.should_retry = None;
    }

    /// Whether `error` should be retried. Without a predicate, always `true`.
    pub fn should_retry(&self, error: &(dyn Error + 'static)) -> bool {
        self.should_retry
            .as_ref()
            .is_none_or(|predicate| predicate(error))
    }

    /// Wait that follows a wait of `previous`: `previous * backoff_factor`,
    /// truncated to whole milliseconds.
    pub fn next_wait(&self, previous: Duration) -> Duration {
        let millis = previous.as_millis() as f64 * self.backoff_factor;
        // `as` saturates, so an absurdly long schedule pins at u64::MAX ms
        Duration::from_millis(millis as u64)
    }

    /// The waits this policy prescribes between attempts.
    pub fn backoff(&self) -> Backoff<&Self> {
        Backoff::new(self)
    }
}

impl Default for RetryPolicy {
    /// 4 attempts, 50ms initial wait, doubling each time, every failure
    /// retried.
    fn default() -> Self {
        Self {
            max_retries: Self::DEFAULT_MAX_RETRIES,
            initial_wait: Self::DEFAULT_INITIAL_WAIT,
            backoff_factor: Self::DEFAULT_BACKOFF_FACTOR,
            should_retry: None,
        }
    }
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_retries", &self.max_retries)
            .field("initial_wait", &self.initial_wait)
            .field("backoff_factor", &self.backoff_factor)
            .field(
                "should_retry",
                &self.should_retry.as_ref().map(|_| "<predicate>"),
            )
            .finish()
    }
}

impl BackoffStrategy for RetryPolicy {
    fn max_retries(&self) -> u32 {
        self.max_retries
    }

    fn initial_wait(&self) -> Duration {
        self.initial_wait
    }

    fn next_wait(&self, previous: Duration) -> Duration {
        RetryPolicy::next_wait(self, previous)
    }

    fn should_retry(&self, error: &(dyn Error + 'static)) -> bool {
        RetryPolicy::should_retry(self, error)
    }
}

/// Builder for configuring [`RetryPolicy`].
///
/// Unset parameters keep their defaults; set ones are clamped on `build`.
#[derive(Default)]
pub struct RetryPolicyBuilder {
    max_retries: Option<u32>,
    initial_wait: Option<Duration>,
    backoff_factor: Option<f64>,
    should_retry: Option<RetryPredicate>,
}

impl RetryPolicyBuilder {
    /// Set the total number of attempts.
    ///
    /// Default: 4
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    /// Set the wait before the second attempt.
    ///
    /// Default: 50ms
    pub fn initial_wait(mut self, initial_wait: Duration) -> Self {
        self.initial_wait = Some(initial_wait);
        self
    }

    /// Set the multiplier applied to the wait after each failure.
    ///
    /// Default: 2.0
    pub fn backoff_factor(mut self, backoff_factor: f64) -> Self {
        self.backoff_factor = Some(backoff_factor);
        self
    }

    /// Only retry failures for which `predicate` returns `true`.
    pub fn should_retry<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&(dyn Error + 'static)) -> bool + Send + Sync + 'static,
    {
        self.should_retry = Some(Arc::new(predicate));
        self
    }

    /// Build the policy, clamping every configured parameter.
    pub fn build(self) -> RetryPolicy {
        let mut policy = RetryPolicy::default();
        if let Some(max_retries) = self.max_retries {
            policy.set_max_retries(max_retries);
        }
        if let Some(initial_wait) = self.initial_wait {
            policy.set_initial_wait(initial_wait);
        }
        if let Some(backoff_factor) = self.backoff_factor {
            policy.set_backoff_factor(backoff_factor);
        }
        policy.should_retry = self.should_retry;
        policy
    }
}

impl fmt::Debug for RetryPolicyBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicyBuilder")
            .field("max_retries", &self.max_retries)
            .field("initial_wait", &self.initial_wait)
            .field("backoff_factor", &self.backoff_factor)
            .finish_non_exhaustive()
    }
}
