//! Retry execution with exponential backoff.
//!
//! A [`RetryExecutor`] re-invokes a fallible operation under a
//! [`BackoffStrategy`] until it succeeds, the strategy declares a failure
//! non-retryable, or the attempt budget runs out. [`RetryPolicy`] is the
//! standard strategy: clamped parameters, multiplicative waits, and an
//! injectable predicate for classifying failures.
//!
//! # Key Types
//!
//! - [`RetryPolicy`] - clamped attempt budget, initial wait and factor
//! - [`BackoffStrategy`] - the trait the executor is generic over
//! - [`Backoff`] - iterator over a strategy's waits
//! - [`RetryExecutor`] - blocking and async execution
//! - [`Sleeper`] - blocking wait hook ([`ThreadSleeper`], [`RecordingSleeper`])
//!
//! # Examples
//!
//! ```rust
//! use holdfast_core::retry::{RetryExecutor, RetryPolicy};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let policy = RetryPolicy::builder()
//!     .max_retries(3)
//!     .initial_wait(Duration::from_millis(100))
//!     .build();
//!
//! let result = RetryExecutor::new()
//!     .run_async(|| async { Ok::<_, std::io::Error>(42) }, &policy)
//!     .await?;
//! # Ok(())
//! # }
//! ```

mod executor;
mod policy;
mod sleeper;
mod strategy;

pub use executor::RetryExecutor;
pub use policy::{RetryPolicy, RetryPolicyBuilder, RetryPredicate};
pub use sleeper::{RecordingSleeper, Sleeper, ThreadSleeper};
pub use strategy::{Backoff, BackoffStrategy};
