//! Example: Retrying fallible operations with RetryExecutor
//!
//! This example demonstrates:
//! 1. Async retry with exponential backoff
//! 2. A predicate that refuses to retry malformed input
//! 3. The blocking path and the clamped policy parameters
//!
//! Run with:
//! ```bash
//! RUST_LOG=holdfast_core=debug cargo run -p holdfast-core --example retry_example
//! ```

use holdfast_core::prelude::*;
use std::io;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

/// A simulated API that fails the first few times
struct UnreliableApi {
    attempts: AtomicU32,
    fail_count: u32,
}

impl UnreliableApi {
    fn new(fail_count: u32) -> Self {
        Self {
            attempts: AtomicU32::new(0),
            fail_count,
        }
    }

    fn call(&self) -> io::Result<String> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;

        if attempt <= self.fail_count {
            println!("  Attempt {attempt}: FAILED (simulating transient error)");
            Err(io::Error::new(
                io::ErrorKind::TimedOut,
                format!("timed out on attempt {attempt}"),
            ))
        } else {
            println!("  Attempt {attempt}: SUCCESS");
            Ok("API response data".to_string())
        }
    }

    fn total_attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}

/// Example 1: Async retry with exponential backoff
async fn example_async_retry() -> anyhow::Result<()> {
    println!("\n=== Example 1: Async Retry with Exponential Backoff ===\n");

    let policy = RetryPolicy::builder()
        .max_retries(4)
        .initial_wait(Duration::from_millis(100))
        .backoff_factor(2.0)
        .build();

    let api = UnreliableApi::new(2);
    let start = Instant::now();

    let response = RetryExecutor::new()
        .run_async(|| async { api.call() }, &policy)
        .await?;

    println!("\nResult: {response}");
    println!("Total attempts: {}", api.total_attempts());
    println!("Elapsed: {:?} (waits of 100ms + 200ms)", start.elapsed());
    Ok(())
}

/// Example 2: Classify malformed input as non-retryable
async fn example_non_retryable() -> anyhow::Result<()> {
    println!("\n=== Example 2: Non-Retryable Failures ===\n");

    let policy = RetryPolicy::builder()
        .should_retry(|error| {
            error
                .downcast_ref::<io::Error>()
                .is_none_or(|e| e.kind() != io::ErrorKind::InvalidData)
        })
        .build();

    let attempts = AtomicU32::new(0);
    let result: Result<(), _> = RetryExecutor::new()
        .run_async(
            || async {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err(io::Error::new(io::ErrorKind::InvalidData, "malformed payload"))
            },
            &policy,
        )
        .await;

    match result {
        Err(RetryError::NonRetryable(err)) => {
            println!("Gave up immediately: {err}");
            println!("Total attempts: {}", attempts.load(Ordering::SeqCst));
        }
        other => anyhow::bail!("unexpected outcome: {other:?}"),
    }
    Ok(())
}

/// Example 3: Blocking retry and clamped parameters
fn example_blocking_retry() -> anyhow::Result<()> {
    println!("\n=== Example 3: Blocking Retry ===\n");

    // Out-of-range values are pulled back into bounds
    let policy = RetryPolicy::new(100, Duration::from_millis(1), 10.0);
    println!("Clamped policy: {policy:?}");

    let waits: Vec<_> = policy.backoff().take(4).collect();
    println!("First waits: {waits:?}");

    let api = UnreliableApi::new(1);
    let response = RetryExecutor::new().run(|| api.call(), &policy)?;
    println!("Result: {response} after {} attempts", api.total_attempts());
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    example_async_retry().await?;
    example_non_retryable().await?;
    tokio::task::spawn_blocking(example_blocking_retry).await??;

    println!("\n=== All examples completed ===");
    Ok(())
}
