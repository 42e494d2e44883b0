//! Integration tests composing resource guards with the retry executor

use async_trait::async_trait;
use holdfast_core::prelude::*;
use holdfast_core::retry::RecordingSleeper;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

/// A session that needs an asynchronous handshake before it counts as open.
struct Session {
    count: OpenCount,
    handshakes: AtomicU32,
    ready: AtomicBool,
}

impl Session {
    fn new() -> Self {
        Self {
            count: OpenCount::new(),
            handshakes: AtomicU32::new(0),
            ready: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl Openable for Session {
    fn open_count(&self) -> &OpenCount {
        &self.count
    }

    fn label(&self) -> &str {
        "session"
    }

    async fn open_async(&self) {
        tokio::time::sleep(Duration::from_millis(25)).await;
        self.handshakes.fetch_add(1, Ordering::SeqCst);
        self.ready.store(true, Ordering::SeqCst);
        self.open_count().increment();
    }

    fn close(&self) {
        if self.open_count().decrement() == Some(0) {
            self.ready.store(false, Ordering::SeqCst);
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[test]
fn test_retried_scope_releases_every_attempt() {
    let resource = OpenableResource::new();
    let sleeper = RecordingSleeper::new();
    let executor = RetryExecutor::with_sleeper(sleeper.clone());
    let attempts = AtomicU32::new(0);

    let result = executor.run(
        || {
            let _guard = resource.acquire();
            assert_eq!(resource.open_count().get(), 1);

            if attempts.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(io::Error::other("query failed"))
            } else {
                Ok("rows")
            }
        },
        &RetryPolicy::default(),
    );

    assert_eq!(result.unwrap(), "rows");
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
    assert!(!resource.is_open());
    assert_eq!(
        sleeper.waits(),
        vec![Duration::from_millis(50), Duration::from_millis(100)]
    );
}

#[test]
fn test_exhausted_scope_leaves_resource_closed() {
    let resource = OpenableResource::new();
    let executor = RetryExecutor::with_sleeper(RecordingSleeper::new());
    let policy = RetryPolicy::builder().max_retries(3).build();

    let result: Result<(), _> = executor.run(
        || {
            let _guard = resource.acquire();
            Err(io::Error::other("still broken"))
        },
        &policy,
    );

    let err = result.unwrap_err();
    assert_eq!(err.attempts(), Some(3));
    assert_eq!(err.into_inner().unwrap().to_string(), "still broken");
    assert!(!resource.is_open());
}

#[test]
fn test_outer_guard_keeps_resource_open_across_retries() {
    let resource = OpenableResource::new();
    let executor = RetryExecutor::with_sleeper(RecordingSleeper::new());
    let outer = resource.acquire();

    let _: Result<(), _> = executor.run(
        || {
            let _inner = resource.acquire();
            Err(io::Error::other("nope"))
        },
        &RetryPolicy::builder().max_retries(2).build(),
    );

    assert!(resource.is_open());
    assert_eq!(resource.open_count().get(), 1);
    drop(outer);
    assert_eq!(resource.state(), LifecycleState::Closed);
}

#[tokio::test(start_paused = true)]
async fn test_async_retry_with_async_acquisition() {
    let session = Session::new();
    let executor = RetryExecutor::new();
    let attempts = AtomicU32::new(0);

    let result = executor
        .run_async(
            || async {
                let guard = session.acquire_async().await;
                assert!(guard.ready.load(Ordering::SeqCst));

                if attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(io::Error::from(io::ErrorKind::TimedOut))
                } else {
                    Ok(guard.handshakes.load(Ordering::SeqCst))
                }
            },
            &RetryPolicy::default(),
        )
        .await;

    assert_eq!(result.unwrap(), 2);
    assert!(!session.is_open());
    assert!(!session.ready.load(Ordering::SeqCst));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_guards_balance() {
    let resource = Arc::new(OpenableResource::new());

    let tasks: Vec<_> = (0..64)
        .map(|i| {
            let resource = Arc::clone(&resource);
            tokio::spawn(async move {
                let guard = resource.acquire_owned_async().await;
                assert!(guard.is_open());
                if i % 2 == 0 {
                    tokio::task::yield_now().await;
                }
                drop(guard);
            })
        })
        .collect();

    for task in tasks {
        task.await.unwrap();
    }

    assert_eq!(resource.open_count().get(), 0);
    assert!(!resource.is_open());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_async_acquisitions_each_handshake() {
    let session = Arc::new(Session::new());

    let tasks: Vec<_> = (0..16)
        .map(|_| {
            let session = Arc::clone(&session);
            tokio::spawn(async move {
                let guard = Arc::clone(&session).acquire_owned_async().await;
                assert!(guard.is_open());
            })
        })
        .collect();

    for task in tasks {
        task.await.unwrap();
    }

    assert_eq!(session.handshakes.load(Ordering::SeqCst), 16);
    assert!(!session.is_open());
}

#[test]
fn test_dispose_closes_once_despite_leaked_guard() {
    let session = Session::new();
    session.open();
    assert!(session.is_open());

    // Forgetting a guard leaks one opening; disposal still closes once
    std::mem::forget(session.acquire());
    assert_eq!(session.open_count().get(), 2);

    session.dispose();
    assert_eq!(session.open_count().get(), 1);
}

#[test]
fn test_policy_loaded_from_file_drives_executor() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("retry.toml");
    std::fs::write(&path, "max_retries = 2\ninitial_wait_ms = 30\nbackoff_factor = 3.0\n")?;

    let policy = RetryPolicyConfig::from_file(&path)?.into_policy();

    let sleeper = RecordingSleeper::new();
    let executor = RetryExecutor::with_sleeper(sleeper.clone());
    let result: Result<(), _> = executor.run(|| Err(io::Error::other("down")), &policy);

    assert!(result.unwrap_err().is_exhausted());
    assert_eq!(sleeper.waits(), vec![Duration::from_millis(30)]);
    Ok(())
}
