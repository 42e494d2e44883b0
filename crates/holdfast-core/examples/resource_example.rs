//! Example: Sharing one connection between several consumers
//!
//! This example shows a connection whose asynchronous handshake runs before
//! any guard is handed out, nested acquisitions keeping it open, and the
//! corrective close when the owner is dropped.
//!
//! Run with:
//! ```bash
//! RUST_LOG=holdfast_core=trace cargo run -p holdfast-core --example resource_example
//! ```

use async_trait::async_trait;
use holdfast_core::prelude::*;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// A database connection that is expensive to establish
struct DatabaseConnection {
    connection_string: String,
    count: OpenCount,
}

impl DatabaseConnection {
    fn new(connection_string: impl Into<String>) -> Self {
        Self {
            connection_string: connection_string.into(),
            count: OpenCount::new(),
        }
    }
}

#[async_trait]
impl Openable for DatabaseConnection {
    fn open_count(&self) -> &OpenCount {
        &self.count
    }

    fn label(&self) -> &str {
        &self.connection_string
    }

    async fn open_async(&self) {
        if !self.is_open() {
            println!("  Establishing session to {}...", self.connection_string);
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
        self.open_count().increment();
    }

    fn close(&self) {
        if self.open_count().decrement() == Some(0) {
            println!("  Last user gone, closing {}", self.connection_string);
        }
    }
}

impl Drop for DatabaseConnection {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let db = Arc::new(DatabaseConnection::new("postgres://localhost/mydb"));
    println!("Created connection (state: {})", db.state());

    println!("\nFirst consumer acquires...");
    let first = db.acquire_async().await;
    println!("State after acquire: {}", first.state());

    println!("\nSecond consumer acquires from a spawned task...");
    let second = Arc::clone(&db).acquire_owned_async().await;
    let worker = tokio::spawn(async move {
        println!("  Worker sees {} openings", second.open_count().get());
    });
    worker.await?;

    println!("\nFirst consumer releases...");
    drop(first);
    println!("State: {}", db.state());

    println!("\nLeaking an opening, then dropping the owner...");
    db.open();
    drop(db);

    Ok(())
}
