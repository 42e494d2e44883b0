#![deny(unsafe_code)]
#![warn(missing_docs)]

//! Reference-counted resource lifecycles and retry/backoff execution.
//!
//! This crate provides two small control-flow primitives that higher-level
//! resource owners compose:
//!
//! - **Scoped resource sharing** via the [`Openable`](resource::Openable) trait
//!   - Reentrant open-count that never goes negative
//!   - Guards that close exactly once however the scope exits
//!   - Async acquisition that waits for setup before handing out the guard
//! - **Retry with exponential backoff** via [`RetryExecutor`](retry::RetryExecutor)
//!   - Clamped [`RetryPolicy`](retry::RetryPolicy) parameters
//!   - Injectable classification of non-retryable failures
//!   - Blocking, async, and cancellable execution
//! - **Configuration** of retry policies from TOML and the environment
//!
//! Neither half depends on the other. The usual composition retries a
//! scoped use of a resource:
//!
//! ```rust
//! use holdfast_core::prelude::*;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let connection = OpenableResource::new();
//! let executor = RetryExecutor::new();
//!
//! let rows = executor.run(
//!     || {
//!         let conn = connection.acquire();
//!         assert!(conn.is_open());
//!         Ok::<_, std::io::Error>(3)
//!     },
//!     &RetryPolicy::default(),
//! )?;
//!
//! assert_eq!(rows, 3);
//! assert!(!connection.is_open());
//! # Ok(())
//! # }
//! ```
//!
//! The library emits `tracing` events but never installs a subscriber.

pub mod config;
pub mod error;
pub mod resource;
pub mod retry;

/// Convenient re-exports of commonly used items.
///
/// Import all core abstractions with:
///
/// ```rust
/// use holdfast_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::RetryPolicyConfig;
    pub use crate::error::{ConfigError, RetryError};
    pub use crate::resource::{
        AcquisitionGuard, LifecycleState, OpenCount, Openable, OpenableExt, OpenableResource,
        OwnedAcquisitionGuard,
    };
    pub use crate::retry::{BackoffStrategy, RetryExecutor, RetryPolicy, RetryPolicyBuilder};
}
