//! Reference-counted resource lifecycle management.
//!
//! Several logical consumers can share one underlying resource (a
//! connection, a handle, a session). Each consumer acquires a guard that
//! opens the resource on entry and closes it when the guard goes out of
//! scope; the resource stays open while any guard is alive.
//!
//! # Key Types
//!
//! - [`Openable`] - the open/close contract a managed resource implements
//! - [`OpenableExt`] - scoped acquisition for every [`Openable`]
//! - [`OpenCount`] - the atomic, floor-at-zero counter behind it
//! - [`OpenableResource`] - base resource with no setup work of its own
//! - [`AcquisitionGuard`] / [`OwnedAcquisitionGuard`] - scope-bound openings
//!
//! # Examples
//!
//! ```rust
//! use holdfast_core::resource::{OpenCount, Openable, OpenableExt};
//! use async_trait::async_trait;
//!
//! struct Connection {
//!     count: OpenCount,
//! }
//!
//! #[async_trait]
//! impl Openable for Connection {
//!     fn open_count(&self) -> &OpenCount {
//!         &self.count
//!     }
//!
//!     async fn open_async(&self) {
//!         // establish the session here, then count the opening
//!         self.open_count().increment();
//!     }
//! }
//!
//! impl Drop for Connection {
//!     fn drop(&mut self) {
//!         self.dispose();
//!     }
//! }
//!
//! # #[tokio::main]
//! # async fn main() {
//! let conn = Connection { count: OpenCount::new() };
//! {
//!     let _a = conn.acquire_async().await;
//!     let _b = conn.acquire();
//!     assert_eq!(conn.open_count().get(), 2);
//! }
//! assert!(!conn.is_open());
//! # }
//! ```

mod count;
mod guard;

pub use count::OpenCount;
pub use guard::{AcquisitionGuard, OwnedAcquisitionGuard};

use async_trait::async_trait;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Externally observable lifecycle state of an [`Openable`].
///
/// The open-count itself is only a reentrancy depth; callers see two states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    /// No outstanding openings.
    Closed,
    /// At least one outstanding opening.
    Open,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed => write!(f, "closed"),
            Self::Open => write!(f, "open"),
        }
    }
}

/// A resource whose logical open/closed state is reference-counted.
///
/// Implementors only have to hand out their [`OpenCount`]. The provided
/// methods do the bookkeeping; a resource that performs real work when it
/// opens or closes overrides them and must still update the shared counter
/// exactly once per call (typically `self.open_count().increment()` after
/// the work is done).
///
/// None of these operations fail. Closing more often than opening is a
/// no-op rather than an error, so nested and overlapping acquisitions are
/// always safe.
///
/// # Examples
///
/// ```rust
/// use holdfast_core::resource::{OpenCount, Openable};
///
/// struct FileHandle {
///     count: OpenCount,
/// }
///
/// impl Openable for FileHandle {
///     fn open_count(&self) -> &OpenCount {
///         &self.count
///     }
/// }
///
/// let handle = FileHandle { count: OpenCount::new() };
/// handle.open();
/// handle.open();
/// handle.close();
/// assert!(handle.is_open());
/// handle.close();
/// handle.close(); // spurious close is ignored
/// assert!(!handle.is_open());
/// ```
#[async_trait]
pub trait Openable: Send + Sync {
    /// The counter tracking outstanding openings of this resource.
    fn open_count(&self) -> &OpenCount;

    /// Name used in log events. Defaults to the type name.
    fn label(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Add one opening.
    fn open(&self) {
        let count = self.open_count().increment();
        tracing::trace!(resource = self.label(), count, "resource opened");
    }

    /// Finish any asynchronous setup, then add one opening.
    ///
    /// The default has no setup to wait for and behaves like [`open`](Self::open).
    async fn open_async(&self) {
        self.open();
    }

    /// Remove one opening, if any are outstanding.
    fn close(&self) {
        match self.open_count().decrement() {
            Some(count) => {
                tracing::trace!(resource = self.label(), count, "resource closed");
            }
            None => {
                tracing::trace!(resource = self.label(), "ignoring close of closed resource");
            }
        }
    }

    /// `true` while at least one opening is outstanding.
    fn is_open(&self) -> bool {
        self.open_count().is_open()
    }

    /// Current lifecycle state.
    fn state(&self) -> LifecycleState {
        if self.is_open() {
            LifecycleState::Open
        } else {
            LifecycleState::Closed
        }
    }

    /// Corrective close for an owner that is going away.
    ///
    /// Closes once if the resource is still open. This does not balance
    /// outstanding acquisitions; call it from `Drop` of the owning type.
    fn dispose(&self) {
        if self.is_open() {
            tracing::debug!(
                resource = self.label(),
                count = self.open_count().get(),
                "disposing resource that is still open"
            );
            self.close();
        }
    }
}

/// Scoped acquisition, available on every [`Openable`].
pub trait OpenableExt: Openable {
    /// Open the resource and return a guard that closes it on drop.
    fn acquire(&self) -> AcquisitionGuard<'_, Self> {
        AcquisitionGuard::acquire(self)
    }

    /// Await [`Openable::open_async`], then return a guard that closes the
    /// resource on drop.
    fn acquire_async(&self) -> impl Future<Output = AcquisitionGuard<'_, Self>> + Send {
        AcquisitionGuard::acquire_async(self)
    }

    /// Like [`acquire`](Self::acquire), but the guard keeps the resource
    /// alive through an `Arc`.
    fn acquire_owned(self: Arc<Self>) -> OwnedAcquisitionGuard<Self> {
        OwnedAcquisitionGuard::acquire(self)
    }

    /// Like [`acquire_async`](Self::acquire_async), but the guard keeps the
    /// resource alive through an `Arc`.
    fn acquire_owned_async(
        self: Arc<Self>,
    ) -> impl Future<Output = OwnedAcquisitionGuard<Self>> + Send {
        OwnedAcquisitionGuard::acquire_async(self)
    }
}

impl<R: Openable + ?Sized> OpenableExt for R {}

/// A resource with no setup or teardown work of its own.
///
/// Embed it in a type that only needs the counting, or use it directly as a
/// shared "in use" marker. Dropping it performs the corrective close from
/// [`Openable::dispose`].
#[derive(Debug, Default)]
pub struct OpenableResource {
    count: OpenCount,
}

impl OpenableResource {
    /// Create a closed resource.
    pub const fn new() -> Self {
        Self {
            count: OpenCount::new(),
        }
    }
}

impl Openable for OpenableResource {
    fn open_count(&self) -> &OpenCount {
        &self.count
    }
}

impl Drop for OpenableResource {
    fn drop(&mut self) {
        self.dispose();
    }
}
