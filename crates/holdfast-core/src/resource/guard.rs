//! Scope-bound acquisition guards.
//!
//! A guard pairs exactly one `open` with exactly one eventual `close` on its
//! target. The close runs when the guard is dropped, so it happens on normal
//! return, on `?` propagation and during panic unwinding alike.

use super::Openable;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

/// Guard borrowing an [`Openable`] for the length of a scope.
///
/// Obtained through [`OpenableExt::acquire`](super::OpenableExt::acquire) or
/// [`OpenableExt::acquire_async`](super::OpenableExt::acquire_async). The
/// resource is already open by the time the guard is handed out.
///
/// # Examples
///
/// ```rust
/// use holdfast_core::resource::{OpenableExt, OpenableResource, Openable};
///
/// let resource = OpenableResource::new();
/// {
///     let _guard = resource.acquire();
///     assert!(resource.is_open());
/// }
/// assert!(!resource.is_open());
/// ```
#[must_use = "the resource is closed again as soon as the guard is dropped"]
pub struct AcquisitionGuard<'a, R: Openable + ?Sized> {
    resource: &'a R,
    released: bool,
}

impl<'a, R: Openable + ?Sized> AcquisitionGuard<'a, R> {
    /// Open `resource` and return a guard for it.
    pub fn acquire(resource: &'a R) -> Self {
        resource.open();
        Self {
            resource,
            released: false,
        }
    }

    /// Await `resource.open_async()` and only then return a guard for it.
    ///
    /// The await on the open is the only suspension point; nothing can be
    /// done through the guard before the open has completed.
    pub async fn acquire_async(resource: &'a R) -> Self {
        resource.open_async().await;
        Self {
            resource,
            released: false,
        }
    }

    /// The guarded resource.
    pub fn resource(&self) -> &'a R {
        self.resource
    }

    /// Whether this guard has already closed its resource.
    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Close the resource now instead of at the end of the scope.
    ///
    /// Only the first call closes; later calls and the eventual drop are
    /// no-ops.
    pub fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.resource.close();
        }
    }
}

impl<R: Openable + ?Sized> Deref for AcquisitionGuard<'_, R> {
    type Target = R;

    fn deref(&self) -> &R {
        self.resource
    }
}

impl<R: Openable + ?Sized> Drop for AcquisitionGuard<'_, R> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<R: Openable + ?Sized> fmt::Debug for AcquisitionGuard<'_, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AcquisitionGuard")
            .field("resource", &self.resource.label())
            .field("released", &self.released)
            .finish()
    }
}

/// Guard holding an `Arc` to its resource.
///
/// Same contract as [`AcquisitionGuard`], but `'static`, so it can be moved
/// into spawned tasks.
///
/// # Examples
///
/// ```rust
/// use holdfast_core::resource::{OpenableExt, OpenableResource, Openable};
/// use std::sync::Arc;
///
/// # #[tokio::main]
/// # async fn main() {
/// let resource = Arc::new(OpenableResource::new());
/// let guard = Arc::clone(&resource).acquire_owned();
///
/// tokio::spawn(async move {
///     assert!(guard.is_open());
/// })
/// .await
/// .unwrap();
///
/// assert!(!resource.is_open());
/// # }
/// ```
#[must_use = "the resource is closed again as soon as the guard is dropped"]
pub struct OwnedAcquisitionGuard<R: Openable + ?Sized> {
    resource: Arc<R>,
    released: bool,
}

impl<R: Openable + ?Sized> OwnedAcquisitionGuard<R> {
    /// Open `resource` and return a guard owning a handle to it.
    pub fn acquire(resource: Arc<R>) -> Self {
        resource.open();
        Self {
            resource,
            released: false,
        }
    }

    /// Await `resource.open_async()` and only then return a guard for it.
    pub async fn acquire_async(resource: Arc<R>) -> Self {
        resource.open_async().await;
        Self {
            resource,
            released: false,
        }
    }

    /// The guarded resource.
    pub fn resource(&self) -> &Arc<R> {
        &self.resource
    }

    /// Whether this guard has already closed its resource.
    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Close the resource now. Idempotent.
    pub fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.resource.close();
        }
    }
}

impl<R: Openable + ?Sized> Deref for OwnedAcquisitionGuard<R> {
    type Target = R;

    fn deref(&self) -> &R {
        &self.resource
    }
}

impl<R: Openable + ?Sized> Drop for OwnedAcquisitionGuard<R> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<R: Openable + ?Sized> fmt::Debug for OwnedAcquisitionGuard<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OwnedAcquisitionGuard")
            .field("resource", &self.resource.label())
            .field("released", &self.released)
            .finish()
    }
}
