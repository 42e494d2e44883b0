//! Atomic open-count with a floor-at-zero decrement.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Reentrant reference count backing an [`Openable`](super::Openable) resource.
///
/// The count is the only mutable state a resource shares between its
/// acquirers. Every update is a single atomic operation, so concurrent guards
/// on the same resource never lose an increment and the count never drops
/// below zero.
///
/// # Examples
///
/// ```rust
/// use holdfast_core::resource::OpenCount;
///
/// let count = OpenCount::new();
/// assert_eq!(count.increment(), 1);
/// assert_eq!(count.increment(), 2);
/// assert_eq!(count.decrement(), Some(1));
/// assert_eq!(count.decrement(), Some(0));
///
/// // Spurious extra decrements are ignored
/// assert_eq!(count.decrement(), None);
/// assert_eq!(count.get(), 0);
/// ```
#[derive(Debug, Default)]
pub struct OpenCount {
    count: AtomicUsize,
}

impl OpenCount {
    /// Create a counter in the closed state (count 0).
    pub const fn new() -> Self {
        Self {
            count: AtomicUsize::new(0),
        }
    }

    /// Add one outstanding opening and return the new count.
    pub fn increment(&self) -> usize {
        self.count.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Remove one outstanding opening.
    ///
    /// Returns the new count, or `None` if the count was already zero and
    /// nothing changed.
    pub fn decrement(&self) -> Option<usize> {
        self.count
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .ok()
            .map(|previous| previous - 1)
    }

    /// Current number of outstanding openings.
    pub fn get(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    /// `true` while at least one opening is outstanding.
    pub fn is_open(&self) -> bool {
        self.get() > 0
    }
}
