//! Public API of the concurrent sorted set.

use std::iter::FusedIterator;

use crate::error::CollectorError;
use crate::guard::Guard;

/// A linearizable concurrent sorted set with snapshot iteration.
///
/// # Design
///
/// Implementations supply the unsafe `*_internal` algorithm methods, which
/// require the caller to be pinned. The provided methods pin `Self::Guard`
/// for the whole operation, so user code never touches raw pointers or
/// guards:
///
/// ```text
/// add / remove / contains / iter      ← pins Self::Guard
///    ↓
/// *_internal                          ← lock-free algorithm
///    ↓
/// SnapshotList<T, G>                  ← actual data structure
/// ```
///
/// # Example
///
/// ```rust
/// use snapset_core::{ConcurrentSet, DeferredGuard, SnapshotList};
///
/// let set: SnapshotList<i32, DeferredGuard> = SnapshotList::new();
/// assert!(set.add(15));
/// assert!(set.add(-1));
/// assert!(set.add(0));
/// assert_eq!(set.iter().collect::<Vec<_>>(), vec![-1, 0, 15]);
///
/// assert!(set.remove(&0));
/// assert!(!set.contains(&0));
/// assert_eq!(set.to_vec(), vec![-1, 15]);
/// ```
///
pub trait ConcurrentSet<T: Ord + Clone> {
    type Guard: Guard;

    // =========================================================================
    // Algorithm (caller holds the pin)
    // =========================================================================
    // These walk raw nodes that a concurrent remove may retire; without a pin
    // a retired node can be freed underneath the traversal.

    /// # Safety
    /// The calling thread must be pinned with `Self::Guard::pin()`.
    unsafe fn add_internal(&self, value: T) -> bool;

    /// # Safety
    /// The calling thread must be pinned with `Self::Guard::pin()`.
    unsafe fn remove_internal(&self, value: &T) -> bool;

    /// # Safety
    /// The calling thread must be pinned with `Self::Guard::pin()`.
    unsafe fn contains_internal(&self, value: &T) -> bool;

    /// Take a linearizable snapshot of the set, sorted ascending.
    ///
    /// # Safety
    /// The calling thread must be pinned with `Self::Guard::pin()`.
    unsafe fn snapshot_internal(&self) -> Result<Vec<T>, CollectorError>;

    // =========================================================================
    // Safe Public API (pins the guard for the duration of each call)
    // =========================================================================

    /// Insert a value.
    ///
    /// Returns `true` if the value was inserted, `false` if it already exists.
    ///
    fn add(&self, value: T) -> bool {
        let _guard = Self::Guard::pin();
        unsafe { self.add_internal(value) }
    }

    /// Remove a value.
    ///
    /// Returns `true` if the value was removed, `false` if not found.
    ///
    fn remove(&self, value: &T) -> bool {
        let _guard = Self::Guard::pin();
        unsafe { self.remove_internal(value) }
    }

    fn contains(&self, value: &T) -> bool {
        let _guard = Self::Guard::pin();
        unsafe { self.contains_internal(value) }
    }

    /// Iterate over a snapshot of the set.
    ///
    /// The snapshot reflects a state the set was in at some instant during
    /// this call. It is finite and not restartable: call `iter` again for a
    /// fresh snapshot.
    ///
    fn iter(&self) -> SnapshotIter<T> {
        let _guard = Self::Guard::pin();
        let values = unsafe { self.snapshot_internal() }
            .expect("snapshot collector read before it was sealed");
        SnapshotIter::new(values)
    }

    /// Check emptiness through a full snapshot.
    ///
    /// A structural "head points at tail" check would not be linearizable
    /// with concurrent mutation.
    ///
    fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    /// Collects one snapshot into a Vec.
    fn to_vec(&self) -> Vec<T> {
        self.iter().collect()
    }

    /// Number of elements in one snapshot.
    fn len(&self) -> usize {
        self.iter().len()
    }
}

// ============================================================================
// Iterator Support
// ============================================================================

/// Iterator over an owned snapshot, ascending and without duplicates.
///
/// Values are cloned out of the set while the guard is pinned, so the
/// iterator holds no references into the live structure.
///
#[derive(Debug, Clone)]
pub struct SnapshotIter<T> {
    values: std::vec::IntoIter<T>,
}

impl<T> SnapshotIter<T> {
    pub(crate) fn new(values: Vec<T>) -> Self {
        SnapshotIter {
            values: values.into_iter(),
        }
    }
}

impl<T> Iterator for SnapshotIter<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.values.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.values.size_hint()
    }
}

impl<T> DoubleEndedIterator for SnapshotIter<T> {
    fn next_back(&mut self) -> Option<T> {
        self.values.next_back()
    }
}

impl<T> ExactSizeIterator for SnapshotIter<T> {}

impl<T> FusedIterator for SnapshotIter<T> {}
