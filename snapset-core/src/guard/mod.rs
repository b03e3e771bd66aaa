//! Memory reclamation for the lock-free set.
//!
//! Two kinds of object leave the set while other threads may still be
//! looking at them: list nodes unlinked by a compare-and-swap, and snapshot
//! collectors replaced in the collector slot. Neither may be freed while a
//! thread that could have loaded it is still inside an operation.
//!
//! ```text
//! SnapshotList<T, G: Guard>
//!     │
//!     ├── G = EpochGuard      frees after an epoch grace period (snapset-crossbeam)
//!     └── G = DeferredGuard   frees when the set drops (tests)
//! ```

mod deferred_guard;

pub use deferred_guard::DeferredGuard;

/// Reclamation scheme a set is parameterised with.
///
/// The set keeps one `Guard` value for retiring objects and calls
/// [`Guard::pin`] at the start of every public operation.
///
/// # Safety Contract
///
/// An object handed to `defer_destroy` must stay allocated until every
/// `ReadGuard` that existed at the time of the call has been dropped.
///
pub trait Guard: Sized + Default + Send + Sync {
    /// Protection token held for the duration of one operation.
    ///
    /// A pinned `crossbeam_epoch::Guard` for epochs, `()` when nothing is
    /// freed before the set drops.
    type ReadGuard: Sized;

    fn pin() -> Self::ReadGuard;

    /// Schedule `node` to be freed with `dealloc` once no reader can hold it.
    ///
    /// # Safety
    ///
    /// - `node` must already be unreachable from the set
    /// - each object may be retired only once
    /// - `dealloc` must match how `node` was allocated
    ///
    unsafe fn defer_destroy<N>(&self, node: *mut N, dealloc: unsafe fn(*mut N));
}
