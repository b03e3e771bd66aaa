//! Epoch-based guard implementation using crossbeam-epoch.
//!
//! # Design
//!
//! `EpochGuard` is a zero-sized type that schedules destruction using the
//! global epoch collector. Unlinked list nodes and replaced snapshot
//! collectors are freed once every thread pinned at retirement time has
//! unpinned:
//!
//! ```text
//! SnapshotList<i32, EpochGuard>
//!     │
//!     ├── add / remove / contains / iter   pin for the whole operation
//!     └── retire(node | collector)         defer_unchecked on the global collector
//! ```

use crossbeam_epoch::{self as epoch, Guard as CrossbeamGuard};
use snapset_core::guard::Guard;

/// Guard backed by the global crossbeam-epoch collector.
///
/// Stateless, so a set parameterised with it stays `Send + Sync` and pays
/// nothing per instance. Retired nodes and collectors are queued on the
/// current thread's epoch bag and freed after a grace period, which keeps
/// memory bounded for long-running sets (unlike `DeferredGuard`).
///
#[derive(Debug, Clone, Copy, Default)]
pub struct EpochGuard;

impl EpochGuard {
    pub fn new() -> Self {
        EpochGuard
    }
}

impl Guard for EpochGuard {
    /// A pinned crossbeam guard, held for the duration of one set operation.
    type ReadGuard = CrossbeamGuard;

    fn pin() -> Self::ReadGuard {
        epoch::pin()
    }

    unsafe fn defer_destroy<N>(&self, node: *mut N, dealloc: unsafe fn(*mut N)) {
        // Raw pointers are not Send; carry the address instead.
        let addr = node as usize;
        let guard = epoch::pin();
        unsafe {
            guard.defer_unchecked(move || {
                dealloc(addr as *mut N);
            });
        }
    }
}
