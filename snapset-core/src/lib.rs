//! Lock-free linearizable sorted set with snapshot iteration.
//!
//! - [`SnapshotList`] - the set: Harris-style marked-pointer list whose
//!   iterators use a shared snapshot collector
//! - [`BlockingCollector`] - lock-free append-only collection that can be sealed
//! - [`Guard`] - memory reclamation abstraction; [`DeferredGuard`] for tests,
//!   `EpochGuard` from `snapset-crossbeam` for production

mod tracing_helpers;

pub mod common_tests;
pub mod data_structures;
pub mod error;
pub mod guard;

// Re-exports for convenience
pub use data_structures::{
    AppendOnlyCollection, BlockingCollector, ConcurrentSet, SnapshotIter, SnapshotList,
};
pub use error::CollectorError;
pub use guard::{DeferredGuard, Guard};
