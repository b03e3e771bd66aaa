//! Lock-free sorted set with snapshot iteration.
//!
//! The set is parameterized by a guard type `G: Guard` that determines the
//! memory reclamation strategy:
//!
//! - `DeferredGuard`: Testing - defers destruction until the set drops
//! - `EpochGuard`: Production - epoch-based reclamation (snapset-crossbeam)

pub(crate) mod snap_collector;
pub mod snapshot_list;

pub use snapshot_list::SnapshotList;
