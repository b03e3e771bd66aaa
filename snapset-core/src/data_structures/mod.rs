//! Data structures for the concurrent snapshot set.
//!
//! # Organization
//!
//! - [`sorted`] - The lock-free sorted set (`SnapshotList`) and its snapshot collector
//! - [`collector`] - Append-only collections sealed against further additions
//! - [`concurrent_set`] - The public `ConcurrentSet` API
//! - `internal` - Internal implementation details (pub(crate))

pub mod collector;
pub mod concurrent_set;
pub(crate) mod internal;
pub mod sorted;

pub use collector::{AppendOnlyCollection, BlockingCollector};
pub use concurrent_set::{ConcurrentSet, SnapshotIter};
pub use sorted::SnapshotList;

// MarkedPtr stays pub(crate) - truly internal implementation detail
pub(crate) use internal::MarkedPtr;
