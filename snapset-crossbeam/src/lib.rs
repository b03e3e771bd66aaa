//! Crossbeam-based memory reclamation for snapset collections.
//!
//! This crate provides `EpochGuard`, an implementation of the `Guard` trait
//! using crossbeam-epoch, for long-running use of `SnapshotList`.
//!
//! # Usage
//!
//! ```
//! use snapset_core::{ConcurrentSet, SnapshotList};
//! use snapset_crossbeam::EpochGuard;
//!
//! let set: SnapshotList<i32, EpochGuard> = SnapshotList::new();
//! set.add(42);
//! assert_eq!(set.to_vec(), vec![42]);
//! ```

pub mod epoch_guard;

pub use epoch_guard::EpochGuard;
