//! Append-only collections that can be sealed against further additions.
//!
//! The snapshot protocol keeps its in-flight bookkeeping in these: many
//! threads append concurrently, one thread seals, and every reader then sees
//! the same fixed contents.

pub mod append_only_collection;
pub mod blocking_collector;

pub use append_only_collection::AppendOnlyCollection;
pub use blocking_collector::{BlockingCollector, Contents};
