//! Error types.

use thiserror::Error;

/// Failures surfaced by an append-only collection.
///
/// These are contract violations by the caller, never transient conditions:
/// the snapshot path seals a collector before reading it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CollectorError {
    /// `contents()` was called before `seal()`.
    #[error("collector contents read before the collector was sealed")]
    NotSealed,
}
