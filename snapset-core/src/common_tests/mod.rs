//! Shared test bodies for `ConcurrentSet` implementations.
//!
//! Each guard flavour runs the same assertions from its own `tests/` directory.
