//! Reclamation that waits for the owning set to drop.
//!
//! Every retired node and collector stays allocated until the `DeferredGuard`
//! is dropped, so tests can count retirements and never race a free.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

use super::Guard;

/// Guard that frees retired objects only when it is dropped itself.
///
/// Memory grows with every unlink and every replaced snapshot collector, so
/// this is meant for tests and short-lived sets. Use `EpochGuard` from
/// `snapset-crossbeam` otherwise.
///
/// Retiring the same address twice panics, which catches broken
/// exactly-once retirement in the set.
///
#[derive(Default)]
pub struct DeferredGuard {
    retired: Mutex<RetiredList>,
}

#[derive(Default)]
struct RetiredList {
    entries: Vec<Retired>,
    addresses: HashSet<usize>,
}

struct Retired {
    addr: usize,
    free: unsafe fn(*mut ()),
}

impl DeferredGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of objects waiting for destruction.
    pub fn pending(&self) -> usize {
        self.lock().entries.len()
    }

    fn lock(&self) -> MutexGuard<'_, RetiredList> {
        // A panicking test thread must not leak everything it retired.
        self.retired.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for DeferredGuard {
    fn drop(&mut self) {
        let list = self
            .retired
            .get_mut()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        for entry in list.entries.drain(..) {
            unsafe { (entry.free)(entry.addr as *mut ()) };
        }
    }
}

impl Guard for DeferredGuard {
    /// Nothing to pin: retired objects outlive every operation on the set.
    type ReadGuard = ();

    fn pin() -> Self::ReadGuard {}

    unsafe fn defer_destroy<N>(&self, node: *mut N, dealloc: unsafe fn(*mut N)) {
        let addr = node as usize;
        // Only the pointee type differs; the calling convention is the same.
        let free = unsafe { std::mem::transmute::<unsafe fn(*mut N), unsafe fn(*mut ())>(dealloc) };

        let mut list = self.lock();
        if !list.addresses.insert(addr) {
            drop(list);
            panic!("object at {:#x} retired twice", addr);
        }
        list.entries.push(Retired { addr, free });
    }
}
