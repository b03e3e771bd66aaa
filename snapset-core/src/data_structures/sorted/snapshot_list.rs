use std::fmt;
use std::ptr;
use std::sync::atomic::{AtomicPtr, AtomicU64, Ordering};

use crate::data_structures::ConcurrentSet;
use crate::data_structures::MarkedPtr;
use crate::data_structures::sorted::snap_collector::{Observed, Report, SnapCollector};
use crate::error::CollectorError;
use crate::guard::Guard;
use crate::tracing_helpers::{debug_log, trace_log};

type NodePtr<T> = *mut SnapshotListNode<T>;
type CollectorPtr<T> = *mut SnapCollector<T>;

///
/// Lock-free sorted list with linearizable snapshot iteration.
///
/// Insertion and removal follow Harris's 'A Pragmatic Implementation of
/// Non-Blocking Linked-Lists'; iteration follows Petrank and Timnat's
/// 'Lock-Free Data-Structure Iterators' snapshot-collector technique.
///
// =============================================================================
// LIST STRUCTURE
// =============================================================================
//
// ┌──────┐    ┌──────┐    ┌──────┐    ┌──────┐    ┌──────┐
// │ HEAD │───►│  10  │───►│  20  │───►│  30  │───►│ TAIL │
// │(sent)│    │      │    │      │    │      │    │(sent)│
// └──────┘    └──────┘    └──────┘    └──────┘    └──────┘
//
// The mark bit on node.next means the NODE ITSELF is logically deleted.
//
// INVARIANTS:
// 1. Unmarked nodes are sorted ascending by value
// 2. A value is held by at most one unmarked node
// 3. Marks are never cleared and a marked node's next never changes
// 4. HEAD and TAIL are never marked, removed or reported
// 5. A node is retired exactly once, by the thread whose CAS unlinks it
//
// =============================================================================
// REMOVE (Two-Phase Delete)
// =============================================================================
//
// Phase 1: LOGICAL DELETE  CAS curr.next (succ, 0) -> (succ, 1)   [linearization]
// Phase 2: PHYSICAL UNLINK CAS pred.next (curr, 0) -> (succ, 0)   [best effort]
//
//          pred ──────► curr ──╳───► succ
//          pred ─────────────────────► succ
//
// A failed phase 2 is left to the next traversal passing over curr.
//
// =============================================================================
// SNAPSHOT PROTOCOL
// =============================================================================
//
// 1. acquire:   use the current collector if active, else CAS in a new one
// 2. collect:   walk from HEAD adding every unmarked node while active
// 3. finish:    at TAIL seal nodes, deactivate, then seal reports
// 4. reconcile: (nodes ∪ inserted reports) \ deleted reports
//
// Every traversal in find() reports what it passes over: unmarked nodes as
// inserted, marked nodes as deleted. Successful add/remove report their own
// effect. Together these fill in whatever the collecting walk missed.
//
pub(crate) struct SnapshotListNode<T> {
    data: Option<T>,
    id: u64,
    next: AtomicPtr<SnapshotListNode<T>>,
}

impl<T> SnapshotListNode<T> {
    fn new(key: T, id: u64) -> Self {
        SnapshotListNode {
            data: Some(key),
            id,
            next: AtomicPtr::new(ptr::null_mut()),
        }
    }

    fn new_sentinel() -> Self {
        SnapshotListNode {
            data: None,
            id: 0,
            next: AtomicPtr::new(ptr::null_mut()),
        }
    }

    fn is_sentinel(&self) -> bool {
        self.data.is_none()
    }

    fn key(&self) -> &T {
        self.data
            .as_ref()
            .expect("Cannot get key from sentinel node")
    }

    // =========================================================================
    // Next pointer accessors
    // =========================================================================

    /// Load next pointer with the mark bit (Acquire ordering)
    #[inline]
    fn get_next(&self) -> NodePtr<T> {
        self.next.load(Ordering::Acquire)
    }

    /// Store next pointer (Release ordering)
    #[inline]
    fn set_next(&self, ptr: NodePtr<T>) {
        self.next.store(ptr, Ordering::Release)
    }

    /// CAS next pointer (AcqRel/Acquire ordering)
    #[inline]
    fn cas_next(&self, expected: NodePtr<T>, new: NodePtr<T>) -> Result<NodePtr<T>, NodePtr<T>> {
        self.next
            .compare_exchange(expected, new, Ordering::AcqRel, Ordering::Acquire)
    }

    #[inline]
    fn is_deleted(&self) -> bool {
        MarkedPtr::new(self.get_next()).is_marked()
    }

    /// Deallocate a node.
    ///
    /// # Safety
    /// - `ptr` must have been allocated by the list with `Box::new`
    /// - Must only be called once
    /// - Node must not be accessed after this call
    ///
    unsafe fn dealloc_ptr(ptr: *mut Self) {
        unsafe { drop(Box::from_raw(ptr)) };
    }
}

impl<T: Clone> SnapshotListNode<T> {
    fn observe(&self) -> Observed<T> {
        Observed {
            id: self.id,
            value: self.key().clone(),
        }
    }
}

/// Sorted set of `T` with snapshot iteration, reclaiming memory through `G`.
///
/// Nodes never leave the crate: every operation goes through
/// [`ConcurrentSet`] and hands back owned values.
///
/// ```compile_fail
/// use snapset_core::data_structures::sorted::snapshot_list::SnapshotListNode;
/// ```
///
pub struct SnapshotList<T, G: Guard> {
    head: NodePtr<T>,
    tail: NodePtr<T>,
    /// The single current snapshot collector. Replaced only by CAS.
    collector: AtomicPtr<SnapCollector<T>>,
    /// Identity source for nodes. Starts at 1, sentinels use 0.
    next_id: AtomicU64,
    /// Shared guard instance for deferred destruction of unlinked nodes
    /// and replaced collectors.
    guard: G,
}

impl<T, G> SnapshotList<T, G>
where
    T: Ord + Clone,
    G: Guard,
{
    pub fn new() -> Self {
        let tail = Box::into_raw(Box::new(SnapshotListNode::new_sentinel()));
        let head = Box::into_raw(Box::new(SnapshotListNode::new_sentinel()));
        unsafe {
            (*head).set_next(tail);
        }

        // Start with an inactive collector so the first iterator installs its own.
        //
        let collector = Box::into_raw(Box::new(SnapCollector::new(false)));

        SnapshotList {
            head,
            tail,
            collector: AtomicPtr::new(collector),
            next_id: AtomicU64::new(1),
            guard: G::default(),
        }
    }

    /// Get the shared guard instance for this set.
    pub fn guard(&self) -> &G {
        &self.guard
    }

    /// Hand an unlinked node to the guard.
    ///
    /// # Safety
    /// `node` must have just been unlinked by the caller's successful CAS.
    #[inline]
    unsafe fn retire(&self, node: NodePtr<T>) {
        unsafe {
            self.guard.defer_destroy(node, SnapshotListNode::dealloc_ptr);
        }
    }

    // =========================================================================
    // Reporting to the active collector
    // =========================================================================

    fn report_insert(&self, node: NodePtr<T>) {
        let collector = unsafe { &*self.collector.load(Ordering::SeqCst) };
        let node = unsafe { &*node };
        debug_assert!(!node.is_sentinel());
        if collector.is_active() && !node.is_deleted() {
            collector.add_report(Report::inserted(node.observe()));
        }
    }

    fn report_delete(&self, node: NodePtr<T>) {
        let collector = unsafe { &*self.collector.load(Ordering::SeqCst) };
        if collector.is_active() {
            let node = unsafe { &*node };
            debug_assert!(!node.is_sentinel());
            collector.add_report(Report::deleted(node.observe()));
        }
    }

    // Core operation: find with cleanup and reporting.
    // Returns (pred, curr) with pred.value < value <= curr.value, curr may be TAIL.
    //
    // Marked nodes on the way are reported deleted and snipped out. If a
    // snip loses its CAS, pred changed underneath us: restart from HEAD.
    //
    fn find(&self, value: &T) -> (NodePtr<T>, NodePtr<T>) {
        'retry: loop {
            let mut pred = self.head;
            let mut curr = MarkedPtr::unmask(unsafe { (*pred).get_next() });

            while curr != self.tail {
                let succ = MarkedPtr::new(unsafe { (*curr).get_next() });

                if succ.is_marked() {
                    self.report_delete(curr);

                    let snip = unsafe { (*pred).cas_next(curr, succ.as_ptr()) };
                    if snip.is_err() {
                        trace_log!("find restarted after losing an unlink race");
                        continue 'retry;
                    }

                    unsafe { self.retire(curr) };
                    curr = succ.as_ptr();
                } else {
                    self.report_insert(curr);

                    if unsafe { (*curr).key() } >= value {
                        break;
                    }

                    pred = curr;
                    curr = succ.as_ptr();
                }
            }

            return (pred, curr);
        }
    }

    // =========================================================================
    // Snapshot collector lifecycle
    // =========================================================================

    /// Return the active collector, installing a fresh one if the current
    /// one is finished. The first successful installer wins.
    fn acquire_collector(&self) -> CollectorPtr<T> {
        let current = self.collector.load(Ordering::SeqCst);
        if unsafe { (*current).is_active() } {
            return current;
        }

        let fresh = Box::into_raw(Box::new(SnapCollector::new(true)));
        match self
            .collector
            .compare_exchange(current, fresh, Ordering::SeqCst, Ordering::SeqCst)
        {
            Ok(_) => {
                trace_log!("installed a new snapshot collector");
                unsafe {
                    self.guard.defer_destroy(current, SnapCollector::dealloc_ptr);
                }
                fresh
            }
            Err(winner) => {
                // Never published.
                unsafe { SnapCollector::dealloc_ptr(fresh) };
                winner
            }
        }
    }

    /// Walk the list feeding `collector` until it is deactivated or TAIL is
    /// reached, then close it for reports.
    ///
    /// # Safety
    /// `collector` must have been obtained from `acquire_collector` under the
    /// current pin.
    unsafe fn collect_snapshot(&self, collector: CollectorPtr<T>) {
        let collector = unsafe { &*collector };
        let mut finished = false;
        let mut curr = MarkedPtr::unmask(unsafe { (*self.head).get_next() });

        while collector.is_active() {
            if curr == self.tail {
                collector.seal_nodes();
                collector.deactivate();
                finished = true;
                break;
            }

            let node = unsafe { &*curr };
            let next = MarkedPtr::new(node.get_next());
            if !next.is_marked() {
                collector.add_node(node.observe());
            }
            curr = next.as_ptr();
        }

        collector.seal_reports();

        if finished {
            debug_log!(
                observed = ?collector.counts(),
                "snapshot traversal reached tail"
            );
        }
    }
}

impl<T, G> ConcurrentSet<T> for SnapshotList<T, G>
where
    T: Ord + Clone,
    G: Guard,
{
    type Guard = G;

    unsafe fn add_internal(&self, value: T) -> bool {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let new_node = Box::into_raw(Box::new(SnapshotListNode::new(value, id)));

        loop {
            let key = unsafe { (*new_node).key() };
            let (pred, curr) = self.find(key);

            // Check for duplicate.
            //
            if curr != self.tail && unsafe { (*curr).key() } == key {
                // Clean up unused node.
                //
                unsafe { SnapshotListNode::dealloc_ptr(new_node) };
                return false;
            }

            unsafe {
                (*new_node).set_next(curr);
            }

            // Linearization point: link new node behind an unmarked pred.
            //
            if unsafe { (*pred).cas_next(curr, new_node) }.is_ok() {
                self.report_insert(new_node);
                return true;
            }
            // CAS failed, retry
        }
    }

    unsafe fn remove_internal(&self, value: &T) -> bool {
        loop {
            let (pred, curr) = self.find(value);

            if curr == self.tail || unsafe { (*curr).key() } != value {
                return false;
            }

            let succ = MarkedPtr::new(unsafe { (*curr).get_next() });
            if succ.is_marked() {
                // Someone else deleted it first; the next find cleans it up.
                continue;
            }

            // Linearization point: logical delete.
            //
            let mark = unsafe { (*curr).cas_next(succ.as_raw(), succ.with_mark(true).as_raw()) };
            if mark.is_err() {
                continue;
            }

            self.report_delete(curr);

            // Best-effort physical unlink, a later find finishes it otherwise.
            //
            if unsafe { (*pred).cas_next(curr, succ.as_ptr()) }.is_ok() {
                unsafe { self.retire(curr) };
            }
            return true;
        }
    }

    unsafe fn contains_internal(&self, value: &T) -> bool {
        let mut curr = MarkedPtr::unmask(unsafe { (*self.head).get_next() });

        while curr != self.tail {
            let node = unsafe { &*curr };
            let next = MarkedPtr::new(node.get_next());

            if !next.is_marked() {
                match node.key().cmp(value) {
                    std::cmp::Ordering::Equal => return true,
                    std::cmp::Ordering::Greater => return false,
                    std::cmp::Ordering::Less => {}
                }
            }

            curr = next.as_ptr();
        }

        false
    }

    unsafe fn snapshot_internal(&self) -> Result<Vec<T>, CollectorError> {
        let collector = self.acquire_collector();
        unsafe {
            self.collect_snapshot(collector);
            (*collector).reconcile()
        }
    }
}

impl<T, G> Default for SnapshotList<T, G>
where
    T: Ord + Clone,
    G: Guard,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, G> fmt::Debug for SnapshotList<T, G>
where
    T: Ord + Clone + fmt::Debug,
    G: Guard,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<T, G: Guard> Drop for SnapshotList<T, G> {
    fn drop(&mut self) {
        // Free everything still linked, logically deleted nodes included.
        // Unlinked nodes and replaced collectors belong to the guard.
        //
        let mut curr = self.head;

        while !curr.is_null() {
            unsafe {
                let next = if curr == self.tail {
                    ptr::null_mut()
                } else {
                    MarkedPtr::unmask((*curr).get_next())
                };
                SnapshotListNode::dealloc_ptr(curr);
                curr = next;
            }
        }

        unsafe { SnapCollector::dealloc_ptr(*self.collector.get_mut()) };
    }
}

// Nodes and values are shared by every thread operating on the set and values
// are cloned out of nodes allocated by other threads.
unsafe impl<T: Send + Sync, G: Guard> Send for SnapshotList<T, G> {}
unsafe impl<T: Send + Sync, G: Guard> Sync for SnapshotList<T, G> {}

// ============================================================================
// Tests - Unique to SnapshotList
// ============================================================================
// Note: Common tests are in tests/snapshot_list_tests.rs
