use std::marker::PhantomData;
use std::ptr;
use std::sync::atomic::{AtomicPtr, Ordering};

use crate::data_structures::MarkedPtr;
use crate::data_structures::collector::AppendOnlyCollection;
use crate::error::CollectorError;

type NodePtr<T> = *mut CollectorNode<T>;

///
/// Lock-free append-only stack that can be sealed.
///
// Layout:
//
//   head ──► [v3] ──► [v2] ──► [v1] ──► NULL
//     │
//   bit 0 = SEALED
//
// The sealed flag lives in the low bit of `head`, so a push and a seal race
// on the same word:
//
//   add:  CAS(head, (h, unsealed) -> (new, unsealed))
//         - fails on a head change  -> retry with the new head
//         - fails on the sealed bit -> return false
//
//   seal: CAS(head, (h, unsealed) -> (h, sealed))
//         - fails only on a head change (another add won) -> retry
//
// Whichever CAS lands first decides whether a racing add is part of the
// sealed contents. Nodes are never unlinked, they are freed on Drop.
//
struct CollectorNode<T> {
    value: T,
    next: NodePtr<T>,
}

pub struct BlockingCollector<T> {
    head: AtomicPtr<CollectorNode<T>>,
    _owns: PhantomData<Box<CollectorNode<T>>>,
}

impl<T> BlockingCollector<T> {
    pub fn new() -> Self {
        BlockingCollector {
            head: AtomicPtr::new(ptr::null_mut()),
            _owns: PhantomData,
        }
    }

    #[inline]
    fn load_head(&self) -> MarkedPtr<CollectorNode<T>> {
        MarkedPtr::new(self.head.load(Ordering::Acquire))
    }
}

impl<T> AppendOnlyCollection<T> for BlockingCollector<T> {
    type Contents<'a>
        = Contents<'a, T>
    where
        Self: 'a,
        T: 'a;

    fn add(&self, value: T) -> bool {
        let new_node = Box::into_raw(Box::new(CollectorNode {
            value,
            next: ptr::null_mut(),
        }));

        let mut current = self.head.load(Ordering::Acquire);

        loop {
            if MarkedPtr::new(current).is_marked() {
                // Never published, still exclusively ours.
                //
                unsafe { drop(Box::from_raw(new_node)) };
                return false;
            }

            unsafe {
                (*new_node).next = current;
            }

            match self.head.compare_exchange_weak(
                current,
                new_node,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }

    fn seal(&self) {
        let mut current = self.head.load(Ordering::Acquire);

        loop {
            let marked = MarkedPtr::new(current);
            if marked.is_marked() {
                return;
            }

            match self.head.compare_exchange_weak(
                current,
                marked.with_mark(true).as_raw(),
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return,
                Err(actual) => current = actual,
            }
        }
    }

    fn is_sealed(&self) -> bool {
        self.load_head().is_marked()
    }

    fn contents(&self) -> Result<Self::Contents<'_>, CollectorError> {
        let head = self.load_head();
        if !head.is_marked() {
            return Err(CollectorError::NotSealed);
        }

        Ok(Contents {
            next: head.as_ptr(),
            _collector: PhantomData,
        })
    }
}

impl<T> Default for BlockingCollector<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for BlockingCollector<T> {
    fn drop(&mut self) {
        let mut curr = MarkedPtr::unmask(*self.head.get_mut());

        while !curr.is_null() {
            unsafe {
                let next = (*curr).next;
                drop(Box::from_raw(curr));
                curr = next;
            }
        }
    }
}

// Values move in from any thread through `add` and are shared by reference
// through `contents`.
unsafe impl<T: Send> Send for BlockingCollector<T> {}
unsafe impl<T: Send + Sync> Sync for BlockingCollector<T> {}

/// Iterator over the sealed contents of a [`BlockingCollector`], most recent
/// addition first.
pub struct Contents<'a, T> {
    next: *const CollectorNode<T>,
    _collector: PhantomData<&'a BlockingCollector<T>>,
}

impl<'a, T> Iterator for Contents<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next.is_null() {
            return None;
        }

        // Sealed nodes are immutable and live as long as the collector.
        let node = unsafe { &*self.next };
        self.next = node.next;
        Some(&node.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::{Arc, Barrier};
    use std::thread;

    fn sealed_values(collector: &BlockingCollector<i32>) -> Vec<i32> {
        collector.contents().unwrap().copied().collect()
    }

    #[test]
    fn test_add_then_seal_reverses_insertion_order() {
        let collector = BlockingCollector::new();

        assert!(collector.add(-12));
        assert!(collector.add(-2));
        assert!(collector.add(4));
        assert!(collector.add(12));

        collector.seal();

        assert_eq!(sealed_values(&collector), vec![12, 4, -2, -12]);
    }

    #[test]
    fn test_sealed_empty_rejects_adds() {
        let collector = BlockingCollector::new();
        collector.seal();

        assert!(!collector.add(-12));
        assert!(!collector.add(-2));
        assert!(!collector.add(4));
        assert!(!collector.add(12));

        assert!(sealed_values(&collector).is_empty());
    }

    #[test]
    fn test_contents_before_seal_fails() {
        let collector = BlockingCollector::new();
        collector.add(1);

        assert!(!collector.is_sealed());
        assert_eq!(collector.contents().err(), Some(CollectorError::NotSealed));
    }

    #[test]
    fn test_seal_is_idempotent_and_contents_stable() {
        let collector = BlockingCollector::new();
        collector.add(1);
        collector.add(2);

        collector.seal();
        let first = sealed_values(&collector);

        collector.seal();
        assert!(collector.is_sealed());
        assert!(!collector.add(3));

        assert_eq!(first, sealed_values(&collector));
        assert_eq!(first, vec![2, 1]);
    }

    #[test]
    fn test_rejected_values_are_dropped() {
        let value = Arc::new(());
        let collector = BlockingCollector::new();

        assert!(collector.add(Arc::clone(&value)));
        collector.seal();
        assert!(!collector.add(Arc::clone(&value)));

        assert_eq!(Arc::strong_count(&value), 2);
        drop(collector);
        assert_eq!(Arc::strong_count(&value), 1);
    }

    #[test]
    fn test_concurrent_adds_racing_seal() {
        let collector = Arc::new(BlockingCollector::new());
        let accepted = Arc::new(AtomicUsize::new(0));
        let num_threads = 8;
        let per_thread = 2_000;
        let barrier = Arc::new(Barrier::new(num_threads + 1));

        let handles: Vec<_> = (0..num_threads)
            .map(|t| {
                let collector = Arc::clone(&collector);
                let accepted = Arc::clone(&accepted);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    for i in 0..per_thread {
                        if collector.add((t * per_thread + i) as i32) {
                            accepted.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                })
            })
            .collect();

        barrier.wait();
        thread::yield_now();
        collector.seal();

        for handle in handles {
            handle.join().unwrap();
        }

        // Every accepted value is visible exactly once, nothing else is.
        let mut values = sealed_values(&collector);
        assert_eq!(values.len(), accepted.load(Ordering::Relaxed));
        values.sort_unstable();
        values.dedup();
        assert_eq!(values.len(), accepted.load(Ordering::Relaxed));
    }
}
