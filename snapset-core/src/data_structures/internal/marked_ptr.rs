// Marked pointer operations using the least significant bit as a flag.
//
// Bit layout:
//   Bit 0: MARK - meaning depends on the owner of the cell
//
//   SnapshotList node.next:   MARK = the node owning this cell is logically deleted
//   BlockingCollector head:   MARK = the collector is sealed, no further adds
//
// Every pointee is at least pointer-aligned, so bit 0 of a real address is
// always zero and the pointer and flag travel together through one CAS.
//
const MARK: usize = 0b1;

/// A pointer that uses the least significant bit as a mark flag.
pub(crate) struct MarkedPtr<T> {
    ptr: *mut T,
}

// Manual impls to avoid requiring T: Clone/Copy
impl<T> Copy for MarkedPtr<T> {}

impl<T> Clone for MarkedPtr<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> MarkedPtr<T> {
    /// Create a new MarkedPtr from a (possibly marked) pointer.
    #[inline]
    pub(crate) fn new(ptr: *mut T) -> Self {
        MarkedPtr { ptr }
    }

    /// Strip the mark bit from a raw pointer without creating a MarkedPtr instance.
    #[inline]
    pub(crate) fn unmask(ptr: *mut T) -> *mut T {
        (ptr as usize & !MARK) as *mut T
    }

    /// Get the clean pointer without the mark bit (the one you dereference).
    #[inline]
    pub(crate) fn as_ptr(&self) -> *mut T {
        Self::unmask(self.ptr)
    }

    /// Get the raw pointer with the mark bit intact (for CAS operations).
    #[inline]
    pub(crate) fn as_raw(&self) -> *mut T {
        self.ptr
    }

    #[inline]
    pub(crate) fn is_marked(&self) -> bool {
        (self.ptr as usize & MARK) != 0
    }

    /// Same address with the mark bit set or cleared.
    #[inline]
    pub(crate) fn with_mark(&self, mark: bool) -> Self {
        let ptr_bits = self.as_ptr() as usize;
        let marked_bits = if mark { ptr_bits | MARK } else { ptr_bits };
        MarkedPtr {
            ptr: marked_bits as *mut T,
        }
    }
}
