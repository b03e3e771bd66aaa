use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};

use crate::data_structures::collector::{AppendOnlyCollection, BlockingCollector};
use crate::error::CollectorError;

/// A node as seen by the snapshot protocol: its identity plus a copy of its value.
///
/// Identities are unique per set and never reused, so two observations of the
/// same node always compare equal even after the node itself is reclaimed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Observed<T> {
    pub(crate) id: u64,
    pub(crate) value: T,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ReportKind {
    Inserted,
    Deleted,
}

/// An insert or delete contributed by a concurrent mutator (or traversal).
#[derive(Debug, Clone)]
pub(crate) struct Report<T> {
    pub(crate) observed: Observed<T>,
    pub(crate) kind: ReportKind,
}

impl<T> Report<T> {
    pub(crate) fn inserted(observed: Observed<T>) -> Self {
        Report {
            observed,
            kind: ReportKind::Inserted,
        }
    }

    pub(crate) fn deleted(observed: Observed<T>) -> Self {
        Report {
            observed,
            kind: ReportKind::Deleted,
        }
    }
}

///
/// Per-iteration coordination object of the snapshot protocol.
///
// Lifecycle:
//
//   installed (active) ─► nodes filled by the iterating traversal
//                      ─► reports filled by every concurrent add/remove/find
//   traversal reaches tail:
//       1. seal nodes
//       2. deactivate            (no new reports are attempted after this)
//       3. seal reports          (every thread that read the collector does this)
//   reconcile:  (nodes ∪ inserted) \ deleted
//
// Reports can only be submitted by a thread that saw the collector active.
// Because reports are sealed strictly after deactivation, a report is
// either captured or the submitting thread observed the collector inactive.
//
pub(crate) struct SnapCollector<T> {
    active: AtomicBool,
    nodes: BlockingCollector<Observed<T>>,
    reports: BlockingCollector<Report<T>>,
}

impl<T> SnapCollector<T> {
    pub(crate) fn new(active: bool) -> Self {
        SnapCollector {
            active: AtomicBool::new(active),
            nodes: BlockingCollector::new(),
            reports: BlockingCollector::new(),
        }
    }

    #[inline]
    pub(crate) fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub(crate) fn deactivate(&self) {
        self.active.store(false, Ordering::SeqCst);
    }

    pub(crate) fn add_node(&self, observed: Observed<T>) {
        self.nodes.add(observed);
    }

    pub(crate) fn add_report(&self, report: Report<T>) {
        self.reports.add(report);
    }

    pub(crate) fn seal_nodes(&self) {
        self.nodes.seal();
    }

    pub(crate) fn seal_reports(&self) {
        self.reports.seal();
    }

    /// Deallocate a collector previously leaked with `Box::into_raw`.
    ///
    /// # Safety
    /// - `ptr` must come from `Box::into_raw(Box::new(SnapCollector::new(..)))`
    /// - must only be called once, with no remaining readers
    ///
    pub(crate) unsafe fn dealloc_ptr(ptr: *mut Self) {
        unsafe { drop(Box::from_raw(ptr)) };
    }
}

impl<T: Ord + Clone> SnapCollector<T> {
    /// Combine the collected nodes with the reports into sorted snapshot contents.
    ///
    /// Inserted reports are unioned in first, then every deleted identity is
    /// removed, so a node reported both inserted and deleted stays out.
    ///
    pub(crate) fn reconcile(&self) -> Result<Vec<T>, CollectorError> {
        let mut live: HashMap<u64, &T> = self
            .nodes
            .contents()?
            .map(|observed| (observed.id, &observed.value))
            .collect();

        let mut deleted: HashSet<u64> = HashSet::new();
        for report in self.reports.contents()? {
            match report.kind {
                ReportKind::Inserted => {
                    live.entry(report.observed.id)
                        .or_insert(&report.observed.value);
                }
                ReportKind::Deleted => {
                    deleted.insert(report.observed.id);
                }
            }
        }

        live.retain(|id, _| !deleted.contains(id));

        let mut values: Vec<T> = live.into_values().cloned().collect();
        values.sort_unstable();
        values.dedup();
        Ok(values)
    }

    /// Sizes of the sealed node and report collections.
    #[cfg_attr(not(feature = "tracing"), allow(dead_code))]
    pub(crate) fn counts(&self) -> (usize, usize) {
        let nodes = self.nodes.contents().map(|c| c.count()).unwrap_or(0);
        let reports = self.reports.contents().map(|c| c.count()).unwrap_or(0);
        (nodes, reports)
    }
}
