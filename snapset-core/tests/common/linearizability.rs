//! Brute-force linearizability checking for small concurrent histories.
//!
//! Worker threads record every operation with a call and a return timestamp
//! drawn from one shared counter. The checker then searches for a total order
//! that respects real time (an operation that returned before another was
//! called must come first) and reproduces every observed result on a
//! sequential model.

use std::collections::HashSet;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};

/// Sequential specification of the object under test.
pub trait Model: Clone + Eq + Hash {
    type Op: Debug;
    type Ret: Debug + PartialEq;

    fn apply(&mut self, op: &Self::Op) -> Self::Ret;
}

#[derive(Debug, Clone)]
pub struct Event<O, R> {
    pub thread: usize,
    pub op: O,
    pub ret: R,
    pub call: u64,
    pub returned: u64,
}

/// Shared logical clock for timestamping calls and returns.
#[derive(Default)]
pub struct Clock(AtomicU64);

impl Clock {
    pub fn tick(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst)
    }

    /// Run `f`, stamping it with call and return ticks.
    pub fn record<O, R>(&self, thread: usize, op: O, f: impl FnOnce(&O) -> R) -> Event<O, R> {
        let call = self.tick();
        let ret = f(&op);
        let returned = self.tick();
        Event {
            thread,
            op,
            ret,
            call,
            returned,
        }
    }
}

/// Returns `true` if some real-time respecting order of `history` is legal
/// for `initial`.
pub fn is_linearizable<M: Model>(initial: &M, history: &[Event<M::Op, M::Ret>]) -> bool {
    assert!(history.len() <= 64, "history too long for a u64 mask");

    let full = if history.len() == 64 {
        u64::MAX
    } else {
        (1u64 << history.len()) - 1
    };
    let mut dead_ends: HashSet<(u64, M)> = HashSet::new();
    search(initial, history, 0, full, &mut dead_ends)
}

fn search<M: Model>(
    state: &M,
    history: &[Event<M::Op, M::Ret>],
    done: u64,
    full: u64,
    dead_ends: &mut HashSet<(u64, M)>,
) -> bool {
    if done == full {
        return true;
    }
    if dead_ends.contains(&(done, state.clone())) {
        return false;
    }

    // Earliest return among pending events bounds which ones may go next.
    let horizon = history
        .iter()
        .enumerate()
        .filter(|(i, _)| done & (1 << i) == 0)
        .map(|(_, e)| e.returned)
        .min()
        .unwrap_or(u64::MAX);

    for (i, event) in history.iter().enumerate() {
        if done & (1 << i) != 0 || event.call > horizon {
            continue;
        }
        let mut next = state.clone();
        if next.apply(&event.op) == event.ret && search(&next, history, done | (1 << i), full, dead_ends)
        {
            return true;
        }
    }

    dead_ends.insert((done, state.clone()));
    false
}

/// Assert helper that prints the offending history.
pub fn assert_linearizable<M: Model>(initial: &M, history: &[Event<M::Op, M::Ret>]) {
    if !is_linearizable(initial, history) {
        let mut sorted: Vec<_> = history.iter().collect();
        sorted.sort_by_key(|e| e.call);
        let lines: Vec<String> = sorted
            .iter()
            .map(|e| {
                format!(
                    "  t{} [{:>3}..{:>3}] {:?} -> {:?}",
                    e.thread, e.call, e.returned, e.op, e.ret
                )
            })
            .collect();
        panic!("history is not linearizable:\n{}", lines.join("\n"));
    }
}
