mod common;

use rstest::{fixture, rstest};
use serial_test::serial;
use snapset_core::common_tests::set_core_tests::*;
use snapset_core::common_tests::set_stress_tests::*;
use snapset_core::{ConcurrentSet, DeferredGuard, SnapshotList};

type TestSet = SnapshotList<i32, DeferredGuard>;

#[fixture]
fn set() -> TestSet {
    common::init_tracing();
    TestSet::new()
}

// ============================================================================
// Core behavior
// ============================================================================

#[rstest]
fn basic_operations(set: TestSet) {
    test_basic_operations(&set);
}

#[rstest]
fn iteration_order(set: TestSet) {
    test_iteration_order(&set);
}

#[rstest]
fn is_empty(set: TestSet) {
    test_is_empty(&set);
}

#[rstest]
fn readd_after_remove(set: TestSet) {
    test_readd_after_remove(&set);
}

#[rstest]
fn snapshot_is_detached(set: TestSet) {
    test_snapshot_is_detached(&set);
}

#[test]
fn concurrent_operations() {
    test_concurrent_operations::<TestSet>();
}

#[test]
fn concurrent_add_remove() {
    test_concurrent_add_remove::<TestSet>();
}

#[rstest]
#[case::ascending(vec![-12, -2, 4, 12])]
#[case::descending(vec![12, 4, -2, -12])]
#[case::interleaved(vec![4, -12, 12, -2])]
fn snapshot_sorted_for_any_insertion_order(set: TestSet, #[case] values: Vec<i32>) {
    for v in &values {
        assert!(set.add(*v));
    }
    assert_eq!(set.to_vec(), vec![-12, -2, 4, 12]);
}

#[test]
fn works_with_owned_keys() {
    let set: SnapshotList<String, DeferredGuard> = SnapshotList::new();

    assert!(set.add("pear".to_string()));
    assert!(set.add("apple".to_string()));
    assert!(!set.add("pear".to_string()));
    assert!(set.contains(&"apple".to_string()));

    assert_eq!(set.to_vec(), vec!["apple".to_string(), "pear".to_string()]);
    assert!(set.remove(&"apple".to_string()));
    assert_eq!(format!("{:?}", set), r#"{"pear"}"#);
}

// ============================================================================
// Stress
// ============================================================================

#[test]
#[serial(stress_tests)]
fn stress_concurrent_remove_same_value() {
    test_concurrent_remove_same_value::<TestSet>();
}

#[test]
#[serial(stress_tests)]
fn stress_concurrent_add_same_value() {
    test_concurrent_add_same_value::<TestSet>();
}

#[test]
#[serial(stress_tests)]
fn stress_private_key_sequences() {
    test_private_key_sequences::<TestSet>();
}

#[test]
#[serial(stress_tests)]
fn stress_snapshot_during_modifications() {
    common::init_tracing();
    test_snapshot_during_modifications::<TestSet>();
}

#[test]
#[serial(stress_tests)]
fn stress_is_empty_under_churn() {
    test_is_empty_under_churn::<TestSet>();
}

#[test]
#[serial(stress_tests)]
fn stress_extreme_contention_single_key() {
    test_extreme_contention_single_key::<TestSet>();
}

#[test]
#[serial(stress_tests)]
fn stress_concurrent_snapshots() {
    test_concurrent_snapshots::<TestSet>();
}

#[test]
#[serial(stress_tests)]
fn stress_high_contention_mixed() {
    test_high_contention_mixed::<TestSet>();
}
