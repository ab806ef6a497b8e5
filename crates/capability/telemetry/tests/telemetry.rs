use fleet_telemetry::{
    metrics, new_operation_id, record_bind_conflict, record_unbind_conflict,
    record_unbind_miss,
};

#[test]
fn operation_ids_are_unique() {
    let first = new_operation_id();
    let second = new_operation_id();
    assert!(!first.is_empty());
    assert_ne!(first, second);
}

#[test]
fn counters_increase() {
    let before = metrics().snapshot();
    record_bind_conflict();
    record_unbind_miss();
    record_unbind_conflict();
    let after = metrics().snapshot();
    assert!(after.bind_conflicts > before.bind_conflicts);
    assert!(after.unbind_misses > before.unbind_misses);
    assert!(after.unbind_conflicts > before.unbind_conflicts);
}
