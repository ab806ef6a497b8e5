use fleet_storage::{BindingStore, InMemoryBindingStore, StorageError};

#[tokio::test]
async fn upsert_creates_active_binding() {
    let store = InMemoryBindingStore::new();
    let record = store
        .upsert(100600001, "DEV-IMEI-01", 1000)
        .await
        .expect("upsert");
    assert_eq!(record.vehicle_id, 100600001);
    assert_eq!(record.device_id, "DEV-IMEI-01");
    assert!(record.is_active());

    let by_vehicle = store
        .find_active_by_vehicle(100600001)
        .await
        .expect("find")
        .expect("bound");
    let by_device = store
        .find_active_by_device("DEV-IMEI-01")
        .await
        .expect("find")
        .expect("bound");
    assert_eq!(by_vehicle, record);
    assert_eq!(by_device, record);
}

#[tokio::test]
async fn upsert_is_idempotent_for_same_pair() {
    let store = InMemoryBindingStore::new();
    let first = store.upsert(1, "dev-1", 1000).await.expect("first");
    let second = store.upsert(1, "dev-1", 2000).await.expect("second");
    assert_eq!(first, second);
    assert_eq!(store.all_rows().len(), 1);
}

#[tokio::test]
async fn upsert_rejects_taken_vehicle_or_device() {
    let store = InMemoryBindingStore::new();
    store.upsert(1, "dev-1", 1000).await.expect("bind");

    let err = store.upsert(2, "dev-1", 1001).await.expect_err("device taken");
    assert!(matches!(err, StorageError::Conflict(_)));
    let err = store.upsert(1, "dev-2", 1002).await.expect_err("vehicle taken");
    assert!(err.is_conflict());
    assert_eq!(store.all_rows().len(), 1);
}

#[tokio::test]
async fn upsert_rejects_invalid_vehicle_id() {
    let store = InMemoryBindingStore::new();
    assert!(store.upsert(0, "dev-1", 1000).await.is_err());
}

#[tokio::test]
async fn soft_delete_keeps_history_row() {
    let store = InMemoryBindingStore::new();
    store.upsert(1, "dev-1", 1000).await.expect("bind");

    let deleted = store
        .soft_delete_by_vehicle(1, 2000)
        .await
        .expect("delete")
        .expect("row");
    assert_eq!(deleted.deleted_at_ms, Some(2000));
    assert!(store.find_active_by_vehicle(1).await.expect("find").is_none());
    assert!(store.find_active_by_device("dev-1").await.expect("find").is_none());

    let rows = store.all_rows();
    assert_eq!(rows.len(), 1);
    assert!(!rows[0].is_active());

    let again = store.soft_delete_by_vehicle(1, 3000).await.expect("delete");
    assert!(again.is_none());
}

#[tokio::test]
async fn rebinding_after_unbind_creates_new_row() {
    let store = InMemoryBindingStore::new();
    let first = store.upsert(1, "dev-1", 1000).await.expect("bind");
    store.soft_delete_by_vehicle(1, 2000).await.expect("unbind");
    let second = store.upsert(1, "dev-1", 3000).await.expect("rebind");
    assert_ne!(first.binding_id, second.binding_id);
    assert_eq!(store.all_rows().len(), 2);
}

#[tokio::test]
async fn suffix_lookup_matches_active_rows_only() {
    let store = InMemoryBindingStore::new();
    store.upsert(1, "861234567890123", 1000).await.expect("bind");
    store.upsert(2, "869999999990456", 1000).await.expect("bind");
    store.soft_delete_by_vehicle(2, 2000).await.expect("unbind");

    let hit = store
        .find_active_by_device_suffix("0123")
        .await
        .expect("query")
        .expect("hit");
    assert_eq!(hit.vehicle_id, 1);
    let miss = store
        .find_active_by_device_suffix("0456")
        .await
        .expect("query");
    assert!(miss.is_none());
}

#[tokio::test]
async fn purge_removes_only_expired_history() {
    let store = InMemoryBindingStore::new();
    store.upsert(1, "dev-1", 100).await.expect("bind");
    store.upsert(2, "dev-2", 100).await.expect("bind");
    store.upsert(3, "dev-3", 100).await.expect("bind");
    store.soft_delete_by_vehicle(1, 1000).await.expect("unbind");
    store.soft_delete_by_vehicle(2, 5000).await.expect("unbind");

    let purged = store.purge_deleted_before(2000).await.expect("purge");
    assert_eq!(purged, 1);
    let rows = store.all_rows();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().any(|row| row.vehicle_id == 2 && !row.is_active()));
    assert!(rows.iter().any(|row| row.vehicle_id == 3 && row.is_active()));
}
