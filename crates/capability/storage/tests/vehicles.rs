use fleet_storage::{InMemoryVehicleStore, StorageError, VehicleRecord, VehicleStore};

fn vehicle(vehicle_id: i64, car_no: &str) -> VehicleRecord {
    VehicleRecord {
        vehicle_id,
        car_no: car_no.to_string(),
        brand: "XC".to_string(),
        model: "E1".to_string(),
        area: "north".to_string(),
        voltage_program_id: None,
        has_helmet: false,
        investor: "INV-01".to_string(),
    }
}

#[tokio::test]
async fn bulk_insert_and_find() {
    let store = InMemoryVehicleStore::new();
    let inserted = store
        .insert_vehicles(vec![vehicle(100600001, "A001"), vehicle(100600002, "A002")])
        .await
        .expect("insert");
    assert_eq!(inserted.len(), 2);

    let found = store
        .find_vehicle(100600002)
        .await
        .expect("find")
        .expect("vehicle");
    assert_eq!(found.car_no, "A002");
    assert!(store.find_vehicle(100600003).await.expect("find").is_none());
}

#[tokio::test]
async fn bulk_insert_is_all_or_nothing() {
    let store = InMemoryVehicleStore::new();
    store
        .insert_vehicles(vec![vehicle(100600001, "A001")])
        .await
        .expect("insert");

    let err = store
        .insert_vehicles(vec![vehicle(100600002, "A002"), vehicle(100600003, "A001")])
        .await
        .expect_err("duplicate car_no");
    assert!(matches!(err, StorageError::Conflict(_)));
    assert!(store.find_vehicle(100600002).await.expect("find").is_none());
}

#[tokio::test]
async fn set_voltage_program() {
    let store = InMemoryVehicleStore::new();
    store
        .insert_vehicles(vec![vehicle(100600001, "A001")])
        .await
        .expect("insert");

    assert!(store.set_voltage_program(100600001, Some(7)).await.expect("set"));
    let found = store.find_vehicle(100600001).await.expect("find").expect("vehicle");
    assert_eq!(found.voltage_program_id, Some(7));

    assert!(store.set_voltage_program(100600001, None).await.expect("clear"));
    let found = store.find_vehicle(100600001).await.expect("find").expect("vehicle");
    assert_eq!(found.voltage_program_id, None);

    assert!(!store.set_voltage_program(1, Some(7)).await.expect("missing"));
}
