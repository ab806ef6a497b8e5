use domain::VoltageProgram;
use fleet_binding::{
    BindingService, CacheIndex, InMemoryDeviceCounter, KeyedLocks, VoltageProgramManager,
};
use fleet_config::CacheKeyConfig;
use fleet_storage::{
    CacheStore, InMemoryBindingStore, InMemoryCacheStore, InMemoryProgramCatalog,
    InMemoryVehicleStore, VehicleRecord, VehicleStore,
};
use serde_json::json;
use std::sync::Arc;

struct Harness {
    programs: VoltageProgramManager,
    bindings: BindingService,
    vehicles: Arc<InMemoryVehicleStore>,
    catalog: Arc<InMemoryProgramCatalog>,
    cache: Arc<InMemoryCacheStore>,
}

fn vehicle(vehicle_id: i64, car_no: &str) -> VehicleRecord {
    VehicleRecord {
        vehicle_id,
        car_no: car_no.to_string(),
        brand: "xc".to_string(),
        model: "S1".to_string(),
        area: "hz-west".to_string(),
        voltage_program_id: None,
        has_helmet: true,
        investor: "inv-01".to_string(),
    }
}

fn program_48v() -> VoltageProgram {
    VoltageProgram::new(
        3,
        "48V-20Ah",
        json!({ "fullVoltage": 54.6, "lowVoltage": 42.0 }),
    )
}

async fn harness() -> Harness {
    let vehicles = Arc::new(InMemoryVehicleStore::new());
    vehicles
        .insert_vehicles(vec![vehicle(100600001, "ZJ-A0001"), vehicle(100600002, "ZJ-A0002")])
        .await
        .expect("seed vehicles");
    let catalog = Arc::new(InMemoryProgramCatalog::with_programs(vec![program_48v()]));
    let cache = Arc::new(InMemoryCacheStore::new());
    let index = Arc::new(CacheIndex::new(cache.clone(), CacheKeyConfig::default()));
    let locks = Arc::new(KeyedLocks::new());
    let programs =
        VoltageProgramManager::new(vehicles.clone(), catalog.clone(), index.clone(), locks.clone());
    let bindings = BindingService::new(
        Arc::new(InMemoryBindingStore::new()),
        index,
        Arc::new(InMemoryDeviceCounter::new()),
        locks,
    );
    Harness {
        programs,
        bindings,
        vehicles,
        catalog,
        cache,
    }
}

#[tokio::test]
async fn assign_valid_program_is_visible_on_lookup() {
    let h = harness().await;
    let outcome = h.programs.assign(100600001, 3).await.expect("assign");
    assert!(outcome.vehicle_updated);
    assert_eq!(outcome.program, Some(program_48v()));

    assert_eq!(
        h.programs.lookup(100600001).await.expect("lookup"),
        Some(program_48v())
    );
    let stored = h
        .vehicles
        .find_vehicle(100600001)
        .await
        .expect("find")
        .expect("vehicle");
    assert_eq!(stored.voltage_program_id, Some(3));
    assert!(
        h.cache
            .get("xc_battery_Name_100600001")
            .await
            .expect("get")
            .is_some()
    );
}

#[tokio::test]
async fn assign_unknown_program_clears_cache_but_keeps_id() {
    let h = harness().await;
    h.programs.assign(100600001, 3).await.expect("assign");

    let outcome = h.programs.assign(100600001, 99).await.expect("assign");
    assert!(outcome.vehicle_updated);
    assert_eq!(outcome.program, None);
    assert_eq!(h.programs.lookup(100600001).await.expect("lookup"), None);
    let stored = h
        .vehicles
        .find_vehicle(100600001)
        .await
        .expect("find")
        .expect("vehicle");
    assert_eq!(stored.voltage_program_id, Some(99));
}

#[tokio::test]
async fn assign_to_missing_vehicle_reports_not_updated() {
    let h = harness().await;
    let outcome = h.programs.assign(100600099, 3).await.expect("assign");
    assert!(!outcome.vehicle_updated);
    assert_eq!(outcome.program, Some(program_48v()));
    assert_eq!(h.programs.lookup(100600099).await.expect("lookup"), None);
    assert!(
        h.cache
            .get("xc_battery_Name_100600099")
            .await
            .expect("get")
            .is_none()
    );
}

#[tokio::test]
async fn unassign_clears_vehicle_and_cache() {
    let h = harness().await;
    h.programs.assign(100600001, 3).await.expect("assign");

    assert!(h.programs.unassign(100600001).await.expect("unassign"));
    assert_eq!(h.programs.lookup(100600001).await.expect("lookup"), None);
    let stored = h
        .vehicles
        .find_vehicle(100600001)
        .await
        .expect("find")
        .expect("vehicle");
    assert_eq!(stored.voltage_program_id, None);
}

#[tokio::test]
async fn lookup_by_device_follows_binding_index() {
    let h = harness().await;
    h.programs.assign(100600001, 3).await.expect("assign");
    assert_eq!(
        h.programs
            .lookup_by_device("DEV-IMEI-01")
            .await
            .expect("lookup"),
        None
    );

    h.bindings
        .bind(100600001, "DEV-IMEI-01", 1)
        .await
        .expect("bind");
    assert_eq!(
        h.programs
            .lookup_by_device("DEV-IMEI-01")
            .await
            .expect("lookup"),
        Some(program_48v())
    );
}

#[tokio::test]
async fn corrupt_snapshot_reads_as_absent() {
    let h = harness().await;
    h.cache
        .set("xc_battery_Name_100600001", "{not json")
        .await
        .expect("seed");
    assert_eq!(h.programs.lookup(100600001).await.expect("lookup"), None);
}

#[tokio::test]
async fn sync_cache_follows_catalog_changes() {
    let h = harness().await;
    h.programs.assign(100600001, 3).await.expect("assign");

    let updated = VoltageProgram::new(3, "48V-24Ah", json!({ "fullVoltage": 54.6 }));
    h.catalog.insert(updated.clone()).expect("update program");
    let synced = h.programs.sync_cache(100600001, 3).await.expect("sync");
    assert_eq!(synced, Some(updated.clone()));
    assert_eq!(
        h.programs.lookup(100600001).await.expect("lookup"),
        Some(updated)
    );

    h.catalog.remove(3).expect("remove program");
    assert_eq!(h.programs.sync_cache(100600001, 3).await.expect("sync"), None);
    assert_eq!(h.programs.lookup(100600001).await.expect("lookup"), None);
    let stored = h
        .vehicles
        .find_vehicle(100600001)
        .await
        .expect("find")
        .expect("vehicle");
    assert_eq!(stored.voltage_program_id, Some(3));
}
