use domain::VoltageProgram;
use fleet_storage::{CacheStore, InMemoryCacheStore, InMemoryProgramCatalog, ProgramCatalog};

#[tokio::test]
async fn cache_set_get_delete() {
    let cache = InMemoryCacheStore::new();
    assert!(cache.get("carImeiBindings_1").await.expect("get").is_none());

    cache.set("carImeiBindings_1", "dev-1").await.expect("set");
    assert_eq!(
        cache.get("carImeiBindings_1").await.expect("get").as_deref(),
        Some("dev-1")
    );
    cache.set("carImeiBindings_1", "dev-2").await.expect("overwrite");
    assert_eq!(
        cache.get("carImeiBindings_1").await.expect("get").as_deref(),
        Some("dev-2")
    );

    cache.delete("carImeiBindings_1").await.expect("delete");
    assert!(cache.is_empty());
    cache.delete("carImeiBindings_1").await.expect("delete missing");
}

#[tokio::test]
async fn catalog_lookup() {
    let catalog = InMemoryProgramCatalog::with_programs(vec![VoltageProgram::new(
        1,
        "48V",
        serde_json::json!({ "low": 42 }),
    )]);
    let found = catalog.find_program(1).await.expect("find").expect("program");
    assert_eq!(found.name, "48V");
    assert!(catalog.find_program(2).await.expect("find").is_none());

    catalog
        .insert(VoltageProgram::new(2, "60V", serde_json::json!({})))
        .expect("insert");
    assert!(catalog.find_program(2).await.expect("find").is_some());
    assert!(catalog.remove(2).expect("remove"));
    assert!(catalog.find_program(2).await.expect("find").is_none());
}
