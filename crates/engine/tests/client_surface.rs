//! Client surface behavior: lazy validation, navigation, registry
//! management, and configuration round trips.

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use cortex_engine::{
    parse_registry, CategoryMode, Cortex, CortexOptions, CreateMemoryInput,
    DefaultAdapterFactory, ErrorCode, GetMemoryOptions, ListMemoriesOptions, Slug,
    StoreDefinition,
};

const CONFIG: &str = r#"
stores:
  default:
    kind: filesystem
    description: Primary store
  scratch:
    kind: filesystem
"#;

async fn open_cortex(dir: &std::path::Path) -> Cortex {
    let registry = parse_registry(CONFIG).unwrap();
    let cortex = Cortex::init(CortexOptions {
        data_path: dir.to_path_buf(),
        registry: registry.clone(),
        adapter_factory: Arc::new(DefaultAdapterFactory),
    })
    .unwrap();
    cortex.initialize().await.unwrap();

    for name in ["default", "scratch"] {
        let store = cortex.get_store(name).unwrap();
        let definition = registry.get(&Slug::new(name).unwrap()).unwrap();
        store.initialize(definition.to_store_data()).await.unwrap();
    }
    cortex
}

#[tokio::test]
async fn navigation_is_total_and_validation_is_lazy() {
    let dir = tempfile::tempdir().unwrap();
    let cortex = open_cortex(dir.path()).await;
    let store = cortex.get_store("default").unwrap();

    // Building clients for nonsense paths never fails.
    let bad_category = store.category("!!!");
    let bad_memory = store.memory("///");

    // The first async operation surfaces INVALID_PATH.
    let err = bad_category.exists().await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidPath);
    let err = bad_memory.get(GetMemoryOptions::default()).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidPath);
}

#[tokio::test]
async fn navigation_composes_paths() {
    let dir = tempfile::tempdir().unwrap();
    let cortex = open_cortex(dir.path()).await;
    let store = cortex.get_store("default").unwrap();

    let deep = store.root().category("standards").category("typescript");
    assert_eq!(deep.raw_path(), "/standards/typescript");
    assert_eq!(deep.parent().raw_path(), "/standards");
    assert_eq!(deep.parent().parent().raw_path(), "/");
    assert_eq!(deep.parent().parent().parent().raw_path(), "/");

    let memory = deep.memory("style");
    assert_eq!(memory.raw_path(), "/standards/typescript/style");

    let now = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
    memory
        .create(
            CreateMemoryInput {
                content: "use tabs".to_string(),
                ..CreateMemoryInput::default()
            },
            now,
        )
        .await
        .unwrap();

    let entries = deep.list_memories(ListMemoriesOptions::default()).await.unwrap();
    assert_eq!(entries.len(), 1);
}

#[tokio::test]
async fn consecutive_separators_normalize() {
    let dir = tempfile::tempdir().unwrap();
    let cortex = open_cortex(dir.path()).await;
    let store = cortex.get_store("default").unwrap();

    let now = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
    store
        .memory("a//b")
        .create(CreateMemoryInput::default(), now)
        .await
        .unwrap();

    let memory = store
        .memory("a/b")
        .get(GetMemoryOptions::default())
        .await
        .unwrap();
    assert_eq!(memory.path.to_string(), "a/b");
}

#[tokio::test]
async fn stores_are_isolated_from_each_other() {
    let dir = tempfile::tempdir().unwrap();
    let cortex = open_cortex(dir.path()).await;
    let now = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();

    cortex
        .get_store("default")
        .unwrap()
        .memory("notes/alpha")
        .create(CreateMemoryInput::default(), now)
        .await
        .unwrap();

    let err = cortex
        .get_store("scratch")
        .unwrap()
        .memory("notes/alpha")
        .get(GetMemoryOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::MemoryNotFound);
}

#[tokio::test]
async fn unknown_stores_and_bad_names_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let cortex = open_cortex(dir.path()).await;

    let err = cortex.get_store("nope").unwrap_err();
    assert_eq!(err.code(), ErrorCode::StoreNotFound);

    let err = cortex.get_store("Bad Name").unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidStoreName);
}

#[tokio::test]
async fn add_and_remove_stores_round_trip_through_config() {
    let dir = tempfile::tempdir().unwrap();
    let cortex = open_cortex(dir.path()).await;

    let definition = StoreDefinition {
        description: Some("team knowledge".to_string()),
        category_mode: CategoryMode::Free,
        ..StoreDefinition::default()
    };
    cortex.add_store("team", definition.clone()).await.unwrap();

    let err = cortex.add_store("team", definition).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::DuplicateStoreName);

    // A fresh instance sees the persisted registry.
    let reloaded = Cortex::load(
        dir.path().to_path_buf(),
        Arc::new(DefaultAdapterFactory),
    )
    .await
    .unwrap();
    let names: Vec<String> = reloaded
        .store_definitions()
        .iter()
        .map(|(name, _)| name.to_string())
        .collect();
    assert_eq!(names, vec!["default", "scratch", "team"]);

    cortex.remove_store("team").await.unwrap();
    let err = cortex.remove_store("team").await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::StoreNotFound);
}

#[tokio::test]
async fn uninitialized_stores_fail_operations_that_need_data() {
    let dir = tempfile::tempdir().unwrap();
    let registry = parse_registry(CONFIG).unwrap();
    let cortex = Cortex::init(CortexOptions {
        data_path: dir.path().to_path_buf(),
        registry,
        adapter_factory: Arc::new(DefaultAdapterFactory),
    })
    .unwrap();

    let store = cortex.get_store("default").unwrap();
    let now = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
    let err = store
        .memory("notes/alpha")
        .create(CreateMemoryInput::default(), now)
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::StoreNotInitialized);
}

#[tokio::test]
async fn initialize_refuses_a_second_run() {
    let dir = tempfile::tempdir().unwrap();
    let cortex = open_cortex(dir.path()).await;
    let store = cortex.get_store("default").unwrap();

    let err = store
        .initialize(cortex.store_definitions()[0].1.to_store_data())
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::StoreAlreadyExists);
}

#[tokio::test]
async fn store_initialization_creates_declared_categories() {
    let dir = tempfile::tempdir().unwrap();
    let registry = parse_registry(
        r#"
stores:
  default:
    kind: filesystem
    categories:
      standards:
        subcategories:
          typescript: {}
      standup: {}
"#,
    )
    .unwrap();
    let cortex = Cortex::init(CortexOptions {
        data_path: dir.path().to_path_buf(),
        registry: registry.clone(),
        adapter_factory: Arc::new(DefaultAdapterFactory),
    })
    .unwrap();
    cortex.initialize().await.unwrap();

    let store = cortex.get_store("default").unwrap();
    let definition = registry.get(&Slug::new("default").unwrap()).unwrap();
    store.initialize(definition.to_store_data()).await.unwrap();

    for path in ["standards", "standards/typescript", "standup"] {
        assert!(store.category(path).exists().await.unwrap(), "missing {path}");
    }

    let subs = store.root().list_subcategories().await.unwrap();
    let names: Vec<String> = subs.iter().map(|s| s.path.to_string()).collect();
    assert_eq!(names, vec!["standards", "standup"]);
}
