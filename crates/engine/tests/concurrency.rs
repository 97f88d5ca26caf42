//! Concurrent writer behavior: index progress under contention.

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use cortex_engine::{
    parse_registry, Cortex, CortexOptions, CreateMemoryInput, DefaultAdapterFactory,
    ListMemoriesOptions, Slug, StoreClient,
};

const CONFIG: &str = r#"
stores:
  default:
    kind: filesystem
    properties:
      index_lock_timeout_ms: 30000
"#;

async fn open_store(dir: &std::path::Path) -> StoreClient {
    let registry = parse_registry(CONFIG).unwrap();
    let cortex = Cortex::init(CortexOptions {
        data_path: dir.to_path_buf(),
        registry: registry.clone(),
        adapter_factory: Arc::new(DefaultAdapterFactory),
    })
    .unwrap();
    cortex.initialize().await.unwrap();

    let store = cortex.get_store("default").unwrap();
    let definition = registry.get(&Slug::new("default").unwrap()).unwrap();
    store.initialize(definition.to_store_data()).await.unwrap();
    store
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn fifty_concurrent_creates_yield_fifty_entries() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(dir.path()).await;
    let now = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();

    let mut tasks = Vec::new();
    for n in 1..=50 {
        let store = store.clone();
        tasks.push(tokio::spawn(async move {
            store
                .memory(&format!("bulk/item-{n}"))
                .create(
                    CreateMemoryInput {
                        content: format!("item number {n}"),
                        ..CreateMemoryInput::default()
                    },
                    now,
                )
                .await
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let entries = store
        .category("bulk")
        .list_memories(ListMemoriesOptions::default())
        .await
        .unwrap();
    assert_eq!(entries.len(), 50);

    // Every path appears exactly once.
    let mut paths: Vec<String> = entries.iter().map(|e| e.path.to_string()).collect();
    paths.dedup();
    assert_eq!(paths.len(), 50);

    // A fresh reindex finds nothing to repair.
    let before = entries;
    let result = store.category("bulk").reindex().await.unwrap();
    assert_eq!(result.memories_indexed, 50);
    assert!(result.warnings.is_empty());
    let after = store
        .category("bulk")
        .list_memories(ListMemoriesOptions::default())
        .await
        .unwrap();
    assert_eq!(before, after);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_writers_across_categories_do_not_interfere() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(dir.path()).await;
    let now = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();

    let mut tasks = Vec::new();
    for c in ["alpha", "beta", "gamma", "delta"] {
        for n in 1..=10 {
            let store = store.clone();
            tasks.push(tokio::spawn(async move {
                store
                    .memory(&format!("{c}/item-{n}"))
                    .create(
                        CreateMemoryInput {
                            content: "x".to_string(),
                            ..CreateMemoryInput::default()
                        },
                        now,
                    )
                    .await
            }));
        }
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    for c in ["alpha", "beta", "gamma", "delta"] {
        let entries = store
            .category(c)
            .list_memories(ListMemoriesOptions::default())
            .await
            .unwrap();
        assert_eq!(entries.len(), 10, "category {c}");
    }

    let subs = store.root().list_subcategories().await.unwrap();
    assert_eq!(subs.len(), 4);
    assert!(subs.iter().all(|s| s.memory_count == 10));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_mixed_writes_and_removes_settle_consistently() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(dir.path()).await;
    let now = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();

    for n in 1..=20 {
        store
            .memory(&format!("mixed/item-{n}"))
            .create(
                CreateMemoryInput {
                    content: "x".to_string(),
                    ..CreateMemoryInput::default()
                },
                now,
            )
            .await
            .unwrap();
    }

    // Remove the first ten while creating ten more.
    let mut tasks = Vec::new();
    for n in 1..=10 {
        let store = store.clone();
        tasks.push(tokio::spawn(async move {
            store.memory(&format!("mixed/item-{n}")).remove().await
        }));
    }
    for n in 21..=30 {
        let store = store.clone();
        tasks.push(tokio::spawn(async move {
            store
                .memory(&format!("mixed/item-{n}"))
                .create(
                    CreateMemoryInput {
                        content: "x".to_string(),
                        ..CreateMemoryInput::default()
                    },
                    now,
                )
                .await
                .map(|_| ())
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let entries = store
        .category("mixed")
        .list_memories(ListMemoriesOptions::default())
        .await
        .unwrap();
    assert_eq!(entries.len(), 20);

    let result = store.category("mixed").reindex().await.unwrap();
    assert_eq!(result.memories_indexed, 20);
}
