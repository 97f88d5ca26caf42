//! End-to-end memory lifecycle against the filesystem adapter.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use cortex_engine::{
    parse_registry, Cortex, CortexOptions, CreateMemoryInput, DefaultAdapterFactory, ErrorCode,
    GetMemoryOptions, ListMemoriesOptions, MemorySource, Slug, StoreClient, Update,
    UpdateMemoryInput,
};

const CONFIG: &str = r#"
stores:
  default:
    kind: filesystem
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

fn ts(month: u32, day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, month, day, hour, 0, 0).unwrap()
}

#[tokio::test]
async fn create_then_list_shows_one_entry() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(dir.path()).await;

    let input = CreateMemoryInput {
        content: "use tabs".to_string(),
        source: MemorySource::User,
        tags: vec!["style".to_string()],
        ..CreateMemoryInput::default()
    };
    store
        .memory("standards/typescript/style")
        .create(input, ts(3, 1, 0))
        .await
        .unwrap();

    let entries = store
        .category("standards/typescript")
        .list_memories(ListMemoriesOptions::default())
        .await
        .unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].path.to_string(), "standards/typescript/style");
    assert!(entries[0].token_estimate > 0);
}

#[tokio::test]
async fn create_rejects_duplicates() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(dir.path()).await;

    let memory = store.memory("notes/alpha");
    memory
        .create(CreateMemoryInput::default(), ts(3, 1, 0))
        .await
        .unwrap();
    let err = memory
        .create(CreateMemoryInput::default(), ts(3, 1, 1))
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::MemoryAlreadyExists);
}

#[tokio::test]
async fn get_round_trips_metadata_and_content() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(dir.path()).await;

    let input = CreateMemoryInput {
        content: "retro notes\nline two".to_string(),
        source: MemorySource::Import,
        tags: vec!["retro".to_string(), "".to_string(), "retro".to_string()],
        citations: vec!["meeting-2026-03-01".to_string()],
        summary: Some("march retro".to_string()),
        ..CreateMemoryInput::default()
    };
    store
        .memory("notes/retro")
        .create(input, ts(3, 1, 9))
        .await
        .unwrap();

    let memory = store
        .memory("notes/retro")
        .get(GetMemoryOptions::default())
        .await
        .unwrap();
    assert_eq!(memory.content, "retro notes\nline two");
    assert_eq!(memory.metadata.source, MemorySource::Import);
    assert_eq!(memory.metadata.tags, vec!["retro".to_string()]);
    assert_eq!(memory.metadata.citations, vec!["meeting-2026-03-01".to_string()]);
    assert_eq!(memory.metadata.summary.as_deref(), Some("march retro"));
    assert_eq!(memory.metadata.created_at, ts(3, 1, 9));
    assert_eq!(memory.metadata.updated_at, ts(3, 1, 9));
}

#[tokio::test]
async fn get_missing_returns_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(dir.path()).await;

    let err = store
        .memory("notes/ghost")
        .get(GetMemoryOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::MemoryNotFound);
}

#[tokio::test]
async fn expired_memories_read_as_not_found_unless_included() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(dir.path()).await;

    let input = CreateMemoryInput {
        content: "ephemeral".to_string(),
        expires_at: Some(ts(3, 2, 0)),
        ..CreateMemoryInput::default()
    };
    store
        .memory("notes/ephemeral")
        .create(input, ts(3, 1, 0))
        .await
        .unwrap();

    let err = store
        .memory("notes/ephemeral")
        .get(GetMemoryOptions {
            include_expired: false,
            now: Some(ts(3, 3, 0)),
        })
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::MemoryNotFound);

    let memory = store
        .memory("notes/ephemeral")
        .get(GetMemoryOptions {
            include_expired: true,
            now: Some(ts(3, 3, 0)),
        })
        .await
        .unwrap();
    assert_eq!(memory.content, "ephemeral");
}

#[tokio::test]
async fn update_merges_field_wise() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(dir.path()).await;

    let input = CreateMemoryInput {
        content: "v1".to_string(),
        tags: vec!["draft".to_string()],
        summary: Some("first draft".to_string()),
        expires_at: Some(ts(6, 1, 0)),
        ..CreateMemoryInput::default()
    };
    store
        .memory("notes/doc")
        .create(input, ts(3, 1, 0))
        .await
        .unwrap();

    // Omitted fields preserve; content "" replaces; expires_at clears.
    let updated = store
        .memory("notes/doc")
        .update(
            UpdateMemoryInput {
                content: Some(String::new()),
                expires_at: Update::Clear,
                ..UpdateMemoryInput::default()
            },
            ts(3, 2, 0),
        )
        .await
        .unwrap();

    assert_eq!(updated.content, "");
    assert_eq!(updated.metadata.tags, vec!["draft".to_string()]);
    assert_eq!(updated.metadata.summary.as_deref(), Some("first draft"));
    assert_eq!(updated.metadata.expires_at, None);
    assert_eq!(updated.metadata.created_at, ts(3, 1, 0));
    assert_eq!(updated.metadata.updated_at, ts(3, 2, 0));

    // Keep preserves an expiry that is still set.
    let updated = store
        .memory("notes/doc")
        .update(
            UpdateMemoryInput {
                tags: Some(vec!["final".to_string()]),
                summary: Update::Set("done".to_string()),
                ..UpdateMemoryInput::default()
            },
            ts(3, 3, 0),
        )
        .await
        .unwrap();
    assert_eq!(updated.metadata.tags, vec!["final".to_string()]);
    assert_eq!(updated.metadata.summary.as_deref(), Some("done"));
    assert_eq!(updated.content, "");
    assert_eq!(updated.metadata.updated_at, ts(3, 3, 0));
}

#[tokio::test]
async fn update_missing_returns_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(dir.path()).await;

    let err = store
        .memory("notes/ghost")
        .update(UpdateMemoryInput::default(), ts(3, 1, 0))
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::MemoryNotFound);
}

#[tokio::test]
async fn move_preserves_timestamps_and_updates_listings() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(dir.path()).await;

    let input = CreateMemoryInput {
        content: "keep me".to_string(),
        ..CreateMemoryInput::default()
    };
    store
        .memory("notes/alpha")
        .create(input, ts(3, 1, 0))
        .await
        .unwrap();

    store
        .memory("notes/alpha")
        .move_to("archive/alpha")
        .await
        .unwrap();

    let err = store
        .memory("notes/alpha")
        .get(GetMemoryOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::MemoryNotFound);

    let moved = store
        .memory("archive/alpha")
        .get(GetMemoryOptions::default())
        .await
        .unwrap();
    assert_eq!(moved.metadata.created_at, ts(3, 1, 0));
    // A move never bumps updated_at.
    assert_eq!(moved.metadata.updated_at, ts(3, 1, 0));

    let notes = store
        .category("notes")
        .list_memories(ListMemoriesOptions::default())
        .await
        .unwrap();
    assert!(notes.is_empty());

    let archive = store
        .category("archive")
        .list_memories(ListMemoriesOptions::default())
        .await
        .unwrap();
    assert_eq!(archive.len(), 1);
    assert_eq!(archive[0].path.to_string(), "archive/alpha");
}

#[tokio::test]
async fn move_round_trip_restores_the_original_state() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(dir.path()).await;

    let input = CreateMemoryInput {
        content: "boomerang".to_string(),
        tags: vec!["keep".to_string()],
        ..CreateMemoryInput::default()
    };
    let original = store
        .memory("notes/alpha")
        .create(input, ts(3, 1, 0))
        .await
        .unwrap();

    store
        .memory("notes/alpha")
        .move_to("archive/alpha")
        .await
        .unwrap();
    store
        .memory("archive/alpha")
        .move_to("notes/alpha")
        .await
        .unwrap();

    let restored = store
        .memory("notes/alpha")
        .get(GetMemoryOptions::default())
        .await
        .unwrap();
    assert_eq!(restored, original);
}

#[tokio::test]
async fn move_refuses_existing_destinations() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(dir.path()).await;

    for path in ["notes/alpha", "notes/beta"] {
        store
            .memory(path)
            .create(CreateMemoryInput::default(), ts(3, 1, 0))
            .await
            .unwrap();
    }

    let err = store
        .memory("notes/alpha")
        .move_to("notes/beta")
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::DestinationExists);
}

#[tokio::test]
async fn remove_deletes_the_document_and_entry() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(dir.path()).await;

    store
        .memory("notes/alpha")
        .create(CreateMemoryInput::default(), ts(3, 1, 0))
        .await
        .unwrap();
    store.memory("notes/alpha").remove().await.unwrap();

    assert!(!store.memory("notes/alpha").exists().await.unwrap());
    let err = store.memory("notes/alpha").remove().await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::MemoryNotFound);

    let entries = store
        .root()
        .list_memories(ListMemoriesOptions::default())
        .await
        .unwrap();
    assert!(entries.is_empty());
}
