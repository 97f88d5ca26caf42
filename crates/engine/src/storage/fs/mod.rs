//! Filesystem storage adapter.
//!
//! The reference adapter: stores and memories live as plain directories,
//! Markdown documents, and YAML index files under a data directory.
//!
//! ```text
//! {data_path}/
//!   config.yaml                     registry + store definitions
//!   stores/
//!     {store}/
//!       store.yaml                  per-store metadata
//!       memories/
//!         {category}/.../{leaf}.md  memory documents
//!         {category}/.../.index.yaml  category index
//! ```
//!
//! Document writes are atomic (temp file + rename); index updates
//! serialize per category through [`PathLockMap`].

mod categories;
mod indexes;
mod memories;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tempfile::NamedTempFile;
use tokio::sync::Mutex;

use crate::config::{
    parse_registry_lenient, render_registry, Registry, StoreData, StoreDefinition,
};
use crate::error::StorageError;
use crate::storage::locks::{PathLockMap, DEFAULT_LOCK_TIMEOUT};
use crate::storage::{
    CategoryCapability, ConfigCapability, IndexCapability, MemoryCapability, StorageAdapter,
    StoreCapability,
};
use crate::tokens::{create_estimator, TokenEstimator};
use crate::types::{CategoryPath, MemoryPath, Slug};

const CONFIG_FILE: &str = "config.yaml";
const STORE_FILE: &str = "store.yaml";
const INDEX_FILE: &str = ".index.yaml";
const MEMORY_EXTENSION: &str = "md";

/// Filesystem adapter for one store.
pub struct FilesystemAdapter {
    store_root: PathBuf,
    config: FsConfigStore,
    locks: PathLockMap,
    estimator: Arc<dyn TokenEstimator>,
}

impl FilesystemAdapter {
    pub fn new(data_path: &Path, name: &Slug, definition: &StoreDefinition) -> Self {
        let timeout = definition
            .properties
            .get(&serde_yaml::Value::String("index_lock_timeout_ms".to_string()))
            .and_then(|v| v.as_u64())
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_LOCK_TIMEOUT);

        FilesystemAdapter {
            store_root: data_path.join("stores").join(name.as_str()),
            config: FsConfigStore::new(data_path),
            locks: PathLockMap::new(timeout),
            estimator: create_estimator(definition.property_str("token_estimator")),
        }
    }

    fn store_file(&self) -> PathBuf {
        self.store_root.join(STORE_FILE)
    }

    fn memories_root(&self) -> PathBuf {
        self.store_root.join("memories")
    }

    fn category_dir(&self, path: &CategoryPath) -> PathBuf {
        let mut dir = self.memories_root();
        for segment in path.segments() {
            dir.push(segment.as_str());
        }
        dir
    }

    fn memory_file(&self, path: &MemoryPath) -> PathBuf {
        self.category_dir(&path.category)
            .join(format!("{}.{}", path.leaf, MEMORY_EXTENSION))
    }

    fn index_file(&self, path: &CategoryPath) -> PathBuf {
        self.category_dir(path).join(INDEX_FILE)
    }

    pub(crate) fn estimator(&self) -> &dyn TokenEstimator {
        self.estimator.as_ref()
    }

    pub(crate) fn locks(&self) -> &PathLockMap {
        &self.locks
    }
}

impl StorageAdapter for FilesystemAdapter {
    fn config(&self) -> &dyn ConfigCapability {
        &self.config
    }

    fn stores(&self) -> &dyn StoreCapability {
        self
    }

    fn categories(&self) -> &dyn CategoryCapability {
        self
    }

    fn indexes(&self) -> &dyn IndexCapability {
        self
    }

    fn memories(&self) -> &dyn MemoryCapability {
        self
    }
}

#[async_trait]
impl StoreCapability for FilesystemAdapter {
    async fn load(&self) -> Result<Option<StoreData>, StorageError> {
        let text = match tokio::fs::read_to_string(self.store_file()).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StorageError::io(e)),
        };
        let data = serde_yaml::from_str(&text).map_err(|e| StorageError::Parse {
            path: STORE_FILE.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Some(data))
    }

    async fn save(&self, data: &StoreData) -> Result<(), StorageError> {
        let yaml = serde_yaml::to_string(data).map_err(|e| StorageError::Serialize {
            reason: format!("{STORE_FILE}: {e}"),
        })?;
        write_atomic(self.store_file(), yaml).await
    }
}

/// Registry persistence for a data directory (config.yaml). In-process
/// writers serialize through an internal mutex; the write itself is
/// atomic for cooperating processes.
pub struct FsConfigStore {
    config_path: PathBuf,
    write_guard: Mutex<()>,
}

impl FsConfigStore {
    pub fn new(data_path: &Path) -> Self {
        FsConfigStore {
            config_path: data_path.join(CONFIG_FILE),
            write_guard: Mutex::new(()),
        }
    }

    async fn load(&self) -> Result<Registry, StorageError> {
        let text = match tokio::fs::read_to_string(&self.config_path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Registry::new()),
            Err(e) => {
                return Err(StorageError::ConfigRead {
                    reason: e.to_string(),
                })
            }
        };
        parse_registry_lenient(&text).map_err(|e| StorageError::ConfigRead {
            reason: e.to_string(),
        })
    }

    async fn persist(&self, registry: &Registry) -> Result<(), StorageError> {
        let yaml = render_registry(registry).map_err(|e| StorageError::ConfigWrite {
            reason: e.to_string(),
        })?;
        write_atomic(self.config_path.clone(), yaml)
            .await
            .map_err(|e| StorageError::ConfigWrite {
                reason: e.to_string(),
            })
    }
}

#[async_trait]
impl ConfigCapability for FsConfigStore {
    async fn reload(&self) -> Result<Registry, StorageError> {
        self.load().await
    }

    async fn get_store(&self, name: &Slug) -> Result<Option<StoreDefinition>, StorageError> {
        Ok(self.load().await?.remove(name))
    }

    async fn save_store(
        &self,
        name: &Slug,
        definition: &StoreDefinition,
    ) -> Result<(), StorageError> {
        let _guard = self.write_guard.lock().await;
        let mut registry = self.load().await?;
        registry.insert(name.clone(), definition.clone());
        self.persist(&registry).await
    }

    async fn remove(&self, name: &Slug) -> Result<(), StorageError> {
        let _guard = self.write_guard.lock().await;
        let mut registry = self.load().await?;
        registry.remove(name);
        self.persist(&registry).await
    }
}

/// Write a document atomically: temp file in the destination directory,
/// then rename over the target.
pub(crate) async fn write_atomic(path: PathBuf, contents: String) -> Result<(), StorageError> {
    tokio::task::spawn_blocking(move || {
        let parent = path.parent().ok_or_else(|| StorageError::Io {
            reason: format!("no parent directory for {}", path.display()),
        })?;
        std::fs::create_dir_all(parent).map_err(StorageError::io)?;

        let temp = NamedTempFile::new_in(parent).map_err(StorageError::io)?;
        std::fs::write(temp.path(), contents.as_bytes()).map_err(StorageError::io)?;
        temp.persist(&path).map_err(StorageError::io)?;
        Ok(())
    })
    .await
    .map_err(|e| StorageError::Io {
        reason: format!("blocking task failed: {e}"),
    })?
}
