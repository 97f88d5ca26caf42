//! Storage adapter port.
//!
//! The engine never touches persistence directly: every suspension point
//! lives behind one of the five capability traits below, aggregated by
//! [`StorageAdapter`]. Adapters must be safe to invoke from multiple
//! concurrent tasks; memory writes must be atomic with respect to readers
//! (a reader sees the pre-image or the post-image, never a torn
//! document).

pub mod fs;
pub mod locks;

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

use crate::config::{Registry, StoreData, StoreDefinition};
use crate::error::{DomainError, StorageError};
use crate::index::{CategoryIndex, CategoryMemoryEntry};
use crate::types::{CategoryPath, Memory, MemoryPath, ReindexResult, Slug};

/// Registry and per-store configuration persistence (config.yaml).
#[async_trait]
pub trait ConfigCapability: Send + Sync {
    /// Re-read the registry from persistent storage. An absent document
    /// yields an empty registry.
    async fn reload(&self) -> Result<Registry, StorageError>;

    /// Fetch one store's registry entry, or None when unknown.
    async fn get_store(&self, name: &Slug) -> Result<Option<StoreDefinition>, StorageError>;

    /// Insert or replace one store's registry entry.
    async fn save_store(&self, name: &Slug, definition: &StoreDefinition)
        -> Result<(), StorageError>;

    /// Drop one store's registry entry. Removing an unknown name is a
    /// no-op.
    async fn remove(&self, name: &Slug) -> Result<(), StorageError>;
}

/// Per-store metadata persistence (store.yaml), separate from the
/// registry for adapters that split the two.
#[async_trait]
pub trait StoreCapability: Send + Sync {
    /// Load the store's metadata, or None when the store has never been
    /// initialized.
    async fn load(&self) -> Result<Option<StoreData>, StorageError>;

    /// Persist the store's metadata.
    async fn save(&self, data: &StoreData) -> Result<(), StorageError>;
}

/// Category tree persistence.
#[async_trait]
pub trait CategoryCapability: Send + Sync {
    async fn exists(&self, path: &CategoryPath) -> Result<bool, StorageError>;

    /// Idempotent create, including missing ancestors and their index
    /// entries.
    async fn ensure(&self, path: &CategoryPath) -> Result<(), StorageError>;

    /// Recursive delete of the category and everything under it, plus its
    /// entry in the parent's index.
    async fn delete(&self, path: &CategoryPath) -> Result<(), StorageError>;

    /// Write the category's description through the parent's entry (the
    /// root's description lives on the root index). None clears.
    async fn set_description(
        &self,
        path: &CategoryPath,
        description: Option<&str>,
    ) -> Result<(), StorageError>;

    /// Drop the parent's subcategory entry for this path without touching
    /// the category's own contents.
    async fn remove_subcategory_entry(&self, path: &CategoryPath) -> Result<(), StorageError>;
}

/// Derived index persistence and incremental maintenance.
#[async_trait]
pub trait IndexCapability: Send + Sync {
    async fn load(&self, path: &CategoryPath) -> Result<Option<CategoryIndex>, StorageError>;

    async fn store(&self, path: &CategoryPath, index: &CategoryIndex)
        -> Result<(), StorageError>;

    /// Record a create or update of one memory: upsert the entry in its
    /// category's index and refresh ancestor subcategory entries.
    async fn update_after_memory_write(
        &self,
        entry: CategoryMemoryEntry,
    ) -> Result<(), StorageError>;

    /// Record a removal: drop the entry, apply the empty-category cleanup
    /// rule, refresh the parent count.
    async fn update_after_memory_remove(&self, path: &MemoryPath) -> Result<(), StorageError>;

    /// Record a move between paths, carrying the entry's derived fields.
    async fn update_after_memory_move(
        &self,
        from: &MemoryPath,
        to: &MemoryPath,
    ) -> Result<(), StorageError>;

    /// Rebuild every index under `scope` from the document ground truth,
    /// repairing orphan and missing entries.
    async fn reindex(&self, scope: &CategoryPath) -> Result<ReindexResult, StorageError>;
}

/// Memory document persistence.
#[async_trait]
pub trait MemoryCapability: Send + Sync {
    /// Read a memory, or None when absent.
    async fn read(&self, path: &MemoryPath) -> Result<Option<Memory>, StorageError>;

    /// Atomically write (create or replace) a memory document.
    async fn write(&self, memory: &Memory) -> Result<(), StorageError>;

    /// Remove a memory document. Removing an absent path is a no-op.
    async fn remove(&self, path: &MemoryPath) -> Result<(), StorageError>;

    /// Move a memory document between paths.
    async fn rename(&self, from: &MemoryPath, to: &MemoryPath) -> Result<(), StorageError>;

    /// Enumerate every memory path under `scope`. The snapshot is finite
    /// and not restartable across concurrent mutation.
    async fn list_paths_under(&self, scope: &CategoryPath)
        -> Result<Vec<MemoryPath>, StorageError>;
}

/// The composite capability set the engine depends on.
pub trait StorageAdapter: Send + Sync {
    fn config(&self) -> &dyn ConfigCapability;
    fn stores(&self) -> &dyn StoreCapability;
    fn categories(&self) -> &dyn CategoryCapability;
    fn indexes(&self) -> &dyn IndexCapability;
    fn memories(&self) -> &dyn MemoryCapability;
}

/// Creates adapters from a store's `kind` tag, and the config capability
/// used for the registry document above any one store.
pub trait AdapterFactory: Send + Sync {
    /// Open (or create) the adapter backing one store.
    fn open_store(
        &self,
        data_path: &Path,
        name: &Slug,
        definition: &StoreDefinition,
    ) -> Result<Arc<dyn StorageAdapter>, DomainError>;

    /// Open the registry persistence for a data directory.
    fn open_config(&self, data_path: &Path) -> Result<Arc<dyn ConfigCapability>, DomainError>;
}

/// Built-in factory: knows the `filesystem` kind.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultAdapterFactory;

impl AdapterFactory for DefaultAdapterFactory {
    fn open_store(
        &self,
        data_path: &Path,
        name: &Slug,
        definition: &StoreDefinition,
    ) -> Result<Arc<dyn StorageAdapter>, DomainError> {
        match definition.kind.as_str() {
            crate::config::FILESYSTEM_KIND => Ok(Arc::new(fs::FilesystemAdapter::new(
                data_path,
                name,
                definition,
            ))),
            other => Err(DomainError::InvalidArguments {
                reason: format!(
                    "unknown adapter kind '{other}' for store '{name}'; known kinds: filesystem"
                ),
            }),
        }
    }

    fn open_config(&self, data_path: &Path) -> Result<Arc<dyn ConfigCapability>, DomainError> {
        Ok(Arc::new(fs::FsConfigStore::new(data_path)))
    }
}
