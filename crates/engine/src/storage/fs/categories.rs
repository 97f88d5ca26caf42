//! Category tree persistence for the filesystem adapter.
//!
//! A category is a directory under the store's memories root. Its
//! description lives in the parent's index entry; the root's description
//! lives on the root index document.

use async_trait::async_trait;

use super::{FilesystemAdapter, INDEX_FILE};
use crate::error::StorageError;
use crate::storage::CategoryCapability;
use crate::types::CategoryPath;

#[async_trait]
impl CategoryCapability for FilesystemAdapter {
    async fn exists(&self, path: &CategoryPath) -> Result<bool, StorageError> {
        tokio::fs::try_exists(self.category_dir(path))
            .await
            .map_err(StorageError::io)
    }

    async fn ensure(&self, path: &CategoryPath) -> Result<(), StorageError> {
        let dir = self.category_dir(path);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(StorageError::io)?;

        // Materialize the category's own index document.
        let guard = self.locks().acquire(&path.to_string()).await?;
        if self.load_index_unlocked(path).await?.is_none() {
            self.store_index_unlocked(path, &Default::default()).await?;
        }
        drop(guard);

        if path.is_root() {
            return Ok(());
        }
        self.refresh_ancestor_entries(path).await
    }

    async fn delete(&self, path: &CategoryPath) -> Result<(), StorageError> {
        let dir = self.category_dir(path);
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(StorageError::io(e)),
        }
        self.remove_subcategory_entry(path).await
    }

    async fn set_description(
        &self,
        path: &CategoryPath,
        description: Option<&str>,
    ) -> Result<(), StorageError> {
        if path.is_root() {
            let guard = self.locks().acquire(&path.to_string()).await?;
            let mut index = self.load_index_unlocked(path).await?.unwrap_or_default();
            index.description = description.map(str::to_string);
            self.store_index_unlocked(path, &index).await?;
            drop(guard);
            return Ok(());
        }

        let parent = path.parent();
        let guard = self.locks().acquire(&parent.to_string()).await?;
        let mut index = self.load_index_unlocked(&parent).await?.unwrap_or_default();
        index.upsert_subcategory(path).description = description.map(str::to_string);
        self.store_index_unlocked(&parent, &index).await?;
        drop(guard);
        Ok(())
    }

    async fn remove_subcategory_entry(&self, path: &CategoryPath) -> Result<(), StorageError> {
        if path.is_root() {
            return Ok(());
        }
        let parent = path.parent();
        let guard = self.locks().acquire(&parent.to_string()).await?;
        let mut index = self.load_index_unlocked(&parent).await?.unwrap_or_default();
        index.remove_subcategory(path);
        self.store_index_unlocked(&parent, &index).await?;
        drop(guard);
        Ok(())
    }
}
