//! Memory document persistence for the filesystem adapter.

use async_trait::async_trait;
use std::path::Path;

use super::{write_atomic, FilesystemAdapter, INDEX_FILE, MEMORY_EXTENSION};
use crate::document::{parse_memory, serialize_memory};
use crate::error::StorageError;
use crate::storage::MemoryCapability;
use crate::types::{CategoryPath, Memory, MemoryPath, Slug};

#[async_trait]
impl MemoryCapability for FilesystemAdapter {
    async fn read(&self, path: &MemoryPath) -> Result<Option<Memory>, StorageError> {
        let file = self.memory_file(path);
        let text = match tokio::fs::read_to_string(&file).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StorageError::io(e)),
        };
        parse_memory(path.clone(), &text).map(Some)
    }

    async fn write(&self, memory: &Memory) -> Result<(), StorageError> {
        let doc = serialize_memory(memory)?;
        write_atomic(self.memory_file(&memory.path), doc).await
    }

    async fn remove(&self, path: &MemoryPath) -> Result<(), StorageError> {
        match tokio::fs::remove_file(self.memory_file(path)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::io(e)),
        }
    }

    async fn rename(&self, from: &MemoryPath, to: &MemoryPath) -> Result<(), StorageError> {
        let source = self.memory_file(from);
        let target = self.memory_file(to);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(StorageError::io)?;
        }
        tokio::fs::rename(&source, &target)
            .await
            .map_err(StorageError::io)
    }

    async fn list_paths_under(
        &self,
        scope: &CategoryPath,
    ) -> Result<Vec<MemoryPath>, StorageError> {
        let root = self.category_dir(scope);
        let scope = scope.clone();
        tokio::task::spawn_blocking(move || {
            let mut paths = Vec::new();
            collect_paths(&root, &scope, &mut paths)?;
            paths.sort();
            Ok(paths)
        })
        .await
        .map_err(|e| StorageError::Io {
            reason: format!("blocking task failed: {e}"),
        })?
    }
}

/// Walk a category directory collecting memory paths. Entries whose names
/// are not valid slugs are skipped here; reindex owns their repair.
fn collect_paths(
    dir: &Path,
    category: &CategoryPath,
    out: &mut Vec<MemoryPath>,
) -> Result<(), StorageError> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(StorageError::io(e)),
    };

    for entry in entries {
        let entry = entry.map_err(StorageError::io)?;
        let name = entry.file_name();
        let name = match name.to_str() {
            Some(name) => name,
            None => continue,
        };
        if name == INDEX_FILE || name.starts_with('.') {
            continue;
        }

        let file_type = entry.file_type().map_err(StorageError::io)?;
        if file_type.is_dir() {
            if let Ok(slug) = Slug::new(name) {
                collect_paths(&entry.path(), &category.join(slug), out)?;
            }
        } else if let Some(stem) = name.strip_suffix(&format!(".{MEMORY_EXTENSION}")) {
            if let Ok(leaf) = Slug::new(stem) {
                out.push(MemoryPath::new(category.clone(), leaf));
            }
        }
    }
    Ok(())
}
