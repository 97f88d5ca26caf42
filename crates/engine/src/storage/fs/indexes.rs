//! Index persistence and maintenance for the filesystem adapter.
//!
//! Every incremental update acquires the per-category lock, loads the
//! index document, applies one of the pure mutations from
//! [`crate::index`], and stores it back. No operation ever holds two
//! category locks at once; ancestor refreshes acquire one lock per level.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::Path;

use super::{write_atomic, FilesystemAdapter, INDEX_FILE, MEMORY_EXTENSION};
use crate::error::StorageError;
use crate::index::{CategoryIndex, CategoryMemoryEntry};
use crate::storage::{IndexCapability, MemoryCapability};
use crate::types::{CategoryPath, MemoryPath, ReindexResult, Slug};

impl FilesystemAdapter {
    pub(super) async fn load_index_unlocked(
        &self,
        path: &CategoryPath,
    ) -> Result<Option<CategoryIndex>, StorageError> {
        let file = self.index_file(path);
        let text = match tokio::fs::read_to_string(&file).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StorageError::io(e)),
        };
        serde_yaml::from_str(&text)
            .map(Some)
            .map_err(|e| StorageError::Parse {
                path: format!("{}/{INDEX_FILE}", path),
                reason: e.to_string(),
            })
    }

    pub(super) async fn store_index_unlocked(
        &self,
        path: &CategoryPath,
        index: &CategoryIndex,
    ) -> Result<(), StorageError> {
        let yaml = serde_yaml::to_string(index).map_err(|e| StorageError::Serialize {
            reason: format!("{}/{INDEX_FILE}: {e}", path),
        })?;
        write_atomic(self.index_file(path), yaml).await
    }

    /// Bring the parent's entry for `child` in line with the child's
    /// current index document. The child's count is read inside the
    /// parent lock so the last writer for a burst of concurrent child
    /// mutations always records the settled count. Returns whether the
    /// entry already existed.
    async fn sync_parent_entry(
        &self,
        child: &CategoryPath,
        allow_remove: bool,
    ) -> Result<bool, StorageError> {
        let parent = child.parent();
        let guard = self.locks().acquire(&parent.to_string()).await?;
        let child_index = self.load_index_unlocked(child).await?;
        let mut index = self.load_index_unlocked(&parent).await?.unwrap_or_default();
        let existed = index.subcategory(child).is_some();
        match child_index {
            Some(child_index) => {
                index.upsert_subcategory(child).memory_count =
                    child_index.memories.len() as u64;
            }
            None if allow_remove => {
                index.remove_subcategory(child);
            }
            None => {
                index.upsert_subcategory(child);
            }
        }
        self.store_index_unlocked(&parent, &index).await?;
        drop(guard);
        Ok(existed)
    }

    /// Walk from `category` toward the root, making sure each parent has
    /// a subcategory entry for its child with a fresh direct memory
    /// count. Stops once an existing entry is found above the first
    /// level, since the chain above it is already linked.
    pub(super) async fn refresh_ancestor_entries(
        &self,
        category: &CategoryPath,
    ) -> Result<(), StorageError> {
        let mut child = category.clone();
        while !child.is_root() {
            let existed = self.sync_parent_entry(&child, false).await?;
            if existed && child != *category {
                break;
            }
            child = child.parent();
        }
        Ok(())
    }

    /// Drop a memory's entry from its category index, applying the
    /// empty-category cleanup rule: a category left with no memories, no
    /// subcategories, and no description loses its index document, its
    /// directory, and its entry in the parent. The index document is
    /// deleted under the category lock so concurrent writers never lose
    /// an update. Returns the removed entry when one existed.
    async fn remove_entry_and_cleanup(
        &self,
        path: &MemoryPath,
    ) -> Result<Option<CategoryMemoryEntry>, StorageError> {
        let category = path.category.clone();

        let guard = self.locks().acquire(&category.to_string()).await?;
        let mut index = self
            .load_index_unlocked(&category)
            .await?
            .unwrap_or_default();
        let carried = index.memory(path).cloned();
        index.remove_memory(path);

        let described = if category.is_root() {
            true
        } else {
            self.load_index_unlocked(&category.parent())
                .await?
                .and_then(|parent| {
                    parent
                        .subcategory(&category)
                        .and_then(|e| e.description.clone())
                })
                .is_some()
        };

        if index.is_empty() && !described && !category.is_root() {
            let dir = self.category_dir(&category);
            let _ = tokio::fs::remove_file(dir.join(INDEX_FILE)).await;
            let _ = tokio::fs::remove_dir(&dir).await;
        } else {
            self.store_index_unlocked(&category, &index).await?;
        }
        drop(guard);

        if !category.is_root() {
            self.sync_parent_entry(&category, true).await?;
        }
        Ok(carried)
    }

    /// Build the index entry for a memory already on disk at `path`.
    async fn entry_from_document(
        &self,
        path: &MemoryPath,
    ) -> Result<Option<CategoryMemoryEntry>, StorageError> {
        let memory = match MemoryCapability::read(self, path).await? {
            Some(memory) => memory,
            None => return Ok(None),
        };
        Ok(Some(CategoryMemoryEntry {
            path: path.clone(),
            token_estimate: self.estimator().estimate(&memory.content),
            summary: memory.metadata.summary.clone(),
            updated_at: Some(memory.metadata.updated_at),
            expires_at: memory.metadata.expires_at,
        }))
    }
}

#[async_trait]
impl IndexCapability for FilesystemAdapter {
    async fn load(&self, path: &CategoryPath) -> Result<Option<CategoryIndex>, StorageError> {
        self.load_index_unlocked(path).await
    }

    async fn store(
        &self,
        path: &CategoryPath,
        index: &CategoryIndex,
    ) -> Result<(), StorageError> {
        let guard = self.locks().acquire(&path.to_string()).await?;
        self.store_index_unlocked(path, index).await?;
        drop(guard);
        Ok(())
    }

    async fn update_after_memory_write(
        &self,
        entry: CategoryMemoryEntry,
    ) -> Result<(), StorageError> {
        let category = entry.path.category.clone();

        let guard = self.locks().acquire(&category.to_string()).await?;
        let mut index = self
            .load_index_unlocked(&category)
            .await?
            .unwrap_or_default();
        index.upsert_memory(entry);
        self.store_index_unlocked(&category, &index).await?;
        drop(guard);

        self.refresh_ancestor_entries(&category).await
    }

    async fn update_after_memory_remove(&self, path: &MemoryPath) -> Result<(), StorageError> {
        self.remove_entry_and_cleanup(path).await.map(|_| ())
    }

    async fn update_after_memory_move(
        &self,
        from: &MemoryPath,
        to: &MemoryPath,
    ) -> Result<(), StorageError> {
        if from.category == to.category {
            let category = from.category.clone();
            let guard = self.locks().acquire(&category.to_string()).await?;
            let mut index = self
                .load_index_unlocked(&category)
                .await?
                .unwrap_or_default();
            let carried = index.memory(from).cloned();
            index.remove_memory(from);
            let mut entry = match carried {
                Some(entry) => entry,
                None => match self.entry_from_document(to).await? {
                    Some(entry) => entry,
                    None => {
                        self.store_index_unlocked(&category, &index).await?;
                        return Ok(());
                    }
                },
            };
            entry.path = to.clone();
            index.upsert_memory(entry);
            self.store_index_unlocked(&category, &index).await?;
            drop(guard);
            return Ok(());
        }

        // Cross-category: detach from the source index first.
        let carried = self.remove_entry_and_cleanup(from).await?;

        let mut entry = match carried {
            Some(entry) => entry,
            None => match self.entry_from_document(to).await? {
                Some(entry) => entry,
                None => return Ok(()),
            },
        };
        entry.path = to.clone();
        self.update_after_memory_write(entry).await
    }

    async fn reindex(&self, scope: &CategoryPath) -> Result<ReindexResult, StorageError> {
        let scope_dir = self.category_dir(scope);
        if !tokio::fs::try_exists(&scope_dir).await.unwrap_or(false) {
            return Ok(ReindexResult::default());
        }

        // Phase one: blocking walk. Repairs non-slug file and directory
        // names on disk and returns the surviving tree shape.
        let scope_clone = scope.clone();
        let (tree, mut warnings) = tokio::task::spawn_blocking(move || {
            let mut tree: BTreeMap<CategoryPath, ScanNode> = BTreeMap::new();
            let mut warnings = Vec::new();
            scan_tree(&scope_dir, scope_clone, &mut tree, &mut warnings)?;
            Ok::<_, StorageError>((tree, warnings))
        })
        .await
        .map_err(|e| StorageError::Io {
            reason: format!("blocking task failed: {e}"),
        })??;

        // Phase two: rebuild each category's index from the documents,
        // carrying descriptions over from the previous index.
        let mut memories_indexed = 0usize;
        for (category, node) in &tree {
            let previous = self
                .load_index_unlocked(category)
                .await?
                .unwrap_or_default();
            let mut rebuilt = CategoryIndex {
                description: previous.description.clone(),
                ..CategoryIndex::default()
            };

            for leaf in &node.leaves {
                let path = MemoryPath::new(category.clone(), leaf.clone());
                match self.entry_from_document(&path).await {
                    Ok(Some(entry)) => {
                        rebuilt.upsert_memory(entry);
                        memories_indexed += 1;
                    }
                    Ok(None) => {}
                    Err(e) => warnings.push(format!("skipped '{path}': {e}")),
                }
            }

            for child in &node.children {
                let child_path = category.join(child.clone());
                let count = tree
                    .get(&child_path)
                    .map(|n| n.leaves.len() as u64)
                    .unwrap_or(0);
                let description = previous
                    .subcategory(&child_path)
                    .and_then(|e| e.description.clone());
                let entry = rebuilt.upsert_subcategory(&child_path);
                entry.memory_count = count;
                entry.description = description;
            }

            let guard = self.locks().acquire(&category.to_string()).await?;
            self.store_index_unlocked(category, &rebuilt).await?;
            drop(guard);
        }

        // Relink the scope into its ancestors with the fresh count.
        if !scope.is_root() {
            self.refresh_ancestor_entries(scope).await?;
        }

        Ok(ReindexResult {
            categories_indexed: tree.len(),
            memories_indexed,
            warnings,
        })
    }
}

struct ScanNode {
    leaves: Vec<Slug>,
    children: Vec<Slug>,
}

/// Recursive blocking walk. Renames non-slug names into sanitized forms
/// (numeric suffixes on collision) and records a warning per repair.
fn scan_tree(
    dir: &Path,
    category: CategoryPath,
    tree: &mut BTreeMap<CategoryPath, ScanNode>,
    warnings: &mut Vec<String>,
) -> Result<(), StorageError> {
    let mut leaves = Vec::new();
    let mut children = Vec::new();

    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(StorageError::io(e)),
    };

    let mut subdirs = Vec::new();
    for entry in entries {
        let entry = entry.map_err(StorageError::io)?;
        let name = entry.file_name();
        let name = match name.to_str() {
            Some(name) => name.to_string(),
            None => {
                warnings.push(format!(
                    "skipped non-UTF-8 name under '/{category}'"
                ));
                continue;
            }
        };
        if name == INDEX_FILE || name.starts_with('.') {
            continue;
        }

        let file_type = entry.file_type().map_err(StorageError::io)?;
        if file_type.is_dir() {
            match repair_name(dir, &name, None, warnings, &category)? {
                Some(slug) => subdirs.push(slug),
                None => continue,
            }
        } else if let Some(stem) = name.strip_suffix(&format!(".{MEMORY_EXTENSION}")) {
            match repair_name(dir, stem, Some(MEMORY_EXTENSION), warnings, &category)? {
                Some(slug) => leaves.push(slug),
                None => continue,
            }
        }
    }

    for child in subdirs {
        let child_path = category.join(child.clone());
        scan_tree(&dir.join(child.as_str()), child_path, tree, warnings)?;
        children.push(child);
    }

    leaves.sort();
    children.sort();
    tree.insert(category, ScanNode { leaves, children });
    Ok(())
}

/// Validate one on-disk name, renaming it to a sanitized slug when
/// needed. Returns None when nothing usable remains.
fn repair_name(
    dir: &Path,
    stem: &str,
    extension: Option<&str>,
    warnings: &mut Vec<String>,
    category: &CategoryPath,
) -> Result<Option<Slug>, StorageError> {
    if let Ok(slug) = Slug::new(stem) {
        if slug.as_str() == stem {
            return Ok(Some(slug));
        }
    }

    let base = match slugify(stem) {
        Some(base) => base,
        None => {
            warnings.push(format!(
                "skipped '{stem}' under '/{category}': no valid slug remains"
            ));
            return Ok(None);
        }
    };

    let with_ext = |name: &str| match extension {
        Some(ext) => format!("{name}.{ext}"),
        None => name.to_string(),
    };

    let mut candidate = base.clone();
    let mut suffix = 2;
    while dir.join(with_ext(&candidate)).exists() {
        candidate = format!("{base}-{suffix}");
        suffix += 1;
    }

    std::fs::rename(dir.join(with_ext(stem)), dir.join(with_ext(&candidate)))
        .map_err(StorageError::io)?;
    warnings.push(format!(
        "renamed '{stem}' to '{candidate}' under '/{category}'"
    ));
    Ok(Some(Slug::new(&candidate).expect("sanitized name is a slug")))
}

/// Reduce an arbitrary name to slug form: lowercase, whitespace and
/// underscores to hyphens, other characters dropped, hyphen runs
/// collapsed. None when nothing remains.
fn slugify(raw: &str) -> Option<String> {
    let mut out = String::with_capacity(raw.len());
    for c in raw.trim().to_ascii_lowercase().chars() {
        match c {
            'a'..='z' | '0'..='9' => out.push(c),
            ' ' | '\t' | '_' | '-' | '.' => out.push('-'),
            _ => {}
        }
    }
    let collapsed: Vec<&str> = out.split('-').filter(|s| !s.is_empty()).collect();
    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed.join("-"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreDefinition;
    use crate::types::{Memory, MemoryMetadata, MemoryPath};
    use chrono::{TimeZone, Utc};

    fn adapter(dir: &Path) -> FilesystemAdapter {
        let name = Slug::new("default").unwrap();
        FilesystemAdapter::new(dir, &name, &StoreDefinition::default())
    }

    fn sample(path: &str, content: &str) -> Memory {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
        Memory {
            path: MemoryPath::parse(path).unwrap(),
            metadata: MemoryMetadata::new(now),
            content: content.to_string(),
        }
    }

    fn entry(fs: &FilesystemAdapter, memory: &Memory) -> CategoryMemoryEntry {
        CategoryMemoryEntry {
            path: memory.path.clone(),
            token_estimate: fs.estimator().estimate(&memory.content),
            summary: None,
            updated_at: Some(memory.metadata.updated_at),
            expires_at: memory.metadata.expires_at,
        }
    }

    #[tokio::test]
    async fn write_update_links_ancestors() {
        let dir = tempfile::tempdir().unwrap();
        let fs = adapter(dir.path());

        let memory = sample("standards/typescript/style", "use tabs");
        MemoryCapability::write(&fs, &memory).await.unwrap();
        fs.update_after_memory_write(entry(&fs, &memory))
            .await
            .unwrap();

        let leaf_index = IndexCapability::load(&fs, &memory.path.category)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(leaf_index.memories.len(), 1);

        let standards = CategoryPath::parse("standards").unwrap();
        let mid = IndexCapability::load(&fs, &standards).await.unwrap().unwrap();
        let sub = mid.subcategory(&memory.path.category).unwrap();
        assert_eq!(sub.memory_count, 1);

        let root = IndexCapability::load(&fs, &CategoryPath::root())
            .await
            .unwrap()
            .unwrap();
        assert!(root.subcategory(&standards).is_some());
    }

    #[tokio::test]
    async fn remove_update_applies_the_cleanup_rule() {
        let dir = tempfile::tempdir().unwrap();
        let fs = adapter(dir.path());

        let memory = sample("notes/alpha", "x");
        MemoryCapability::write(&fs, &memory).await.unwrap();
        fs.update_after_memory_write(entry(&fs, &memory))
            .await
            .unwrap();

        MemoryCapability::remove(&fs, &memory.path).await.unwrap();
        fs.update_after_memory_remove(&memory.path).await.unwrap();

        let root = IndexCapability::load(&fs, &CategoryPath::root())
            .await
            .unwrap()
            .unwrap();
        assert!(root
            .subcategory(&CategoryPath::parse("notes").unwrap())
            .is_none());
    }

    #[tokio::test]
    async fn move_update_carries_the_entry() {
        let dir = tempfile::tempdir().unwrap();
        let fs = adapter(dir.path());

        let memory = sample("notes/alpha", "body");
        MemoryCapability::write(&fs, &memory).await.unwrap();
        fs.update_after_memory_write(entry(&fs, &memory))
            .await
            .unwrap();

        let to = MemoryPath::parse("archive/alpha").unwrap();
        fs.rename(&memory.path, &to).await.unwrap();
        fs.update_after_memory_move(&memory.path, &to).await.unwrap();

        let archive = IndexCapability::load(&fs, &to.category)
            .await
            .unwrap()
            .unwrap();
        assert!(archive.memory(&to).is_some());

        let root = IndexCapability::load(&fs, &CategoryPath::root())
            .await
            .unwrap()
            .unwrap();
        assert!(root
            .subcategory(&CategoryPath::parse("notes").unwrap())
            .is_none());
        assert_eq!(
            root.subcategory(&to.category).unwrap().memory_count,
            1
        );
    }

    #[tokio::test]
    async fn reindex_rebuilds_from_ground_truth() {
        let dir = tempfile::tempdir().unwrap();
        let fs = adapter(dir.path());

        for (path, content) in [("notes/alpha", "a"), ("notes/deep/beta", "b")] {
            let memory = sample(path, content);
            MemoryCapability::write(&fs, &memory).await.unwrap();
        }

        // No incremental updates ran; the indexes are missing entirely.
        let result = fs.reindex(&CategoryPath::root()).await.unwrap();
        assert_eq!(result.memories_indexed, 2);
        assert!(result.warnings.is_empty());

        let notes = IndexCapability::load(&fs, &CategoryPath::parse("notes").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(notes.memories.len(), 1);
        assert_eq!(
            notes
                .subcategory(&CategoryPath::parse("notes/deep").unwrap())
                .unwrap()
                .memory_count,
            1
        );
    }

    #[tokio::test]
    async fn reindex_repairs_invalid_names() {
        let dir = tempfile::tempdir().unwrap();
        let fs = adapter(dir.path());

        let valid = sample("notes/alpha", "a");
        MemoryCapability::write(&fs, &valid).await.unwrap();

        // An externally created file with an invalid name.
        let notes_dir = dir.path().join("stores/default/memories/notes");
        std::fs::write(notes_dir.join("My Note.md"), "---\ncreated_at: 2026-03-01T00:00:00Z\nupdated_at: 2026-03-01T00:00:00Z\n---\nhello\n").unwrap();

        let result = fs.reindex(&CategoryPath::root()).await.unwrap();
        assert_eq!(result.memories_indexed, 2);
        assert!(result.warnings.iter().any(|w| w.contains("my-note")));
        assert!(notes_dir.join("my-note.md").exists());
        assert!(!notes_dir.join("My Note.md").exists());
    }

    #[tokio::test]
    async fn reindex_resolves_collisions_with_suffixes() {
        let dir = tempfile::tempdir().unwrap();
        let fs = adapter(dir.path());

        let existing = sample("notes/my-note", "a");
        MemoryCapability::write(&fs, &existing).await.unwrap();

        let notes_dir = dir.path().join("stores/default/memories/notes");
        std::fs::write(notes_dir.join("My Note.md"), "---\ncreated_at: 2026-03-01T00:00:00Z\nupdated_at: 2026-03-01T00:00:00Z\n---\nhello\n").unwrap();

        let result = fs.reindex(&CategoryPath::root()).await.unwrap();
        assert_eq!(result.memories_indexed, 2);
        assert!(notes_dir.join("my-note-2.md").exists());
    }

    #[test]
    fn slugify_reduces_names() {
        assert_eq!(slugify("My Note"), Some("my-note".to_string()));
        assert_eq!(slugify("a__b"), Some("a-b".to_string()));
        assert_eq!(slugify("notes.2026"), Some("notes-2026".to_string()));
        assert_eq!(slugify("!!!"), None);
    }
}
