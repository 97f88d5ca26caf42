//! Category index model and the pure incremental update rules.
//!
//! Each category carries a derived index: its direct memory entries and
//! its direct subcategory entries, both sorted by canonical path
//! ascending with unique paths. The storage adapter loads an index, makes
//! one of the mutations below under the category lock, and stores it
//! back; `list`, `get_recent`, and subcategory browsing consult only
//! these indexes, never the document tree.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::types::{CategoryPath, MemoryPath};

/// Index row for one direct memory of a category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryMemoryEntry {
    pub path: MemoryPath,
    pub token_estimate: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(
        default,
        with = "crate::types::timestamp::opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(
        default,
        with = "crate::types::timestamp::opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Index row for one direct subcategory. `memory_count` reflects direct
/// memories of the child only, never recursive totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubcategoryEntry {
    pub path: CategoryPath,
    pub memory_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// The derived index document of one category.
///
/// `description` is populated only on the root index: every other
/// category's description lives in its parent's subcategory entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryIndex {
    #[serde(default)]
    pub memories: Vec<CategoryMemoryEntry>,
    #[serde(default)]
    pub subcategories: Vec<SubcategoryEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl CategoryIndex {
    /// Insert or replace the entry for a memory path, keeping the list
    /// sorted. Returns true when the entry is new.
    pub fn upsert_memory(&mut self, entry: CategoryMemoryEntry) -> bool {
        match self.memories.binary_search_by(|e| e.path.cmp(&entry.path)) {
            Ok(pos) => {
                self.memories[pos] = entry;
                false
            }
            Err(pos) => {
                self.memories.insert(pos, entry);
                true
            }
        }
    }

    /// Remove the entry for a memory path. Returns true when it existed.
    pub fn remove_memory(&mut self, path: &MemoryPath) -> bool {
        match self.memories.binary_search_by(|e| e.path.cmp(path)) {
            Ok(pos) => {
                self.memories.remove(pos);
                true
            }
            Err(_) => false,
        }
    }

    pub fn memory(&self, path: &MemoryPath) -> Option<&CategoryMemoryEntry> {
        self.memories
            .binary_search_by(|e| e.path.cmp(path))
            .ok()
            .map(|pos| &self.memories[pos])
    }

    pub fn subcategory(&self, path: &CategoryPath) -> Option<&SubcategoryEntry> {
        self.subcategories
            .binary_search_by(|e| e.path.cmp(path))
            .ok()
            .map(|pos| &self.subcategories[pos])
    }

    /// Get or insert the subcategory entry for a child path, returning a
    /// mutable reference. New entries start with a zero count and no
    /// description.
    pub fn upsert_subcategory(&mut self, path: &CategoryPath) -> &mut SubcategoryEntry {
        let pos = match self.subcategories.binary_search_by(|e| e.path.cmp(path)) {
            Ok(pos) => pos,
            Err(pos) => {
                self.subcategories.insert(
                    pos,
                    SubcategoryEntry {
                        path: path.clone(),
                        memory_count: 0,
                        description: None,
                    },
                );
                pos
            }
        };
        &mut self.subcategories[pos]
    }

    pub fn subcategory_mut(&mut self, path: &CategoryPath) -> Option<&mut SubcategoryEntry> {
        self.subcategories
            .binary_search_by(|e| e.path.cmp(path))
            .ok()
            .map(move |pos| &mut self.subcategories[pos])
    }

    /// Remove the subcategory entry for a child path. Returns true when
    /// it existed.
    pub fn remove_subcategory(&mut self, path: &CategoryPath) -> bool {
        match self.subcategories.binary_search_by(|e| e.path.cmp(path)) {
            Ok(pos) => {
                self.subcategories.remove(pos);
                true
            }
            Err(_) => false,
        }
    }

    /// No direct memories and no direct subcategories.
    pub fn is_empty(&self) -> bool {
        self.memories.is_empty() && self.subcategories.is_empty()
    }

    /// Restore the sorted-unique invariant after a bulk rebuild.
    pub fn normalize(&mut self) {
        self.memories.sort_by(|a, b| a.path.cmp(&b.path));
        self.memories.dedup_by(|a, b| a.path == b.path);
        self.subcategories.sort_by(|a, b| a.path.cmp(&b.path));
        self.subcategories.dedup_by(|a, b| a.path == b.path);
    }
}

/// Recency ordering for index entries: `updated_at` descending, entries
/// missing `updated_at` last, path ascending as the tiebreak.
pub fn recency_order(a: &CategoryMemoryEntry, b: &CategoryMemoryEntry) -> Ordering {
    match (a.updated_at, b.updated_at) {
        (Some(ta), Some(tb)) => tb.cmp(&ta).then_with(|| a.path.cmp(&b.path)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.path.cmp(&b.path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn entry(path: &str, updated_at: Option<DateTime<Utc>>) -> CategoryMemoryEntry {
        CategoryMemoryEntry {
            path: MemoryPath::parse(path).unwrap(),
            token_estimate: 3,
            summary: None,
            updated_at,
            expires_at: None,
        }
    }

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, day, 0, 0, 0).unwrap()
    }

    #[test]
    fn upsert_keeps_entries_sorted_and_unique() {
        let mut index = CategoryIndex::default();
        assert!(index.upsert_memory(entry("notes/beta", None)));
        assert!(index.upsert_memory(entry("notes/alpha", None)));
        assert!(!index.upsert_memory(entry("notes/beta", Some(at(1)))));

        let paths: Vec<String> = index.memories.iter().map(|e| e.path.to_string()).collect();
        assert_eq!(paths, vec!["notes/alpha", "notes/beta"]);
        assert_eq!(index.memories[1].updated_at, Some(at(1)));
    }

    #[test]
    fn remove_memory_reports_presence() {
        let mut index = CategoryIndex::default();
        index.upsert_memory(entry("notes/alpha", None));
        assert!(index.remove_memory(&MemoryPath::parse("notes/alpha").unwrap()));
        assert!(!index.remove_memory(&MemoryPath::parse("notes/alpha").unwrap()));
        assert!(index.is_empty());
    }

    #[test]
    fn subcategory_upsert_starts_at_zero() {
        let mut index = CategoryIndex::default();
        let path = CategoryPath::parse("notes").unwrap();
        {
            let sub = index.upsert_subcategory(&path);
            assert_eq!(sub.memory_count, 0);
            sub.memory_count = 2;
        }
        assert_eq!(index.subcategory(&path).unwrap().memory_count, 2);
        assert!(index.remove_subcategory(&path));
        assert!(index.is_empty());
    }

    #[test]
    fn subcategories_stay_sorted() {
        let mut index = CategoryIndex::default();
        index.upsert_subcategory(&CategoryPath::parse("zeta").unwrap());
        index.upsert_subcategory(&CategoryPath::parse("alpha").unwrap());
        let paths: Vec<String> = index
            .subcategories
            .iter()
            .map(|e| e.path.to_string())
            .collect();
        assert_eq!(paths, vec!["alpha", "zeta"]);
    }

    #[test]
    fn recency_sorts_newest_first_with_path_tiebreak() {
        let mut entries = vec![
            entry("b/old", Some(at(1))),
            entry("a/untouched", None),
            entry("b/new", Some(at(9))),
            entry("a/new", Some(at(9))),
        ];
        entries.sort_by(recency_order);
        let paths: Vec<String> = entries.iter().map(|e| e.path.to_string()).collect();
        assert_eq!(paths, vec!["a/new", "b/new", "b/old", "a/untouched"]);
    }

    #[test]
    fn normalize_restores_invariants() {
        let mut index = CategoryIndex {
            memories: vec![entry("notes/b", None), entry("notes/a", None), entry("notes/b", None)],
            subcategories: vec![],
            description: None,
        };
        index.normalize();
        let paths: Vec<String> = index.memories.iter().map(|e| e.path.to_string()).collect();
        assert_eq!(paths, vec!["notes/a", "notes/b"]);
    }
}
