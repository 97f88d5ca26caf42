//! Lazy category client.

use std::sync::Arc;

use super::MemoryClient;
use crate::error::DomainError;
use crate::index::{CategoryMemoryEntry, SubcategoryEntry};
use crate::ops::{self, StoreContext};
use crate::types::{
    CategoryPath, CreateCategoryResult, ListMemoriesOptions, PruneOptions, PruneResult,
    RecentMemory, RecentOptions, ReindexResult,
};

/// A pointer to a category path in a store. Cheap value object: carries
/// the canonical raw path (leading `/`) and a shared adapter reference,
/// owns no other state. Navigation never validates; an invalid path
/// errors at the first async operation.
#[derive(Clone)]
pub struct CategoryClient {
    context: Arc<StoreContext>,
    raw: String,
}

impl CategoryClient {
    pub(super) fn new(context: Arc<StoreContext>, raw: &str) -> Self {
        let trimmed = raw.trim();
        let raw = if trimmed.starts_with('/') {
            trimmed.to_string()
        } else {
            format!("/{trimmed}")
        };
        CategoryClient { context, raw }
    }

    /// The canonical raw path, always with a leading `/`.
    pub fn raw_path(&self) -> &str {
        &self.raw
    }

    fn parse(&self) -> Result<CategoryPath, DomainError> {
        CategoryPath::parse(&self.raw)
    }

    /// Navigate to a child (or deeper) category. Total.
    pub fn category(&self, relative: &str) -> CategoryClient {
        let base = self.raw.trim_end_matches('/');
        let relative = relative.trim().trim_start_matches('/');
        CategoryClient::new(self.context.clone(), &format!("{base}/{relative}"))
    }

    /// Navigate to a memory under this category. Total.
    pub fn memory(&self, relative: &str) -> MemoryClient {
        let base = self.raw.trim_end_matches('/');
        let relative = relative.trim().trim_start_matches('/');
        MemoryClient::new(self.context.clone(), &format!("{base}/{relative}"))
    }

    /// Navigate to the parent category; the root's parent is the root.
    pub fn parent(&self) -> CategoryClient {
        let trimmed = self.raw.trim_end_matches('/');
        let parent = match trimmed.rfind('/') {
            Some(0) | None => "/",
            Some(pos) => &trimmed[..pos],
        };
        CategoryClient::new(self.context.clone(), parent)
    }

    pub async fn exists(&self) -> Result<bool, DomainError> {
        let path = self.parse()?;
        Ok(self.context.adapter().categories().exists(&path).await?)
    }

    pub async fn create(&self) -> Result<CreateCategoryResult, DomainError> {
        let path = self.parse()?;
        ops::category::create_category(&self.context, &path).await
    }

    pub async fn delete(&self) -> Result<(), DomainError> {
        let path = self.parse()?;
        ops::category::delete_category(&self.context, &path).await
    }

    pub async fn set_description(&self, text: &str) -> Result<(), DomainError> {
        let path = self.parse()?;
        ops::category::set_description(&self.context, &path, text).await
    }

    /// Index entries for every memory under this category, recursively.
    pub async fn list_memories(
        &self,
        options: ListMemoriesOptions,
    ) -> Result<Vec<CategoryMemoryEntry>, DomainError> {
        let path = self.parse()?;
        ops::memory::list_memories(&self.context, &path, options).await
    }

    /// Direct subcategory entries.
    pub async fn list_subcategories(&self) -> Result<Vec<SubcategoryEntry>, DomainError> {
        let path = self.parse()?;
        ops::category::list_subcategories(&self.context, &path).await
    }

    /// Rebuild every index under this category.
    pub async fn reindex(&self) -> Result<ReindexResult, DomainError> {
        let path = self.parse()?;
        ops::store::reindex(&self.context, &path).await
    }

    /// Delete expired memories under this category.
    pub async fn prune(&self, options: PruneOptions) -> Result<PruneResult, DomainError> {
        let path = self.parse()?;
        ops::memory::prune_expired_memories(&self.context, &path, options).await
    }

    /// Most recently updated memories under this category.
    pub async fn get_recent(
        &self,
        options: RecentOptions,
    ) -> Result<Vec<RecentMemory>, DomainError> {
        let path = self.parse()?;
        let options = RecentOptions {
            category: Some(path),
            ..options
        };
        ops::memory::get_recent_memories(&self.context, options).await
    }
}
