//! Client for one store.

use std::sync::Arc;

use super::{CategoryClient, MemoryClient};
use crate::config::StoreData;
use crate::error::DomainError;
use crate::ops::{self, StoreContext};
use crate::types::{CategoryPath, ReindexResult, Slug};

/// Exclusive view onto one registered store. Cheap to clone; every clone
/// shares the same opened adapter and store data cache.
#[derive(Clone)]
pub struct StoreClient {
    context: Arc<StoreContext>,
}

impl std::fmt::Debug for StoreClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreClient").field("name", self.name()).finish()
    }
}

impl StoreClient {
    pub(super) fn new(context: Arc<StoreContext>) -> Self {
        StoreClient { context }
    }

    pub fn name(&self) -> &Slug {
        self.context.name()
    }

    /// The store's metadata, loaded lazily and cached until `save` or
    /// `initialize`.
    pub async fn load(&self) -> Result<Arc<StoreData>, DomainError> {
        self.context.data().await
    }

    /// Replace the store's metadata and invalidate the cache.
    pub async fn save(&self, data: StoreData) -> Result<(), DomainError> {
        self.context.adapter().stores().save(&data).await?;
        self.context.invalidate().await;
        Ok(())
    }

    /// First-time setup: persist metadata and ensure declared categories.
    pub async fn initialize(&self, data: StoreData) -> Result<(), DomainError> {
        ops::store::initialize_store(&self.context, &data).await
    }

    /// The root category client.
    pub fn root(&self) -> CategoryClient {
        CategoryClient::new(self.context.clone(), "/")
    }

    /// A category client for a raw path. Never fails: path validation is
    /// deferred to the first async operation.
    pub fn category(&self, path: &str) -> CategoryClient {
        CategoryClient::new(self.context.clone(), path)
    }

    /// A memory client for a raw path, equally lazy.
    pub fn memory(&self, path: &str) -> MemoryClient {
        MemoryClient::new(self.context.clone(), path)
    }

    /// Rebuild every index in the store.
    pub async fn reindex(&self) -> Result<ReindexResult, DomainError> {
        ops::store::reindex(&self.context, &CategoryPath::root()).await
    }
}
