//! Domain operations.
//!
//! Every operation follows the same spine: parse paths, resolve the
//! effective policy, run the validations in declared order, apply the
//! pure transformations, invoke the adapter capability, and finally
//! update the affected indexes. All suspension points live in adapter
//! calls.

pub mod category;
pub mod memory;
pub mod store;

use std::sync::Arc;
use tokio::sync::RwLock;

use crate::config::StoreData;
use crate::error::DomainError;
use crate::storage::StorageAdapter;
use crate::tokens::TokenEstimator;
use crate::types::Slug;

/// Shared per-store state handed to every operation: the opened adapter,
/// the token estimator, and a lazily-loaded store data cache.
pub struct StoreContext {
    name: Slug,
    adapter: Arc<dyn StorageAdapter>,
    estimator: Arc<dyn TokenEstimator>,
    data: RwLock<Option<Arc<StoreData>>>,
}

impl StoreContext {
    pub fn new(
        name: Slug,
        adapter: Arc<dyn StorageAdapter>,
        estimator: Arc<dyn TokenEstimator>,
    ) -> Self {
        StoreContext {
            name,
            adapter,
            estimator,
            data: RwLock::new(None),
        }
    }

    pub fn name(&self) -> &Slug {
        &self.name
    }

    pub fn adapter(&self) -> &dyn StorageAdapter {
        self.adapter.as_ref()
    }

    pub fn estimator(&self) -> &dyn TokenEstimator {
        self.estimator.as_ref()
    }

    /// The store's metadata, loaded on first use and cached until
    /// [`StoreContext::invalidate`].
    pub async fn data(&self) -> Result<Arc<StoreData>, DomainError> {
        if let Some(data) = self.data.read().await.as_ref() {
            return Ok(data.clone());
        }

        let mut slot = self.data.write().await;
        if let Some(data) = slot.as_ref() {
            return Ok(data.clone());
        }
        let loaded = self
            .adapter
            .stores()
            .load()
            .await
            .map_err(DomainError::from)?
            .ok_or_else(|| DomainError::StoreNotInitialized {
                name: self.name.to_string(),
            })?;
        let data = Arc::new(loaded);
        *slot = Some(data.clone());
        Ok(data)
    }

    /// Drop the cached store data; the next operation reloads it.
    pub async fn invalidate(&self) {
        *self.data.write().await = None;
    }
}
