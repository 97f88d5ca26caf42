//! Fluent client surface: `Cortex` → `StoreClient` → `CategoryClient` /
//! `MemoryClient`.
//!
//! Navigation is synchronous and total: building a category or memory
//! client never validates the path. Validation happens lazily at the
//! first async operation, which surfaces `INVALID_PATH` through the
//! normal `Result` channel. No client method signals failure by
//! unwinding.

mod category;
mod memory;
mod store;

pub use category::CategoryClient;
pub use memory::MemoryClient;
pub use store::StoreClient;

use dashmap::DashMap;
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::{Registry, StoreDefinition};
use crate::error::DomainError;
use crate::ops::StoreContext;
use crate::storage::{AdapterFactory, ConfigCapability};
use crate::tokens::create_estimator;
use crate::types::Slug;

/// Construction options for [`Cortex`].
pub struct CortexOptions {
    pub data_path: PathBuf,
    pub registry: Registry,
    pub adapter_factory: Arc<dyn AdapterFactory>,
}

/// Owns the store registry and hands out store clients. Multiple
/// instances are independent; registry mutations are serialized
/// internally and readers observe consistent snapshots.
pub struct Cortex {
    data_path: PathBuf,
    factory: Arc<dyn AdapterFactory>,
    config: Arc<dyn ConfigCapability>,
    registry: RwLock<Registry>,
    contexts: DashMap<Slug, Arc<StoreContext>>,
}

impl Cortex {
    /// Build an instance from an in-memory registry.
    pub fn init(options: CortexOptions) -> Result<Self, DomainError> {
        let config = options.adapter_factory.open_config(&options.data_path)?;
        Ok(Cortex {
            data_path: options.data_path,
            factory: options.adapter_factory,
            config,
            registry: RwLock::new(options.registry),
            contexts: DashMap::new(),
        })
    }

    /// Build an instance by reloading the registry from the data
    /// directory's config document.
    pub async fn load(
        data_path: PathBuf,
        adapter_factory: Arc<dyn AdapterFactory>,
    ) -> Result<Self, DomainError> {
        let config = adapter_factory.open_config(&data_path)?;
        let registry = config.reload().await?;
        if registry.is_empty() {
            return Err(DomainError::ConfigReadFailed {
                reason: format!(
                    "no stores configured under {}; run init first",
                    data_path.display()
                ),
            });
        }
        Ok(Cortex {
            data_path,
            factory: adapter_factory,
            config,
            registry: RwLock::new(registry),
            contexts: DashMap::new(),
        })
    }

    pub fn data_path(&self) -> &Path {
        &self.data_path
    }

    /// Persist the registry as the config document.
    pub async fn initialize(&self) -> Result<(), DomainError> {
        let registry = self.registry.read().clone();
        for (name, definition) in &registry {
            self.config.save_store(name, definition).await?;
        }
        Ok(())
    }

    /// Open a store client. The adapter is created on first use and
    /// shared by every client of the store.
    pub fn get_store(&self, name: &str) -> Result<StoreClient, DomainError> {
        let slug = Slug::new(name).map_err(|_| DomainError::InvalidStoreName {
            name: name.to_string(),
            reason: "store names must be valid slugs".to_string(),
        })?;
        let definition = self
            .registry
            .read()
            .get(&slug)
            .cloned()
            .ok_or_else(|| DomainError::StoreNotFound {
                name: name.to_string(),
            })?;

        let context = match self.contexts.entry(slug.clone()) {
            dashmap::mapref::entry::Entry::Occupied(entry) => entry.get().clone(),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                let adapter = self
                    .factory
                    .open_store(&self.data_path, &slug, &definition)?;
                let estimator = create_estimator(definition.property_str("token_estimator"));
                let context = Arc::new(StoreContext::new(slug, adapter, estimator));
                slot.insert(context.clone());
                context
            }
        };
        Ok(StoreClient::new(context))
    }

    /// Register a new store and persist the updated registry.
    pub async fn add_store(
        &self,
        name: &str,
        definition: StoreDefinition,
    ) -> Result<(), DomainError> {
        let slug = Slug::new(name).map_err(|_| DomainError::InvalidStoreName {
            name: name.to_string(),
            reason: "store names must be valid slugs".to_string(),
        })?;

        {
            let mut registry = self.registry.write();
            if registry.contains_key(&slug) {
                return Err(DomainError::DuplicateStoreName {
                    name: name.to_string(),
                });
            }
            registry.insert(slug.clone(), definition.clone());
        }

        if let Err(e) = self.config.save_store(&slug, &definition).await {
            self.registry.write().remove(&slug);
            return Err(e.into());
        }
        Ok(())
    }

    /// Drop a store from the registry and persist the change. The
    /// store's data on disk is left in place.
    pub async fn remove_store(&self, name: &str) -> Result<(), DomainError> {
        let slug = Slug::new(name).map_err(|_| DomainError::InvalidStoreName {
            name: name.to_string(),
            reason: "store names must be valid slugs".to_string(),
        })?;

        {
            let mut registry = self.registry.write();
            if registry.remove(&slug).is_none() {
                return Err(DomainError::StoreNotFound {
                    name: name.to_string(),
                });
            }
        }
        self.contexts.remove(&slug);
        self.config.remove(&slug).await?;
        Ok(())
    }

    /// Snapshot of the registry.
    pub fn store_definitions(&self) -> Vec<(Slug, StoreDefinition)> {
        self.registry
            .read()
            .iter()
            .map(|(name, def)| (name.clone(), def.clone()))
            .collect()
    }
}
