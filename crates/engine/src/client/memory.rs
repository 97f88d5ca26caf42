//! Lazy memory client.

use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::error::DomainError;
use crate::ops::{self, StoreContext};
use crate::types::{CreateMemoryInput, GetMemoryOptions, Memory, MemoryPath, UpdateMemoryInput};

/// A pointer to a memory path in a store. Like [`super::CategoryClient`],
/// a cheap immutable value object with lazy path validation.
#[derive(Clone)]
pub struct MemoryClient {
    context: Arc<StoreContext>,
    raw: String,
}

impl std::fmt::Debug for MemoryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryClient").field("raw", &self.raw).finish()
    }
}

impl MemoryClient {
    pub(super) fn new(context: Arc<StoreContext>, raw: &str) -> Self {
        let trimmed = raw.trim();
        let raw = if trimmed.starts_with('/') {
            trimmed.to_string()
        } else {
            format!("/{trimmed}")
        };
        MemoryClient { context, raw }
    }

    pub fn raw_path(&self) -> &str {
        &self.raw
    }

    fn parse(&self) -> Result<MemoryPath, DomainError> {
        MemoryPath::parse(&self.raw)
    }

    pub async fn exists(&self) -> Result<bool, DomainError> {
        let path = self.parse()?;
        Ok(self
            .context
            .adapter()
            .memories()
            .read(&path)
            .await?
            .is_some())
    }

    pub async fn get(&self, options: GetMemoryOptions) -> Result<Memory, DomainError> {
        let path = self.parse()?;
        ops::memory::get_memory(&self.context, &path, options).await
    }

    pub async fn create(
        &self,
        input: CreateMemoryInput,
        now: DateTime<Utc>,
    ) -> Result<Memory, DomainError> {
        let path = self.parse()?;
        ops::memory::create_memory(&self.context, &path, input, now).await
    }

    pub async fn update(
        &self,
        updates: UpdateMemoryInput,
        now: DateTime<Utc>,
    ) -> Result<Memory, DomainError> {
        let path = self.parse()?;
        ops::memory::update_memory(&self.context, &path, updates, now).await
    }

    /// Move this memory to another path, returning a client for the
    /// destination.
    pub async fn move_to(&self, to: &str) -> Result<MemoryClient, DomainError> {
        let from = self.parse()?;
        let target = MemoryClient::new(self.context.clone(), to);
        let to = target.parse()?;
        ops::memory::move_memory(&self.context, &from, &to).await?;
        Ok(target)
    }

    pub async fn remove(&self) -> Result<(), DomainError> {
        let path = self.parse()?;
        ops::memory::remove_memory(&self.context, &path).await
    }
}
