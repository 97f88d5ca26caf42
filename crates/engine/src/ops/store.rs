//! Store-level operations.

use tracing::{debug, info};

use super::StoreContext;
use crate::config::{declared_paths, StoreData};
use crate::error::DomainError;
use crate::types::{CategoryPath, ReindexResult};

/// Initialize a store: persist its metadata and ensure every declared
/// category exists. Refuses stores that are already initialized.
pub async fn initialize_store(ctx: &StoreContext, data: &StoreData) -> Result<(), DomainError> {
    if ctx.adapter().stores().load().await?.is_some() {
        return Err(DomainError::StoreAlreadyExists {
            name: ctx.name().to_string(),
        });
    }

    ctx.adapter().stores().save(data).await?;
    ctx.adapter()
        .categories()
        .ensure(&CategoryPath::root())
        .await?;
    for path in declared_paths(&data.categories) {
        ctx.adapter().categories().ensure(&path).await?;
    }
    ctx.invalidate().await;

    info!(store = %ctx.name(), "initialized store");
    Ok(())
}

/// Rebuild every index under `scope` from the document ground truth.
pub async fn reindex(
    ctx: &StoreContext,
    scope: &CategoryPath,
) -> Result<ReindexResult, DomainError> {
    let result = ctx.adapter().indexes().reindex(scope).await?;
    debug!(
        scope = %scope,
        categories = result.categories_indexed,
        memories = result.memories_indexed,
        warnings = result.warnings.len(),
        store = %ctx.name(),
        "reindexed scope"
    );
    Ok(result)
}
