//! Category operations.

use tracing::debug;

use super::StoreContext;
use crate::error::DomainError;
use crate::index::SubcategoryEntry;
use crate::policy::{
    check_category_creation, check_category_deletable, check_description_allowed,
    resolve_effective,
};
use crate::types::{CategoryPath, CreateCategoryResult, MAX_DESCRIPTION_LENGTH};

/// Idempotently create a category with its missing ancestors, subject to
/// the store's category mode.
pub async fn create_category(
    ctx: &StoreContext,
    path: &CategoryPath,
) -> Result<CreateCategoryResult, DomainError> {
    if path.is_root() {
        return Ok(CreateCategoryResult {
            path: path.clone(),
            created: false,
        });
    }

    let data = ctx.data().await?;
    check_category_creation(data.category_mode, &data.categories, path)?;

    let parent_policy = resolve_effective(&data.categories, &path.parent());
    if !parent_policy.subcategory_creation {
        return Err(DomainError::SubcategoryCreationNotAllowed {
            category: path.parent().to_string(),
        });
    }

    let existed = ctx.adapter().categories().exists(path).await?;
    ctx.adapter().categories().ensure(path).await?;

    if !existed {
        debug!(path = %path, store = %ctx.name(), "created category");
    }
    Ok(CreateCategoryResult {
        path: path.clone(),
        created: !existed,
    })
}

/// Recursively delete a category. The root, config-declared categories,
/// and ancestors of declared categories are refused.
pub async fn delete_category(ctx: &StoreContext, path: &CategoryPath) -> Result<(), DomainError> {
    if path.is_root() {
        return Err(DomainError::RootCategoryRejected {
            operation: "deleted".to_string(),
        });
    }

    let data = ctx.data().await?;
    check_category_deletable(&data.categories, path)?;

    if !ctx.adapter().categories().exists(path).await? {
        return Err(DomainError::CategoryNotFound {
            path: path.to_string(),
            store: ctx.name().to_string(),
        });
    }

    ctx.adapter().categories().delete(path).await?;
    debug!(path = %path, store = %ctx.name(), "deleted category");
    Ok(())
}

/// Set or clear a category's description. Empty or whitespace-only input
/// clears. Declared categories are protected.
pub async fn set_description(
    ctx: &StoreContext,
    path: &CategoryPath,
    text: &str,
) -> Result<(), DomainError> {
    let data = ctx.data().await?;
    check_description_allowed(&data.categories, path)?;

    let trimmed = text.trim();
    let length = trimmed.chars().count();
    if length > MAX_DESCRIPTION_LENGTH {
        return Err(DomainError::DescriptionTooLong {
            length,
            limit: MAX_DESCRIPTION_LENGTH,
        });
    }

    if !ctx.adapter().categories().exists(path).await? {
        return Err(DomainError::CategoryNotFound {
            path: path.to_string(),
            store: ctx.name().to_string(),
        });
    }

    let description = if trimmed.is_empty() { None } else { Some(trimmed) };
    ctx.adapter()
        .categories()
        .set_description(path, description)
        .await?;

    debug!(path = %path, store = %ctx.name(), cleared = description.is_none(), "set category description");
    Ok(())
}

/// The direct subcategory entries of a category, path ascending.
pub async fn list_subcategories(
    ctx: &StoreContext,
    scope: &CategoryPath,
) -> Result<Vec<SubcategoryEntry>, DomainError> {
    Ok(ctx
        .adapter()
        .indexes()
        .load(scope)
        .await?
        .map(|index| index.subcategories)
        .unwrap_or_default())
}
