//! Memory document operations.

use chrono::{DateTime, Utc};
use futures::future::join_all;
use tracing::debug;

use super::StoreContext;
use crate::error::DomainError;
use crate::index::{recency_order, CategoryMemoryEntry};
use crate::policy::{apply_ttl_ceiling, resolve_effective, EffectivePolicy};
use crate::types::{
    normalize_content, normalize_tags, CategoryPath, CreateMemoryInput, GetMemoryOptions,
    ListMemoriesOptions, Memory, MemoryMetadata, MemoryPath, PruneOptions, PruneResult,
    RecentMemory, RecentOptions, UpdateMemoryInput, RECENT_DEFAULT_LIMIT, RECENT_MAX_LIMIT,
};

fn check_content_length(
    policy: &EffectivePolicy,
    content: &str,
    category: &CategoryPath,
) -> Result<(), DomainError> {
    if let Some(limit) = policy.max_content_length {
        let length = content.chars().count();
        if length > limit {
            return Err(DomainError::ContentTooLong {
                length,
                limit,
                category: category.to_string(),
            });
        }
    }
    Ok(())
}

fn index_entry(ctx: &StoreContext, memory: &Memory) -> CategoryMemoryEntry {
    CategoryMemoryEntry {
        path: memory.path.clone(),
        token_estimate: ctx.estimator().estimate(&memory.content),
        summary: memory.metadata.summary.clone(),
        updated_at: Some(memory.metadata.updated_at),
        expires_at: memory.metadata.expires_at,
    }
}

/// Create a memory at `path`. Fails when the path already holds one.
pub async fn create_memory(
    ctx: &StoreContext,
    path: &MemoryPath,
    input: CreateMemoryInput,
    now: DateTime<Utc>,
) -> Result<Memory, DomainError> {
    let data = ctx.data().await?;
    let policy = resolve_effective(&data.categories, &path.category);

    if !policy.permissions.create {
        return Err(DomainError::OperationNotPermitted {
            operation: "create".to_string(),
            category: path.category.to_string(),
        });
    }
    let content = normalize_content(&input.content);
    check_content_length(&policy, &content, &path.category)?;

    if ctx.adapter().memories().read(path).await?.is_some() {
        return Err(DomainError::MemoryAlreadyExists {
            path: path.to_string(),
            store: ctx.name().to_string(),
        });
    }

    let expires_at = apply_ttl_ceiling(&policy, input.expires_at, now);
    let memory = Memory {
        path: path.clone(),
        metadata: MemoryMetadata {
            created_at: now,
            updated_at: now,
            tags: normalize_tags(input.tags),
            source: input.source,
            citations: input.citations,
            expires_at,
            summary: input.summary,
            extra: Default::default(),
        },
        content,
    };

    ctx.adapter().memories().write(&memory).await?;
    ctx.adapter()
        .indexes()
        .update_after_memory_write(index_entry(ctx, &memory))
        .await?;

    debug!(path = %path, store = %ctx.name(), "created memory");
    Ok(memory)
}

/// Read a memory. Expired memories surface as not-found unless
/// `include_expired` is set.
pub async fn get_memory(
    ctx: &StoreContext,
    path: &MemoryPath,
    options: GetMemoryOptions,
) -> Result<Memory, DomainError> {
    let not_found = || DomainError::MemoryNotFound {
        path: path.to_string(),
        store: ctx.name().to_string(),
    };

    let memory = ctx
        .adapter()
        .memories()
        .read(path)
        .await?
        .ok_or_else(not_found)?;

    let now = options.now.unwrap_or_else(Utc::now);
    if !options.include_expired && memory.metadata.is_expired(now) {
        return Err(not_found());
    }
    Ok(memory)
}

/// Merge updates into an existing memory. Omitted fields preserve the
/// stored values; `updated_at` always becomes `now`.
pub async fn update_memory(
    ctx: &StoreContext,
    path: &MemoryPath,
    updates: UpdateMemoryInput,
    now: DateTime<Utc>,
) -> Result<Memory, DomainError> {
    let data = ctx.data().await?;
    let policy = resolve_effective(&data.categories, &path.category);

    if !policy.permissions.update {
        return Err(DomainError::OperationNotPermitted {
            operation: "update".to_string(),
            category: path.category.to_string(),
        });
    }

    let mut memory = ctx
        .adapter()
        .memories()
        .read(path)
        .await?
        .ok_or_else(|| DomainError::MemoryNotFound {
            path: path.to_string(),
            store: ctx.name().to_string(),
        })?;

    if let Some(content) = updates.content {
        let content = normalize_content(&content);
        check_content_length(&policy, &content, &path.category)?;
        memory.content = content;
    }
    if let Some(tags) = updates.tags {
        memory.metadata.tags = normalize_tags(tags);
    }
    if let Some(source) = updates.source {
        memory.metadata.source = source;
    }
    if let Some(citations) = updates.citations {
        memory.metadata.citations = citations;
    }
    memory.metadata.summary = updates.summary.apply(memory.metadata.summary.take());
    memory.metadata.expires_at = updates.expires_at.apply(memory.metadata.expires_at.take());
    memory.metadata.updated_at = now;

    ctx.adapter().memories().write(&memory).await?;
    ctx.adapter()
        .indexes()
        .update_after_memory_write(index_entry(ctx, &memory))
        .await?;

    debug!(path = %path, store = %ctx.name(), "updated memory");
    Ok(memory)
}

/// Move a memory, preserving all metadata including both timestamps.
pub async fn move_memory(
    ctx: &StoreContext,
    from: &MemoryPath,
    to: &MemoryPath,
) -> Result<(), DomainError> {
    if ctx.adapter().memories().read(from).await?.is_none() {
        return Err(DomainError::MemoryNotFound {
            path: from.to_string(),
            store: ctx.name().to_string(),
        });
    }
    if ctx.adapter().memories().read(to).await?.is_some() {
        return Err(DomainError::DestinationExists {
            path: to.to_string(),
            store: ctx.name().to_string(),
        });
    }

    ctx.adapter().memories().rename(from, to).await?;
    ctx.adapter()
        .indexes()
        .update_after_memory_move(from, to)
        .await?;

    debug!(from = %from, to = %to, store = %ctx.name(), "moved memory");
    Ok(())
}

/// Remove a memory.
pub async fn remove_memory(ctx: &StoreContext, path: &MemoryPath) -> Result<(), DomainError> {
    let data = ctx.data().await?;
    let policy = resolve_effective(&data.categories, &path.category);

    if !policy.permissions.delete {
        return Err(DomainError::OperationNotPermitted {
            operation: "delete".to_string(),
            category: path.category.to_string(),
        });
    }

    if ctx.adapter().memories().read(path).await?.is_none() {
        return Err(DomainError::MemoryNotFound {
            path: path.to_string(),
            store: ctx.name().to_string(),
        });
    }

    ctx.adapter().memories().remove(path).await?;
    ctx.adapter()
        .indexes()
        .update_after_memory_remove(path)
        .await?;

    debug!(path = %path, store = %ctx.name(), "removed memory");
    Ok(())
}

/// Collect every index entry under `scope` by walking the index documents
/// (never the memory files).
async fn collect_entries(
    ctx: &StoreContext,
    scope: &CategoryPath,
) -> Result<Vec<CategoryMemoryEntry>, DomainError> {
    let mut entries = Vec::new();
    let mut queue = vec![scope.clone()];
    while let Some(category) = queue.pop() {
        let index = match ctx.adapter().indexes().load(&category).await? {
            Some(index) => index,
            None => continue,
        };
        entries.extend(index.memories);
        queue.extend(index.subcategories.into_iter().map(|sub| sub.path));
    }
    Ok(entries)
}

/// List index entries under a scope, path ascending. Entries without
/// expiry data are returned regardless of `include_expired`; prune is the
/// authoritative cleanup.
pub async fn list_memories(
    ctx: &StoreContext,
    scope: &CategoryPath,
    options: ListMemoriesOptions,
) -> Result<Vec<CategoryMemoryEntry>, DomainError> {
    let now = options.now.unwrap_or_else(Utc::now);
    let mut entries = collect_entries(ctx, scope).await?;
    if !options.include_expired {
        entries.retain(|e| !matches!(e.expires_at, Some(expires) if expires <= now));
    }
    entries.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(entries)
}

/// Delete every memory under `scope` whose front-matter expiry has
/// passed. A dry run only reports; a real run deletes and then reindexes
/// the scope to purge orphan entries.
pub async fn prune_expired_memories(
    ctx: &StoreContext,
    scope: &CategoryPath,
    options: PruneOptions,
) -> Result<PruneResult, DomainError> {
    let now = options.now.unwrap_or_else(Utc::now);
    let paths = ctx.adapter().memories().list_paths_under(scope).await?;

    let mut pruned = Vec::new();
    for path in paths {
        let memory = match ctx.adapter().memories().read(&path).await {
            Ok(Some(memory)) => memory,
            Ok(None) => continue,
            Err(e) => {
                debug!(path = %path, error = %e, "skipping unreadable memory during prune");
                continue;
            }
        };
        if memory.metadata.is_expired(now) {
            pruned.push(path);
        }
    }

    if !options.dry_run {
        for path in &pruned {
            ctx.adapter().memories().remove(path).await?;
        }
        ctx.adapter().indexes().reindex(scope).await?;
    }

    debug!(
        scope = %scope,
        count = pruned.len(),
        dry_run = options.dry_run,
        store = %ctx.name(),
        "pruned expired memories"
    );
    Ok(PruneResult {
        pruned,
        dry_run: options.dry_run,
    })
}

/// The most recently updated memories under a scope, with their full
/// content.
pub async fn get_recent_memories(
    ctx: &StoreContext,
    options: RecentOptions,
) -> Result<Vec<RecentMemory>, DomainError> {
    let scope = options.category.clone().unwrap_or_default();
    let now = options.now.unwrap_or_else(Utc::now);
    let limit = options
        .limit
        .unwrap_or(RECENT_DEFAULT_LIMIT)
        .min(RECENT_MAX_LIMIT);

    let mut entries = collect_entries(ctx, &scope).await?;
    if !options.include_expired {
        entries.retain(|e| !matches!(e.expires_at, Some(expires) if expires <= now));
    }
    entries.sort_by(recency_order);
    entries.truncate(limit);

    let reads = entries.iter().map(|entry| {
        let path = entry.path.clone();
        async move { ctx.adapter().memories().read(&path).await }
    });
    let documents = join_all(reads).await;

    let mut recent = Vec::with_capacity(entries.len());
    for (entry, document) in entries.into_iter().zip(documents) {
        if let Some(memory) = document? {
            recent.push(RecentMemory {
                path: entry.path,
                content: memory.content,
                updated_at: entry.updated_at,
                token_estimate: entry.token_estimate,
                tags: memory.metadata.tags,
            });
        }
    }
    Ok(recent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Update;

    #[test]
    fn recent_limit_defaults_and_caps() {
        let options = RecentOptions::default();
        assert_eq!(options.limit.unwrap_or(RECENT_DEFAULT_LIMIT), 5);
        assert_eq!(700usize.min(RECENT_MAX_LIMIT), 100);
    }

    #[test]
    fn update_merge_uses_three_state_fields() {
        let updates = UpdateMemoryInput::default();
        assert!(matches!(updates.summary, Update::Keep));
        assert!(matches!(updates.expires_at, Update::Keep));
        assert!(updates.content.is_none());
    }
}
