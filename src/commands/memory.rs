//! `cortex create|get|update|move|remove` — memory document commands.

use chrono::{DateTime, Utc};
use clap::ArgMatches;
use std::io::Read;

use cortex_engine::{
    CreateMemoryInput, DomainError, GetMemoryOptions, MemorySource, Update, UpdateMemoryInput,
};

/// Resolve memory content from `--content`, `--file`, or `--stdin`.
/// Returns None when no source was given.
fn read_content(matches: &ArgMatches) -> Result<Option<String>, DomainError> {
    if let Some(text) = matches.get_one::<String>("content") {
        return Ok(Some(text.clone()));
    }
    if let Some(path) = matches.get_one::<String>("file") {
        return std::fs::read_to_string(path)
            .map(Some)
            .map_err(|e| DomainError::InvalidArguments {
                reason: format!("cannot read content file '{path}': {e}"),
            });
    }
    if matches.get_flag("stdin") {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .map_err(|e| DomainError::InvalidArguments {
                reason: format!("cannot read content from stdin: {e}"),
            })?;
        return Ok(Some(text));
    }
    Ok(None)
}

fn parse_expiry(matches: &ArgMatches) -> Result<Option<DateTime<Utc>>, DomainError> {
    match matches.get_one::<String>("expires") {
        None => Ok(None),
        Some(raw) => DateTime::parse_from_rfc3339(raw)
            .map(|dt| Some(dt.with_timezone(&Utc)))
            .map_err(|e| DomainError::InvalidArguments {
                reason: format!("invalid --expires timestamp '{raw}': {e}; use RFC 3339"),
            }),
    }
}

fn collected(matches: &ArgMatches, id: &str) -> Vec<String> {
    matches
        .get_many::<String>(id)
        .map(|values| values.cloned().collect())
        .unwrap_or_default()
}

pub async fn create(matches: &ArgMatches) -> Result<(), DomainError> {
    let store = super::open_store(matches).await?;
    let path = matches.get_one::<String>("path").expect("required");

    let input = CreateMemoryInput {
        content: read_content(matches)?.unwrap_or_default(),
        tags: collected(matches, "tag"),
        source: matches
            .get_one::<String>("source")
            .cloned()
            .map(MemorySource::from)
            .unwrap_or_default(),
        citations: collected(matches, "citation"),
        summary: matches.get_one::<String>("summary").cloned(),
        expires_at: parse_expiry(matches)?,
    };

    let memory = store.memory(path).create(input, Utc::now()).await?;
    println!("✓ Created {}", memory.path);
    if let Some(expires) = memory.metadata.expires_at {
        println!("  expires {}", expires.to_rfc3339());
    }
    Ok(())
}

pub async fn get(matches: &ArgMatches) -> Result<(), DomainError> {
    let store = super::open_store(matches).await?;
    let path = matches.get_one::<String>("path").expect("required");

    let memory = store
        .memory(path)
        .get(GetMemoryOptions {
            include_expired: matches.get_flag("include-expired"),
            now: None,
        })
        .await?;

    if matches.get_flag("json") {
        let value = serde_json::json!({
            "path": memory.path.to_string(),
            "metadata": memory.metadata,
            "content": memory.content,
        });
        println!("{}", serde_json::to_string_pretty(&value).unwrap_or_default());
        return Ok(());
    }

    println!("# {}", memory.path);
    println!("updated: {}", memory.metadata.updated_at.to_rfc3339());
    if !memory.metadata.tags.is_empty() {
        println!("tags: {}", memory.metadata.tags.join(", "));
    }
    if let Some(expires) = memory.metadata.expires_at {
        println!("expires: {}", expires.to_rfc3339());
    }
    println!();
    println!("{}", memory.content);
    Ok(())
}

pub async fn update(matches: &ArgMatches) -> Result<(), DomainError> {
    let store = super::open_store(matches).await?;
    let path = matches.get_one::<String>("path").expect("required");

    // Empty or unprovided content preserves the stored content.
    let content = read_content(matches)?.filter(|text| !text.is_empty());

    let summary = if matches.get_flag("clear-summary") {
        Update::Clear
    } else {
        match matches.get_one::<String>("summary") {
            Some(text) => Update::Set(text.clone()),
            None => Update::Keep,
        }
    };
    let expires_at = if matches.get_flag("clear-expiry") {
        Update::Clear
    } else {
        match parse_expiry(matches)? {
            Some(expiry) => Update::Set(expiry),
            None => Update::Keep,
        }
    };

    let tags = matches
        .get_many::<String>("tag")
        .map(|values| values.cloned().collect::<Vec<_>>());
    let citations = matches
        .get_many::<String>("citation")
        .map(|values| values.cloned().collect::<Vec<_>>());

    let updates = UpdateMemoryInput {
        content,
        tags,
        source: matches
            .get_one::<String>("source")
            .cloned()
            .map(MemorySource::from),
        citations,
        summary,
        expires_at,
    };

    let memory = store.memory(path).update(updates, Utc::now()).await?;
    println!("✓ Updated {}", memory.path);
    Ok(())
}

pub async fn move_memory(matches: &ArgMatches) -> Result<(), DomainError> {
    let store = super::open_store(matches).await?;
    let from = matches.get_one::<String>("from").expect("required");
    let to = matches.get_one::<String>("to").expect("required");

    store.memory(from).move_to(to).await?;
    println!("✓ Moved {from} -> {to}");
    Ok(())
}

pub async fn remove(matches: &ArgMatches) -> Result<(), DomainError> {
    let store = super::open_store(matches).await?;
    let path = matches.get_one::<String>("path").expect("required");

    store.memory(path).remove().await?;
    println!("✓ Removed {path}");
    Ok(())
}
