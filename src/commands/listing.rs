//! `cortex list` and `cortex recent` — index-backed queries.

use clap::ArgMatches;

use cortex_engine::{DomainError, ListMemoriesOptions, RecentOptions};

pub async fn list(matches: &ArgMatches) -> Result<(), DomainError> {
    let store = super::open_store(matches).await?;
    let scope = matches.get_one::<String>("scope").expect("defaulted");

    let entries = store
        .category(scope)
        .list_memories(ListMemoriesOptions {
            include_expired: matches.get_flag("include-expired"),
            now: None,
        })
        .await?;

    if matches.get_flag("json") {
        println!(
            "{}",
            serde_json::to_string_pretty(&entries).unwrap_or_default()
        );
        return Ok(());
    }

    if entries.is_empty() {
        println!("No memories under '{scope}'");
        return Ok(());
    }
    for entry in entries {
        let updated = entry
            .updated_at
            .map(|dt| dt.to_rfc3339())
            .unwrap_or_else(|| "-".to_string());
        match entry.summary {
            Some(summary) => println!(
                "{}  {} tokens  {updated}  {summary}",
                entry.path, entry.token_estimate
            ),
            None => println!("{}  {} tokens  {updated}", entry.path, entry.token_estimate),
        }
    }
    Ok(())
}

pub async fn recent(matches: &ArgMatches) -> Result<(), DomainError> {
    let store = super::open_store(matches).await?;

    let limit = match matches.get_one::<String>("limit") {
        None => None,
        Some(raw) => Some(raw.parse::<usize>().map_err(|_| {
            DomainError::InvalidArguments {
                reason: format!("invalid --limit '{raw}': expected a number"),
            }
        })?),
    };

    let scope = matches
        .get_one::<String>("category")
        .map(String::as_str)
        .unwrap_or("/");
    let entries = store
        .category(scope)
        .get_recent(RecentOptions {
            category: None, // overridden by the category client
            limit,
            include_expired: matches.get_flag("include-expired"),
            now: None,
        })
        .await?;

    if matches.get_flag("json") {
        println!(
            "{}",
            serde_json::to_string_pretty(&entries).unwrap_or_default()
        );
        return Ok(());
    }

    for entry in entries {
        let updated = entry
            .updated_at
            .map(|dt| dt.to_rfc3339())
            .unwrap_or_else(|| "-".to_string());
        println!("── {}  ({updated})", entry.path);
        println!("{}", entry.content);
    }
    Ok(())
}
