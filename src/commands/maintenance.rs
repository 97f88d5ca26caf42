//! `cortex prune` and `cortex reindex` — scope maintenance.

use clap::ArgMatches;

use cortex_engine::{DomainError, PruneOptions};

pub async fn prune(matches: &ArgMatches) -> Result<(), DomainError> {
    let store = super::open_store(matches).await?;
    let scope = matches.get_one::<String>("scope").expect("defaulted");
    let dry_run = matches.get_flag("dry-run");

    let result = store
        .category(scope)
        .prune(PruneOptions { dry_run, now: None })
        .await?;

    if result.pruned.is_empty() {
        println!("Nothing to prune under '{scope}'");
        return Ok(());
    }
    for path in &result.pruned {
        if dry_run {
            println!("would prune {path}");
        } else {
            println!("pruned {path}");
        }
    }
    println!(
        "{} {} memor{}",
        if dry_run { "Would prune" } else { "Pruned" },
        result.pruned.len(),
        if result.pruned.len() == 1 { "y" } else { "ies" }
    );
    Ok(())
}

pub async fn reindex(matches: &ArgMatches) -> Result<(), DomainError> {
    let store = super::open_store(matches).await?;
    let scope = matches.get_one::<String>("scope").expect("defaulted");

    let result = store.category(scope).reindex().await?;
    println!(
        "✓ Reindexed {} categor{}, {} memor{}",
        result.categories_indexed,
        if result.categories_indexed == 1 { "y" } else { "ies" },
        result.memories_indexed,
        if result.memories_indexed == 1 { "y" } else { "ies" }
    );
    for warning in result.warnings {
        println!("⚠️  {warning}");
    }
    Ok(())
}
