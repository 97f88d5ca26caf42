//! `cortex store` — registry management.

use clap::ArgMatches;

use cortex_engine::{CategoryMode, DomainError, StoreDefinition};

pub async fn run(matches: &ArgMatches) -> Result<(), DomainError> {
    match matches.subcommand() {
        Some(("list", sub)) => list(sub).await,
        Some(("add", sub)) => add(sub).await,
        Some(("remove", sub)) => remove(sub).await,
        _ => {
            eprintln!("Usage: cortex store <list|add|remove>");
            Ok(())
        }
    }
}

async fn list(matches: &ArgMatches) -> Result<(), DomainError> {
    let cortex = super::open_cortex(matches).await?;
    let definitions = cortex.store_definitions();

    if matches.get_flag("json") {
        let rows: Vec<serde_json::Value> = definitions
            .iter()
            .map(|(name, def)| {
                serde_json::json!({
                    "name": name.to_string(),
                    "kind": def.kind,
                    "description": def.description,
                    "category_mode": serde_json::to_value(def.category_mode).unwrap_or_default(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows).unwrap_or_default());
        return Ok(());
    }

    for (name, def) in definitions {
        match def.description {
            Some(description) => println!("{name}  ({})  {description}", def.kind),
            None => println!("{name}  ({})", def.kind),
        }
    }
    Ok(())
}

async fn add(matches: &ArgMatches) -> Result<(), DomainError> {
    let cortex = super::open_cortex(matches).await?;
    let name = matches.get_one::<String>("name").expect("required");

    let mode = match matches.get_one::<String>("mode").map(String::as_str) {
        Some("free") | None => CategoryMode::Free,
        Some("subcategories") => CategoryMode::Subcategories,
        Some("strict") => CategoryMode::Strict,
        Some(other) => {
            return Err(DomainError::InvalidArguments {
                reason: format!("unknown category mode '{other}'; expected free, subcategories, or strict"),
            })
        }
    };

    let definition = StoreDefinition {
        description: matches.get_one::<String>("description").cloned(),
        category_mode: mode,
        ..StoreDefinition::default()
    };
    cortex.add_store(name, definition.clone()).await?;
    cortex
        .get_store(name)?
        .initialize(definition.to_store_data())
        .await?;

    println!("✓ Added store '{name}'");
    Ok(())
}

async fn remove(matches: &ArgMatches) -> Result<(), DomainError> {
    let cortex = super::open_cortex(matches).await?;
    let name = matches.get_one::<String>("name").expect("required");
    cortex.remove_store(name).await?;
    println!("✓ Removed store '{name}' from the registry (data left on disk)");
    Ok(())
}
