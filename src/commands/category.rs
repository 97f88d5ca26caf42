//! `cortex category` — category management.

use clap::ArgMatches;

use cortex_engine::DomainError;

pub async fn run(matches: &ArgMatches) -> Result<(), DomainError> {
    match matches.subcommand() {
        Some(("create", sub)) => create(sub).await,
        Some(("delete", sub)) => delete(sub).await,
        Some(("describe", sub)) => describe(sub).await,
        _ => {
            eprintln!("Usage: cortex category <create|delete|describe>");
            Ok(())
        }
    }
}

async fn create(matches: &ArgMatches) -> Result<(), DomainError> {
    let store = super::open_store(matches).await?;
    let path = matches.get_one::<String>("path").expect("required");

    let result = store.category(path).create().await?;
    if result.created {
        println!("✓ Created category /{}", result.path);
    } else {
        println!("• Category /{} already exists", result.path);
    }
    Ok(())
}

async fn delete(matches: &ArgMatches) -> Result<(), DomainError> {
    let store = super::open_store(matches).await?;
    let path = matches.get_one::<String>("path").expect("required");

    store.category(path).delete().await?;
    println!("✓ Deleted category {path}");
    Ok(())
}

async fn describe(matches: &ArgMatches) -> Result<(), DomainError> {
    let store = super::open_store(matches).await?;
    let path = matches.get_one::<String>("path").expect("required");
    let text = matches
        .get_one::<String>("text")
        .map(String::as_str)
        .unwrap_or("");

    store.category(path).set_description(text).await?;
    if text.trim().is_empty() {
        println!("✓ Cleared description of {path}");
    } else {
        println!("✓ Described {path}");
    }
    Ok(())
}
