//! `cortex init` — bootstrap the data directory and stores.

use clap::ArgMatches;
use std::sync::Arc;

use cortex_engine::{
    starter_registry, Cortex, CortexOptions, DefaultAdapterFactory, DomainError, ErrorCode,
};

pub async fn run(matches: &ArgMatches) -> Result<(), DomainError> {
    let data_dir = super::data_dir(matches);
    let factory = Arc::new(DefaultAdapterFactory);

    // Reuse an existing config; otherwise start with the default store.
    let cortex = match Cortex::load(data_dir.clone(), factory.clone()).await {
        Ok(cortex) => cortex,
        Err(_) => {
            let cortex = Cortex::init(CortexOptions {
                data_path: data_dir.clone(),
                registry: starter_registry(),
                adapter_factory: factory,
            })?;
            cortex.initialize().await?;
            cortex
        }
    };

    for (name, definition) in cortex.store_definitions() {
        let store = cortex.get_store(name.as_str())?;
        match store.initialize(definition.to_store_data()).await {
            Ok(()) => println!("✓ Initialized store '{name}'"),
            Err(e) if e.code() == ErrorCode::StoreAlreadyExists => {
                println!("• Store '{name}' already initialized")
            }
            Err(e) => return Err(e),
        }
    }

    println!("✓ Cortex ready at {}", data_dir.display());
    Ok(())
}
