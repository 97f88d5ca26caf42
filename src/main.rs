#![allow(clippy::multiple_crate_versions)]

use clap::{Arg, ArgAction, Command};

mod commands;
mod mcp_server;

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn store_arg() -> Arg {
    Arg::new("store")
        .short('s')
        .long("store")
        .value_name("STORE")
        .help("Store to operate on")
        .default_value("default")
}

fn json_arg() -> Arg {
    Arg::new("json")
        .long("json")
        .action(ArgAction::SetTrue)
        .help("Emit machine-readable JSON")
}

fn content_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("content")
                .short('c')
                .long("content")
                .value_name("TEXT")
                .help("Inline memory content"),
        )
        .arg(
            Arg::new("file")
                .short('f')
                .long("file")
                .value_name("PATH")
                .help("Read memory content from a file"),
        )
        .arg(
            Arg::new("stdin")
                .long("stdin")
                .action(ArgAction::SetTrue)
                .help("Read memory content from stdin"),
        )
        .arg(
            Arg::new("tag")
                .short('t')
                .long("tag")
                .value_name("TAG")
                .action(ArgAction::Append)
                .help("Tag to attach (repeatable)"),
        )
        .arg(
            Arg::new("citation")
                .long("citation")
                .value_name("REF")
                .action(ArgAction::Append)
                .help("Citation reference (repeatable)"),
        )
        .arg(
            Arg::new("summary")
                .long("summary")
                .value_name("TEXT")
                .help("Short summary shown in listings"),
        )
        .arg(
            Arg::new("expires")
                .long("expires")
                .value_name("TIMESTAMP")
                .help("Expiry as an RFC 3339 timestamp (e.g. 2026-06-01T00:00:00Z)"),
        )
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let matches = Command::new("cortex")
        .version(VERSION)
        .about("Cortex - hierarchical memory store for autonomous agents")
        .arg(
            Arg::new("data-dir")
                .long("data-dir")
                .value_name("DIR")
                .global(true)
                .help("Data directory (default: CORTEX_DATA_DIR or ~/.cortex/data)"),
        )
        .subcommand(
            Command::new("init")
                .about("Create the data directory, a starter config, and initialize stores"),
        )
        .subcommand(
            Command::new("store")
                .about("Manage the store registry")
                .subcommand(Command::new("list").about("List registered stores").arg(json_arg()))
                .subcommand(
                    Command::new("add")
                        .about("Register a new store")
                        .arg(Arg::new("name").value_name("NAME").required(true))
                        .arg(
                            Arg::new("description")
                                .long("description")
                                .value_name("TEXT")
                                .help("Store description"),
                        )
                        .arg(
                            Arg::new("mode")
                                .long("mode")
                                .value_name("MODE")
                                .help("Category mode: free, subcategories, or strict")
                                .default_value("free"),
                        ),
                )
                .subcommand(
                    Command::new("remove")
                        .about("Drop a store from the registry (data stays on disk)")
                        .arg(Arg::new("name").value_name("NAME").required(true)),
                ),
        )
        .subcommand(content_args(
            Command::new("create")
                .about("Create a memory")
                .arg(Arg::new("path").value_name("PATH").required(true))
                .arg(store_arg())
                .arg(
                    Arg::new("source")
                        .long("source")
                        .value_name("SOURCE")
                        .help("Origin of the memory: agent, user, import, ...")
                        .default_value("user"),
                ),
        ))
        .subcommand(
            Command::new("get")
                .about("Read a memory")
                .arg(Arg::new("path").value_name("PATH").required(true))
                .arg(store_arg())
                .arg(
                    Arg::new("include-expired")
                        .long("include-expired")
                        .action(ArgAction::SetTrue)
                        .help("Return the memory even when expired"),
                )
                .arg(json_arg()),
        )
        .subcommand(content_args(
            Command::new("update")
                .about("Update a memory; omitted fields are preserved")
                .arg(Arg::new("path").value_name("PATH").required(true))
                .arg(store_arg())
                .arg(
                    Arg::new("source")
                        .long("source")
                        .value_name("SOURCE")
                        .help("Replace the memory's source"),
                )
                .arg(
                    Arg::new("clear-summary")
                        .long("clear-summary")
                        .action(ArgAction::SetTrue)
                        .help("Remove the summary"),
                )
                .arg(
                    Arg::new("clear-expiry")
                        .long("clear-expiry")
                        .action(ArgAction::SetTrue)
                        .help("Remove the expiry"),
                ),
        ))
        .subcommand(
            Command::new("move")
                .about("Move a memory to a new path")
                .arg(Arg::new("from").value_name("FROM").required(true))
                .arg(Arg::new("to").value_name("TO").required(true))
                .arg(store_arg()),
        )
        .subcommand(
            Command::new("remove")
                .about("Delete a memory")
                .arg(Arg::new("path").value_name("PATH").required(true))
                .arg(store_arg()),
        )
        .subcommand(
            Command::new("list")
                .about("List memories under a category")
                .arg(Arg::new("scope").value_name("SCOPE").default_value("/"))
                .arg(store_arg())
                .arg(
                    Arg::new("include-expired")
                        .long("include-expired")
                        .action(ArgAction::SetTrue)
                        .help("Include expired entries"),
                )
                .arg(json_arg()),
        )
        .subcommand(
            Command::new("recent")
                .about("Show the most recently updated memories")
                .arg(
                    Arg::new("category")
                        .long("category")
                        .value_name("SCOPE")
                        .help("Restrict to a category subtree"),
                )
                .arg(
                    Arg::new("limit")
                        .short('n')
                        .long("limit")
                        .value_name("N")
                        .help("Maximum entries to return (default 5, cap 100)"),
                )
                .arg(
                    Arg::new("include-expired")
                        .long("include-expired")
                        .action(ArgAction::SetTrue)
                        .help("Include expired memories"),
                )
                .arg(store_arg())
                .arg(json_arg()),
        )
        .subcommand(
            Command::new("prune")
                .about("Delete expired memories under a category")
                .arg(Arg::new("scope").value_name("SCOPE").default_value("/"))
                .arg(store_arg())
                .arg(
                    Arg::new("dry-run")
                        .long("dry-run")
                        .action(ArgAction::SetTrue)
                        .help("Report what would be pruned without deleting"),
                ),
        )
        .subcommand(
            Command::new("reindex")
                .about("Rebuild category indexes from the stored documents")
                .arg(Arg::new("scope").value_name("SCOPE").default_value("/"))
                .arg(store_arg()),
        )
        .subcommand(
            Command::new("category")
                .about("Manage categories")
                .subcommand(
                    Command::new("create")
                        .about("Create a category (with missing ancestors)")
                        .arg(Arg::new("path").value_name("PATH").required(true))
                        .arg(store_arg()),
                )
                .subcommand(
                    Command::new("delete")
                        .about("Delete a category and everything under it")
                        .arg(Arg::new("path").value_name("PATH").required(true))
                        .arg(store_arg()),
                )
                .subcommand(
                    Command::new("describe")
                        .about("Set a category description (no text clears it)")
                        .arg(Arg::new("path").value_name("PATH").required(true))
                        .arg(Arg::new("text").value_name("TEXT"))
                        .arg(store_arg()),
                ),
        )
        .subcommand(Command::new("serve").about("Run the MCP tool server on stdio"))
        .get_matches();

    let result = match matches.subcommand() {
        Some(("init", sub)) => commands::init::run(sub).await,
        Some(("store", sub)) => commands::store::run(sub).await,
        Some(("create", sub)) => commands::memory::create(sub).await,
        Some(("get", sub)) => commands::memory::get(sub).await,
        Some(("update", sub)) => commands::memory::update(sub).await,
        Some(("move", sub)) => commands::memory::move_memory(sub).await,
        Some(("remove", sub)) => commands::memory::remove(sub).await,
        Some(("list", sub)) => commands::listing::list(sub).await,
        Some(("recent", sub)) => commands::listing::recent(sub).await,
        Some(("prune", sub)) => commands::maintenance::prune(sub).await,
        Some(("reindex", sub)) => commands::maintenance::reindex(sub).await,
        Some(("category", sub)) => commands::category::run(sub).await,
        Some(("serve", sub)) => commands::serve::run(sub).await,
        _ => {
            eprintln!("No command given. Try: cortex --help");
            std::process::exit(2);
        }
    };

    if let Err(error) = result {
        eprintln!("✗ {error}");
        std::process::exit(commands::exit_code(&error));
    }
}
