//! `cortex serve` — run the MCP tool server on stdio.

use clap::ArgMatches;

use cortex_engine::DomainError;

pub async fn run(matches: &ArgMatches) -> Result<(), DomainError> {
    let cortex = super::open_cortex(matches).await?;
    tracing::info!(data_dir = %cortex.data_path().display(), "starting MCP server on stdio");
    crate::mcp_server::start(cortex)
        .await
        .map_err(|e| DomainError::Storage {
            reason: format!("MCP server failed: {e}"),
        })
}
