//! MCP server implementation for Cortex.
//!
//! Exposes the memory store engine as MCP tools over stdio transport
//! using the rmcp SDK. MCP clients (Claude Code, Cursor, etc.) can
//! create, read, update, move, and prune memories, manage categories,
//! and browse stores. Tool names and argument schemas are stable public
//! surface.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::*,
    tool, tool_handler, tool_router,
    transport::stdio,
    ErrorData as McpError, ServerHandler, ServiceExt,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use cortex_engine::{
    Cortex, CreateMemoryInput, DomainError, ErrorCategory, GetMemoryOptions,
    ListMemoriesOptions, MemorySource, PruneOptions, RecentOptions, StoreClient, Update,
    UpdateMemoryInput,
};

/// Absolute bound on a tool call's serialized arguments.
const MAX_REQUEST_BYTES: usize = 1024 * 1024;

// ---------------------------------------------------------------------------
// Parameter structs
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct CreateMemoryParams {
    /// Store name (defaults to "default")
    pub store: Option<String>,
    /// Memory path, e.g. "standards/typescript/style"
    pub path: String,
    /// Memory content body
    pub content: Option<String>,
    /// Tags to attach
    pub tags: Option<Vec<String>>,
    /// Origin: agent, user, import, ...
    pub source: Option<String>,
    /// Citation references
    pub citations: Option<Vec<String>>,
    /// Short summary shown in listings
    pub summary: Option<String>,
    /// Expiry as an RFC 3339 timestamp
    pub expires_at: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct GetMemoryParams {
    /// Store name (defaults to "default")
    pub store: Option<String>,
    /// Memory path
    pub path: String,
    /// Return the memory even when expired
    pub include_expired: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct UpdateMemoryParams {
    /// Store name (defaults to "default")
    pub store: Option<String>,
    /// Memory path
    pub path: String,
    /// Replacement content; omitted preserves the stored content
    pub content: Option<String>,
    /// Replacement tag set
    pub tags: Option<Vec<String>>,
    /// Replacement source
    pub source: Option<String>,
    /// Replacement citations
    pub citations: Option<Vec<String>>,
    /// Replacement summary
    pub summary: Option<String>,
    /// Remove the summary
    pub clear_summary: Option<bool>,
    /// Replacement expiry as an RFC 3339 timestamp
    pub expires_at: Option<String>,
    /// Remove the expiry
    pub clear_expiry: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct MoveMemoryParams {
    /// Store name (defaults to "default")
    pub store: Option<String>,
    /// Current memory path
    pub from: String,
    /// Destination memory path
    pub to: String,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct RemoveMemoryParams {
    /// Store name (defaults to "default")
    pub store: Option<String>,
    /// Memory path
    pub path: String,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ListMemoriesParams {
    /// Store name (defaults to "default")
    pub store: Option<String>,
    /// Category scope; empty or "/" lists the whole store
    pub scope: Option<String>,
    /// Include expired entries
    pub include_expired: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct RecentMemoriesParams {
    /// Store name (defaults to "default")
    pub store: Option<String>,
    /// Restrict to a category subtree
    pub category: Option<String>,
    /// Maximum entries (default 5, cap 100)
    pub limit: Option<usize>,
    /// Include expired memories
    pub include_expired: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct PruneMemoriesParams {
    /// Store name (defaults to "default")
    pub store: Option<String>,
    /// Category scope; empty or "/" prunes the whole store
    pub scope: Option<String>,
    /// Report without deleting
    pub dry_run: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct CategoryParams {
    /// Store name (defaults to "default")
    pub store: Option<String>,
    /// Category path
    pub path: String,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct DescribeCategoryParams {
    /// Store name (defaults to "default")
    pub store: Option<String>,
    /// Category path
    pub path: String,
    /// Description text; empty or omitted clears it
    pub description: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ReindexParams {
    /// Store name (defaults to "default")
    pub store: Option<String>,
    /// Category scope; empty or "/" reindexes the whole store
    pub scope: Option<String>,
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

/// Translate a domain error into a protocol error: INVALID_ARGUMENTS,
/// NOT_FOUND, CONFLICT, or INTERNAL, carrying the stable engine code.
fn map_error(error: DomainError) -> McpError {
    let protocol = match error.category() {
        ErrorCategory::Input | ErrorCategory::Policy => "INVALID_ARGUMENTS",
        ErrorCategory::NotFound => "NOT_FOUND",
        ErrorCategory::Conflict => "CONFLICT",
        ErrorCategory::Storage | ErrorCategory::Parse => "INTERNAL",
    };
    let data = serde_json::json!({
        "code": error.code().as_str(),
        "protocol": protocol,
    });
    let message = error.to_string();
    match error.category() {
        ErrorCategory::Input | ErrorCategory::Policy => {
            McpError::invalid_params(message, Some(data))
        }
        ErrorCategory::NotFound => McpError::resource_not_found(message, Some(data)),
        ErrorCategory::Conflict => McpError::invalid_request(message, Some(data)),
        ErrorCategory::Storage | ErrorCategory::Parse => {
            McpError::internal_error(message, Some(data))
        }
    }
}

/// Reject argument payloads above the absolute request size bound.
fn check_request_size<T: Serialize>(params: &T) -> Result<(), McpError> {
    let size = serde_json::to_vec(params).map(|bytes| bytes.len()).unwrap_or(0);
    if size > MAX_REQUEST_BYTES {
        return Err(McpError::invalid_request(
            format!(
                "Request arguments are {size} bytes, exceeding the {MAX_REQUEST_BYTES} byte limit. \
                 Split the content into smaller memories."
            ),
            Some(serde_json::json!({ "code": "REQUEST_TOO_LARGE" })),
        ));
    }
    Ok(())
}

fn parse_expiry(raw: &Option<String>) -> Result<Option<DateTime<Utc>>, McpError> {
    match raw {
        None => Ok(None),
        Some(raw) => DateTime::parse_from_rfc3339(raw)
            .map(|dt| Some(dt.with_timezone(&Utc)))
            .map_err(|e| {
                McpError::invalid_params(
                    format!("invalid expires_at '{raw}': {e}; use RFC 3339"),
                    Some(serde_json::json!({ "code": "INVALID_ARGUMENTS" })),
                )
            }),
    }
}

fn json_result(value: serde_json::Value) -> CallToolResult {
    let text = serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string());
    CallToolResult::success(vec![Content::text(text)])
}

// ---------------------------------------------------------------------------
// Server struct
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct CortexMcpServer {
    cortex: Arc<Cortex>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl CortexMcpServer {
    pub fn new(cortex: Cortex) -> Self {
        Self {
            cortex: Arc::new(cortex),
            tool_router: Self::tool_router(),
        }
    }

    fn store(&self, name: &Option<String>) -> Result<StoreClient, McpError> {
        let name = name.as_deref().unwrap_or("default");
        self.cortex.get_store(name).map_err(map_error)
    }

    #[tool(
        description = "Create a memory at a path. Paths are lowercase slugs separated by '/', e.g. standards/typescript/style."
    )]
    async fn create_memory(
        &self,
        Parameters(params): Parameters<CreateMemoryParams>,
    ) -> Result<CallToolResult, McpError> {
        check_request_size(&params)?;
        let store = self.store(&params.store)?;
        let expires_at = parse_expiry(&params.expires_at)?;

        let input = CreateMemoryInput {
            content: params.content.unwrap_or_default(),
            tags: params.tags.unwrap_or_default(),
            source: params
                .source
                .map(MemorySource::from)
                .unwrap_or(MemorySource::Agent),
            citations: params.citations.unwrap_or_default(),
            summary: params.summary,
            expires_at,
        };
        let memory = store
            .memory(&params.path)
            .create(input, Utc::now())
            .await
            .map_err(map_error)?;

        Ok(json_result(serde_json::json!({
            "path": memory.path.to_string(),
            "created_at": memory.metadata.created_at.to_rfc3339(),
            "expires_at": memory.metadata.expires_at.map(|dt| dt.to_rfc3339()),
        })))
    }

    #[tool(description = "Read a memory's metadata and full content.")]
    async fn get_memory(
        &self,
        Parameters(params): Parameters<GetMemoryParams>,
    ) -> Result<CallToolResult, McpError> {
        let store = self.store(&params.store)?;
        let memory = store
            .memory(&params.path)
            .get(GetMemoryOptions {
                include_expired: params.include_expired.unwrap_or(false),
                now: None,
            })
            .await
            .map_err(map_error)?;

        Ok(json_result(serde_json::json!({
            "path": memory.path.to_string(),
            "metadata": memory.metadata,
            "content": memory.content,
        })))
    }

    #[tool(
        description = "Update a memory. Omitted fields are preserved; clear_summary/clear_expiry remove those fields."
    )]
    async fn update_memory(
        &self,
        Parameters(params): Parameters<UpdateMemoryParams>,
    ) -> Result<CallToolResult, McpError> {
        check_request_size(&params)?;
        let store = self.store(&params.store)?;

        let summary = if params.clear_summary.unwrap_or(false) {
            Update::Clear
        } else {
            match params.summary {
                Some(summary) => Update::Set(summary),
                None => Update::Keep,
            }
        };
        let expires_at = if params.clear_expiry.unwrap_or(false) {
            Update::Clear
        } else {
            match parse_expiry(&params.expires_at)? {
                Some(expiry) => Update::Set(expiry),
                None => Update::Keep,
            }
        };

        let updates = UpdateMemoryInput {
            content: params.content,
            tags: params.tags,
            source: params.source.map(MemorySource::from),
            citations: params.citations,
            summary,
            expires_at,
        };
        let memory = store
            .memory(&params.path)
            .update(updates, Utc::now())
            .await
            .map_err(map_error)?;

        Ok(json_result(serde_json::json!({
            "path": memory.path.to_string(),
            "updated_at": memory.metadata.updated_at.to_rfc3339(),
        })))
    }

    #[tool(description = "Move a memory to a new path, preserving its metadata.")]
    async fn move_memory(
        &self,
        Parameters(params): Parameters<MoveMemoryParams>,
    ) -> Result<CallToolResult, McpError> {
        let store = self.store(&params.store)?;
        store
            .memory(&params.from)
            .move_to(&params.to)
            .await
            .map_err(map_error)?;
        Ok(json_result(serde_json::json!({
            "from": params.from,
            "to": params.to,
        })))
    }

    #[tool(description = "Delete a memory.")]
    async fn remove_memory(
        &self,
        Parameters(params): Parameters<RemoveMemoryParams>,
    ) -> Result<CallToolResult, McpError> {
        let store = self.store(&params.store)?;
        store
            .memory(&params.path)
            .remove()
            .await
            .map_err(map_error)?;
        Ok(json_result(serde_json::json!({ "removed": params.path })))
    }

    #[tool(
        description = "List memory index entries under a category scope (path, token estimate, summary, timestamps)."
    )]
    async fn list_memories(
        &self,
        Parameters(params): Parameters<ListMemoriesParams>,
    ) -> Result<CallToolResult, McpError> {
        let store = self.store(&params.store)?;
        let scope = params.scope.as_deref().unwrap_or("/");
        let entries = store
            .category(scope)
            .list_memories(ListMemoriesOptions {
                include_expired: params.include_expired.unwrap_or(false),
                now: None,
            })
            .await
            .map_err(map_error)?;
        Ok(json_result(serde_json::to_value(entries).unwrap_or_default()))
    }

    #[tool(
        description = "List direct subcategories of a category, with direct memory counts and descriptions."
    )]
    async fn list_subcategories(
        &self,
        Parameters(params): Parameters<CategoryParams>,
    ) -> Result<CallToolResult, McpError> {
        let store = self.store(&params.store)?;
        let entries = store
            .category(&params.path)
            .list_subcategories()
            .await
            .map_err(map_error)?;
        Ok(json_result(serde_json::to_value(entries).unwrap_or_default()))
    }

    #[tool(
        description = "Fetch the most recently updated memories with their full content. Default limit 5, cap 100."
    )]
    async fn get_recent_memories(
        &self,
        Parameters(params): Parameters<RecentMemoriesParams>,
    ) -> Result<CallToolResult, McpError> {
        let store = self.store(&params.store)?;
        let scope = params.category.as_deref().unwrap_or("/");
        let entries = store
            .category(scope)
            .get_recent(RecentOptions {
                category: None, // overridden by the category client
                limit: params.limit,
                include_expired: params.include_expired.unwrap_or(false),
                now: None,
            })
            .await
            .map_err(map_error)?;
        Ok(json_result(serde_json::to_value(entries).unwrap_or_default()))
    }

    #[tool(
        description = "Delete expired memories under a scope. With dry_run, only report what would be deleted."
    )]
    async fn prune_memories(
        &self,
        Parameters(params): Parameters<PruneMemoriesParams>,
    ) -> Result<CallToolResult, McpError> {
        let store = self.store(&params.store)?;
        let scope = params.scope.as_deref().unwrap_or("/");
        let result = store
            .category(scope)
            .prune(PruneOptions {
                dry_run: params.dry_run.unwrap_or(false),
                now: None,
            })
            .await
            .map_err(map_error)?;
        Ok(json_result(serde_json::to_value(result).unwrap_or_default()))
    }

    #[tool(description = "Create a category (with missing ancestors). Idempotent.")]
    async fn create_category(
        &self,
        Parameters(params): Parameters<CategoryParams>,
    ) -> Result<CallToolResult, McpError> {
        let store = self.store(&params.store)?;
        let result = store
            .category(&params.path)
            .create()
            .await
            .map_err(map_error)?;
        Ok(json_result(serde_json::to_value(result).unwrap_or_default()))
    }

    #[tool(description = "Delete a category and everything under it.")]
    async fn delete_category(
        &self,
        Parameters(params): Parameters<CategoryParams>,
    ) -> Result<CallToolResult, McpError> {
        let store = self.store(&params.store)?;
        store
            .category(&params.path)
            .delete()
            .await
            .map_err(map_error)?;
        Ok(json_result(serde_json::json!({ "deleted": params.path })))
    }

    #[tool(description = "Set or clear a category's description (empty clears).")]
    async fn set_category_description(
        &self,
        Parameters(params): Parameters<DescribeCategoryParams>,
    ) -> Result<CallToolResult, McpError> {
        check_request_size(&params)?;
        let store = self.store(&params.store)?;
        let text = params.description.unwrap_or_default();
        store
            .category(&params.path)
            .set_description(&text)
            .await
            .map_err(map_error)?;
        Ok(json_result(serde_json::json!({
            "path": params.path,
            "cleared": text.trim().is_empty(),
        })))
    }

    #[tool(description = "List the registered stores.")]
    async fn list_stores(&self) -> Result<CallToolResult, McpError> {
        let stores: Vec<serde_json::Value> = self
            .cortex
            .store_definitions()
            .iter()
            .map(|(name, def)| {
                serde_json::json!({
                    "name": name.to_string(),
                    "kind": def.kind,
                    "description": def.description,
                })
            })
            .collect();
        Ok(json_result(serde_json::Value::Array(stores)))
    }

    #[tool(
        description = "Rebuild category indexes under a scope from the stored documents, repairing drift."
    )]
    async fn reindex(
        &self,
        Parameters(params): Parameters<ReindexParams>,
    ) -> Result<CallToolResult, McpError> {
        let store = self.store(&params.store)?;
        let scope = params.scope.as_deref().unwrap_or("/");
        let result = store
            .category(scope)
            .reindex()
            .await
            .map_err(map_error)?;
        Ok(json_result(serde_json::to_value(result).unwrap_or_default()))
    }
}

// ---------------------------------------------------------------------------
// ServerHandler — #[tool_handler] auto-generates list_tools + call_tool
// ---------------------------------------------------------------------------

#[tool_handler]
impl ServerHandler for CortexMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Cortex hierarchical memory store — create, read, update, move, and prune \
                 memories organized in categories across named stores"
                    .to_string(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Start the MCP server over stdio transport. Stdout carries the
/// protocol; logging goes to stderr (configured in `main`).
pub async fn start(cortex: Cortex) -> Result<(), Box<dyn std::error::Error>> {
    let service = CortexMcpServer::new(cortex).serve(stdio()).await?;
    service.waiting().await?;
    Ok(())
}
