//! MCP tool adapter.
//!
//! Exposes the repository as two MCP tools through `rmcp`:
//!
//! | Tool | Arguments | Result |
//! |------|-----------|--------|
//! | `search_policy_chunks` | `query`, `doctype?`, `department?`, `revised_after?`, `limit?` (5) | `{ "items": [PolicyChunk] }` |
//! | `get_policy_chunk` | `id` (string or integer) | `{ "item": PolicyChunk \| null }` |
//!
//! Served over stdio ([`serve_stdio`]) or mounted into the HTTP server as a
//! streamable-HTTP endpoint ([`streamable_http_service`]).

use std::borrow::Cow;
use std::sync::Arc;

use rmcp::model::*;
use rmcp::transport::streamable_http_server::session::local::LocalSessionManager;
use rmcp::transport::streamable_http_server::{StreamableHttpServerConfig, StreamableHttpService};
use rmcp::{ErrorData as McpError, ServerHandler, ServiceExt};
use serde_json::Value;
use thiserror::Error;

use crate::error::RetrievalError;
use crate::models::{GetResponse, PointId, SearchRequest};
use crate::repository::Repository;

pub const SEARCH_TOOL: &str = "search_policy_chunks";
pub const GET_TOOL: &str = "get_policy_chunk";

/// Why a tool call produced no result.
#[derive(Debug, Error)]
pub enum ToolCallError {
    #[error("no tool registered with name: {0}")]
    UnknownTool(String),

    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    #[error(transparent)]
    Retrieval(#[from] RetrievalError),

    #[error("failed to encode result: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Bridges [`Repository`] to the MCP JSON-RPC protocol.
///
/// Each MCP session receives a clone (the repository is behind `Arc`).
#[derive(Clone)]
pub struct PolicyMcp {
    repo: Arc<Repository>,
}

impl PolicyMcp {
    pub fn new(repo: Arc<Repository>) -> Self {
        Self { repo }
    }

    /// Descriptors for every tool this server offers.
    pub fn tools() -> Vec<Tool> {
        vec![
            descriptor(
                SEARCH_TOOL,
                "Semantic search over policy document chunks, optionally narrowed by \
                 document type, department and a minimum revision date.",
                serde_json::json!({
                    "type": "object",
                    "properties": {
                        "query": { "type": "string", "minLength": 1, "description": "Natural-language search query" },
                        "doctype": { "type": "string", "description": "Exact document type, e.g. HR" },
                        "department": { "type": "string", "description": "Exact owning department" },
                        "revised_after": {
                            "type": "string",
                            "description": "ISO date string, e.g. 2024-01-01 or 2024-01-01T00:00:00Z"
                        },
                        "limit": {
                            "type": "integer",
                            "default": 5,
                            "description": "Maximum results; values outside 1..=50 are clamped"
                        }
                    },
                    "required": ["query"]
                }),
            ),
            descriptor(
                GET_TOOL,
                "Fetch a single policy chunk by id. Returns null when it does not exist.",
                serde_json::json!({
                    "type": "object",
                    "properties": {
                        "id": {
                            "type": ["string", "integer"],
                            "description": "Chunk id (unsigned integer or UUID)"
                        }
                    },
                    "required": ["id"]
                }),
            ),
        ]
    }

    /// Run a tool by name and return its structured result.
    pub async fn execute(&self, name: &str, arguments: Value) -> Result<Value, ToolCallError> {
        match name {
            SEARCH_TOOL => {
                let request: SearchRequest = serde_json::from_value(arguments)
                    .map_err(|e| ToolCallError::InvalidArguments(e.to_string()))?;
                let response = self.repo.search(&request).await?;
                Ok(serde_json::to_value(&response)?)
            }
            GET_TOOL => {
                let id = match arguments.get("id") {
                    Some(v @ (Value::String(_) | Value::Number(_))) => PointId::from_argument(v),
                    _ => {
                        return Err(ToolCallError::InvalidArguments(
                            "id must be a string or an integer".to_string(),
                        ))
                    }
                };
                let item = match id {
                    Some(id) => self.repo.get_by_id(&id).await?,
                    None => None,
                };
                Ok(serde_json::to_value(GetResponse { item })?)
            }
            other => Err(ToolCallError::UnknownTool(other.to_string())),
        }
    }
}

fn descriptor(name: &'static str, description: &'static str, schema: Value) -> Tool {
    let input_schema: Arc<serde_json::Map<String, Value>> = match schema {
        Value::Object(map) => Arc::new(map),
        _ => Arc::new(serde_json::Map::new()),
    };

    Tool {
        name: Cow::Borrowed(name),
        title: None,
        description: Some(Cow::Borrowed(description)),
        input_schema,
        output_schema: None,
        annotations: Some(ToolAnnotations::new().read_only(true)),
        execution: None,
        icons: None,
        meta: None,
    }
}

impl ServerHandler for PolicyMcp {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "policy-mcp".to_string(),
                title: Some("Policy MCP".to_string()),
                version: env!("CARGO_PKG_VERSION").to_string(),
                description: None,
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Policy document retrieval. Use search_policy_chunks to find relevant \
                 passages and get_policy_chunk to fetch one chunk by id."
                    .to_string(),
            ),
        }
    }

    fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: rmcp::service::RequestContext<rmcp::RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListToolsResult, McpError>> + Send + '_ {
        std::future::ready(Ok(ListToolsResult::with_all_items(Self::tools())))
    }

    fn get_tool(&self, name: &str) -> Option<Tool> {
        Self::tools().into_iter().find(|t| t.name == name)
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParams,
        _context: rmcp::service::RequestContext<rmcp::RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let arguments = request
            .arguments
            .map(Value::Object)
            .unwrap_or(Value::Object(serde_json::Map::new()));

        match self.execute(&request.name, arguments).await {
            Ok(result) => {
                let text = serde_json::to_string_pretty(&result).unwrap_or_default();
                Ok(CallToolResult::success(vec![Content::text(text)]))
            }
            Err(ToolCallError::UnknownTool(name)) => Err(McpError::new(
                ErrorCode::METHOD_NOT_FOUND,
                format!("no tool registered with name: {}", name),
                None,
            )),
            Err(ToolCallError::InvalidArguments(msg)) => Err(McpError::invalid_params(msg, None)),
            Err(e) => {
                tracing::warn!(tool = %request.name, error = %e, "tool call failed");
                Ok(CallToolResult::error(vec![Content::text(e.to_string())]))
            }
        }
    }
}

/// Serve MCP over stdin/stdout until the client disconnects.
pub async fn serve_stdio(repo: Arc<Repository>) -> anyhow::Result<()> {
    tracing::info!("serving MCP over stdio");
    let service = PolicyMcp::new(repo).serve(rmcp::transport::stdio()).await?;
    service.waiting().await?;
    Ok(())
}

/// Tower service speaking MCP streamable HTTP, ready to nest into a router.
pub fn streamable_http_service(
    repo: Arc<Repository>,
) -> StreamableHttpService<PolicyMcp, LocalSessionManager> {
    StreamableHttpService::new(
        move || Ok(PolicyMcp::new(repo.clone())),
        Arc::new(LocalSessionManager::default()),
        StreamableHttpServerConfig::default(),
    )
}
