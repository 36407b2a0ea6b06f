//! HTTP server: debug REST surface plus the MCP streamable-HTTP endpoint.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version) |
//! | `GET`  | `/debug/search` | `search_policy_chunks` as plain JSON |
//! | `GET`  | `/debug/chunk/{id}` | `get_policy_chunk` as plain JSON |
//! | `*`    | `MCP_PATH` (default `/mcp`) | MCP streamable HTTP |
//!
//! The debug endpoints return the same `{items}` / `{item}` shapes as the
//! MCP tools, without the protocol envelope.
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "upstream_error", "message": "vector backend error: HTTP 503: ..." } }
//! ```
//!
//! | Code | Status |
//! |------|--------|
//! | `bad_request` | 400 |
//! | `incompatible_backend` | 500 |
//! | `upstream_error` | 502 |
//! | `config_error` | 500 |

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::config::ServerConfig;
use crate::error::RetrievalError;
use crate::mcp::streamable_http_service;
use crate::models::{GetResponse, SearchRequest, SearchResponse};
use crate::repository::Repository;

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
struct AppState {
    repo: Arc<Repository>,
}

/// Health and debug routes only, without MCP.
pub fn debug_router(repo: Arc<Repository>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/debug/search", get(handle_search))
        .route("/debug/chunk/{chunk_id}", get(handle_chunk))
        .layer(cors)
        .with_state(AppState { repo })
}

/// Full application: debug routes plus MCP mounted at `mcp_path`.
pub fn app(repo: Arc<Repository>, mcp_path: &str) -> Router {
    debug_router(repo.clone()).nest_service(mcp_path, streamable_http_service(repo))
}

/// Bind to `host:port` and serve until the process is terminated.
pub async fn run_server(config: &ServerConfig, repo: Arc<Repository>) -> anyhow::Result<()> {
    let bind_addr = config.bind_addr();
    let app = app(repo, &config.mcp_path);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(
        addr = %listener.local_addr()?,
        mcp_path = %config.mcp_path,
        "HTTP server listening"
    );
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<RetrievalError> for AppError {
    fn from(err: RetrievalError) -> Self {
        let status = match &err {
            RetrievalError::EmptyQuery => StatusCode::BAD_REQUEST,
            RetrievalError::Embedding(_) | RetrievalError::Backend(_) => StatusCode::BAD_GATEWAY,
            RetrievalError::Incompatible
            | RetrievalError::MissingConfig(_)
            | RetrievalError::InvalidConfig(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(error = %err, "debug request failed");
        }
        AppError {
            status,
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ GET /debug/search ============

async fn handle_search(
    State(state): State<AppState>,
    Query(request): Query<SearchRequest>,
) -> Result<Json<SearchResponse>, AppError> {
    let response = state.repo.search(&request).await?;
    Ok(Json(response))
}

// ============ GET /debug/chunk/{chunk_id} ============

async fn handle_chunk(
    State(state): State<AppState>,
    Path(chunk_id): Path<String>,
) -> Result<Json<GetResponse>, AppError> {
    let item = state.repo.get_by_key(&chunk_id).await?;
    Ok(Json(GetResponse { item }))
}
