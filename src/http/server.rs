//! HTTP API server for athena-relay.
//!
//! Exposes query submission and table previews over plain GET endpoints.
//! Handlers only translate between HTTP and [`QueryLifecycle`]; every error
//! that reaches them is returned to the client as a JSON payload.

use crate::{
    error::{RelayError, Result},
    query::{table_preview_sql, PollPolicy, QueryLifecycle},
    service::{ExecutionHandle, ExecutionState, QueryRequest},
};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Query string of `GET /executeQuery`.
#[derive(Debug, Deserialize)]
pub struct ExecuteQueryParams {
    #[serde(default)]
    pub query: Option<String>,
}

/// Response after submitting a query
#[derive(Debug, Serialize, Deserialize)]
pub struct ExecuteQueryResponse {
    pub execution_id: ExecutionHandle,
}

/// Query string of `GET /loadTable`.
#[derive(Debug, Deserialize)]
pub struct LoadTableParams {
    #[serde(rename = "tableName", default)]
    pub table_name: Option<String>,
}

/// Rows of a table preview
#[derive(Debug, Serialize, Deserialize)]
pub struct TableResponse {
    pub rows: Vec<Vec<String>>,
    pub row_count: usize,
}

/// Error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<ExecutionState>,
}

/// Shared application state
pub struct AppState {
    pub lifecycle: QueryLifecycle,
    pub database: String,
    pub output_location: String,
    pub policy: PollPolicy,
    /// Fires on shutdown; in-flight waits observe a child token.
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(
        lifecycle: QueryLifecycle,
        database: impl Into<String>,
        output_location: impl Into<String>,
        policy: PollPolicy,
    ) -> Self {
        Self {
            lifecycle,
            database: database.into(),
            output_location: output_location.into(),
            policy,
            shutdown: CancellationToken::new(),
        }
    }

    /// Uses `shutdown` instead of a private token.
    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }

    fn request_for(&self, sql: impl Into<String>) -> QueryRequest {
        QueryRequest::new(sql, self.database.clone(), self.output_location.clone())
    }
}

/// Error returned by handlers.
#[derive(Debug)]
pub struct ApiError(RelayError);

impl ApiError {
    fn status(&self) -> StatusCode {
        match &self.0 {
            RelayError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            RelayError::Submission(_)
            | RelayError::Poll(_)
            | RelayError::Fetch(_)
            | RelayError::QueryExecution { .. } => StatusCode::BAD_GATEWAY,
            RelayError::PollTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            RelayError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
            RelayError::Config(_) | RelayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<RelayError> for ApiError {
    fn from(err: RelayError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!("{}: {}", self.0.category(), self.0);
        }

        let body = Json(ErrorResponse {
            error: self.0.to_string(),
            category: self.0.category().to_string(),
            state: self.0.terminal_state(),
        });
        (status, body).into_response()
    }
}

/// Create the HTTP router with all routes
pub fn create_server(state: AppState) -> Router {
    Router::new()
        .route("/executeQuery", get(execute_query))
        .route("/loadTable", get(load_table))
        .route("/receive", get(receive))
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

/// GET /receive - Liveness probe
async fn receive() -> &'static str {
    "Hello World!"
}

/// GET /executeQuery - Submit a query and return its execution id without waiting
async fn execute_query(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ExecuteQueryParams>,
) -> std::result::Result<Json<ExecuteQueryResponse>, ApiError> {
    let query = params
        .query
        .filter(|query| !query.trim().is_empty())
        .ok_or_else(|| RelayError::invalid_request("Query parameter 'query' must not be empty"))?;

    let handle = state.lifecycle.submit(&state.request_for(query)).await?;
    info!("Submitted execution {}", handle);

    Ok(Json(ExecuteQueryResponse {
        execution_id: handle,
    }))
}

/// GET /loadTable - Preview the first rows of a table
async fn load_table(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LoadTableParams>,
) -> std::result::Result<Json<TableResponse>, ApiError> {
    let table_name = params
        .table_name
        .ok_or_else(|| RelayError::invalid_request("Query parameter 'tableName' is required"))?;
    let sql = table_preview_sql(&table_name)?;
    let cancel = state.shutdown.child_token();

    let results = state
        .lifecycle
        .run_query_with_cancel(&state.request_for(sql), &state.policy, &cancel)
        .await?;

    let row_count = results.row_count();
    info!("Loaded {} rows from {}", row_count, table_name.trim());

    Ok(Json(TableResponse {
        rows: results.into_rows(),
        row_count,
    }))
}

/// Serve on an already bound listener until the shutdown token fires.
pub async fn serve(listener: TcpListener, state: AppState) -> Result<()> {
    let shutdown = state.shutdown.clone();
    let app = create_server(state);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| RelayError::internal(format!("HTTP server failed: {e}")))
}

/// Bind `addr` and serve until the shutdown token fires.
pub async fn start_server(addr: &str, state: AppState) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| RelayError::config(format!("Cannot listen on {addr}: {e}")))?;

    info!("athena-relay listening on http://{}", addr);
    info!("  GET /executeQuery?query=<sql>      - Submit a query");
    info!("  GET /loadTable?tableName=<table>   - Preview a table");
    info!("  GET /receive                       - Liveness probe");

    serve(listener, state).await
}
