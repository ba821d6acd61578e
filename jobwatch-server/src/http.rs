//! Jobwatch HTTP REST API
//!
//! Axum server exposing the job catalog and manual ingestion over HTTP.
//! Runs alongside the Unix socket IPC server on port 5000 (configurable).
//!
//! Each endpoint has a thin axum handler that delegates to an inner function
//! returning `(StatusCode, Value)`, so the logic is testable without routing.
//!
//! Endpoints:
//! - GET  /health: store status and stored job count
//! - GET  /version: server version info
//! - GET  /api/jobs: filtered job list (JSON array, newest first)
//! - GET  /api/search-terms: default search terms (JSON array)
//! - POST /api/update-jobs: manual ingestion; 202 unless `wait` is set

use std::sync::Arc;

use anyhow::Result;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use jobwatch_core::ipc::{JobwatchRequest, JobwatchResponse};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use crate::state::AppState;
use crate::subsystems::catalog::{self, ListJobsQuery};

/// Build the Axum router with all endpoints
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/version", get(version_handler))
        .route("/api/jobs", get(jobs_handler))
        .route("/api/search-terms", get(search_terms_handler))
        .route("/api/update-jobs", post(update_jobs_handler))
        .with_state(state)
}

/// Start the HTTP server on the configured address.
/// Gracefully shuts down when the broadcast shutdown signal fires.
pub async fn start_http_server(
    state: Arc<AppState>,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<()> {
    let addr = format!("{}:{}", state.config.http.host, state.config.http.port);

    let app = build_router(state);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Jobwatch HTTP API listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
            tracing::info!("HTTP server shutting down...");
        })
        .await?;

    Ok(())
}

// ============================================================================
// Request / Response DTOs
// ============================================================================

/// Body of `POST /api/update-jobs`. Missing fields take the service defaults.
#[derive(Debug, Deserialize, Default)]
pub struct UpdateJobsRequest {
    pub search_terms: Option<Vec<String>>,
    pub min_salary: Option<u32>,
    pub remote_only: Option<bool>,
    pub fulltime_only: Option<bool>,
    pub days_ago: Option<u32>,
    #[serde(default)]
    pub wait: bool,
}

/// Standard HTTP error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub status: String,
}

impl ErrorResponse {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            error: msg.into(),
            status: "error".to_string(),
        }
    }

    fn into_value(self) -> serde_json::Value {
        serde_json::json!({ "error": self.error, "status": self.status })
    }
}

// ============================================================================
// Inner (directly testable) business logic functions
// ============================================================================

/// Inner health check: counts stored jobs and returns (status_code, json_body).
pub async fn health_inner(state: &AppState) -> (StatusCode, serde_json::Value) {
    match state.store.count().await {
        Ok(count) => (
            StatusCode::OK,
            serde_json::json!({
                "status": "healthy",
                "version": env!("CARGO_PKG_VERSION"),
                "store": state.store.name(),
                "jobs": count,
                "ingestion_running": state.ingestion.is_running(),
                "socket": state.config.service.socket_path,
            }),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            serde_json::json!({
                "status": "unhealthy",
                "store": state.store.name(),
                "error": e.to_string(),
            }),
        ),
    }
}

/// Inner version: returns version info (pure, no IO).
pub fn version_inner() -> serde_json::Value {
    serde_json::json!({
        "version": env!("CARGO_PKG_VERSION"),
        "protocol": "jobwatch/1",
    })
}

/// Inner jobs listing, a bare JSON array of records.
pub async fn jobs_inner(state: &AppState, query: ListJobsQuery) -> (StatusCode, serde_json::Value) {
    match catalog::list_jobs(state.store.as_ref(), &query).await {
        Ok(jobs) => match serde_json::to_value(jobs) {
            Ok(body) => (StatusCode::OK, body),
            Err(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse::new(e.to_string()).into_value(),
            ),
        },
        Err(e) => {
            tracing::error!(error = %e, "Job listing failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse::new(e.to_string()).into_value(),
            )
        }
    }
}

pub fn search_terms_inner(state: &AppState) -> serde_json::Value {
    serde_json::json!(catalog::list_default_search_terms(&state.config.ingestion))
}

/// Inner update: routes a TriggerIngestion request through the IPC router.
pub async fn update_jobs_inner(
    state: &AppState,
    req: UpdateJobsRequest,
) -> (StatusCode, serde_json::Value) {
    let wait = req.wait;
    let ipc_request = JobwatchRequest::TriggerIngestion {
        search_terms: req.search_terms,
        min_salary: req.min_salary,
        remote_only: req.remote_only,
        fulltime_only: req.fulltime_only,
        days_ago: req.days_ago,
        wait,
    };

    let response = crate::router::handle_request(ipc_request, state).await;

    match response_to_http(response) {
        Ok(data) if wait => (StatusCode::OK, data),
        Ok(data) => (StatusCode::ACCEPTED, data),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorResponse::new(e).into_value(),
        ),
    }
}

// ============================================================================
// Axum handler wrappers (thin, delegate to inner functions)
// ============================================================================

pub async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let (status, body) = health_inner(&state).await;
    (status, Json(body))
}

pub async fn version_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(version_inner()))
}

pub async fn jobs_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListJobsQuery>,
) -> impl IntoResponse {
    let (status, body) = jobs_inner(&state, query).await;
    (status, Json(body))
}

pub async fn search_terms_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (StatusCode::OK, Json(search_terms_inner(&state)))
}

pub async fn update_jobs_handler(
    State(state): State<Arc<AppState>>,
    body: Option<Json<UpdateJobsRequest>>,
) -> impl IntoResponse {
    let req = body.map(|Json(req)| req).unwrap_or_default();
    let (status, body) = update_jobs_inner(&state, req).await;
    (status, Json(body))
}

// ============================================================================
// Helpers
// ============================================================================

/// Convert an IPC `JobwatchResponse` into an HTTP body value, or an error string.
pub fn response_to_http(response: JobwatchResponse) -> std::result::Result<serde_json::Value, String> {
    if response.is_ok() {
        Ok(response.data.unwrap_or(serde_json::json!({})))
    } else {
        Err(response.error.unwrap_or_else(|| "unknown error".to_string()))
    }
}
