//! REST API server for the game query orchestrator
//!
//! Exposes the orchestrator over HTTP, either as one JSON response or as a
//! server-sent event stream of progress steps.

use async_stream::stream;
use axum::{
    extract::State,
    http::StatusCode,
    response::sse::{Event as SseEvent, KeepAlive, Sse},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::agent::Orchestrator;
use crate::models::QueryEvent;

/// =============================
/// Request Models
/// =============================

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct QueryRequest {
    pub query: String,
}

/// =============================
/// Response Wrapper
/// =============================

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
    pub timestamp: String,
}

impl ApiResponse {
    pub fn success<T: Serialize>(data: T) -> Self {
        Self {
            success: true,
            data: serde_json::to_value(data).ok(),
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct ApiState {
    pub orchestrator: Arc<Orchestrator>,
}

fn empty_query() -> (StatusCode, Json<ApiResponse>) {
    (
        StatusCode::BAD_REQUEST,
        Json(ApiResponse::error("query must not be empty".into())),
    )
}

/// =============================
/// Health Endpoint
/// =============================

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// =============================
/// Query Endpoint
/// =============================

async fn run_query(
    State(state): State<ApiState>,
    Json(req): Json<QueryRequest>,
) -> (StatusCode, Json<ApiResponse>) {
    let query = req.query.trim();
    if query.is_empty() {
        return empty_query();
    }

    info!(query = %query, "Received query request");

    let response = state.orchestrator.run_query(query).await;

    // Terminal query failures are still a well-formed answer for the client.
    (StatusCode::OK, Json(ApiResponse::success(response)))
}

/// =============================
/// Streaming Endpoint
/// =============================

async fn stream_query(
    State(state): State<ApiState>,
    Json(req): Json<QueryRequest>,
) -> Result<
    Sse<impl futures_util::Stream<Item = Result<SseEvent, Infallible>>>,
    (StatusCode, Json<ApiResponse>),
> {
    let query = req.query.trim().to_string();
    if query.is_empty() {
        return Err(empty_query());
    }

    info!(query = %query, "Received streaming query request");

    let (tx, mut rx) = mpsc::unbounded_channel::<QueryEvent>();
    let orchestrator = state.orchestrator.clone();
    tokio::spawn(async move {
        orchestrator.run_query_streaming(&query, &tx).await;
    });

    let event_stream = stream! {
        while let Some(event) = rx.recv().await {
            let name = match &event {
                QueryEvent::Step(_) => "step",
                QueryEvent::Answer { .. } => "answer",
                QueryEvent::Error { .. } => "error",
            };
            let payload = serde_json::to_string(&event)
                .unwrap_or_else(|_| "{}".to_string());
            yield Ok(SseEvent::default().event(name).data(payload));
        }
    };

    Ok(Sse::new(event_stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(10))
            .text("keepalive"),
    ))
}

/// =============================
/// Router
/// =============================

pub fn create_router(orchestrator: Arc<Orchestrator>) -> Router {
    let state = ApiState { orchestrator };

    Router::new()
        .route("/health", get(health))
        .route("/api/query", post(run_query))
        .route("/api/query/stream", post(stream_query))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(
    orchestrator: Arc<Orchestrator>,
    port: u16,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let router = create_router(orchestrator);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API Server listening on http://0.0.0.0:{}", port);
    info!("Local: http://127.0.0.1:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}
