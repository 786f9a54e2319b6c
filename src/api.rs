//! REST API server for the query router
//!
//! Exposes the pipeline and the audit trail over HTTP

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use uuid::Uuid;

use crate::error::RouterError;
use crate::models::{QueryRequest, QueryStatus};
use crate::pipeline::QueryPipeline;
use crate::Result;

/// =============================
/// Request Models
/// =============================

#[derive(Debug, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub chat_id: Option<String>,
    pub user_id: Option<String>,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
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
    pub pipeline: Arc<QueryPipeline>,
}

type ApiResult = (StatusCode, Json<ApiResponse>);

fn error_status(e: &RouterError) -> StatusCode {
    match e {
        RouterError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// =============================
/// Health Endpoint
/// =============================

async fn health(State(state): State<ApiState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "tools": state.pipeline.registry().list(),
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// =============================
/// Query Endpoint
/// =============================

async fn run_query(state: &ApiState, request: QueryRequest) -> ApiResult {
    match state.pipeline.run(request).await {
        Ok(response) if response.status == QueryStatus::Rejected => {
            let message = response.answer.clone();
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(ApiResponse {
                    error: Some(message),
                    success: false,
                    ..ApiResponse::success(&response)
                }),
            )
        }
        Ok(response) => (StatusCode::OK, Json(ApiResponse::success(&response))),
        Err(e) => {
            let status = error_status(&e);
            if status.is_server_error() {
                error!(error = %e, "Query failed");
            }
            (status, Json(ApiResponse::error(e.to_string())))
        }
    }
}

async fn query_handler(State(state): State<ApiState>, Json(req): Json<QueryRequest>) -> ApiResult {
    info!("Received query request: {}", req.query);
    run_query(&state, req).await
}

/// =============================
/// Chat Endpoint
/// =============================

async fn chat_handler(State(state): State<ApiState>, Json(req): Json<ChatRequest>) -> ApiResult {
    // Only the latest user turn is routed; earlier turns are context for the client
    let Some(user_msg) = req.messages.iter().rev().find(|m| m.role == "user") else {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error("No user message found".into())),
        );
    };

    let user_id = req
        .user_id
        .clone()
        .or_else(|| req.chat_id.as_ref().map(|chat| format!("chat_{}", chat)));

    let request = QueryRequest {
        query: user_msg.content.clone(),
        user_id,
    };
    info!(chat_id = ?req.chat_id, "Received chat turn");

    let (status, Json(mut response)) = run_query(&state, request).await;
    if let (Some(data), Some(chat_id)) = (response.data.as_mut(), req.chat_id.as_ref()) {
        data["chat_id"] = serde_json::json!(chat_id);
    }
    (status, Json(response))
}

/// =============================
/// Audit Endpoints
/// =============================

async fn get_query_record(State(state): State<ApiState>, Path(id): Path<String>) -> ApiResult {
    let Ok(request_id) = Uuid::parse_str(&id) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error(format!("Invalid request id: {}", id))),
        );
    };

    let audit_log = state.pipeline.audit_log();
    match audit_log.get(request_id).await {
        Ok(Some(record)) => {
            let verified = audit_log.verify_integrity(request_id).await.unwrap_or(false);
            (
                StatusCode::OK,
                Json(ApiResponse::success(serde_json::json!({
                    "record": record,
                    "integrity_verified": verified,
                }))),
            )
        }
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::error(format!("No query with id {}", request_id))),
        ),
        Err(e) => (error_status(&e), Json(ApiResponse::error(e.to_string()))),
    }
}

async fn list_user_queries(State(state): State<ApiState>, Path(user_id): Path<String>) -> ApiResult {
    match state.pipeline.audit_log().list_for_user(&user_id).await {
        Ok(ids) => (
            StatusCode::OK,
            Json(ApiResponse::success(serde_json::json!({
                "user_id": user_id,
                "request_ids": ids,
            }))),
        ),
        Err(e) => (error_status(&e), Json(ApiResponse::error(e.to_string()))),
    }
}

/// =============================
/// Router
/// =============================

pub fn create_router(pipeline: Arc<QueryPipeline>) -> Router {
    let state = ApiState { pipeline };

    Router::new()
        .route("/health", get(health))
        .route("/api/query", post(query_handler))
        .route("/api/chat", post(chat_handler))
        .route("/api/queries/:id", get(get_query_record))
        .route("/api/users/:user_id/queries", get(list_user_queries))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(pipeline: Arc<QueryPipeline>, port: u16) -> Result<()> {
    let router = create_router(pipeline);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API Server listening on http://0.0.0.0:{}", port);
    info!("Local: http://127.0.0.1:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}
