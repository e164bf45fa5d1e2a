//! HTTP Endpoints
//!
//! REST API for the sales assistant.

use std::time::Duration;

use axum::{
    extract::{rejection::JsonRejection, Json, State},
    http::{HeaderMap, HeaderValue, Method, StatusCode},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::chat::ChatTurn;
use crate::metrics::metrics_handler;
use crate::state::AppState;
use crate::{ServerError, MISSING_MESSAGE};

const DEFAULT_ORIGIN: &str = "http://localhost:3000";

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let cors_layer = build_cors_layer(
        &state.config.server.cors_origins,
        state.config.server.cors_enabled,
    );
    let timeout = Duration::from_secs(state.config.server.timeout_seconds);

    Router::new()
        .route("/api/chat", get(chat_status).post(chat))
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/metrics", get(metrics_handler))
        .layer(TimeoutLayer::new(timeout))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .with_state(state)
}

/// Build CORS layer from configured origins
///
/// - If cors_enabled is false, returns permissive layer (for dev)
/// - If no configured origin parses, only localhost:3000 is allowed
fn build_cors_layer(origins: &[String], enabled: bool) -> CorsLayer {
    if !enabled {
        tracing::warn!("CORS is disabled - allowing all origins (NOT FOR PRODUCTION)");
        return CorsLayer::permissive();
    }

    let mut parsed_origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| {
            origin.parse::<HeaderValue>().ok().or_else(|| {
                tracing::warn!("Invalid CORS origin: {}", origin);
                None
            })
        })
        .collect();

    if parsed_origins.is_empty() {
        tracing::info!("No usable CORS origins configured, defaulting to {}", DEFAULT_ORIGIN);
        parsed_origins.push(HeaderValue::from_static(DEFAULT_ORIGIN));
    }

    tracing::info!("CORS configured with {} origins", parsed_origins.len());
    CorsLayer::new()
        .allow_origin(parsed_origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
}

/// Chat request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChatRequest {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    user_ip: Option<String>,
    #[serde(default)]
    conversation_id: Option<String>,
}

/// Chat response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ChatResponse {
    response: String,
    conversation_id: String,
    success: bool,
}

/// `POST /api/chat`
async fn chat(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ServerError> {
    let Json(request) = payload.map_err(|rejection| {
        tracing::debug!(error = %rejection, "Rejected chat body");
        ServerError::InvalidRequest(MISSING_MESSAGE.to_string())
    })?;

    let user_ip = request
        .user_ip
        .filter(|ip| !ip.trim().is_empty())
        .or_else(|| forwarded_for(&headers));

    let reply = state
        .chat
        .handle(ChatTurn {
            message: request.message.unwrap_or_default(),
            user_ip,
            conversation_id: request.conversation_id,
        })
        .await?;

    Ok(Json(ChatResponse {
        response: reply.response,
        conversation_id: reply.conversation_id,
        success: true,
    }))
}

/// First address of `X-Forwarded-For`, if any
fn forwarded_for(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|ip| ip.trim().to_string())
        .filter(|ip| !ip.is_empty())
}

/// `GET /api/chat`
async fn chat_status() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "message": "API funcionando!" }))
}

async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    let executions = state.chat.graph().logger().len();

    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "checks": {
            "conversation_store": if state.persistent { "scylla" } else { "memory" },
            "knowledge_search": if state.vector_search { "qdrant" } else { "memory" },
            "recorded_node_executions": executions,
        }
    }))
}

/// Readiness check with LLM endpoint connectivity
async fn readiness_check(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    let llm_url = format!("{}/models", state.config.llm.endpoint.trim_end_matches('/'));

    // Any HTTP answer (even 401) means the endpoint is reachable
    let (ready, llm_status) =
        match tokio::time::timeout(Duration::from_secs(2), reqwest::get(&llm_url)).await {
            Ok(Ok(_)) => (true, "ok"),
            Ok(Err(_)) => (false, "unreachable"),
            Err(_) => (false, "timeout"),
        };

    let status_code = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status_code,
        Json(serde_json::json!({
            "status": if ready { "ready" } else { "not_ready" },
            "checks": {
                "llm_backend": { "status": llm_status, "url": llm_url }
            }
        })),
    )
}
