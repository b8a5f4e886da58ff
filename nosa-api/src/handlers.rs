//! REST handlers.
use std::net::IpAddr;

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use nosa_core::engine::{CaptureStatus, Engine};
use nosa_core::query::{PacketFilter, QueryResult};
use nosa_core::TransitionError;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::AppState;

/// Query string of `GET /api/packets`.
#[derive(Debug, Default, Deserialize)]
pub struct PacketQuery {
    pub protocol: Option<String>,
    pub source_ip: Option<String>,
    pub destination_ip: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    fn new(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            message: message.into(),
        })
    }
}

/// GET /
pub async fn root() -> Json<Value> {
    Json(json!({
        "message": "nosa packet capture API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "packets": "/api/packets",
            "capture_status": "/api/capture/status",
            "metrics": "/metrics",
            "websocket": "/ws/packets"
        }
    }))
}

/// GET /api/packets
pub async fn packets(
    State(state): State<AppState>,
    query: Result<Query<PacketQuery>, QueryRejection>,
) -> Result<Json<QueryResult>, ApiError> {
    let Query(params) = query.map_err(|e| ApiError::bad_request(e.body_text()))?;

    let limit = match params.limit {
        None => state.limits.default_limit,
        Some(limit) if (1..=state.limits.max_limit).contains(&limit) => limit,
        Some(limit) => {
            return Err(ApiError::bad_request(format!(
                "limit must be between 1 and {}, got {}",
                state.limits.max_limit, limit
            )))
        }
    };

    let filter = PacketFilter {
        protocol: non_empty(params.protocol),
        source_ip: parse_ip("source_ip", params.source_ip)?,
        destination_ip: parse_ip("destination_ip", params.destination_ip)?,
    };

    Ok(Json(state.engine.query(&filter, Some(limit))))
}

/// DELETE /api/packets
pub async fn clear_packets(State(state): State<AppState>) -> Json<MessageResponse> {
    let dropped = state.engine.clear();
    MessageResponse::new(format!("Cleared {dropped} packets"))
}

/// GET /api/capture/status
pub async fn status(State(state): State<AppState>) -> Result<Json<CaptureStatus>, ApiError> {
    let status = blocking(&state, |engine| Ok(engine.status())).await?;
    Ok(Json(status))
}

/// POST /api/capture/start
pub async fn start(State(state): State<AppState>) -> Result<Json<MessageResponse>, ApiError> {
    blocking(&state, Engine::start).await?;
    Ok(MessageResponse::new("Packet capture started successfully"))
}

/// POST /api/capture/stop
pub async fn stop(State(state): State<AppState>) -> Result<Json<MessageResponse>, ApiError> {
    blocking(&state, Engine::stop).await?;
    Ok(MessageResponse::new("Packet capture stopped successfully"))
}

/// POST /api/capture/pause
pub async fn pause(State(state): State<AppState>) -> Result<Json<MessageResponse>, ApiError> {
    blocking(&state, Engine::pause).await?;
    Ok(MessageResponse::new("Packet capture paused successfully"))
}

/// POST /api/capture/resume
pub async fn resume(State(state): State<AppState>) -> Result<Json<MessageResponse>, ApiError> {
    blocking(&state, Engine::resume).await?;
    Ok(MessageResponse::new("Packet capture resumed successfully"))
}

/// GET /metrics
pub async fn metrics(State(state): State<AppState>) -> Result<Response, ApiError> {
    let text = state
        .engine
        .metrics()
        .gather_metrics()
        .map_err(|e| ApiError::internal(format!("Failed to render metrics: {e}")))?;

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        text,
    )
        .into_response())
}

/// Runs a controller call off the async workers; stop and pause may wait
/// for the capture thread to exit.
pub(crate) async fn blocking<T, F>(state: &AppState, f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&Engine) -> Result<T, TransitionError> + Send + 'static,
{
    let engine = state.engine.clone();
    tokio::task::spawn_blocking(move || f(engine.as_ref()))
        .await
        .map_err(|e| ApiError::internal(format!("Controller task failed: {e}")))?
        .map_err(ApiError::from)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_ip(field: &str, value: Option<String>) -> Result<Option<IpAddr>, ApiError> {
    match non_empty(value) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ApiError::bad_request(format!("Invalid {field}: '{raw}'"))),
    }
}
