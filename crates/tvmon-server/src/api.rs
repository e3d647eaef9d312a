pub mod control;
pub mod ingest;
pub mod monitors;
pub mod system;

use crate::logging::TraceId;
use crate::state::AppState;
use axum::extract::{Extension, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tvmon_common::types::EntityKind;
use tvmon_monitor::error::MonitorError;

/// Body of every tvmon response. `data` is omitted from errors and from
/// acknowledgements that carry nothing back.
#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub err_code: i32,
    pub err_msg: String,
    pub trace_id: String,
    pub data: Option<T>,
}

/// `err_code` values; success is 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    BadRequest = 1001,
    Unauthorized = 1002,
    NotFound = 1004,
    Conflict = 1005,
    Capacity = 1006,
    Validation = 1007,
    Internal = 1500,
    StartFailed = 1502,
    Sampler = 1503,
}

fn envelope<T: Serialize>(
    status: StatusCode,
    trace_id: &str,
    err_code: i32,
    msg: &str,
    data: Option<T>,
) -> Response {
    let body = ApiResponse {
        err_code,
        err_msg: msg.to_string(),
        trace_id: trace_id.to_string(),
        data,
    };
    (status, Json(body)).into_response()
}

pub fn success_response<T: Serialize>(status: StatusCode, trace_id: &str, data: T) -> Response {
    envelope(status, trace_id, 0, "success", Some(data))
}

/// Acknowledges an accepted command; `msg` says what happened.
pub fn success_empty_response(status: StatusCode, trace_id: &str, msg: &str) -> Response {
    envelope::<Value>(status, trace_id, 0, msg, None)
}

pub fn error_response(status: StatusCode, trace_id: &str, code: ErrorCode, msg: &str) -> Response {
    envelope::<Value>(status, trace_id, code as i32, msg, None)
}

/// Status and code for each registry failure.
pub fn monitor_error_status(err: &MonitorError) -> (StatusCode, ErrorCode) {
    match err {
        MonitorError::Validation(_) => (StatusCode::BAD_REQUEST, ErrorCode::Validation),
        MonitorError::NotFound(_) => (StatusCode::NOT_FOUND, ErrorCode::NotFound),
        MonitorError::Duplicate(_) => (StatusCode::CONFLICT, ErrorCode::Conflict),
        MonitorError::Capacity { .. } => (StatusCode::TOO_MANY_REQUESTS, ErrorCode::Capacity),
        MonitorError::Start { .. } => (StatusCode::BAD_GATEWAY, ErrorCode::StartFailed),
        MonitorError::Internal { .. } => (StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::Internal),
    }
}

pub fn monitor_error_response(trace_id: &str, err: &MonitorError) -> Response {
    let (status, code) = monitor_error_status(err);
    error_response(status, trace_id, code, &err.to_string())
}

/// Parses the `{kind}` path segment (`channel`, `tuner` or `dvb`).
pub(crate) fn parse_kind(trace_id: &str, kind: &str) -> Result<EntityKind, Response> {
    kind.parse::<EntityKind>().map_err(|e| {
        error_response(StatusCode::BAD_REQUEST, trace_id, ErrorCode::BadRequest, &e)
    })
}

/// Optional `?delay=<secs>` on scheduled operations.
#[derive(Debug, Default, Deserialize)]
pub struct DelayQuery {
    #[serde(default)]
    pub delay: u64,
}

impl DelayQuery {
    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.delay)
    }
}

#[derive(Serialize)]
struct HealthResponse {
    version: String,
    uptime_secs: i64,
    channel_monitors: usize,
    tuner_monitors: usize,
}

async fn health(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let uptime = (Utc::now() - state.start_time).num_seconds();
    success_response(
        StatusCode::OK,
        &trace_id,
        HealthResponse {
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_secs: uptime,
            channel_monitors: state.channels.len(),
            tuner_monitors: state.tuners.len(),
        },
    )
}

pub fn public_routes() -> Router<AppState> {
    Router::new().route("/api/health", get(health))
}

pub fn protected_routes() -> Router<AppState> {
    Router::new()
        .merge(monitors::routes())
        .merge(system::routes())
        .merge(control::routes())
        .merge(ingest::routes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use tvmon_monitor::params::ValidationError;

    #[test]
    fn every_monitor_error_has_a_distinct_status() {
        let errors = [
            MonitorError::Validation(ValidationError::InvalidName("a b".to_string())),
            MonitorError::NotFound("ch1".to_string()),
            MonitorError::Duplicate("ch1".to_string()),
            MonitorError::Capacity {
                kind: EntityKind::Tuner,
                limit: 20,
            },
            MonitorError::Start {
                name: "ch1".to_string(),
                reason: "no target".to_string(),
            },
            MonitorError::Internal {
                name: "ch1".to_string(),
                reason: "boom".to_string(),
            },
        ];
        let statuses: Vec<u16> = errors
            .iter()
            .map(|e| monitor_error_status(e).0.as_u16())
            .collect();
        assert_eq!(statuses, vec![400, 404, 409, 429, 502, 500]);
    }

    #[tokio::test]
    async fn error_envelope_carries_code_and_trace_id() {
        let resp = error_response(
            StatusCode::TOO_MANY_REQUESTS,
            "0123456789abcdef",
            ErrorCode::Capacity,
            "tuner monitor limit reached (20)",
        );
        assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["err_code"], 1006);
        assert_eq!(body["trace_id"], "0123456789abcdef");
        assert!(body["data"].is_null());
    }
}
