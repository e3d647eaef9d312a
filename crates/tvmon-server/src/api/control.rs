use crate::api::{error_response, success_empty_response, DelayQuery, ErrorCode};
use crate::logging::TraceId;
use crate::state::AppState;
use axum::extract::{Extension, Query, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::routing::post;
use axum::Router;
use std::sync::Arc;
use tvmon_common::host::HostEngine;

/// Reloads immediately when no delay is given so the caller sees the
/// outcome; a delayed reload only logs failures.
async fn reload(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Query(delay): Query<DelayQuery>,
) -> Response {
    if delay.delay == 0 {
        return match state.host.reload_config() {
            Ok(()) => success_empty_response(StatusCode::OK, &trace_id, "reloaded"),
            Err(e) => {
                tracing::warn!(trace_id = %trace_id.0, error = %e, "Configuration reload failed");
                error_response(
                    StatusCode::BAD_REQUEST,
                    &trace_id,
                    ErrorCode::BadRequest,
                    &format!("reload failed: {e:#}"),
                )
            }
        };
    }
    let host = Arc::clone(&state.host);
    state
        .host
        .schedule_once(delay.duration(), Box::new(move || host.reload()));
    success_empty_response(StatusCode::ACCEPTED, &trace_id, "reload scheduled")
}

async fn exit(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Query(delay): Query<DelayQuery>,
) -> Response {
    let host = Arc::clone(&state.host);
    if delay.delay == 0 {
        host.exit();
    } else {
        state
            .host
            .schedule_once(delay.duration(), Box::new(move || host.exit()));
    }
    success_empty_response(StatusCode::ACCEPTED, &trace_id, "exit scheduled")
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/control/reload", post(reload))
        .route("/api/control/exit", post(exit))
}
