use crate::api::{error_response, parse_kind, success_empty_response, ErrorCode};
use crate::logging::TraceId;
use crate::state::AppState;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::routing::post;
use axum::{Json, Router};
use tvmon_common::types::Sample;

/// Entry point for the external analyzer: one sample per request, routed
/// to the monitor whose input carries `name`.
async fn ingest_sample(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path((kind, name)): Path<(String, String)>,
    Json(sample): Json<Sample>,
) -> Response {
    let kind = match parse_kind(&trace_id, &kind) {
        Ok(kind) => kind,
        Err(resp) => return resp,
    };
    match state.host.ingest(kind, &name, sample) {
        Ok(()) => success_empty_response(StatusCode::ACCEPTED, &trace_id, "accepted"),
        Err(e) => error_response(
            StatusCode::NOT_FOUND,
            &trace_id,
            ErrorCode::NotFound,
            &e.to_string(),
        ),
    }
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/api/ingest/{kind}/{name}", post(ingest_sample))
}
