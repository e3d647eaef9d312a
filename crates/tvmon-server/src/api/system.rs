use crate::api::{error_response, success_response, ErrorCode};
use crate::logging::TraceId;
use crate::state::AppState;
use axum::extract::{Extension, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use tvmon_collector::CollectorError;

/// Upper bound accepted for the sampler cache interval.
const MAX_CACHE_SECS: u64 = 3600;

#[derive(Deserialize)]
struct IntervalRequest {
    secs: u64,
}

fn sampler_error(trace_id: &str, e: &CollectorError) -> Response {
    tracing::error!(trace_id = %trace_id, error = %e, "Resource sampling failed");
    error_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        trace_id,
        ErrorCode::Sampler,
        &e.to_string(),
    )
}

async fn system_resources(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
) -> Response {
    let result = state.sampler().collect_system();
    match result {
        Ok(snapshot) => success_response(StatusCode::OK, &trace_id, snapshot),
        Err(e) => sampler_error(&trace_id, &e),
    }
}

async fn process_resources(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
) -> Response {
    let result = state.sampler().collect_process();
    match result {
        Ok(snapshot) => success_response(StatusCode::OK, &trace_id, snapshot),
        Err(e) => sampler_error(&trace_id, &e),
    }
}

async fn sampler_stats(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
) -> Response {
    let stats = state.sampler().get_stats();
    success_response(StatusCode::OK, &trace_id, stats)
}

async fn clear_sampler_cache(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
) -> Response {
    let stats = {
        let mut sampler = state.sampler();
        sampler.clear_cache();
        sampler.get_stats()
    };
    success_response(StatusCode::OK, &trace_id, stats)
}

async fn set_sampler_interval(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Json(req): Json<IntervalRequest>,
) -> Response {
    if req.secs > MAX_CACHE_SECS {
        return error_response(
            StatusCode::BAD_REQUEST,
            &trace_id,
            ErrorCode::BadRequest,
            &format!("secs must be between 0 and {MAX_CACHE_SECS}"),
        );
    }
    let stats = {
        let mut sampler = state.sampler();
        sampler.set_cache_interval(req.secs);
        sampler.get_stats()
    };
    success_response(StatusCode::OK, &trace_id, stats)
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/system", get(system_resources))
        .route("/api/process", get(process_resources))
        .route("/api/sampler/stats", get(sampler_stats))
        .route("/api/sampler/clear", post(clear_sampler_cache))
        .route("/api/sampler/interval", put(set_sampler_interval))
}
