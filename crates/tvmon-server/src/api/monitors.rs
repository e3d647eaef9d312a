use crate::api::{
    monitor_error_response, parse_kind, success_empty_response, success_response, DelayQuery,
};
use crate::logging::TraceId;
use crate::state::AppState;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tvmon_common::types::EntityKind;
use tvmon_monitor::error::MonitorError;
use tvmon_monitor::monitor::MonitorView;
use tvmon_monitor::params::MonitorConfig;

#[derive(Serialize)]
struct MonitorList {
    kind: EntityKind,
    count: usize,
    limit: usize,
    monitors: Vec<MonitorView>,
}

#[derive(Serialize)]
struct MonitorDetail {
    #[serde(flatten)]
    view: MonitorView,
    /// Last payload pushed to collectors, `null` before the first emission.
    snapshot: Value,
}

/// `{"name": "...", <tunable>: <value>, ...}`; omitted tunables take their
/// defaults.
#[derive(Deserialize)]
struct CreateMonitorRequest {
    name: String,
    #[serde(flatten)]
    params: Map<String, Value>,
}

async fn list_monitors(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(kind): Path<String>,
) -> Response {
    let kind = match parse_kind(&trace_id, &kind) {
        Ok(kind) => kind,
        Err(resp) => return resp,
    };
    let registry = state.registry(kind);
    let monitors = registry.get_all();
    success_response(
        StatusCode::OK,
        &trace_id,
        MonitorList {
            kind,
            count: monitors.len(),
            limit: registry.limit(),
            monitors,
        },
    )
}

async fn get_monitor(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path((kind, name)): Path<(String, String)>,
) -> Response {
    let kind = match parse_kind(&trace_id, &kind) {
        Ok(kind) => kind,
        Err(resp) => return resp,
    };
    let registry = state.registry(kind);
    let cached = match registry.cached_payload(&name) {
        Ok(cached) => cached,
        Err(e) => return monitor_error_response(&trace_id, &e),
    };
    // The monitor may have been removed between the two lookups.
    let Some(view) = registry.get(&name) else {
        return monitor_error_response(&trace_id, &MonitorError::NotFound(name));
    };
    let snapshot = cached
        .map(|payload| serde_json::from_str(&payload).unwrap_or(Value::String(payload)))
        .unwrap_or(Value::Null);
    success_response(StatusCode::OK, &trace_id, MonitorDetail { view, snapshot })
}

async fn get_psi(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path((kind, name)): Path<(String, String)>,
) -> Response {
    let kind = match parse_kind(&trace_id, &kind) {
        Ok(kind) => kind,
        Err(resp) => return resp,
    };
    match state.registry(kind).psi(&name) {
        Ok(psi) => success_response(StatusCode::OK, &trace_id, psi),
        Err(e) => monitor_error_response(&trace_id, &e),
    }
}

async fn create_monitor(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(kind): Path<String>,
    Json(req): Json<CreateMonitorRequest>,
) -> Response {
    let kind = match parse_kind(&trace_id, &kind) {
        Ok(kind) => kind,
        Err(resp) => return resp,
    };
    let config = match MonitorConfig::from_params(kind, &req.name, &req.params) {
        Ok(config) => config,
        Err(e) => return monitor_error_response(&trace_id, &MonitorError::from(e)),
    };
    let registry = state.registry(kind);
    if let Err(e) = registry.create_and_register(config, None) {
        return monitor_error_response(&trace_id, &e);
    }
    match registry.get(&req.name) {
        Some(view) => success_response(StatusCode::CREATED, &trace_id, view),
        None => success_empty_response(StatusCode::CREATED, &trace_id, "created"),
    }
}

async fn update_monitor(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path((kind, name)): Path<(String, String)>,
    Json(params): Json<Map<String, Value>>,
) -> Response {
    let kind = match parse_kind(&trace_id, &kind) {
        Ok(kind) => kind,
        Err(resp) => return resp,
    };
    let registry = state.registry(kind);
    if let Err(e) = registry.update_monitor_parameters(&name, &params) {
        return monitor_error_response(&trace_id, &e);
    }
    match registry.get(&name) {
        Some(view) => success_response(StatusCode::OK, &trace_id, view),
        None => success_empty_response(StatusCode::OK, &trace_id, "updated"),
    }
}

async fn kill_monitor(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path((kind, name)): Path<(String, String)>,
    Query(delay): Query<DelayQuery>,
) -> Response {
    let kind = match parse_kind(&trace_id, &kind) {
        Ok(kind) => kind,
        Err(resp) => return resp,
    };
    match state.registry(kind).kill_after(&name, delay.duration()) {
        Ok(()) if delay.delay == 0 => success_empty_response(StatusCode::OK, &trace_id, "killed"),
        Ok(()) => success_empty_response(StatusCode::ACCEPTED, &trace_id, "kill scheduled"),
        Err(e) => monitor_error_response(&trace_id, &e),
    }
}

async fn reboot_monitor(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path((kind, name)): Path<(String, String)>,
    Query(delay): Query<DelayQuery>,
) -> Response {
    let kind = match parse_kind(&trace_id, &kind) {
        Ok(kind) => kind,
        Err(resp) => return resp,
    };
    match state.registry(kind).reboot(&name, delay.duration()) {
        Ok(()) => success_empty_response(StatusCode::ACCEPTED, &trace_id, "reboot scheduled"),
        Err(e) => monitor_error_response(&trace_id, &e),
    }
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/monitors/{kind}",
            get(list_monitors).post(create_monitor),
        )
        .route(
            "/api/monitors/{kind}/{name}",
            get(get_monitor).patch(update_monitor).delete(kill_monitor),
        )
        .route("/api/monitors/{kind}/{name}/psi", get(get_psi))
        .route("/api/monitors/{kind}/{name}/reboot", post(reboot_monitor))
}
