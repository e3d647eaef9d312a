use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderName, Request, StatusCode};
use axum::middleware::Next;
use axum::response::Response;

use crate::api::{error_response, ErrorCode};
use crate::logging::TraceId;
use crate::state::AppState;

static API_KEY_HEADER: HeaderName = HeaderName::from_static("x-api-key");

/// Rejects control requests that do not carry the configured `x-api-key`.
/// Passes everything through when no key is configured.
pub async fn api_key_middleware(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let Some(expected) = state.config.api_key.as_deref() else {
        return next.run(req).await;
    };

    let trace_id = req
        .extensions()
        .get::<TraceId>()
        .map(|t| t.0.clone())
        .unwrap_or_default();

    match req
        .headers()
        .get(&API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
    {
        Some(key) if key == expected => next.run(req).await,
        Some(_) => {
            tracing::warn!(trace_id = %trace_id, "Request rejected: invalid x-api-key");
            error_response(
                StatusCode::UNAUTHORIZED,
                &trace_id,
                ErrorCode::Unauthorized,
                "invalid x-api-key",
            )
        }
        None => {
            tracing::warn!(trace_id = %trace_id, "Request rejected: missing x-api-key");
            error_response(
                StatusCode::UNAUTHORIZED,
                &trace_id,
                ErrorCode::Unauthorized,
                "missing x-api-key header",
            )
        }
    }
}
