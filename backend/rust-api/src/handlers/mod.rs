use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{Html, IntoResponse, Response},
    Json,
};
use base64::{engine::general_purpose, Engine as _};
use serde_json::json;
use std::sync::Arc;

use crate::error::InterviewError;
use crate::metrics;
use crate::services::AppState;

pub mod sessions;
pub mod sse;

const INDEX_HTML: &str = include_str!("../../static/index.html");

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Gone(String),
    ServiceUnavailable(String),
}

impl From<InterviewError> for ApiError {
    fn from(err: InterviewError) -> Self {
        let message = err.to_string();
        match err {
            InterviewError::EmptySubmission
            | InterviewError::MissingEmail
            | InterviewError::Validation(_) => ApiError::BadRequest(message),
            InterviewError::SessionNotFound(_) => ApiError::NotFound(message),
            InterviewError::SessionExpired => ApiError::Gone(message),
            InterviewError::ConfigMissing(_) | InterviewError::ProviderUnavailable(_) => {
                ApiError::ServiceUnavailable(message)
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message),
            ApiError::Gone(message) => (StatusCode::GONE, message),
            ApiError::ServiceUnavailable(message) => (StatusCode::SERVICE_UNAVAILABLE, message),
        };
        let json_response = json!({
            "message": message,
            "status": status.as_u16()
        });
        (status, Json(json_response)).into_response()
    }
}

/// GET / - practice page
pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let provider_configured = state.config.llm.api_key.is_some();
    let status = if provider_configured {
        "healthy"
    } else {
        "degraded"
    };

    (
        StatusCode::OK,
        Json(json!({
            "status": status,
            "service": "interview-sim-api",
            "version": env!("CARGO_PKG_VERSION"),
            "dependencies": {
                "provider": {
                    "configured": provider_configured,
                    "model": state.config.llm.model,
                },
                "sinks": state.sessions.sink_names(),
            },
            "sessions": state.store.len().await,
        })),
    )
}

pub async fn metrics_handler() -> impl IntoResponse {
    match metrics::render_metrics() {
        Ok(metrics_text) => (StatusCode::OK, metrics_text),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to render metrics: {}", e),
        ),
    }
}

/// Metrics authentication middleware - protects /metrics endpoint with HTTP Basic Auth
pub async fn metrics_auth_middleware(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let encoded = auth_header
        .strip_prefix("Basic ")
        .ok_or(StatusCode::UNAUTHORIZED)?;
    let decoded = general_purpose::STANDARD
        .decode(encoded)
        .map_err(|_| StatusCode::UNAUTHORIZED)?;
    let credentials = String::from_utf8(decoded).map_err(|_| StatusCode::UNAUTHORIZED)?;

    // Format: username:password
    if credentials != state.config.metrics_auth {
        return Err(StatusCode::UNAUTHORIZED);
    }

    Ok(next.run(request).await)
}
