//! API-key authentication for the trigger endpoints.

use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum::Json;
use std::sync::Arc;
use tracing::warn;

pub const API_KEY_HEADER: &str = "x-api-key";

/// API-key configuration. No configured key means auth is disabled.
#[derive(Clone, Default)]
pub struct ApiKeyConfig {
    pub api_key: Option<String>,
}

impl ApiKeyConfig {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            api_key: api_key.filter(|k| !k.is_empty()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.api_key.is_some()
    }
}

/// Middleware validating the `X-API-Key` header against the configured
/// key. Requests pass untouched when no key is configured.
pub async fn api_key_middleware(
    State(config): State<Arc<ApiKeyConfig>>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Response {
    let Some(expected) = &config.api_key else {
        return next.run(request).await;
    };

    let provided = headers
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok());

    match provided {
        Some(key) if key == expected => next.run(request).await,
        Some(_) => {
            warn!("Rejected request: invalid API key");
            unauthorized("Unauthorized: Invalid API Key")
        }
        None => {
            warn!("Rejected request: missing API key");
            unauthorized("Unauthorized: Missing API Key")
        }
    }
}

fn unauthorized(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({ "error": message })),
    )
        .into_response()
}
