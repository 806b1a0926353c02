//! The gateway router and the three trigger handlers.

use crate::error::ApiError;
use crate::middleware::{api_key_middleware, ApiKeyConfig};
use axum::{
    extract::State,
    middleware as axum_mw,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use maestro_core::{MaestroError, ProjectExecutionRequest};
use maestro_engine::Engine;
use std::sync::Arc;
use tracing::info;

/// Shared application state.
pub struct AppState {
    pub engine: Arc<Engine>,
}

/// The trigger-facing HTTP server.
pub struct GatewayServer;

impl GatewayServer {
    /// Build the router with all trigger endpoints and optional API-key
    /// auth.
    pub fn build(engine: Arc<Engine>, api_key: ApiKeyConfig) -> Router {
        let state = Arc::new(AppState { engine });

        let app = Router::new()
            .route("/new-requirements-available", post(review_requirements))
            .route(
                "/story-ready-for-test-case-generation",
                post(generate_test_cases),
            )
            .route("/execute-tests", post(execute_tests))
            .route("/health", get(health))
            .with_state(state);

        if api_key.is_enabled() {
            app.layer(axum_mw::from_fn_with_state(
                Arc::new(api_key),
                api_key_middleware,
            ))
        } else {
            app
        }
    }
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok", "service": "maestro"}))
}

/// Webhook fired when a user story's requirements are ready for review.
async fn review_requirements(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<serde_json::Value>,
) -> Result<impl IntoResponse, ApiError> {
    info!("Received an event from Jira, requesting requirements review from an agent");
    let issue_key = issue_key_from(&payload)?;
    let message = state.engine.review_requirements(&issue_key).await?;
    Ok(Json(serde_json::json!({ "message": message })))
}

/// Webhook fired when a story is ready for test case generation.
async fn generate_test_cases(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<serde_json::Value>,
) -> Result<impl IntoResponse, ApiError> {
    info!("Received an event from Jira, requesting test case generation from an agent");
    let issue_key = issue_key_from(&payload)?;
    let message = state.engine.run_generation_workflow(&issue_key).await?;
    Ok(Json(serde_json::json!({ "message": message })))
}

/// Request to execute all automated tests of a project.
async fn execute_tests(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ProjectExecutionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let message = state.engine.execute_project_tests(&request.project_key).await?;
    Ok(Json(serde_json::json!({ "message": message })))
}

/// Pull the Jira issue key out of an arbitrary webhook payload.
fn issue_key_from(payload: &serde_json::Value) -> Result<String, ApiError> {
    payload["issue_key"]
        .as_str()
        .filter(|key| !key.is_empty())
        .map(String::from)
        .ok_or_else(|| {
            ApiError(MaestroError::BadRequest(
                "Request has no Jira issue key in the payload".to_string(),
            ))
        })
}
