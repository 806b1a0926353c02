//! HTTP trigger surface of the orchestrator.
//!
//! Three webhook-style POST endpoints compose the engine's workflows;
//! everything else (payload parsing, API-key auth, error→status mapping)
//! is deliberately thin.

pub mod error;
pub mod middleware;
pub mod server;

pub use error::ApiError;
pub use middleware::ApiKeyConfig;
pub use server::{AppState, GatewayServer};
