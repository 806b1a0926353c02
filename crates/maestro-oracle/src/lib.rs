//! Routing and result-extraction oracles.
//!
//! The engine never reasons about *which* agent fits a task or *what* a
//! free-form agent response means — it delegates both questions to oracle
//! traits and only assumes the shape of the answers (one name, many names,
//! or a JSON value). The production implementation ([`LlmOracle`]) asks a
//! chat-completions model; tests substitute deterministic stubs.

pub mod config;
pub mod llm;

pub use config::OracleConfig;
pub use llm::LlmOracle;

use async_trait::async_trait;
use maestro_core::MaestroResult;

/// Maps a task description to capable agent names, given the registry
/// roster rendered as text.
#[async_trait]
pub trait RoutingOracle: Send + Sync {
    /// The single best-matching agent name, or `None` when no registered
    /// agent can handle the task.
    async fn select_one(
        &self,
        task_description: &str,
        roster: &str,
    ) -> MaestroResult<Option<String>>;

    /// All agent names capable of handling the task; empty when none fit.
    async fn select_all(&self, task_description: &str, roster: &str)
        -> MaestroResult<Vec<String>>;
}

/// Maps free-form text to a best-effort structured JSON value.
///
/// `format_hint` describes the requested output shape in prose; the
/// implementation returns an empty JSON object when nothing in the input
/// matches.
#[async_trait]
pub trait ResultExtractor: Send + Sync {
    async fn extract(&self, input: &str, format_hint: &str) -> MaestroResult<serde_json::Value>;
}
