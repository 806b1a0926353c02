//! JSON-RPC client for one remote agent — task submission and status
//! polling against the endpoint advertised in its card.

use crate::protocol::{
    AgentCard, JsonRpcRequest, JsonRpcResponse, Message, Task,
};
use maestro_core::{MaestroError, MaestroResult};
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

/// Client bound to a single agent's JSON-RPC endpoint.
///
/// Holds a clone of the process-wide [`reqwest::Client`] (cheap, the
/// connection pool is shared) and the endpoint URL from the agent card.
#[derive(Debug, Clone)]
pub struct A2aClient {
    http: reqwest::Client,
    endpoint: String,
}

impl A2aClient {
    /// Build a client for the agent described by `card`.
    pub fn new(http: reqwest::Client, card: &AgentCard) -> Self {
        Self {
            http,
            endpoint: card.url.clone(),
        }
    }

    /// Submit a task by sending a user message with the given text payload.
    ///
    /// Returns the JSON-RPC request id together with the task the agent
    /// created for it. A JSON-RPC error response is a protocol failure and
    /// surfaces as [`MaestroError::Http`].
    pub async fn send_message(
        &self,
        input: &str,
        timeout: Duration,
    ) -> MaestroResult<(String, Task)> {
        let request_id = Uuid::new_v4().simple().to_string();
        let message = Message::user_text(input, Uuid::new_v4().simple().to_string());
        let request = JsonRpcRequest::new(
            request_id.clone(),
            "message/send",
            serde_json::json!({ "message": message }),
        );

        let task = self.call(&request, timeout).await?;
        Ok((request_id, task))
    }

    /// Query the current state of a previously submitted task.
    ///
    /// `timeout` bounds this single status call; the caller threads the
    /// remaining overall deadline through it on every poll iteration.
    pub async fn get_task(
        &self,
        request_id: &str,
        task_id: &str,
        timeout: Duration,
    ) -> MaestroResult<Task> {
        let request = JsonRpcRequest::new(
            request_id,
            "tasks/get",
            serde_json::json!({ "id": task_id }),
        );
        self.call(&request, timeout).await
    }

    async fn call(&self, request: &JsonRpcRequest, timeout: Duration) -> MaestroResult<Task> {
        debug!(endpoint = %self.endpoint, method = request.method, "A2A request");

        let response = self
            .http
            .post(&self.endpoint)
            .timeout(timeout)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    MaestroError::Timeout(format!(
                        "A2A request '{}' to {} timed out",
                        request.method, self.endpoint
                    ))
                } else {
                    MaestroError::Http(format!(
                        "A2A request '{}' to {} failed: {e}",
                        request.method, self.endpoint
                    ))
                }
            })?;

        let status = response.status();
        let body: JsonRpcResponse = response.json().await.map_err(|e| {
            MaestroError::Http(format!(
                "Malformed A2A response from {}: {e}",
                self.endpoint
            ))
        })?;

        if let Some(error) = body.error {
            return Err(MaestroError::Http(format!(
                "A2A error {} from {}: {}",
                error.code, self.endpoint, error.message
            )));
        }
        if !status.is_success() {
            return Err(MaestroError::Http(format!(
                "A2A endpoint {} returned status {status}",
                self.endpoint
            )));
        }

        let result = body.result.ok_or_else(|| {
            MaestroError::Http(format!("Empty A2A result from {}", self.endpoint))
        })?;
        let task: Task = serde_json::from_value(result).map_err(|e| {
            MaestroError::Http(format!("Unparsable task from {}: {e}", self.endpoint))
        })?;

        Ok(task)
    }
}
