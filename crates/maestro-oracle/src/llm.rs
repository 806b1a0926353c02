//! Chat-completions implementation of the oracle traits.

use crate::config::OracleConfig;
use crate::{ResultExtractor, RoutingOracle};
use async_trait::async_trait;
use maestro_core::{MaestroError, MaestroResult, SelectedAgent, SelectedAgents};
use serde::de::DeserializeOwned;
use tracing::debug;

const SELECT_ONE_INSTRUCTIONS: &str = "You are an intelligent orchestrator specialized on routing \
    the target task to one of the agents which are registered with you. Select one agent to handle \
    the target task based on the description of this task and the list of all available candidate \
    agents (this list has the info about the capabilities of each agent). If there is no agent \
    that can execute the target task, return an empty string. \
    Respond with a JSON object of the form {\"name\": \"<agent name>\"} and nothing else.";

const SELECT_ALL_INSTRUCTIONS: &str = "You are an intelligent orchestrator specialized on routing \
    tasks. Select all agents that can handle the target task based on the task's description and a \
    list of available agents. If no agents can execute the task, return an empty list. \
    Respond with a JSON object of the form {\"names\": [\"<agent name>\", ...]} and nothing else.";

const EXTRACTOR_INSTRUCTIONS: &str = "You are an intelligent agent specialized on extracting \
    structured information from the input provided to you. Analyze the input, identify the \
    requested information inside it and return it in the format requested by the user. If you \
    identified no matching information, return an empty JSON object. \
    Respond with JSON only, no surrounding prose.";

/// Oracle backed by an OpenAI-compatible chat completions endpoint.
pub struct LlmOracle {
    config: OracleConfig,
    http: reqwest::Client,
}

impl LlmOracle {
    pub fn new(config: OracleConfig, http: reqwest::Client) -> Self {
        Self { config, http }
    }

    /// One chat turn: system instructions + user prompt, JSON answer parsed
    /// into `T`.
    async fn ask<T: DeserializeOwned>(&self, instructions: &str, prompt: &str) -> MaestroResult<T> {
        let url = self.config.completions_url();
        let body = serde_json::json!({
            "model": self.config.model_id,
            "temperature": self.config.temperature,
            "top_p": self.config.top_p,
            "max_tokens": self.config.max_tokens,
            "messages": [
                { "role": "system", "content": instructions },
                { "role": "user", "content": prompt },
            ],
        });

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| MaestroError::Http(format!("Oracle request failed: {e}")))?;

        let status = response.status();
        let response_body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| MaestroError::Http(format!("Malformed oracle response: {e}")))?;

        if !status.is_success() {
            return Err(MaestroError::Http(format!(
                "Oracle API error {status}: {response_body}"
            )));
        }

        let content = response_body["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| {
                MaestroError::Extraction("Oracle response has no message content".to_string())
            })?;

        debug!(content_len = content.len(), "Oracle answered");
        let cleaned = strip_code_fences(content);
        serde_json::from_str(cleaned).map_err(|e| {
            MaestroError::Extraction(format!("Unparsable oracle answer '{cleaned}': {e}"))
        })
    }
}

#[async_trait]
impl RoutingOracle for LlmOracle {
    async fn select_one(
        &self,
        task_description: &str,
        roster: &str,
    ) -> MaestroResult<Option<String>> {
        let prompt = routing_prompt(task_description, roster);
        let selected: SelectedAgent = self.ask(SELECT_ONE_INSTRUCTIONS, &prompt).await?;
        Ok(Some(selected.name).filter(|name| !name.is_empty()))
    }

    async fn select_all(
        &self,
        task_description: &str,
        roster: &str,
    ) -> MaestroResult<Vec<String>> {
        let prompt = routing_prompt(task_description, roster);
        let selected: SelectedAgents = self.ask(SELECT_ALL_INSTRUCTIONS, &prompt).await?;
        Ok(selected.names)
    }
}

#[async_trait]
impl ResultExtractor for LlmOracle {
    async fn extract(&self, input: &str, format_hint: &str) -> MaestroResult<serde_json::Value> {
        let prompt = format!(
            "Your input:\n```\n{input}\n```\n\n\
             Information you need to find: {format_hint}\n\n\
             Result format is a JSON."
        );
        self.ask(EXTRACTOR_INSTRUCTIONS, &prompt).await
    }
}

fn routing_prompt(task_description: &str, roster: &str) -> String {
    format!(
        "Target task description: \"{task_description}\".\n\n\
         The list of all registered with you agents:\n{roster}"
    )
}

/// Strip a leading/trailing markdown code fence from a model answer.
///
/// Models regularly wrap JSON in ```json fences even when told not to.
pub fn strip_code_fences(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    let inner = inner.strip_suffix("```").unwrap_or(inner);
    inner.trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn oracle_for(server: &MockServer) -> LlmOracle {
        LlmOracle::new(
            OracleConfig {
                model_id: "test-model".into(),
                api_key: "test-key".into(),
                api_base_url: server.uri(),
                temperature: 0.0,
                top_p: 1.0,
                max_tokens: 512,
            },
            reqwest::Client::new(),
        )
    }

    fn completion_with(content: &str) -> serde_json::Value {
        serde_json::json!({
            "choices": [{ "message": { "role": "assistant", "content": content } }]
        })
    }

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("{\"a\":1}"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("  {\"a\":1}  "), "{\"a\":1}");
    }

    #[tokio::test]
    async fn test_select_one_returns_name() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(completion_with(r#"{"name": "Review Agent"}"#)),
            )
            .mount(&server)
            .await;

        let oracle = oracle_for(&server);
        let name = oracle
            .select_one("Review the Jira user story", "- Name: Review Agent, ...")
            .await
            .unwrap();
        assert_eq!(name.as_deref(), Some("Review Agent"));
    }

    #[tokio::test]
    async fn test_select_one_empty_name_means_no_match() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion_with(r#"{"name": ""}"#)))
            .mount(&server)
            .await;

        let oracle = oracle_for(&server);
        let name = oracle.select_one("Fly to the moon", "- ...").await.unwrap();
        assert!(name.is_none());
    }

    #[tokio::test]
    async fn test_select_all_with_fenced_answer() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion_with(
                "```json\n{\"names\": [\"UI Agent\", \"API Agent\"]}\n```",
            )))
            .mount(&server)
            .await;

        let oracle = oracle_for(&server);
        let names = oracle
            .select_all("Execute tests having the following label: ui", "- ...")
            .await
            .unwrap();
        assert_eq!(names, vec!["UI Agent".to_string(), "API Agent".to_string()]);
    }

    #[tokio::test]
    async fn test_extract_returns_json_value() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion_with(
                r#"{"testExecutionStatus": "passed", "logs": "all good"}"#,
            )))
            .mount(&server)
            .await;

        let oracle = oracle_for(&server);
        let value = oracle
            .extract("test run output ...", "all data of the requested output JSON object")
            .await
            .unwrap();
        assert_eq!(value["testExecutionStatus"], "passed");
    }

    #[tokio::test]
    async fn test_api_error_surfaces_as_http() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(500).set_body_json(serde_json::json!({"error": "boom"})),
            )
            .mount(&server)
            .await;

        let oracle = oracle_for(&server);
        let err = oracle.select_one("task", "roster").await.unwrap_err();
        assert!(matches!(err, MaestroError::Http(_)));
    }

    #[tokio::test]
    async fn test_garbage_answer_surfaces_as_extraction() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(completion_with("sorry, I cannot")),
            )
            .mount(&server)
            .await;

        let oracle = oracle_for(&server);
        let err = oracle.select_one("task", "roster").await.unwrap_err();
        assert!(matches!(err, MaestroError::Extraction(_)));
    }
}
