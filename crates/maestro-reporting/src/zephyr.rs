//! Client for a Zephyr Scale style test-management API.

use crate::TestManagementClient;
use async_trait::async_trait;
use maestro_core::{
    ExecutionStatus, MaestroError, MaestroResult, TestCase, TestExecutionResult, TestStep,
};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info};

/// Configuration for [`ZephyrClient`].
#[derive(Debug, Clone, Deserialize)]
pub struct ZephyrConfig {
    pub base_url: String,
    pub api_token: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_timeout_secs() -> u64 {
    15
}

fn default_page_size() -> u32 {
    100
}

/// Bearer-token client for the Zephyr Scale Cloud API.
pub struct ZephyrClient {
    config: ZephyrConfig,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchPage {
    #[serde(default)]
    values: Vec<serde_json::Value>,
    #[serde(default)]
    max_results: Option<u32>,
    #[serde(default = "default_is_last")]
    is_last: bool,
}

fn default_is_last() -> bool {
    true
}

impl ZephyrClient {
    pub fn new(config: ZephyrConfig, http: reqwest::Client) -> MaestroResult<Self> {
        if config.base_url.is_empty() {
            return Err(MaestroError::Config(
                "Zephyr base URL is not configured".to_string(),
            ));
        }
        if config.api_token.is_empty() {
            return Err(MaestroError::Config(
                "Zephyr API token is not configured".to_string(),
            ));
        }
        Ok(Self { config, http })
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.timeout_secs)
    }

    async fn get_json(&self, url: &str, query: &[(&str, String)]) -> MaestroResult<serde_json::Value> {
        let response = self
            .http
            .get(url)
            .bearer_auth(&self.config.api_token)
            .query(query)
            .timeout(self.timeout())
            .send()
            .await
            .map_err(|e| MaestroError::Report(format!("Zephyr request to {url} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(MaestroError::Report(format!(
                "Zephyr request to {url} returned status {status}"
            )));
        }
        response
            .json()
            .await
            .map_err(|e| MaestroError::Report(format!("Malformed Zephyr response from {url}: {e}")))
    }

    async fn post_json(
        &self,
        url: &str,
        payload: &serde_json::Value,
    ) -> MaestroResult<serde_json::Value> {
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.config.api_token)
            .json(payload)
            .timeout(self.timeout())
            .send()
            .await
            .map_err(|e| MaestroError::Report(format!("Zephyr request to {url} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(MaestroError::Report(format!(
                "Zephyr request to {url} returned status {status}"
            )));
        }
        response
            .json()
            .await
            .map_err(|e| MaestroError::Report(format!("Malformed Zephyr response from {url}: {e}")))
    }

    /// Fetch the inline steps of a test case.
    async fn fetch_test_steps(&self, test_case_key: &str) -> MaestroResult<Vec<TestStep>> {
        let url = format!(
            "{}/testcases/{test_case_key}/teststeps",
            self.config.base_url
        );
        let data = self
            .get_json(&url, &[("maxResults", "1000".to_string())])
            .await?;

        let steps = data["values"]
            .as_array()
            .map(|values| {
                values
                    .iter()
                    .filter_map(|v| v.get("inline"))
                    .map(|inline| TestStep {
                        action: text_field(inline, "description"),
                        expected_results: text_field(inline, "expectedResult"),
                        test_data: split_br(&text_field(inline, "testData")),
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(steps)
    }

    async fn parse_test_case(&self, raw: &serde_json::Value) -> MaestroResult<TestCase> {
        let key = text_field(raw, "key");
        let steps = if key.is_empty() {
            Vec::new()
        } else {
            self.fetch_test_steps(&key).await?
        };
        Ok(TestCase {
            id: Some(key).filter(|k| !k.is_empty()),
            labels: raw["labels"]
                .as_array()
                .map(|labels| {
                    labels
                        .iter()
                        .filter_map(|l| l.as_str().map(String::from))
                        .collect()
                })
                .unwrap_or_default(),
            name: text_field(raw, "name"),
            summary: text_field(raw, "objective"),
            comment: String::new(),
            preconditions: raw["precondition"].as_str().map(String::from),
            steps,
            parent_issue_key: None,
        })
    }
}

fn text_field(value: &serde_json::Value, field: &str) -> String {
    value[field].as_str().unwrap_or_default().to_string()
}

fn split_br(text: &str) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    text.split("<br>").map(String::from).collect()
}

#[async_trait]
impl TestManagementClient for ZephyrClient {
    async fn fetch_test_cases_by_labels(
        &self,
        project_key: &str,
        target_labels: &[String],
    ) -> MaestroResult<HashMap<String, Vec<TestCase>>> {
        let url = format!("{}/testcases", self.config.base_url);
        let mut by_label: HashMap<String, Vec<TestCase>> = HashMap::new();
        let mut start_at: u32 = 0;
        let mut page_size = self.config.page_size;

        info!(project = %project_key, labels = ?target_labels, "Fetching test cases by labels");
        loop {
            let data = self
                .get_json(
                    &url,
                    &[
                        ("projectKey", project_key.to_string()),
                        ("maxResults", page_size.to_string()),
                        ("startAt", start_at.to_string()),
                    ],
                )
                .await?;
            let page: SearchPage = serde_json::from_value(data)?;
            if let Some(server_max) = page.max_results.filter(|max| *max > 0) {
                page_size = server_max;
            }

            for raw in &page.values {
                let labels: Vec<&str> = raw["labels"]
                    .as_array()
                    .map(|l| l.iter().filter_map(|v| v.as_str()).collect())
                    .unwrap_or_default();
                for target in target_labels {
                    if labels.contains(&target.as_str()) {
                        debug!(key = %text_field(raw, "key"), label = %target, "Matched test case");
                        by_label
                            .entry(target.clone())
                            .or_default()
                            .push(self.parse_test_case(raw).await?);
                    }
                }
            }

            if page.is_last {
                break;
            }
            start_at += page_size;
        }

        Ok(by_label)
    }

    async fn fetch_test_case_by_key(&self, test_case_key: &str) -> MaestroResult<TestCase> {
        let url = format!("{}/testcases/{test_case_key}", self.config.base_url);
        info!(key = %test_case_key, "Fetching test case");
        let raw = self.get_json(&url, &[]).await?;
        self.parse_test_case(&raw).await
    }

    async fn create_test_cycle(&self, project_key: &str, name: &str) -> MaestroResult<String> {
        info!(project = %project_key, cycle = %name, "Creating test cycle");
        let payload = serde_json::json!({
            "projectKey": project_key,
            "name": name,
            "statusName": "Not executed",
        });
        let url = format!("{}/testcycles", self.config.base_url);
        let response = self.post_json(&url, &payload).await?;
        let key = text_field(&response, "key");
        if key.is_empty() {
            return Err(MaestroError::Report(
                "Failed to retrieve test cycle key from Zephyr API response".to_string(),
            ));
        }
        info!(cycle_key = %key, "Test cycle created");
        Ok(key)
    }

    async fn create_test_executions(
        &self,
        results: &[TestExecutionResult],
        project_key: &str,
        test_cycle_key: &str,
    ) -> MaestroResult<()> {
        let url = format!("{}/testexecutions", self.config.base_url);
        for result in results {
            info!(
                test_case = %result.test_case_name,
                status = %result.test_execution_status,
                "Creating test execution"
            );

            let mut script_results: Vec<serde_json::Value> = result
                .step_results
                .iter()
                .map(|step| {
                    let actual = if step.error_message.is_empty() {
                        step.actual_results.clone()
                    } else {
                        step.error_message.clone()
                    };
                    serde_json::json!({
                        "statusName": if step.success { "Pass" } else { "Fail" },
                        "actualResult": actual,
                    })
                })
                .collect();

            // Zephyr rejects executions whose script results do not cover
            // every step of the test case; pad the remainder.
            let total_steps = self.fetch_test_steps(&result.test_case_key).await?.len();
            while script_results.len() < total_steps {
                script_results.push(serde_json::json!({
                    "statusName": "Not Executed",
                    "actualResult": "This step was not executed because a previous step failed.",
                }));
            }

            let passed = result.test_execution_status == ExecutionStatus::Passed;
            let payload = serde_json::json!({
                "projectKey": project_key,
                "testCaseKey": result.test_case_key,
                "testCycleKey": test_cycle_key,
                "statusName": if passed { "Pass" } else { "Fail" },
                "comment": if passed { "" } else { result.general_error_message.as_str() },
                "actualStartDate": result.start_timestamp,
                "actualEndDate": result.end_timestamp,
                "testScriptResults": script_results,
            });
            let response = self.post_json(&url, &payload).await?;
            debug!(execution_id = ?response.get("id"), "Test execution created");
        }
        Ok(())
    }
}
