//! Integration tests running the gateway on a real listener.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use async_trait::async_trait;
use maestro_core::{MaestroResult, TestCase, TestExecutionResult};
use maestro_engine::{AgentRegistry, Engine, EngineConfig, Gate};
use maestro_gateway::{ApiKeyConfig, GatewayServer};
use maestro_oracle::{ResultExtractor, RoutingOracle};
use maestro_reporting::{ReportSink, TestManagementClient};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::net::TcpListener;

struct NoAgentsOracle;

#[async_trait]
impl RoutingOracle for NoAgentsOracle {
    async fn select_one(&self, _task: &str, _roster: &str) -> MaestroResult<Option<String>> {
        Ok(None)
    }
    async fn select_all(&self, _task: &str, _roster: &str) -> MaestroResult<Vec<String>> {
        Ok(vec![])
    }
}

struct EmptyExtractor;

#[async_trait]
impl ResultExtractor for EmptyExtractor {
    async fn extract(&self, _input: &str, _hint: &str) -> MaestroResult<serde_json::Value> {
        Ok(serde_json::json!({}))
    }
}

struct EmptyManagement;

#[async_trait]
impl TestManagementClient for EmptyManagement {
    async fn fetch_test_cases_by_labels(
        &self,
        _project_key: &str,
        _target_labels: &[String],
    ) -> MaestroResult<HashMap<String, Vec<TestCase>>> {
        Ok(HashMap::new())
    }
    async fn fetch_test_case_by_key(&self, test_case_key: &str) -> MaestroResult<TestCase> {
        Err(maestro_core::MaestroError::Report(format!(
            "unknown test case {test_case_key}"
        )))
    }

    async fn create_test_cycle(&self, _project: &str, _name: &str) -> MaestroResult<String> {
        Ok("CYC-1".to_string())
    }
    async fn create_test_executions(
        &self,
        _results: &[TestExecutionResult],
        _project: &str,
        _cycle: &str,
    ) -> MaestroResult<()> {
        Ok(())
    }
}

struct NullSink;

#[async_trait]
impl ReportSink for NullSink {
    async fn publish(&self, _results: &[TestExecutionResult]) -> MaestroResult<()> {
        Ok(())
    }
}

fn test_engine() -> Arc<Engine> {
    let config = EngineConfig {
        request_wait_secs: 1,
        task_timeout_secs: 5,
        poll_interval_secs: 0,
        automated_label: "automated".to_string(),
    };
    Arc::new(Engine::new(
        Arc::new(Gate::new(AgentRegistry::new(), config.request_wait())),
        reqwest::Client::new(),
        Arc::new(NoAgentsOracle),
        Arc::new(EmptyExtractor),
        Arc::new(EmptyManagement),
        Arc::new(NullSink),
        &config,
    ))
}

/// Start the gateway on a random port, returning its address and engine.
async fn start_test_server(api_key: Option<&str>) -> (String, Arc<Engine>) {
    let engine = test_engine();
    let app = GatewayServer::build(engine.clone(), ApiKeyConfig::new(api_key.map(String::from)));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    (format!("http://127.0.0.1:{}", addr.port()), engine)
}

#[tokio::test]
async fn test_health_endpoint() {
    let (base, _engine) = start_test_server(None).await;
    let resp = reqwest::get(format!("{base}/health")).await.unwrap();
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["service"], "maestro");
}

#[tokio::test]
async fn test_missing_issue_key_is_bad_request() {
    let (base, _engine) = start_test_server(None).await;
    let resp = reqwest::Client::new()
        .post(format!("{base}/new-requirements-available"))
        .json(&serde_json::json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("issue key"));
}

#[tokio::test]
async fn test_no_registered_agents_is_not_found() {
    let (base, _engine) = start_test_server(None).await;
    let resp = reqwest::Client::new()
        .post(format!("{base}/new-requirements-available"))
        .json(&serde_json::json!({"issue_key": "QA-1"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_execute_tests_without_cases() {
    let (base, _engine) = start_test_server(None).await;
    let resp = reqwest::Client::new()
        .post(format!("{base}/execute-tests"))
        .json(&serde_json::json!({"project_key": "QA"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "No automated test cases found to execute.");
}

#[tokio::test]
async fn test_held_gate_yields_service_unavailable() {
    let (base, engine) = start_test_server(None).await;
    let registry = engine.registry();
    let _guard = registry.lock().await;

    let resp = reqwest::Client::new()
        .post(format!("{base}/execute-tests"))
        .json(&serde_json::json!({"project_key": "QA"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 503);
}

#[tokio::test]
async fn test_api_key_required_when_configured() {
    let (base, _engine) = start_test_server(Some("secret-key")).await;
    let client = reqwest::Client::new();

    let resp = client.get(format!("{base}/health")).send().await.unwrap();
    assert_eq!(resp.status(), 401);

    let resp = client
        .get(format!("{base}/health"))
        .header("X-API-Key", "wrong")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    let resp = client
        .get(format!("{base}/health"))
        .header("X-API-Key", "secret-key")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
}
