//! The trigger-facing workflows, composed from the registry, the
//! dispatcher, the oracles and the reporting collaborators.

use crate::dispatch::Dispatcher;
use crate::fanout;
use crate::gate::Gate;
use crate::registry::AgentRegistry;
use chrono::Utc;
use maestro_core::{GeneratedTestCases, MaestroError, MaestroResult, TestExecutionResult};
use maestro_oracle::{ResultExtractor, RoutingOracle};
use maestro_reporting::{ReportSink, TestManagementClient};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Timeouts and labels governing the engine.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Bounded wait for the exclusivity gate before a request is rejected
    /// as busy.
    #[serde(default = "default_request_wait_secs")]
    pub request_wait_secs: u64,
    /// Overall deadline for one task submission and for one poll phase.
    #[serde(default = "default_task_timeout_secs")]
    pub task_timeout_secs: u64,
    /// Sleep between two status polls of a still-running task.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Label marking test cases eligible for automated execution.
    #[serde(default = "default_automated_label")]
    pub automated_label: String,
}

fn default_request_wait_secs() -> u64 {
    30
}

fn default_task_timeout_secs() -> u64 {
    500
}

fn default_poll_interval_secs() -> u64 {
    1
}

fn default_automated_label() -> String {
    "automated".to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            request_wait_secs: default_request_wait_secs(),
            task_timeout_secs: default_task_timeout_secs(),
            poll_interval_secs: default_poll_interval_secs(),
            automated_label: default_automated_label(),
        }
    }
}

impl EngineConfig {
    pub fn request_wait(&self) -> Duration {
        Duration::from_secs(self.request_wait_secs)
    }
}

/// The orchestration engine behind the trigger endpoints.
///
/// Every workflow acquires the exclusivity gate with a bounded wait at
/// entry and holds it for the duration of the request, so foreground
/// work never interleaves with a registry refresh — or with another
/// foreground request.
pub struct Engine {
    registry: Arc<Gate<AgentRegistry>>,
    dispatcher: Dispatcher,
    oracle: Arc<dyn RoutingOracle>,
    extractor: Arc<dyn ResultExtractor>,
    management: Arc<dyn TestManagementClient>,
    reporting: Arc<dyn ReportSink>,
    automated_label: String,
}

impl Engine {
    pub fn new(
        registry: Arc<Gate<AgentRegistry>>,
        http: reqwest::Client,
        oracle: Arc<dyn RoutingOracle>,
        extractor: Arc<dyn ResultExtractor>,
        management: Arc<dyn TestManagementClient>,
        reporting: Arc<dyn ReportSink>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            registry,
            dispatcher: Dispatcher::new(
                http,
                Duration::from_secs(config.task_timeout_secs),
                Duration::from_secs(config.poll_interval_secs),
            ),
            oracle,
            extractor,
            management,
            reporting,
            automated_label: config.automated_label.clone(),
        }
    }

    /// Shared handle to the registry gate, for wiring up discovery.
    pub fn registry(&self) -> Arc<Gate<AgentRegistry>> {
        self.registry.clone()
    }

    /// Route a requirements review to the best-matching agent and wait
    /// for it to finish.
    pub async fn review_requirements(&self, issue_key: &str) -> MaestroResult<String> {
        let registry = self.registry.lock_bounded().await?;
        info!(issue = %issue_key, "Requesting requirements review from an agent");

        let description = "Review the Jira user story";
        let agent_name = self.choose_agent(&registry, description).await?;
        let (handle, task) = self
            .dispatcher
            .submit(
                &registry,
                &agent_name,
                &format!("Jira user story with key {issue_key}"),
                description,
            )
            .await?;

        let wait_description = format!("Review of the user story {issue_key}");
        let task = if task.status.state.is_running() {
            self.dispatcher
                .await_completion(&registry, &handle, &wait_description)
                .await?
        } else {
            task
        };
        Dispatcher::ensure_completed(&task, &wait_description)?;

        info!("Received response from an agent, requirements review seems to be complete");
        Ok(format!(
            "Review of the requirements for Jira user story {issue_key} completed."
        ))
    }

    /// Generate test cases for a user story, then have them classified
    /// and reviewed.
    pub async fn run_generation_workflow(&self, issue_key: &str) -> MaestroResult<String> {
        let registry = self.registry.lock_bounded().await?;
        info!(issue = %issue_key, "Requesting test case generation from an agent");

        let generated = self.request_generation(&registry, issue_key).await?;
        if generated.test_cases.is_empty() {
            return Err(MaestroError::Extraction(
                "Test case generation agent provided no generated test cases in its response"
                    .to_string(),
            ));
        }

        info!(
            count = generated.test_cases.len(),
            "Got generated test cases, requesting their classification"
        );
        let cases_payload = format!(
            "Test cases:\n{}",
            serde_json::to_string_pretty(&generated.test_cases)?
        );

        let description = "Classify test cases";
        let agent_name = self.choose_agent(&registry, description).await?;
        let task = self
            .dispatcher
            .run_to_completion(&registry, &agent_name, &cases_payload, description)
            .await?;
        Dispatcher::completed_artifacts(
            &task,
            &format!("Classification of test cases for the user story {issue_key}"),
        )?;
        info!("Received response from an agent, test case classification seems to be complete");

        info!("Requesting review of all generated test cases");
        let description = "Review test cases";
        let agent_name = self.choose_agent(&registry, description).await?;
        let task = self
            .dispatcher
            .run_to_completion(&registry, &agent_name, &cases_payload, description)
            .await?;
        Dispatcher::completed_artifacts(&task, "Review of test cases")?;
        info!("Received response from an agent, test case review seems to be complete");

        Ok(format!(
            "Test case generation and classification for Jira user story {issue_key} completed."
        ))
    }

    /// Execute every automated test case of a project across all capable
    /// agents and feed the outcomes into the reporting backends.
    pub async fn execute_project_tests(&self, project_key: &str) -> MaestroResult<String> {
        let registry = self.registry.lock_bounded().await?;
        info!(project = %project_key, "Received request to execute automated tests");

        let by_label = self
            .management
            .fetch_test_cases_by_labels(project_key, std::slice::from_ref(&self.automated_label))
            .await
            .map_err(|e| {
                MaestroError::Report(format!(
                    "Failed to fetch test cases for project {project_key}: {e}"
                ))
            })?;
        let automated = by_label
            .get(&self.automated_label)
            .cloned()
            .unwrap_or_default();
        if automated.is_empty() {
            info!(project = %project_key, "No automated test cases found");
            return Ok("No automated test cases found to execute.".to_string());
        }

        info!(
            count = automated.len(),
            "Retrieved test cases for automatic execution, grouping them by labels"
        );
        let groups = fanout::group_by_labels(&automated, &self.automated_label);
        if groups.is_empty() {
            info!("No tests found which can be automated based on the label");
            return Ok(format!(
                "No test cases with '{}' label found.",
                self.automated_label
            ));
        }

        let agents_by_label = if registry.is_empty() {
            warn!("Agent registry is empty. Cannot select any execution agents.");
            Default::default()
        } else {
            let labels: Vec<String> = groups.keys().cloned().collect();
            fanout::select_agents_for_labels(self.oracle.as_ref(), &registry.roster(), &labels)
                .await
        };

        let results = fanout::execute_groups(
            &self.dispatcher,
            &registry,
            self.extractor.as_ref(),
            &groups,
            &agents_by_label,
        )
        .await;
        info!(count = results.len(), "Collected execution results");

        if !results.is_empty() {
            info!("Generating test execution report based on all execution results");
            self.report(&results, project_key).await?;
        }
        Ok(format!(
            "Test execution completed for project {project_key}. Ran {} tests.",
            results.len()
        ))
    }

    async fn request_generation(
        &self,
        registry: &AgentRegistry,
        issue_key: &str,
    ) -> MaestroResult<GeneratedTestCases> {
        let description = "Generate test cases";
        let agent_name = self.choose_agent(registry, description).await?;
        let (handle, task) = self
            .dispatcher
            .submit(
                registry,
                &agent_name,
                &format!("Jira user story with key {issue_key}"),
                description,
            )
            .await?;

        // Fast path: an agent that generates synchronously answers the
        // submission with a completed task that already carries artifacts.
        let text = if !task.status.state.is_running() && !task.artifacts.is_empty() {
            Dispatcher::ensure_completed(&task, description)?;
            Dispatcher::artifact_text(&task, description)?
        } else {
            let wait_description =
                format!("Generation of test cases for the user story {issue_key}");
            let task = if task.status.state.is_running() {
                self.dispatcher
                    .await_completion(registry, &handle, &wait_description)
                    .await?
            } else {
                task
            };
            Dispatcher::ensure_completed(&task, &wait_description)?;
            Dispatcher::completed_artifacts(&task, &wait_description)?;
            Dispatcher::artifact_text(&task, &wait_description)?
        };

        serde_json::from_str(&text).map_err(|e| {
            MaestroError::Extraction(format!(
                "Couldn't parse generated test cases from the agent's response: {e}"
            ))
        })
    }

    async fn choose_agent(
        &self,
        registry: &AgentRegistry,
        task_description: &str,
    ) -> MaestroResult<String> {
        if registry.is_empty() {
            return Err(MaestroError::Routing(
                "Orchestrator has currently no registered agents".to_string(),
            ));
        }
        let selected = self
            .oracle
            .select_one(task_description, &registry.roster())
            .await?;
        selected.ok_or_else(|| {
            MaestroError::Routing(format!(
                "No agent found to handle the task '{task_description}'"
            ))
        })
    }

    async fn report(
        &self,
        results: &[TestExecutionResult],
        project_key: &str,
    ) -> MaestroResult<()> {
        let cycle_name = format!(
            "Automated Test Execution - {}",
            Utc::now().format("%Y-%m-%d %H:%M:%S")
        );
        let cycle_key = self
            .management
            .create_test_cycle(project_key, &cycle_name)
            .await?;
        self.management
            .create_test_executions(results, project_key, &cycle_key)
            .await?;
        self.reporting.publish(results).await
    }
}
