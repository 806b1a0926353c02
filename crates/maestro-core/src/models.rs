//! Domain models exchanged between the orchestrator, its test agents and
//! the test-management system.

use serde::{Deserialize, Serialize};

/// One step of a test case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestStep {
    /// The action executed in the scope of this step.
    pub action: String,
    /// Results expected after the action is executed.
    pub expected_results: String,
    /// Test data items belonging to this step.
    #[serde(default)]
    pub test_data: Vec<String>,
}

/// A test case as stored in the test management system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    /// Issue key of the test case; absent for freshly generated cases.
    #[serde(default)]
    pub id: Option<String>,
    /// Labels assigned to this test case.
    #[serde(default)]
    pub labels: Vec<String>,
    pub name: String,
    pub summary: String,
    /// Comments or warnings attached by the generating agent.
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub preconditions: Option<String>,
    #[serde(default)]
    pub steps: Vec<TestStep>,
    /// The user story this test case is linked to.
    #[serde(default)]
    pub parent_issue_key: Option<String>,
}

/// Response payload of a test case generation task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedTestCases {
    pub test_cases: Vec<TestCase>,
}

/// Payload submitted to an execution agent for one test case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestExecutionRequest {
    pub test_case: TestCase,
}

/// Overall status of one test execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Passed,
    Failed,
    /// Execution broke before a verdict could be reached.
    Error,
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutionStatus::Passed => write!(f, "passed"),
            ExecutionStatus::Failed => write!(f, "failed"),
            ExecutionStatus::Error => write!(f, "error"),
        }
    }
}

/// Result of one executed test step.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestStepResult {
    /// Description of the executed action.
    pub step_description: String,
    #[serde(default)]
    pub test_data: Vec<String>,
    pub expected_results: String,
    pub actual_results: String,
    pub success: bool,
    #[serde(default)]
    pub error_message: String,
}

/// A binary file produced during test execution (screenshot, trace, …).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileArtifact {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
    /// Base64-encoded content.
    pub bytes: String,
}

/// The outcome of one dispatched test case execution.
///
/// Assembled from the executing agent's terminal task output; timestamps
/// are backfilled by the engine when the agent does not supply them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestExecutionResult {
    #[serde(default)]
    pub step_results: Vec<TestStepResult>,
    #[serde(default)]
    pub test_case_key: String,
    #[serde(default)]
    pub test_case_name: String,
    pub test_execution_status: ExecutionStatus,
    #[serde(default)]
    pub general_error_message: String,
    #[serde(default)]
    pub logs: String,
    #[serde(default)]
    pub artifacts: Option<Vec<FileArtifact>>,
    #[serde(default)]
    pub start_timestamp: String,
    #[serde(default)]
    pub end_timestamp: String,
}

/// Incoming request to execute all automated tests of a project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectExecutionRequest {
    pub project_key: String,
}

/// Routing oracle answer: the single best agent for a task.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SelectedAgent {
    #[serde(default)]
    pub name: String,
}

/// Routing oracle answer: all agents suitable for a task.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SelectedAgents {
    #[serde(default)]
    pub names: Vec<String>,
}

/// Feedback returned by a requirements review task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequirementsReviewFeedback {
    pub suggested_improvements: Vec<String>,
}
