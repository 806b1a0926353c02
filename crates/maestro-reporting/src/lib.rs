//! Test-management and reporting collaborators.
//!
//! Both are terminal sinks from the engine's point of view: finished
//! execution outcomes flow in, nothing flows back. The engine only knows
//! the [`TestManagementClient`] and [`ReportSink`] traits; the concrete
//! Zephyr and Allure implementations live here.

pub mod allure;
pub mod zephyr;

pub use allure::AllureResultsWriter;
pub use zephyr::{ZephyrClient, ZephyrConfig};

use async_trait::async_trait;
use maestro_core::{MaestroResult, TestCase, TestExecutionResult};
use std::collections::HashMap;

/// Narrow interface to the test management system.
#[async_trait]
pub trait TestManagementClient: Send + Sync {
    /// Fetch all test cases of `project_key` carrying any of
    /// `target_labels`, grouped by the label they matched.
    async fn fetch_test_cases_by_labels(
        &self,
        project_key: &str,
        target_labels: &[String],
    ) -> MaestroResult<HashMap<String, Vec<TestCase>>>;

    /// Fetch one test case by its key.
    async fn fetch_test_case_by_key(&self, test_case_key: &str) -> MaestroResult<TestCase>;

    /// Create a test cycle and return its key.
    async fn create_test_cycle(&self, project_key: &str, name: &str) -> MaestroResult<String>;

    /// Record one execution per result under the given cycle.
    async fn create_test_executions(
        &self,
        results: &[TestExecutionResult],
        project_key: &str,
        test_cycle_key: &str,
    ) -> MaestroResult<()>;
}

/// Sink that renders finished execution outcomes into a report.
#[async_trait]
pub trait ReportSink: Send + Sync {
    async fn publish(&self, results: &[TestExecutionResult]) -> MaestroResult<()>;
}
