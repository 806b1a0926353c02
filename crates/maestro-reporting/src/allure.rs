//! Allure-compatible report sink — writes one `*-result.json` per
//! execution outcome plus decoded attachment files into a results
//! directory, ready for `allure generate`.

use crate::ReportSink;
use async_trait::async_trait;
use base64::Engine as _;
use chrono::DateTime;
use maestro_core::{ExecutionStatus, MaestroError, MaestroResult, TestExecutionResult};
use std::path::PathBuf;
use tracing::{info, warn};
use uuid::Uuid;

/// Writes Allure result files under `<root>/allure-results`.
pub struct AllureResultsWriter {
    results_dir: PathBuf,
}

impl AllureResultsWriter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            results_dir: root.into().join("allure-results"),
        }
    }

    pub fn results_dir(&self) -> &PathBuf {
        &self.results_dir
    }

    fn allure_status(status: ExecutionStatus) -> &'static str {
        match status {
            ExecutionStatus::Passed => "passed",
            ExecutionStatus::Failed => "failed",
            // Allure calls an execution that broke before a verdict "broken".
            ExecutionStatus::Error => "broken",
        }
    }

    async fn write_result(&self, result: &TestExecutionResult) -> MaestroResult<()> {
        let uuid = Uuid::new_v4();
        let status = Self::allure_status(result.test_execution_status);

        let steps: Vec<serde_json::Value> = result
            .step_results
            .iter()
            .map(|step| {
                serde_json::json!({
                    "name": step.step_description,
                    "status": if step.success { "passed" } else { "failed" },
                    "statusDetails": {
                        "message": if step.success { &step.actual_results } else { &step.error_message },
                    },
                })
            })
            .collect();

        let mut attachments: Vec<serde_json::Value> = Vec::new();
        if let Some(files) = &result.artifacts {
            for file in files {
                let decoded = match base64::engine::general_purpose::STANDARD.decode(&file.bytes) {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        warn!(name = ?file.name, error = %e, "Skipping undecodable attachment");
                        continue;
                    }
                };
                let extension = file
                    .mime_type
                    .as_deref()
                    .and_then(|m| m.rsplit('/').next())
                    .unwrap_or("bin");
                let file_name = format!("{}-attachment.{extension}", Uuid::new_v4());
                tokio::fs::write(self.results_dir.join(&file_name), decoded).await?;
                attachments.push(serde_json::json!({
                    "name": file.name,
                    "source": file_name,
                    "type": file.mime_type,
                }));
            }
        }

        let mut body = serde_json::json!({
            "uuid": uuid,
            "name": result.test_case_name,
            "fullName": result.test_case_key,
            "status": status,
            "start": epoch_millis(&result.start_timestamp),
            "stop": epoch_millis(&result.end_timestamp),
            "steps": steps,
            "attachments": attachments,
        });
        if result.test_execution_status != ExecutionStatus::Passed {
            body["statusDetails"] = serde_json::json!({
                "message": result.general_error_message,
                "trace": result.logs,
            });
        }

        let path = self.results_dir.join(format!("{uuid}-result.json"));
        tokio::fs::write(&path, serde_json::to_vec_pretty(&body)?).await?;
        Ok(())
    }
}

fn epoch_millis(timestamp: &str) -> i64 {
    DateTime::parse_from_rfc3339(timestamp)
        .map(|t| t.timestamp_millis())
        .unwrap_or(0)
}

#[async_trait]
impl ReportSink for AllureResultsWriter {
    async fn publish(&self, results: &[TestExecutionResult]) -> MaestroResult<()> {
        info!(results = results.len(), dir = %self.results_dir.display(), "Writing Allure results");

        // Start from a clean results directory so stale outcomes from a
        // previous run never leak into the report.
        if self.results_dir.exists() {
            tokio::fs::remove_dir_all(&self.results_dir).await?;
        }
        tokio::fs::create_dir_all(&self.results_dir).await?;

        for result in results {
            self.write_result(result).await.map_err(|e| {
                MaestroError::Report(format!(
                    "Failed to write Allure result for '{}': {e}",
                    result.test_case_name
                ))
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maestro_core::{FileArtifact, TestStepResult};

    fn sample_result(status: ExecutionStatus) -> TestExecutionResult {
        TestExecutionResult {
            step_results: vec![TestStepResult {
                step_description: "Open page".into(),
                test_data: vec![],
                expected_results: "Page shown".into(),
                actual_results: "Page shown".into(),
                success: true,
                error_message: String::new(),
            }],
            test_case_key: "QA-T1".into(),
            test_case_name: "Login".into(),
            test_execution_status: status,
            general_error_message: "boom".into(),
            logs: "trace".into(),
            artifacts: None,
            start_timestamp: "2025-03-01T10:00:00Z".into(),
            end_timestamp: "2025-03-01T10:00:42Z".into(),
        }
    }

    async fn written_results(dir: &PathBuf) -> Vec<serde_json::Value> {
        let mut results = Vec::new();
        let mut entries = tokio::fs::read_dir(dir).await.unwrap();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            let name = entry.file_name().to_string_lossy().to_string();
            if name.ends_with("-result.json") {
                let content = tokio::fs::read(entry.path()).await.unwrap();
                results.push(serde_json::from_slice(&content).unwrap());
            }
        }
        results
    }

    #[tokio::test]
    async fn test_publish_writes_one_file_per_result() {
        let tmp = tempfile::tempdir().unwrap();
        let writer = AllureResultsWriter::new(tmp.path());
        writer
            .publish(&[
                sample_result(ExecutionStatus::Passed),
                sample_result(ExecutionStatus::Failed),
            ])
            .await
            .unwrap();

        let results = written_results(writer.results_dir()).await;
        assert_eq!(results.len(), 2);
        let statuses: Vec<&str> = results
            .iter()
            .map(|r| r["status"].as_str().unwrap())
            .collect();
        assert!(statuses.contains(&"passed"));
        assert!(statuses.contains(&"failed"));
    }

    #[tokio::test]
    async fn test_error_status_maps_to_broken_with_details() {
        let tmp = tempfile::tempdir().unwrap();
        let writer = AllureResultsWriter::new(tmp.path());
        writer
            .publish(&[sample_result(ExecutionStatus::Error)])
            .await
            .unwrap();

        let results = written_results(writer.results_dir()).await;
        assert_eq!(results[0]["status"], "broken");
        assert_eq!(results[0]["statusDetails"]["message"], "boom");
        assert_eq!(results[0]["statusDetails"]["trace"], "trace");
        assert_eq!(results[0]["start"], 1740823200000i64);
    }

    #[tokio::test]
    async fn test_attachments_are_decoded_and_referenced() {
        let tmp = tempfile::tempdir().unwrap();
        let writer = AllureResultsWriter::new(tmp.path());
        let mut result = sample_result(ExecutionStatus::Passed);
        result.artifacts = Some(vec![FileArtifact {
            name: Some("screenshot".into()),
            mime_type: Some("image/png".into()),
            bytes: base64::engine::general_purpose::STANDARD.encode(b"fake image"),
        }]);
        writer.publish(&[result]).await.unwrap();

        let results = written_results(writer.results_dir()).await;
        let source = results[0]["attachments"][0]["source"].as_str().unwrap();
        assert!(source.ends_with("-attachment.png"));
        let content = tokio::fs::read(writer.results_dir().join(source)).await.unwrap();
        assert_eq!(content, b"fake image");
    }

    #[tokio::test]
    async fn test_publish_cleans_previous_results() {
        let tmp = tempfile::tempdir().unwrap();
        let writer = AllureResultsWriter::new(tmp.path());
        writer
            .publish(&[sample_result(ExecutionStatus::Passed)])
            .await
            .unwrap();
        writer
            .publish(&[sample_result(ExecutionStatus::Passed)])
            .await
            .unwrap();

        let results = written_results(writer.results_dir()).await;
        assert_eq!(results.len(), 1);
    }
}
