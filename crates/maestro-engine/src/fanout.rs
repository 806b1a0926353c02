//! Fan-out/fan-in of a batch of test cases across multiple agents.
//!
//! Cases are partitioned by label, every group is routed to all capable
//! agents, cases inside a group are split round-robin across those agents
//! and all assignments run concurrently. The aggregate is the
//! concatenation of all per-assignment outcomes; its order carries no
//! meaning.

use crate::dispatch::Dispatcher;
use crate::registry::AgentRegistry;
use chrono::{SecondsFormat, Utc};
use futures_util::future::join_all;
use maestro_core::{
    MaestroError, MaestroResult, TestCase, TestExecutionRequest, TestExecutionResult,
};
use maestro_oracle::{ResultExtractor, RoutingOracle};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, error, info, warn};

/// Partition `cases` by every label they carry except `reserved_label`.
///
/// A case with several labels appears in several groups — that is the
/// fan-out, not an accident. The reserved label is the selection marker
/// ("automated") and names no executable group of its own.
pub fn group_by_labels(
    cases: &[TestCase],
    reserved_label: &str,
) -> BTreeMap<String, Vec<TestCase>> {
    let mut groups: BTreeMap<String, Vec<TestCase>> = BTreeMap::new();
    for case in cases {
        for label in &case.labels {
            if label != reserved_label {
                groups.entry(label.clone()).or_default().push(case.clone());
            }
        }
    }
    groups
}

/// Resolve all capable agents for every label, concurrently.
///
/// A routing failure for one label yields an empty agent list for that
/// label only — sibling labels are unaffected.
pub async fn select_agents_for_labels(
    oracle: &dyn RoutingOracle,
    roster: &str,
    labels: &[String],
) -> HashMap<String, Vec<String>> {
    let selections = labels.iter().map(|label| async move {
        let description = format!("Execute tests having the following label: {label}");
        match oracle.select_all(&description, roster).await {
            Ok(names) => {
                if names.is_empty() {
                    warn!(label = %label, "No suitable agents found for label");
                } else {
                    info!(label = %label, agents = ?names, "Selected agents for label");
                }
                (label.clone(), names)
            }
            Err(e) => {
                error!(label = %label, error = %e, "Failed to select agents for label");
                (label.clone(), Vec::new())
            }
        }
    });
    join_all(selections).await.into_iter().collect()
}

/// Execute all groups concurrently and collect every outcome.
///
/// A group with no resolved agents is skipped with a warning and
/// contributes nothing; a failed individual assignment is logged and
/// dropped from the aggregate without aborting its siblings.
pub async fn execute_groups(
    dispatcher: &Dispatcher,
    registry: &AgentRegistry,
    extractor: &dyn ResultExtractor,
    groups: &BTreeMap<String, Vec<TestCase>>,
    agents_by_label: &HashMap<String, Vec<String>>,
) -> Vec<TestExecutionResult> {
    let group_runs = groups.iter().filter_map(|(label, cases)| {
        let agents = agents_by_label
            .get(label)
            .filter(|agents| !agents.is_empty());
        match agents {
            Some(agents) => Some(execute_group(dispatcher, registry, extractor, label, cases, agents)),
            None => {
                warn!(
                    label = %label,
                    "Skipping execution of test cases for label as no suitable agents were found"
                );
                None
            }
        }
    });

    join_all(group_runs).await.into_iter().flatten().collect()
}

/// Pair every case with an agent by round-robin index:
/// `case[i] → agents[i mod n]`. An even static split without load
/// feedback.
pub fn assign_round_robin<'a>(
    cases: &'a [TestCase],
    agents: &'a [String],
) -> Vec<(&'a TestCase, &'a str)> {
    cases
        .iter()
        .enumerate()
        .map(|(index, case)| (case, agents[index % agents.len()].as_str()))
        .collect()
}

/// Execute one group's cases, split round-robin across `agents`.
async fn execute_group(
    dispatcher: &Dispatcher,
    registry: &AgentRegistry,
    extractor: &dyn ResultExtractor,
    label: &str,
    cases: &[TestCase],
    agents: &[String],
) -> Vec<TestExecutionResult> {
    info!(
        label = %label,
        cases = cases.len(),
        agents = ?agents,
        "Starting execution of test group"
    );

    let runs = assign_round_robin(cases, agents)
        .into_iter()
        .map(|(case, agent_name)| {
            debug!(case = ?case.id, agent = %agent_name, "Assigning test case to agent");
            execute_single(dispatcher, registry, extractor, agent_name, case, label)
        });

    join_all(runs)
        .await
        .into_iter()
        .filter_map(|outcome| match outcome {
            Ok(result) => Some(result),
            Err(e) => {
                error!(label = %label, error = %e, "Test case execution failed");
                None
            }
        })
        .collect()
}

/// One assignment: dispatch the case, poll to completion and shape the
/// agent's free-form output into a [`TestExecutionResult`].
async fn execute_single(
    dispatcher: &Dispatcher,
    registry: &AgentRegistry,
    extractor: &dyn ResultExtractor,
    agent_name: &str,
    case: &TestCase,
    label: &str,
) -> MaestroResult<TestExecutionResult> {
    let case_key = case.id.clone().unwrap_or_default();
    let description = format!("Execution of test case {case_key} (type: {label})");
    let payload = serde_json::to_string(&TestExecutionRequest {
        test_case: case.clone(),
    })?;

    let started = Utc::now();
    let task = dispatcher
        .run_to_completion(registry, agent_name, &payload, &description)
        .await?;
    let finished = Utc::now();

    Dispatcher::completed_artifacts(&task, &description)?;
    let text = Dispatcher::artifact_text(&task, &description)?;

    let extracted = extractor
        .extract(&text, "all data of the requested output JSON object")
        .await?;
    let mut result: TestExecutionResult = serde_json::from_value(extracted).map_err(|e| {
        MaestroError::Extraction(format!(
            "Couldn't map the test execution results received from agent {agent_name} \
             to the expected format: {e}"
        ))
    })?;

    result.test_case_key = case_key;
    if result.start_timestamp.is_empty() {
        result.start_timestamp = started.to_rfc3339_opts(SecondsFormat::Secs, true);
    }
    if result.end_timestamp.is_empty() {
        result.end_timestamp = finished.to_rfc3339_opts(SecondsFormat::Secs, true);
    }
    let files: Vec<_> = task
        .first_artifact_files()
        .into_iter()
        .map(Into::into)
        .collect();
    if !files.is_empty() {
        result.artifacts = Some(files);
    }

    info!(
        case = %result.test_case_key,
        status = %result.test_execution_status,
        "Executed test case"
    );
    Ok(result)
}
