//! The per-task dispatch/poll state machine: one submission call, then a
//! deadline-bounded poll loop until a terminal state.

use crate::registry::AgentRegistry;
use maestro_a2a::{A2aClient, Artifact, Task, TaskState};
use maestro_core::{MaestroError, MaestroResult};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

/// Identifies one outstanding unit of dispatched work. Lives only for the
/// duration of one dispatch/poll cycle.
#[derive(Debug, Clone)]
pub struct TaskHandle {
    pub request_id: String,
    pub task_id: String,
    pub agent_name: String,
}

/// Submits tasks to agents and polls them to completion.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    http: reqwest::Client,
    /// Overall budget for one submission and for one poll phase.
    task_timeout: Duration,
    /// Sleep between two polls of a still-running task.
    poll_interval: Duration,
}

impl Dispatcher {
    pub fn new(http: reqwest::Client, task_timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            http,
            task_timeout,
            poll_interval,
        }
    }

    fn client_for(&self, registry: &AgentRegistry, agent_name: &str) -> MaestroResult<A2aClient> {
        let card = registry.get(agent_name).ok_or_else(|| {
            MaestroError::Routing(format!("Agent '{agent_name}' is not registered with its card"))
        })?;
        Ok(A2aClient::new(self.http.clone(), card))
    }

    /// Submit `payload` as a task to the named agent.
    ///
    /// Returns the handle for polling together with the task as reported
    /// by the agent right after submission — agents that execute
    /// synchronously may already report a terminal state here.
    pub async fn submit(
        &self,
        registry: &AgentRegistry,
        agent_name: &str,
        payload: &str,
        description: &str,
    ) -> MaestroResult<(TaskHandle, Task)> {
        let client = self.client_for(registry, agent_name)?;
        info!(agent = %agent_name, task = %description, "Submitting task");

        let (request_id, task) = client
            .send_message(payload, self.task_timeout)
            .await
            .map_err(|e| match e {
                MaestroError::Http(cause) => MaestroError::Http(format!(
                    "Couldn't execute the task '{description}'. Root cause: {cause}"
                )),
                other => other,
            })?;

        let handle = TaskHandle {
            request_id,
            task_id: task.id.clone(),
            agent_name: agent_name.to_string(),
        };
        Ok((handle, task))
    }

    /// Poll the task behind `handle` until a terminal state or the
    /// deadline.
    ///
    /// The deadline is computed once at entry. Every iteration first
    /// checks the remaining budget — an already-expired deadline returns
    /// a timeout without issuing a status query — then bounds one status
    /// call by it. A transport or protocol error from the status call is
    /// fatal and propagates immediately; only a task-level "still
    /// running" answer is retried, after a short sleep.
    pub async fn await_completion(
        &self,
        registry: &AgentRegistry,
        handle: &TaskHandle,
        description: &str,
    ) -> MaestroResult<Task> {
        let client = self.client_for(registry, &handle.agent_name)?;
        let deadline = Instant::now() + self.task_timeout;
        info!(task = %description, "Polling the task until it is complete");

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(MaestroError::Timeout(format!(
                    "Task for {description} was not complete within {} seconds",
                    self.task_timeout.as_secs()
                )));
            }

            let task = client
                .get_task(&handle.request_id, &handle.task_id, remaining)
                .await
                .map_err(|e| match e {
                    MaestroError::Timeout(_) => MaestroError::Timeout(format!(
                        "Fetching status of the task for {description} timed out"
                    )),
                    MaestroError::Http(cause) => MaestroError::Http(format!(
                        "Couldn't get the status of the task for '{description}'. Root cause: {cause}"
                    )),
                    other => other,
                })?;

            let state = task.status.state;
            if state.is_running() {
                debug!(task = %description, state = %state, "Task still running, waiting for its completion");
                tokio::time::sleep(self.poll_interval.min(remaining)).await;
                continue;
            }

            info!(task = %description, state = %state, "Polling completed");
            return Ok(task);
        }
    }

    /// Fail with a domain error unless the task completed successfully.
    ///
    /// A terminal-but-failed task is a domain failure carrying the remote
    /// status message, distinct from any transport error.
    pub fn ensure_completed(task: &Task, description: &str) -> MaestroResult<()> {
        if task.status.state != TaskState::Completed {
            return Err(MaestroError::Task(format!(
                "Task for {description} has an unexpected status '{}'. Root cause: {}",
                task.status.state,
                task.status_message()
            )));
        }
        Ok(())
    }

    /// Submit, poll to a terminal state and validate successful
    /// completion. Skips the poll phase when the agent already reported a
    /// terminal state on submission.
    pub async fn run_to_completion(
        &self,
        registry: &AgentRegistry,
        agent_name: &str,
        payload: &str,
        description: &str,
    ) -> MaestroResult<Task> {
        let (handle, task) = self.submit(registry, agent_name, payload, description).await?;
        let task = if task.status.state.is_running() {
            self.await_completion(registry, &handle, description).await?
        } else {
            task
        };
        Self::ensure_completed(&task, description)?;
        Ok(task)
    }

    /// The artifacts of a completed task; failing when there are none.
    pub fn completed_artifacts<'t>(
        task: &'t Task,
        description: &str,
    ) -> MaestroResult<&'t [Artifact]> {
        if task.artifacts.is_empty() {
            return Err(MaestroError::Extraction(format!(
                "Received no execution results from the agent after it executed {description}"
            )));
        }
        Ok(&task.artifacts)
    }

    /// The text content of a task's primary artifact; failing when empty.
    pub fn artifact_text(task: &Task, description: &str) -> MaestroResult<String> {
        let text = task.first_artifact_text().unwrap_or_default();
        if text.is_empty() {
            return Err(MaestroError::Extraction(format!(
                "Received no text results from the agent after it executed {description}"
            )));
        }
        Ok(text)
    }
}
