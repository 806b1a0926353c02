//! A2A protocol types — the agent card served at the well-known endpoint,
//! the task/artifact shapes returned by agents, and the JSON-RPC 2.0
//! envelope both travel in.

use serde::{Deserialize, Serialize};

/// The self-reported identity and capabilities record of a remote agent,
/// fetched from `/.well-known/agent.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentCard {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Base URL of the agent's JSON-RPC endpoint.
    pub url: String,
    #[serde(default)]
    pub capabilities: AgentCapabilities,
    #[serde(default)]
    pub skills: Vec<AgentSkill>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentCapabilities {
    #[serde(default)]
    pub streaming: bool,
}

/// A declared capability of an agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSkill {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// State of a remote task.
///
/// `Submitted` and `Working` are non-terminal; `Completed` and `Failed`
/// are terminal and never transition further.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    Submitted,
    Working,
    Completed,
    Failed,
}

impl TaskState {
    /// True while the task has not yet reached a terminal state.
    pub fn is_running(self) -> bool {
        matches!(self, TaskState::Submitted | TaskState::Working)
    }
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskState::Submitted => write!(f, "submitted"),
            TaskState::Working => write!(f, "working"),
            TaskState::Completed => write!(f, "completed"),
            TaskState::Failed => write!(f, "failed"),
        }
    }
}

/// Status of a remote task, including an optional agent-supplied message
/// (populated on failures with the root cause).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskStatus {
    pub state: TaskState,
    #[serde(default)]
    pub message: Option<Message>,
}

/// A message exchanged with an agent — plain parts with a role.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub role: String,
    pub parts: Vec<Part>,
    #[serde(default)]
    pub message_id: Option<String>,
}

impl Message {
    /// Build a user message with a single text part.
    pub fn user_text(text: impl Into<String>, message_id: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            parts: vec![Part::Text { text: text.into() }],
            message_id: Some(message_id.into()),
        }
    }

    /// Concatenated text of all text parts.
    pub fn text(&self) -> String {
        collect_text(&self.parts)
    }
}

/// One content part of a message or artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Part {
    Text { text: String },
    File { file: FileContent },
}

/// A file payload carried inline as base64.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileContent {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
    pub bytes: String,
}

impl From<&FileContent> for maestro_core::FileArtifact {
    fn from(file: &FileContent) -> Self {
        Self {
            name: file.name.clone(),
            mime_type: file.mime_type.clone(),
            bytes: file.bytes.clone(),
        }
    }
}

/// An output produced by an agent while executing a task.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    #[serde(default)]
    pub artifact_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    pub parts: Vec<Part>,
}

impl Artifact {
    /// Concatenated text of all text parts, joined with newlines.
    pub fn text(&self) -> String {
        collect_text(&self.parts)
    }

    /// All file parts of this artifact.
    pub fn files(&self) -> Vec<&FileContent> {
        self.parts
            .iter()
            .filter_map(|p| match p {
                Part::File { file } => Some(file),
                Part::Text { .. } => None,
            })
            .collect()
    }
}

fn collect_text(parts: &[Part]) -> String {
    parts
        .iter()
        .filter_map(|p| match p {
            Part::Text { text } => Some(text.as_str()),
            Part::File { .. } => None,
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// A remote task as reported by an agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    #[serde(default)]
    pub context_id: Option<String>,
    pub status: TaskStatus,
    #[serde(default)]
    pub artifacts: Vec<Artifact>,
}

impl Task {
    /// Text content of the first artifact, if any.
    ///
    /// Agents deliver their primary result as the leading artifact; later
    /// artifacts carry supplementary files.
    pub fn first_artifact_text(&self) -> Option<String> {
        self.artifacts.first().map(Artifact::text)
    }

    /// File parts of the first artifact.
    pub fn first_artifact_files(&self) -> Vec<&FileContent> {
        self.artifacts.first().map(Artifact::files).unwrap_or_default()
    }

    /// Root-cause text attached to the task status, if any.
    pub fn status_message(&self) -> String {
        self.status
            .message
            .as_ref()
            .map(Message::text)
            .unwrap_or_default()
    }
}

// --- JSON-RPC 2.0 envelope ---

#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: &'static str,
    pub id: String,
    pub method: &'static str,
    pub params: serde_json::Value,
}

impl JsonRpcRequest {
    pub fn new(id: impl Into<String>, method: &'static str, params: serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id: id.into(),
            method,
            params,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcResponse {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<JsonRpcError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
}
