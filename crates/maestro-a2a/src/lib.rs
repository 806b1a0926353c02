//! A2A wire protocol support — agent cards, tasks and the JSON-RPC client
//! used to submit work to remote agents and poll for their results.

pub mod card;
pub mod client;
pub mod protocol;

pub use card::fetch_agent_card;
pub use client::A2aClient;
pub use protocol::{
    AgentCapabilities, AgentCard, AgentSkill, Artifact, FileContent, Part, Task, TaskState,
    TaskStatus,
};
