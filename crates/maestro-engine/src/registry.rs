//! The agent registry — the single shared mutable resource of the engine.

use maestro_a2a::AgentCard;
use std::collections::HashMap;

/// Mapping from an agent's self-reported name to its card.
///
/// Constructed once at process start and injected; all mutation happens in
/// the discovery loop and all access goes through the exclusivity gate, so
/// readers observe either the pre- or post-refresh state, never a mix.
#[derive(Debug, Default)]
pub struct AgentRegistry {
    agents: HashMap<String, AgentCard>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite an agent, keyed by the name declared in its
    /// card — not the address it was probed at, so a renamed or
    /// load-balanced agent reachable at several addresses unifies under
    /// one entry.
    pub fn insert(&mut self, card: AgentCard) -> Option<AgentCard> {
        self.agents.insert(card.name.clone(), card)
    }

    pub fn get(&self, name: &str) -> Option<&AgentCard> {
        self.agents.get(name)
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.agents.keys().map(String::as_str).collect()
    }

    /// Render the registry as roster text for the routing oracle: one
    /// line per agent with its name, description and skill descriptions.
    pub fn roster(&self) -> String {
        let mut lines: Vec<String> = self
            .agents
            .values()
            .map(|card| {
                let skills = card
                    .skills
                    .iter()
                    .map(|s| s.description.as_str())
                    .collect::<Vec<_>>()
                    .join("; ");
                format!(
                    "- Name: {}, Description: {}, Skills: {}",
                    card.name, card.description, skills
                )
            })
            .collect();
        lines.sort();
        lines.join("\n")
    }
}
