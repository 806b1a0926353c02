use serde::{Deserialize, Serialize};

/// Configuration for the LLM-backed oracle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleConfig {
    pub model_id: String,
    pub api_key: String,
    /// Base URL of an OpenAI-compatible chat completions API.
    pub api_base_url: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_top_p")]
    pub top_p: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_temperature() -> f32 {
    0.0
}

fn default_top_p() -> f32 {
    1.0
}

fn default_max_tokens() -> u32 {
    4096
}

impl OracleConfig {
    /// Full URL of the chat completions endpoint.
    pub fn completions_url(&self) -> String {
        format!(
            "{}/v1/chat/completions",
            self.api_base_url.trim_end_matches('/')
        )
    }
}
