//! Agent card retrieval — the lightweight "describe yourself" probe used
//! by discovery.

use crate::protocol::AgentCard;
use maestro_core::{MaestroError, MaestroResult};
use std::time::Duration;
use tracing::debug;

/// Well-known path an A2A agent serves its card at.
pub const AGENT_CARD_PATH: &str = "/.well-known/agent.json";

/// Fetch the agent card from `base_url`.
///
/// Unreachable hosts, non-2xx responses and unparsable bodies all surface
/// as [`MaestroError::Http`]; discovery treats any of these as "no agent
/// at this address".
pub async fn fetch_agent_card(
    http: &reqwest::Client,
    base_url: &str,
    timeout: Duration,
) -> MaestroResult<AgentCard> {
    let url = format!("{}{}", base_url.trim_end_matches('/'), AGENT_CARD_PATH);
    debug!(url = %url, "Fetching agent card");

    let response = http
        .get(&url)
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| MaestroError::Http(format!("Card request to {url} failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(MaestroError::Http(format!(
            "Card request to {url} returned status {status}"
        )));
    }

    let card: AgentCard = response
        .json()
        .await
        .map_err(|e| MaestroError::Http(format!("Malformed agent card from {url}: {e}")))?;

    Ok(card)
}
