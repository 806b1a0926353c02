//! Periodic agent discovery — probes a configured address/port space and
//! refreshes the registry with every card it finds.

use crate::gate::Gate;
use crate::registry::AgentRegistry;
use futures_util::future::join_all;
use maestro_a2a::fetch_agent_card;
use maestro_core::{MaestroError, MaestroResult};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Configuration for the discovery loop.
#[derive(Debug, Clone, Deserialize)]
pub struct DiscoveryConfig {
    /// Base URLs to probe, scheme included (e.g. `http://localhost`).
    #[serde(default)]
    pub hosts: Vec<String>,
    /// Inclusive port range in `start-end` form, e.g. `8001-8010`.
    #[serde(default)]
    pub ports: String,
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,
}

fn default_interval_secs() -> u64 {
    3000
}

fn default_probe_timeout_secs() -> u64 {
    3
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            hosts: Vec::new(),
            ports: String::new(),
            interval_secs: default_interval_secs(),
            probe_timeout_secs: default_probe_timeout_secs(),
        }
    }
}

/// Parse an inclusive `start-end` port range.
pub fn parse_port_range(ports: &str) -> MaestroResult<RangeInclusive<u16>> {
    let invalid = || {
        MaestroError::Config(format!(
            "Invalid port range '{ports}'. Expected format is 'start-end', e.g. '8001-8010'"
        ))
    };
    let (start, end) = ports.split_once('-').ok_or_else(invalid)?;
    let start: u16 = start.trim().parse().map_err(|_| invalid())?;
    let end: u16 = end.trim().parse().map_err(|_| invalid())?;
    if start > end {
        return Err(invalid());
    }
    Ok(start..=end)
}

/// The background discovery worker.
pub struct Discovery {
    registry: Arc<Gate<AgentRegistry>>,
    http: reqwest::Client,
    config: DiscoveryConfig,
}

impl Discovery {
    pub fn new(
        registry: Arc<Gate<AgentRegistry>>,
        http: reqwest::Client,
        config: DiscoveryConfig,
    ) -> Self {
        Self {
            registry,
            http,
            config,
        }
    }

    /// Run discovery on a fixed interval until `shutdown` fires.
    ///
    /// A refresh cycle that fails is logged and the loop continues; the
    /// gate is held for the entire duration of each cycle and released
    /// before the inter-cycle sleep. The caller awaits the task handle of
    /// this future as the cancellation acknowledgement.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let interval = Duration::from_secs(self.config.interval_secs);
        loop {
            {
                let mut registry = self.registry.lock().await;
                info!("Starting periodic agent discovery");
                match self.refresh(&mut registry).await {
                    Ok(()) => {
                        info!(agents = registry.len(), "Periodic agent discovery finished");
                    }
                    Err(e) => error!(error = %e, "Agent discovery cycle failed"),
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = shutdown.changed() => {
                    info!("Discovery loop shutting down");
                    break;
                }
            }
        }
    }

    /// One refresh cycle: probe every candidate address and insert each
    /// reachable agent's card under its self-reported name.
    pub async fn refresh(&self, registry: &mut AgentRegistry) -> MaestroResult<()> {
        if self.config.hosts.is_empty() || self.config.ports.is_empty() {
            info!("Agent discovery configuration is incomplete; set both hosts and ports");
            return Ok(());
        }

        let port_range = parse_port_range(&self.config.ports)?;
        let candidates: BTreeSet<String> = self
            .config
            .hosts
            .iter()
            .flat_map(|host| {
                let host = host.trim_end_matches('/').to_string();
                port_range.clone().map(move |port| format!("{host}:{port}"))
            })
            .collect();

        if candidates.is_empty() {
            warn!("No agent URLs were generated for discovery");
            return Ok(());
        }

        let timeout = Duration::from_secs(self.config.probe_timeout_secs);
        let probes = candidates
            .iter()
            .map(|url| fetch_agent_card(&self.http, url, timeout));

        let mut found: Vec<String> = Vec::new();
        for (url, result) in candidates.iter().zip(join_all(probes).await) {
            match result {
                Ok(card) => {
                    debug!(url = %url, agent = %card.name, "Registered agent card");
                    found.push(card.url.clone());
                    registry.insert(card);
                }
                Err(e) => {
                    debug!(url = %url, error = %e, "No agent card at probe address");
                }
            }
        }

        if !found.is_empty() {
            info!(urls = %found.join(", "), "Discovered and registered agents");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn card_body(name: &str, url: &str) -> serde_json::Value {
        serde_json::json!({
            "name": name,
            "description": format!("{name} description"),
            "url": url,
            "skills": []
        })
    }

    fn config_for(server: &MockServer, extra: DiscoveryConfig) -> DiscoveryConfig {
        let address = server.address();
        DiscoveryConfig {
            hosts: vec![format!("http://{}", address.ip())],
            ports: format!("{0}-{0}", address.port()),
            ..extra
        }
    }

    fn base_config() -> DiscoveryConfig {
        DiscoveryConfig {
            hosts: vec![],
            ports: String::new(),
            interval_secs: 3000,
            probe_timeout_secs: 1,
        }
    }

    #[test]
    fn test_parse_port_range() {
        assert_eq!(parse_port_range("8001-8010").unwrap(), 8001..=8010);
        assert_eq!(parse_port_range("8001-8001").unwrap(), 8001..=8001);
        assert!(parse_port_range("8001").is_err());
        assert!(parse_port_range("a-b").is_err());
        assert!(parse_port_range("8010-8001").is_err());
    }

    #[tokio::test]
    async fn test_refresh_registers_by_reported_name() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/.well-known/agent.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(card_body(
                "Review Agent",
                "http://agents.internal:9001",
            )))
            .mount(&server)
            .await;

        let discovery = Discovery::new(
            Arc::new(Gate::new(AgentRegistry::new(), Duration::from_secs(1))),
            reqwest::Client::new(),
            config_for(&server, base_config()),
        );

        let mut registry = AgentRegistry::new();
        discovery.refresh(&mut registry).await.unwrap();
        // Keyed by the card's own name, carrying the card's own URL — not
        // the probe address.
        let card = registry.get("Review Agent").unwrap();
        assert_eq!(card.url, "http://agents.internal:9001");
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_refresh_skips_unreachable_ports() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/.well-known/agent.json"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(card_body("Only Agent", &server.uri())),
            )
            .mount(&server)
            .await;

        // Probe a two-port range where only one port answers.
        let address = server.address();
        let config = DiscoveryConfig {
            hosts: vec![format!("http://{}", address.ip())],
            ports: format!("{}-{}", address.port(), address.port() as u32 + 1),
            ..base_config()
        };
        let discovery = Discovery::new(
            Arc::new(Gate::new(AgentRegistry::new(), Duration::from_secs(1))),
            reqwest::Client::new(),
            config,
        );

        let mut registry = AgentRegistry::new();
        discovery.refresh(&mut registry).await.unwrap();
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_refresh_with_incomplete_config_is_noop() {
        let discovery = Discovery::new(
            Arc::new(Gate::new(AgentRegistry::new(), Duration::from_secs(1))),
            reqwest::Client::new(),
            base_config(),
        );
        let mut registry = AgentRegistry::new();
        discovery.refresh(&mut registry).await.unwrap();
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_refresh_with_bad_port_range_is_error() {
        let discovery = Discovery::new(
            Arc::new(Gate::new(AgentRegistry::new(), Duration::from_secs(1))),
            reqwest::Client::new(),
            DiscoveryConfig {
                hosts: vec!["http://localhost".to_string()],
                ports: "oops".to_string(),
                ..base_config()
            },
        );
        let mut registry = AgentRegistry::new();
        let err = discovery.refresh(&mut registry).await.unwrap_err();
        assert!(matches!(err, MaestroError::Config(_)));
    }

    #[tokio::test]
    async fn test_run_acknowledges_shutdown() {
        let server = MockServer::start().await;
        let discovery = Discovery::new(
            Arc::new(Gate::new(AgentRegistry::new(), Duration::from_secs(1))),
            reqwest::Client::new(),
            config_for(&server, base_config()),
        );

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(discovery.run(shutdown_rx));
        tokio::time::sleep(Duration::from_millis(100)).await;

        shutdown_tx.send(true).unwrap();
        // The loop must acknowledge cancellation by finishing on its own.
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("discovery did not acknowledge shutdown")
            .unwrap();
    }
}
