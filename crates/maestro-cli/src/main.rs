use clap::{Parser, Subcommand};
use maestro_core::TestExecutionRequest;
use maestro_engine::{
    AgentRegistry, Discovery, DiscoveryConfig, Engine, EngineConfig, Gate,
};
use maestro_gateway::{ApiKeyConfig, GatewayServer};
use maestro_oracle::{LlmOracle, OracleConfig};
use maestro_reporting::{
    AllureResultsWriter, TestManagementClient, ZephyrClient, ZephyrConfig,
};
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "maestro", about = "Maestro — QA agent orchestrator")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "maestro.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the orchestrator server
    Serve {
        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,
        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Send one test case directly to a locally running agent, bypassing
    /// discovery and routing. Useful when debugging a single agent.
    SendTestCase {
        /// Key of the test case in the test management system
        #[arg(long)]
        key: String,
        /// Port the agent listens on
        #[arg(long)]
        port: u16,
        /// Host the agent listens on
        #[arg(long, default_value = "http://localhost")]
        host: String,
    },
}

#[derive(Deserialize)]
struct MaestroConfig {
    oracle: OracleConfig,
    zephyr: ZephyrConfig,
    #[serde(default)]
    discovery: DiscoveryConfig,
    #[serde(default)]
    engine: EngineConfig,
    #[serde(default)]
    server: ServerConfig,
    #[serde(default = "default_report_dir")]
    report_dir: PathBuf,
}

#[derive(Deserialize)]
struct ServerConfig {
    #[serde(default = "default_host")]
    host: String,
    #[serde(default = "default_port")]
    port: u16,
    /// When set, every trigger request must carry it in `X-API-Key`.
    #[serde(default)]
    api_key: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            api_key: None,
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_report_dir() -> PathBuf {
    PathBuf::from(".")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    let cli = Cli::parse();

    let config_str = tokio::fs::read_to_string(&cli.config).await.map_err(|e| {
        anyhow::anyhow!(
            "Failed to read config file '{}': {}",
            cli.config.display(),
            e
        )
    })?;
    let config: MaestroConfig = toml::from_str(&config_str)?;

    match cli.command {
        Commands::Serve { host, port } => {
            let host = host.unwrap_or_else(|| config.server.host.clone());
            let port = port.unwrap_or(config.server.port);
            serve(config, host, port).await
        }
        Commands::SendTestCase { key, port, host } => send_test_case(config, &key, &host, port).await,
    }
}

/// Load one test case and submit it to the agent at `host:port`,
/// printing the terminal state and any text output.
async fn send_test_case(
    config: MaestroConfig,
    key: &str,
    host: &str,
    port: u16,
) -> anyhow::Result<()> {
    let http = reqwest::Client::new();
    let management = ZephyrClient::new(config.zephyr, http.clone())?;
    let test_case = management.fetch_test_case_by_key(key).await?;
    info!(key = %key, name = %test_case.name, "Loaded test case");

    let base_url = format!("{host}:{port}");
    let card = maestro_a2a::fetch_agent_card(
        &http,
        &base_url,
        std::time::Duration::from_secs(config.discovery.probe_timeout_secs),
    )
    .await?;
    info!(agent = %card.name, "Connected to agent");

    let client = maestro_a2a::A2aClient::new(http, &card);
    let payload = serde_json::to_string(&TestExecutionRequest { test_case })?;
    let timeout = std::time::Duration::from_secs(config.engine.task_timeout_secs);
    let (_, task) = client.send_message(&payload, timeout).await?;

    println!("Task {} finished in state '{}'", task.id, task.status.state);
    if let Some(text) = task.first_artifact_text() {
        println!("{text}");
    }
    Ok(())
}

async fn serve(config: MaestroConfig, host: String, port: u16) -> anyhow::Result<()> {
    info!("Starting Maestro orchestrator on {}:{}", host, port);

    let http = reqwest::Client::new();
    let registry = Arc::new(Gate::new(
        AgentRegistry::new(),
        config.engine.request_wait(),
    ));

    let oracle = Arc::new(LlmOracle::new(config.oracle, http.clone()));
    let management = Arc::new(ZephyrClient::new(config.zephyr, http.clone())?);
    let reporting = Arc::new(AllureResultsWriter::new(config.report_dir));

    let engine = Arc::new(Engine::new(
        registry.clone(),
        http.clone(),
        oracle.clone(),
        oracle,
        management,
        reporting,
        &config.engine,
    ));

    // The one long-lived background task: periodic agent discovery.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let discovery = Discovery::new(registry, http, config.discovery);
    let discovery_handle = tokio::spawn(discovery.run(shutdown_rx));

    let app = GatewayServer::build(engine, ApiKeyConfig::new(config.server.api_key));
    let listener = tokio::net::TcpListener::bind((host.as_str(), port)).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await?;

    // Cancel discovery cooperatively and wait for its acknowledgement
    // before finishing teardown.
    info!("Maestro shutting down");
    let _ = shutdown_tx.send(true);
    discovery_handle.await?;
    info!("Agent discovery task stopped");

    Ok(())
}
