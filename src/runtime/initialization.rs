//! # Initialization
//!
//! Operator start-up: rustls setup, tracing, metrics, server startup, and Kubernetes client
//! setup.

use crate::config::{load_config, ControllerConfig, ServerConfig};
use crate::controller::reconciler::Context;
use crate::controller::server::{start_server, ServerState};
use crate::observability;
use crate::store::KubeStore;
use anyhow::{Context as _, Result};
use kube::Client;
use std::sync::Arc;
use tracing::{error, info};

/// Initialization result containing all necessary components for the operator
pub struct InitializationResult {
    /// Kubernetes client
    pub client: Client,
    /// Reconciler context
    pub context: Arc<Context<KubeStore>>,
    /// Server state for health checks
    pub server_state: Arc<ServerState>,
}

/// Initialize the operator runtime
///
/// This function handles:
/// - rustls crypto provider setup
/// - Tracing subscriber setup
/// - Configuration loading
/// - Metrics registration
/// - HTTP server startup
/// - Kubernetes client creation
/// - Reconciler context setup
pub async fn initialize() -> Result<InitializationResult> {
    // Must run before anything opens a TLS connection
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        return Err(anyhow::anyhow!("Failed to install rustls crypto provider"));
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cars_operator=info".into()),
        )
        .init();

    info!("Starting Cars Operator");
    info!(
        "Build info: timestamp={}, datetime={}, git_hash={}",
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_DATETIME"),
        env!("BUILD_GIT_HASH")
    );

    let (controller_config, server_config) = load_config();
    info!(
        error_requeue_secs = controller_config.error_requeue_after.as_secs(),
        watch_namespace = controller_config.watch_namespace.as_deref().unwrap_or("<all>"),
        field_manager = %controller_config.field_manager,
        metrics_port = server_config.metrics_port,
        "Configuration loaded"
    );

    observability::metrics::register_metrics()?;

    let server_state = Arc::new(ServerState::new());
    let server_handle = spawn_server(&server_config, Arc::clone(&server_state));
    wait_for_server_ready(&server_config, &server_state, &server_handle).await?;

    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;

    let context = Arc::new(build_context(client.clone(), controller_config));

    info!("Operator initialized, starting watch loop...");

    Ok(InitializationResult {
        client,
        context,
        server_state,
    })
}

/// Reconciler context backed by the API server
pub fn build_context(client: Client, config: ControllerConfig) -> Context<KubeStore> {
    let store = KubeStore::new(client, config.field_manager.clone());
    Context::new(store, config)
}

fn spawn_server(
    config: &ServerConfig,
    server_state: Arc<ServerState>,
) -> tokio::task::JoinHandle<()> {
    let port = config.metrics_port;
    tokio::spawn(async move {
        if let Err(e) = start_server(port, server_state).await {
            error!("HTTP server error: {:#}", e);
        }
    })
}

/// Wait for the HTTP server to become ready
async fn wait_for_server_ready(
    config: &ServerConfig,
    server_state: &ServerState,
    server_handle: &tokio::task::JoinHandle<()>,
) -> Result<()> {
    let startup_timeout = config.startup_timeout();
    let poll_interval = config.poll_interval();
    let start_time = std::time::Instant::now();

    loop {
        // Check if server task crashed
        if server_handle.is_finished() {
            return Err(anyhow::anyhow!("HTTP server failed to start"));
        }

        if server_state.ready() {
            info!("HTTP server is ready and accepting connections");
            return Ok(());
        }

        if start_time.elapsed() > startup_timeout {
            return Err(anyhow::anyhow!(
                "HTTP server failed to become ready within {} seconds",
                startup_timeout.as_secs()
            ));
        }

        tokio::time::sleep(poll_interval).await;
    }
}
