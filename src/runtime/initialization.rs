//! # Initialization
//!
//! Controller initialization logic including rustls setup, tracing, metrics,
//! server startup, and Kubernetes client setup.

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use kube::api::{Api, ListParams};
use kube::Client;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::{ControllerConfig, LogFormat, ServerConfig};
use crate::controller::reconciler::Reconciler;
use crate::controller::server::{start_server, ServerState};
use crate::crd::NginxSet;
use crate::observability;

/// Initialization result containing all necessary components for the controller
pub struct InitializationResult {
    /// Kubernetes client
    pub client: Client,
    /// Reconciler context
    pub reconciler: Arc<Reconciler>,
    /// Server state for health checks
    pub server_state: Arc<ServerState>,
    /// Controller configuration
    pub config: ControllerConfig,
}

impl std::fmt::Debug for InitializationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InitializationResult")
            .field("server_ready", &self.server_state.ready())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Initialize the controller runtime
///
/// This function handles:
/// - rustls crypto provider setup
/// - Tracing subscriber setup
/// - Metrics registration
/// - HTTP server startup
/// - Kubernetes client creation
/// - Reconciler setup
/// - CRD availability check
pub async fn initialize() -> Result<InitializationResult> {
    // Must run before anything opens a TLS connection
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        return Err(anyhow::anyhow!("Failed to install rustls crypto provider"));
    }

    let config = ControllerConfig::from_env();
    let server_config = ServerConfig::from_env();

    init_tracing(&config);

    info!("Starting NginxSet Controller");
    info!(
        "Build info: datetime={}, git_hash={}",
        env!("BUILD_DATETIME"),
        env!("BUILD_GIT_HASH")
    );
    info!(
        sync_period_secs = config.sync_period_secs,
        max_concurrent_reconciles = config.max_concurrent_reconciles,
        watch_namespace = config.watch_namespace.as_deref().unwrap_or("*"),
        "Controller configuration loaded"
    );

    if config.enable_metrics {
        observability::metrics::register_metrics().context("Failed to register metrics")?;
    } else {
        warn!("Metrics collection disabled (ENABLE_METRICS=false)");
    }

    let server_state = Arc::new(ServerState::default());

    // Start server in background task and wait for it to bind
    let server_state_clone = Arc::clone(&server_state);
    let server_port = server_config.metrics_port;
    let server_handle = tokio::spawn(async move {
        if let Err(e) = start_server(server_port, server_state_clone).await {
            error!("HTTP server error: {}", e);
        }
    });
    wait_for_server_ready(&server_state, &server_handle, &server_config).await?;

    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;

    let reconciler = Arc::new(Reconciler::from_client(&client, config.clone()));

    check_crd_available(&client, &config).await;

    info!("Controller initialized, starting watch loop...");

    Ok(InitializationResult {
        client,
        reconciler,
        server_state,
        config,
    })
}

/// Install the global tracing subscriber
///
/// `RUST_LOG` wins over `LOG_LEVEL` when both are set.
fn init_tracing(config: &ControllerConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("nginxset_controller={}", config.log_level).into());

    let result = match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(true)
            .try_init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).try_init(),
    };

    if let Err(e) = result {
        eprintln!("Tracing subscriber already initialized: {e}");
    }
}

/// Wait for the HTTP server to become ready
async fn wait_for_server_ready(
    server_state: &Arc<ServerState>,
    server_handle: &tokio::task::JoinHandle<()>,
    server_config: &ServerConfig,
) -> Result<()> {
    let startup_timeout = server_config.startup_timeout();
    let poll_interval = server_config.poll_interval();
    let start_time = Instant::now();

    loop {
        if server_handle.is_finished() {
            return Err(anyhow::anyhow!("HTTP server failed to start"));
        }

        // Set by start_server once bound
        if server_state.ready() {
            info!("HTTP server is ready and accepting connections");
            break;
        }

        if start_time.elapsed() > startup_timeout {
            return Err(anyhow::anyhow!(
                "HTTP server failed to become ready within {} seconds",
                startup_timeout.as_secs()
            ));
        }

        tokio::time::sleep(poll_interval).await;
    }

    Ok(())
}

/// Log whether the `NginxSet` CRD can be listed
///
/// Failure is not fatal; the watch keeps retrying until the CRD shows up.
async fn check_crd_available(client: &Client, config: &ControllerConfig) {
    let nginxsets: Api<NginxSet> = match config.watch_namespace.as_deref() {
        Some(namespace) => Api::namespaced(client.clone(), namespace),
        None => Api::all(client.clone()),
    };

    match nginxsets.list(&ListParams::default().limit(1)).await {
        Ok(_) => info!("CRD is queryable, NginxSet resources will be reconciled"),
        Err(e) => {
            error!("CRD is not queryable; {:?}. Is the CRD installed?", e);
            error!("Installation: cargo run --bin crdgen | kubectl apply -f -");
            warn!("Continuing despite CRD queryability check failure - controller will retry");
        }
    }
}
