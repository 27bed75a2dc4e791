//! # NginxSet Controller
//!
//! A Kubernetes controller that keeps an nginx Deployment in sync with each
//! `NginxSet` custom resource.
//!
//! ## Overview
//!
//! For every `NginxSet` the controller:
//!
//! 1. **Registers a finalizer** so deletions are observed
//! 2. **Creates or scales a Deployment** of the same name to `spec.replicas`
//! 3. **Reports progress** through a Ready condition and a failure counter
//! 4. **Stops retrying** after five consecutive failed installs
//!
//! ## Endpoints
//!
//! - `/metrics` - Prometheus metrics
//! - `/healthz` - Liveness probe
//! - `/readyz` - Readiness probe

use anyhow::Result;
use nginxset_controller::runtime::{initialization::initialize, watch_loop::run_watch_loop};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let init = initialize().await?;

    run_watch_loop(
        init.client,
        init.reconciler,
        init.server_state,
        init.config,
    )
    .await?;

    info!("NginxSet Controller exited");
    Ok(())
}
