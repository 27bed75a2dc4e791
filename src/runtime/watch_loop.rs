//! # Watch Loop
//!
//! Controller watch loop that monitors `NginxSet` resources and triggers
//! reconciliation when changes are detected.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use kube::api::Api;
use kube::runtime::{controller, reflector, watcher, Controller, WatchStreamExt};
use kube::Client;
#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::config::ControllerConfig;
use crate::controller::reconciler::{reconcile_object, Reconciler};
use crate::controller::server::ServerState;
use crate::crd::NginxSet;
use crate::runtime::error_policy::{handle_reconciliation_error, handle_watch_stream_error};
use crate::runtime::trigger::TriggerFilter;
use crate::store::ObjectKey;

fn nginxset_api(client: &Client, config: &ControllerConfig) -> Api<NginxSet> {
    match config.watch_namespace.as_deref() {
        Some(namespace) => Api::namespaced(client.clone(), namespace),
        None => Api::all(client.clone()),
    }
}

/// Turn a watch event into a reconcile trigger, if it warrants one
///
/// Deletions only clear the filter's memory; the pass that removes the
/// finalizer was already triggered by the deletion timestamp being set. A
/// completed relist prunes objects that vanished while the watch was down.
fn admit_event(
    filter: &TriggerFilter,
    event: Result<watcher::Event<NginxSet>, watcher::Error>,
) -> Option<Result<NginxSet, watcher::Error>> {
    match event {
        Ok(watcher::Event::Apply(obj) | watcher::Event::InitApply(obj)) => {
            filter.admit(&obj).then_some(Ok(obj))
        }
        Ok(watcher::Event::Delete(obj)) => {
            if let Ok(key) = ObjectKey::for_resource(&obj) {
                filter.forget(&key);
            }
            None
        }
        Ok(watcher::Event::Init) => {
            filter.begin_relist();
            None
        }
        Ok(watcher::Event::InitDone) => {
            filter.finish_relist();
            None
        }
        Err(e) => {
            handle_watch_stream_error(&e);
            Some(Err(e))
        }
    }
}

/// Resolves on SIGINT or SIGTERM
#[cfg(unix)]
async fn shutdown_signal() -> std::io::Result<()> {
    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result,
        _ = terminate.recv() => Ok(()),
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}

/// Mark the server not ready and publish shutdown once a signal arrives
///
/// The controller stream drains on the same signals through
/// `shutdown_on_signal`.
fn spawn_shutdown_listener(server_state: Arc<ServerState>) -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        if let Err(e) = shutdown_signal().await {
            warn!("Failed to listen for shutdown signal: {}", e);
            return;
        }
        info!("Received shutdown signal (SIGINT/SIGTERM), initiating graceful shutdown...");
        server_state.set_ready(false);
        tx.send_replace(true);
        info!("Marked server as not ready, waiting for in-flight reconciliations to complete...");
    });
    rx
}

/// Resolves once shutdown is published; never if the listener is gone
async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    if shutdown.wait_for(|requested| *requested).await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// Sit out the restart delay; true when shutdown was requested meanwhile
async fn wait_for_restart(shutdown: &mut watch::Receiver<bool>, delay: Duration) -> bool {
    tokio::select! {
        () = shutdown_requested(shutdown) => true,
        () = tokio::time::sleep(delay) => false,
    }
}

/// Run the controller watch loop
///
/// Watches `NginxSet` resources, admits only generation or annotation changes,
/// and dispatches reconciles with bounded concurrency. Restarts the watch if
/// the controller stream ends, until shutdown is requested.
pub async fn run_watch_loop(
    client: Client,
    reconciler: Arc<Reconciler>,
    server_state: Arc<ServerState>,
    config: ControllerConfig,
) -> Result<(), anyhow::Error> {
    let mut shutdown = spawn_shutdown_listener(Arc::clone(&server_state));

    loop {
        if *shutdown.borrow() {
            info!("Shutdown requested, exiting watch loop");
            break;
        }

        let watch_span = tracing::span!(
            tracing::Level::INFO,
            "controller.watch",
            operation = "watch_loop",
            namespace = config.watch_namespace.as_deref().unwrap_or("*")
        );
        let _watch_guard = watch_span.enter();

        info!(
            concurrency = config.max_concurrent_reconciles,
            sync_period_secs = config.sync_period_secs,
            "Starting controller watch loop..."
        );

        let filter = TriggerFilter::new();
        let (reader, writer) = reflector::store();
        let stream = reflector(
            writer,
            watcher(
                nginxset_api(&client, &config),
                watcher::Config::default().any_semantic(),
            ),
        )
        .default_backoff()
        .filter_map(move |event| futures::future::ready(admit_event(&filter, event)));

        Controller::for_stream(stream, reader)
            .with_config(
                controller::Config::default().concurrency(config.max_concurrent_reconciles),
            )
            .shutdown_on_signal()
            .run(
                reconcile_object,
                handle_reconciliation_error,
                Arc::clone(&reconciler),
            )
            .for_each(|result| async move {
                match result {
                    Ok((obj, _action)) => {
                        debug!("Reconciled: {}", obj);
                    }
                    Err(controller::Error::ObjectNotFound(obj)) => {
                        debug!("Object no longer exists (likely deleted): {}", obj);
                    }
                    Err(e) => {
                        debug!("reconcile.dispatch.error: {}", e);
                    }
                }
            })
            .await;

        warn!(
            "Controller watch stream ended, restarting in {} seconds...",
            config.watch_restart_delay_secs
        );
        if wait_for_restart(&mut shutdown, config.watch_restart_delay()).await {
            info!("Shutdown requested, exiting watch loop");
            break;
        }
    }

    info!("Controller stopped gracefully");
    Ok(())
}
