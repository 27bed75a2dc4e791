//! # Error Policy
//!
//! Handling of failed reconcile passes.
//!
//! Failed passes are retried on the same fixed interval as successful ones.
//! The failure counter in the object's status bounds how many install
//! attempts are made, so no per-object backoff is kept here.

use std::sync::Arc;

use kube::runtime::controller::Action;
use tracing::{error, warn};

use crate::controller::reconciler::{Reconciler, ReconcilerError};
use crate::crd::NginxSet;
use crate::observability;

pub fn handle_reconciliation_error(
    obj: Arc<NginxSet>,
    error: &ReconcilerError,
    ctx: Arc<Reconciler>,
) -> Action {
    let name = obj.metadata.name.as_deref().unwrap_or("unknown");
    let namespace = obj.metadata.namespace.as_deref().unwrap_or("default");

    let error_span = tracing::span!(
        tracing::Level::ERROR,
        "controller.watch.reconciliation_error",
        resource.name = name,
        resource.namespace = namespace,
        error = %error
    );
    let _error_guard = error_span.enter();

    if error.store_error().is_some_and(crate::store::StoreError::is_conflict) {
        warn!("Reconciliation of {}/{} hit a write conflict: {}", namespace, name, error);
    } else {
        error!("Reconciliation error for {}/{}: {:?}", namespace, name, error);
    }
    observability::metrics::increment_reconciliation_errors(error.metric_label());
    observability::metrics::increment_requeues("error");

    Action::requeue(ctx.config.sync_period())
}

/// Log a watch stream error; the stream itself retries with backoff
pub fn handle_watch_stream_error(error: &dyn std::fmt::Display) {
    warn!(error = %error, "watch.stream.error");
}
