//! # Reconcile
//!
//! One reconcile pass over a single `NginxSet`.
//!
//! 1. Fetch the object; a missing object is done
//! 2. Register the finalizer
//! 3. Deleting: drop the finalizer and stop
//! 4. New generation: record it, mark Ready Unknown/Progressing, reset failures, persist
//! 5. Classify; an exhausted failure budget records a terminal condition and stops
//! 6. Install-or-upgrade or steady-state sync of the Deployment
//! 7. Ready True on success, Ready False plus one failure otherwise
//! 8. Persist status
//!
//! Every pass that gets past step 1 requeues after the fixed sync period.

use std::sync::Arc;
use std::time::Instant;

use kube::runtime::controller::Action;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::constants::NGINXSET_FINALIZER;
use crate::controller::reconciler::classify::{classify, ReleaseState};
use crate::controller::reconciler::finalizer::{ensure_finalizer, is_deleting, remove_finalizer};
use crate::controller::reconciler::status::patch_status;
use crate::controller::reconciler::status_object::{
    release_aborted, release_not_ready, release_progressing, set_ready, FailureObject,
    StatusObject,
};
use crate::controller::reconciler::types::{object_key, Reconciler, ReconcilerError};
use crate::controller::reconciler::workload;
use crate::crd::NginxSet;
use crate::observability::metrics;
use crate::store::ObjectKey;

/// Entry point used by the controller runtime
pub async fn reconcile_object(
    nginxset: Arc<NginxSet>,
    ctx: Arc<Reconciler>,
) -> Result<Action, ReconcilerError> {
    let key = object_key(nginxset.as_ref())?;
    reconcile(key, ctx).await
}

/// Reconcile the `NginxSet` identified by `key`
pub async fn reconcile(key: ObjectKey, ctx: Arc<Reconciler>) -> Result<Action, ReconcilerError> {
    let span = info_span!(
        "reconcile",
        resource.namespace = %key.namespace,
        resource.name = %key.name
    );
    let start = Instant::now();
    metrics::increment_reconciliations();

    let result = reconcile_pass(&key, &ctx).instrument(span).await;

    metrics::observe_reconciliation_duration(start.elapsed().as_secs_f64());
    result
}

async fn reconcile_pass(key: &ObjectKey, ctx: &Reconciler) -> Result<Action, ReconcilerError> {
    info!("reconcile request");

    let mut nginxset = match ctx.nginxsets.get(key).await {
        Ok(nginxset) => nginxset,
        Err(e) if e.is_not_found() => {
            info!("NginxSet {key} was deleted");
            return Ok(Action::await_change());
        }
        Err(source) => {
            return Err(ReconcilerError::Fetch {
                key: key.clone(),
                source,
            })
        }
    };

    ensure_finalizer(ctx.nginxsets.as_ref(), &mut nginxset, NGINXSET_FINALIZER)
        .await
        .map_err(|source| {
            error!(error = %source, "unable to register finalizer");
            ReconcilerError::FinalizerRegistration {
                key: key.clone(),
                source,
            }
        })?;

    if is_deleting(&nginxset) {
        return reconcile_delete(key, ctx, nginxset).await;
    }

    if nginxset.has_generation_drift() {
        let generation = nginxset.generation();
        debug!(
            generation,
            observed_generation = nginxset.observed_generation(),
            "New generation observed"
        );
        nginxset.set_observed_generation(generation);
        release_progressing(&mut nginxset);
        persist_status(key, ctx, &nginxset, "after generation update").await?;
    }

    let state = classify(&nginxset);
    info!(state = %state, "reconciling nginxset");

    let outcome = match state {
        ReleaseState::Abort => {
            let message = release_aborted(&mut nginxset);
            warn!(failures = nginxset.failures().get(), "{message}");
            metrics::increment_failure_budget_exhausted();
            persist_status(key, ctx, &nginxset, "after reconciliation").await?;
            return Ok(requeue(ctx, "abort"));
        }
        ReleaseState::NeedsInstallOrUpgrade => workload::install_or_upgrade(ctx, &nginxset).await,
        ReleaseState::Unchanged => workload::sync_steady_state(ctx, &nginxset).await,
    };

    match &outcome {
        Ok(action) => {
            debug!(deployment = action.as_str(), "Deployment synced");
            set_ready(&mut nginxset);
        }
        Err(e) => {
            warn!(error = %e, "Deployment sync failed");
            release_not_ready(&mut nginxset, &e.to_string());
        }
    }

    persist_status(key, ctx, &nginxset, "after reconciliation").await?;

    outcome.map(|_| requeue(ctx, "sync-period"))
}

async fn reconcile_delete(
    key: &ObjectKey,
    ctx: &Reconciler,
    mut nginxset: NginxSet,
) -> Result<Action, ReconcilerError> {
    info!("reconcileDelete");
    remove_finalizer(ctx.nginxsets.as_ref(), &mut nginxset, NGINXSET_FINALIZER)
        .await
        .map_err(|source| ReconcilerError::Deletion {
            key: key.clone(),
            source,
        })?;
    metrics::increment_finalizers_removed();
    info!("Removed finalizer, deletion can proceed");
    Ok(Action::await_change())
}

async fn persist_status(
    key: &ObjectKey,
    ctx: &Reconciler,
    nginxset: &NginxSet,
    stage: &str,
) -> Result<(), ReconcilerError> {
    patch_status(ctx.nginxsets.as_ref(), nginxset)
        .await
        .map(|_| ())
        .map_err(|source| {
            error!(error = %source, "unable to update status {stage}");
            ReconcilerError::StatusPatch {
                key: key.clone(),
                source,
            }
        })
}

fn requeue(ctx: &Reconciler, reason: &str) -> Action {
    metrics::increment_requeues(reason);
    Action::requeue(ctx.config.sync_period())
}
