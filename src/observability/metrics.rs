//! # Metrics
//!
//! Prometheus metrics for monitoring the controller.
//!
//! ## Metrics Exposed
//!
//! - `nginxset_reconciliations_total` - Total number of reconciliations
//! - `nginxset_reconciliation_errors_total` - Total number of reconciliation errors, by kind
//! - `nginxset_reconciliation_duration_seconds` - Duration of reconciliation passes
//! - `nginxset_requeues_total` - Requeues scheduled, by reason
//! - `nginxset_deployment_writes_total` - Writes to the managed Deployment, by operation
//! - `nginxset_failure_budget_exhausted_total` - Passes that stopped on an exhausted failure budget
//! - `nginxset_finalizers_removed_total` - Finalizers removed on deletion

use anyhow::Result;
use prometheus::core::Collector;
use prometheus::{Histogram, IntCounter, IntCounterVec, Registry};
use std::sync::LazyLock;

// Metrics
pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static RECONCILIATIONS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "nginxset_reconciliations_total",
        "Total number of reconciliations",
    )
    .expect("Failed to create RECONCILIATIONS_TOTAL metric - this should never happen")
});

static RECONCILIATION_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "nginxset_reconciliation_errors_total",
            "Total number of reconciliation errors by error kind",
        ),
        &["kind"],
    )
    .expect("Failed to create RECONCILIATION_ERRORS_TOTAL metric - this should never happen")
});

static RECONCILIATION_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "nginxset_reconciliation_duration_seconds",
            "Duration of reconciliation in seconds",
        )
        .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0]),
    )
    .expect("Failed to create RECONCILIATION_DURATION metric - this should never happen")
});

static REQUEUES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "nginxset_requeues_total",
            "Total number of requeues scheduled by reason",
        ),
        &["reason"],
    )
    .expect("Failed to create REQUEUES_TOTAL metric - this should never happen")
});

static DEPLOYMENT_WRITES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "nginxset_deployment_writes_total",
            "Total number of writes to managed Deployments by operation",
        ),
        &["operation"],
    )
    .expect("Failed to create DEPLOYMENT_WRITES_TOTAL metric - this should never happen")
});

static FAILURE_BUDGET_EXHAUSTED_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "nginxset_failure_budget_exhausted_total",
        "Total number of passes stopped because the failure budget was exhausted",
    )
    .expect("Failed to create FAILURE_BUDGET_EXHAUSTED_TOTAL metric - this should never happen")
});

static FINALIZERS_REMOVED_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "nginxset_finalizers_removed_total",
        "Total number of finalizers removed from deleted NginxSets",
    )
    .expect("Failed to create FINALIZERS_REMOVED_TOTAL metric - this should never happen")
});

/// Register every controller metric with [`REGISTRY`]
///
/// Safe to call more than once; collectors already registered are skipped.
pub fn register_metrics() -> Result<()> {
    register(RECONCILIATIONS_TOTAL.clone())?;
    register(RECONCILIATION_ERRORS_TOTAL.clone())?;
    register(RECONCILIATION_DURATION.clone())?;
    register(REQUEUES_TOTAL.clone())?;
    register(DEPLOYMENT_WRITES_TOTAL.clone())?;
    register(FAILURE_BUDGET_EXHAUSTED_TOTAL.clone())?;
    register(FINALIZERS_REMOVED_TOTAL.clone())?;

    Ok(())
}

fn register<C: Collector + 'static>(collector: C) -> Result<()> {
    match REGISTRY.register(Box::new(collector)) {
        Ok(()) | Err(prometheus::Error::AlreadyReg) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Gather all registered metrics
#[must_use]
pub fn gather() -> Vec<prometheus::proto::MetricFamily> {
    REGISTRY.gather()
}

pub fn increment_reconciliations() {
    RECONCILIATIONS_TOTAL.inc();
}

pub fn increment_reconciliation_errors(kind: &str) {
    RECONCILIATION_ERRORS_TOTAL.with_label_values(&[kind]).inc();
}

pub fn observe_reconciliation_duration(duration: f64) {
    RECONCILIATION_DURATION.observe(duration);
}

pub fn increment_requeues(reason: &str) {
    REQUEUES_TOTAL.with_label_values(&[reason]).inc();
}

pub fn increment_deployment_writes(operation: &str) {
    DEPLOYMENT_WRITES_TOTAL.with_label_values(&[operation]).inc();
}

pub fn increment_failure_budget_exhausted() {
    FAILURE_BUDGET_EXHAUSTED_TOTAL.inc();
}

pub fn increment_finalizers_removed() {
    FINALIZERS_REMOVED_TOTAL.inc();
}
