//! # Workload
//!
//! Keeps the nginx Deployment owned by an `NginxSet` in line with its spec.
//!
//! The Deployment shares the NginxSet's name and namespace and carries a
//! controller owner reference back to it. Only the replica count is ever
//! reconciled after creation.

use std::collections::BTreeMap;

use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{Container, ContainerPort, PodSpec, PodTemplateSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use kube::api::ObjectMeta;
use kube::Resource;
use tracing::{debug, info};

use crate::constants::{
    APP_LABEL_KEY, APP_LABEL_VALUE, NGINX_CONTAINER_NAME, NGINX_CONTAINER_PORT, NGINX_IMAGE,
};
use crate::controller::reconciler::types::{object_key, Reconciler, ReconcilerError};
use crate::crd::NginxSet;
use crate::observability::metrics;
use crate::store::StoreError;

/// What a sync did to the Deployment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkloadAction {
    Created,
    Patched,
    Unchanged,
}

impl WorkloadAction {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkloadAction::Created => "create",
            WorkloadAction::Patched => "patch",
            WorkloadAction::Unchanged => "none",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PatchPolicy {
    Always,
    OnDrift,
}

fn app_labels() -> BTreeMap<String, String> {
    BTreeMap::from([(APP_LABEL_KEY.to_string(), APP_LABEL_VALUE.to_string())])
}

/// Build the Deployment for a new NginxSet
pub fn build_deployment(nginxset: &NginxSet) -> Result<Deployment, ReconcilerError> {
    let key = object_key(nginxset)?;
    let owner = nginxset
        .controller_owner_ref(&())
        .ok_or_else(|| ReconcilerError::OwnerReference(key.clone()))?;

    Ok(Deployment {
        metadata: ObjectMeta {
            name: Some(key.name),
            namespace: Some(key.namespace),
            owner_references: Some(vec![owner]),
            ..Default::default()
        },
        spec: Some(DeploymentSpec {
            replicas: Some(nginxset.spec.replicas),
            selector: LabelSelector {
                match_labels: Some(app_labels()),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(app_labels()),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    containers: vec![Container {
                        name: NGINX_CONTAINER_NAME.to_string(),
                        image: Some(NGINX_IMAGE.to_string()),
                        ports: Some(vec![ContainerPort {
                            name: Some("http".to_string()),
                            protocol: Some("TCP".to_string()),
                            container_port: NGINX_CONTAINER_PORT,
                            ..Default::default()
                        }]),
                        ..Default::default()
                    }],
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    })
}

/// Create the Deployment if missing, otherwise always patch its replica count
pub async fn install_or_upgrade(
    ctx: &Reconciler,
    nginxset: &NginxSet,
) -> Result<WorkloadAction, ReconcilerError> {
    sync_deployment(ctx, nginxset, PatchPolicy::Always).await
}

/// Create the Deployment if missing, otherwise patch only on replica drift
pub async fn sync_steady_state(
    ctx: &Reconciler,
    nginxset: &NginxSet,
) -> Result<WorkloadAction, ReconcilerError> {
    sync_deployment(ctx, nginxset, PatchPolicy::OnDrift).await
}

async fn sync_deployment(
    ctx: &Reconciler,
    nginxset: &NginxSet,
    policy: PatchPolicy,
) -> Result<WorkloadAction, ReconcilerError> {
    let key = object_key(nginxset)?;
    let child_error = |source: StoreError| ReconcilerError::ChildSync {
        key: key.clone(),
        source,
    };

    let current = match ctx.deployments.get(&key).await {
        Ok(current) => current,
        Err(e) if e.is_not_found() => {
            let deployment = build_deployment(nginxset)?;
            ctx.deployments.create(&deployment).await.map_err(child_error)?;
            info!(
                resource.namespace = %key.namespace,
                resource.name = %key.name,
                replicas = nginxset.spec.replicas,
                "Created deployment"
            );
            metrics::increment_deployment_writes(WorkloadAction::Created.as_str());
            return Ok(WorkloadAction::Created);
        }
        Err(e) => return Err(child_error(e)),
    };

    let desired = Some(nginxset.spec.replicas);
    let actual = current.spec.as_ref().and_then(|s| s.replicas);
    if policy == PatchPolicy::OnDrift && actual == desired {
        debug!(resource = %key, replicas = ?actual, "Deployment replicas already in sync");
        return Ok(WorkloadAction::Unchanged);
    }

    let mut patched = current.clone();
    patched.spec.get_or_insert_with(Default::default).replicas = desired;
    ctx.deployments
        .patch(&patched, &current)
        .await
        .map_err(child_error)?;
    info!(
        resource.namespace = %key.namespace,
        resource.name = %key.name,
        from = ?actual,
        to = nginxset.spec.replicas,
        "Patched deployment replicas"
    );
    metrics::increment_deployment_writes(WorkloadAction::Patched.as_str());
    Ok(WorkloadAction::Patched)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::NginxSetSpec;

    fn nginxset(uid: Option<&str>) -> NginxSet {
        let mut obj = NginxSet::new("web", NginxSetSpec { replicas: 3 });
        obj.metadata.namespace = Some("default".to_string());
        obj.metadata.uid = uid.map(str::to_string);
        obj
    }

    #[test]
    fn test_deployment_template() {
        let deployment = build_deployment(&nginxset(Some("1234"))).unwrap();
        assert_eq!(deployment.metadata.name.as_deref(), Some("web"));
        assert_eq!(deployment.metadata.namespace.as_deref(), Some("default"));

        let spec = deployment.spec.unwrap();
        assert_eq!(spec.replicas, Some(3));
        assert_eq!(spec.selector.match_labels, Some(app_labels()));

        let template = spec.template;
        assert_eq!(template.metadata.unwrap().labels, Some(app_labels()));
        let pod_spec = template.spec.unwrap();
        let container = &pod_spec.containers[0];
        assert_eq!(container.name, "web");
        assert_eq!(container.image.as_deref(), Some("nginx:1.23.2"));
        let port = &container.ports.as_ref().unwrap()[0];
        assert_eq!(port.container_port, 80);
        assert_eq!(port.name.as_deref(), Some("http"));
        assert_eq!(port.protocol.as_deref(), Some("TCP"));
    }

    #[test]
    fn test_deployment_is_owned_by_nginxset() {
        let deployment = build_deployment(&nginxset(Some("1234"))).unwrap();
        let owners = deployment.metadata.owner_references.unwrap();
        assert_eq!(owners.len(), 1);
        let owner = &owners[0];
        assert_eq!(owner.api_version, "api.morpheusph.io/v1beta1");
        assert_eq!(owner.kind, "NginxSet");
        assert_eq!(owner.name, "web");
        assert_eq!(owner.uid, "1234");
        assert_eq!(owner.controller, Some(true));
    }

    #[test]
    fn test_owner_reference_requires_uid() {
        let err = build_deployment(&nginxset(None)).unwrap_err();
        assert!(matches!(err, ReconcilerError::OwnerReference(_)));
    }
}
