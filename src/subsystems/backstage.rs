//! Developer-portal subsystem: Backstage (RHDH) operator subscription, the
//! npm registry secret for dynamic plugins, and the Backstage custom
//! resource.

use kube::core::GroupVersionKind;
use tracing::{debug, info, instrument};

use super::{
    Outcome, SubsystemError, delete_custom_resource, delete_namespace,
    ensure_custom_resource, ensure_operator, remove_subscription,
};
use crate::cluster::secret_gvk;
use crate::controller::ControllerContext;
use crate::crd::orchestrator::Orchestrator;
use crate::templates;

pub const OPERATOR_GROUP: &str = "rhdh-operator-group";
pub const BACKSTAGE_CRD: &str = "backstages.rhdh.redhat.com";
pub const BACKSTAGE_CR: &str = "orchestrator-backstage";
pub const REGISTRY_SECRET: &str = "dynamic-plugins-npmrc";

fn backstage_gvk() -> GroupVersionKind {
    GroupVersionKind::gvk("rhdh.redhat.com", "v1alpha1", "Backstage")
}

fn ingress_gvk() -> GroupVersionKind {
    GroupVersionKind::gvk("config.openshift.io", "v1", "Ingress")
}

#[instrument(skip_all)]
pub async fn reconcile(
    ctx: &ControllerContext,
    orchestrator: &Orchestrator,
) -> Result<Outcome, SubsystemError> {
    let op = &orchestrator.spec.rhdh_operator;
    let sub = &op.subscription;

    if !op.enabled {
        remove_subscription(ctx, sub).await?;
        return Ok(Outcome::Disabled);
    }

    ensure_operator(ctx, OPERATOR_GROUP, sub).await?;

    if !ctx.store.crd_exists(BACKSTAGE_CRD).await.map_err(|source| {
        SubsystemError::CustomResource {
            kind: "CustomResourceDefinition",
            name: BACKSTAGE_CRD.to_string(),
            source,
        }
    })? {
        debug!(crd = BACKSTAGE_CRD, "operator CRD not yet served");
        return Ok(Outcome::AwaitingOperator(BACKSTAGE_CRD));
    }

    let plugins = &orchestrator.spec.rhdh_plugins;
    let target_ns = sub.target_namespace();

    ensure_custom_resource(
        ctx,
        &secret_gvk(),
        "Secret",
        Some(target_ns),
        REGISTRY_SECRET,
        templates::backstage_registry_secret(
            REGISTRY_SECRET,
            target_ns,
            &plugins.npm_registry,
        ),
    )
    .await?;

    let cluster_domain = cluster_domain(ctx).await;
    ensure_custom_resource(
        ctx,
        &backstage_gvk(),
        "Backstage",
        Some(target_ns),
        BACKSTAGE_CR,
        templates::backstage_cr(
            BACKSTAGE_CR,
            target_ns,
            plugins,
            cluster_domain.as_deref(),
        ),
    )
    .await?;

    info!("Backstage resources reconciled");
    Ok(Outcome::Installed)
}

#[instrument(skip_all)]
pub async fn teardown(
    ctx: &ControllerContext,
    orchestrator: &Orchestrator,
) -> Result<(), SubsystemError> {
    let sub = &orchestrator.spec.rhdh_operator.subscription;
    let target_ns = sub.target_namespace();

    delete_custom_resource(
        ctx,
        &backstage_gvk(),
        "Backstage",
        Some(target_ns),
        BACKSTAGE_CR,
    )
    .await?;
    delete_custom_resource(
        ctx,
        &secret_gvk(),
        "Secret",
        Some(target_ns),
        REGISTRY_SECRET,
    )
    .await?;
    delete_namespace(ctx, &sub.namespace).await?;
    remove_subscription(ctx, sub).await?;
    Ok(())
}

/// Cluster ingress domain from the OpenShift cluster Ingress resource.
/// Best-effort: on vanilla clusters the kind is absent and the Backstage CR
/// simply omits its base URLs.
async fn cluster_domain(ctx: &ControllerContext) -> Option<String> {
    match ctx.store.get(&ingress_gvk(), None, "cluster").await {
        Ok(obj) => obj
            .data
            .get("spec")
            .and_then(|s| s.get("domain"))
            .and_then(|d| d.as_str())
            .filter(|d| !d.is_empty())
            .map(str::to_string),
        Err(e) => {
            debug!(error = %e, "cluster ingress domain unavailable");
            None
        }
    }
}
