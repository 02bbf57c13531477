//! Workflow-engine subsystem: SonataFlow operator subscription plus the
//! cluster platform and platform custom resources.

use kube::core::GroupVersionKind;
use tracing::{debug, info, instrument};

use super::{
    Outcome, SubsystemError, delete_custom_resource, delete_namespace,
    ensure_custom_resource, ensure_operator, remove_subscription,
};
use crate::controller::ControllerContext;
use crate::crd::orchestrator::Orchestrator;
use crate::templates;

pub const OPERATOR_GROUP: &str = "openshift-serverless-logic";
pub const CLUSTER_PLATFORM_CRD: &str =
    "sonataflowclusterplatforms.sonataflow.org";
pub const CLUSTER_PLATFORM_CR: &str = "cluster-platform";
pub const PLATFORM_CR: &str = "sonataflow-platform";

fn cluster_platform_gvk() -> GroupVersionKind {
    GroupVersionKind::gvk(
        "sonataflow.org",
        "v1alpha08",
        "SonataFlowClusterPlatform",
    )
}

fn platform_gvk() -> GroupVersionKind {
    GroupVersionKind::gvk("sonataflow.org", "v1alpha08", "SonataFlowPlatform")
}

#[instrument(skip_all)]
pub async fn reconcile(
    ctx: &ControllerContext,
    orchestrator: &Orchestrator,
) -> Result<Outcome, SubsystemError> {
    let op = &orchestrator.spec.sonataflow_operator;
    let sub = &op.subscription;

    if !op.enabled {
        remove_subscription(ctx, sub).await?;
        return Ok(Outcome::Disabled);
    }

    ensure_operator(ctx, OPERATOR_GROUP, sub).await?;

    if !ctx
        .store
        .crd_exists(CLUSTER_PLATFORM_CRD)
        .await
        .map_err(|source| SubsystemError::CustomResource {
            kind: "CustomResourceDefinition",
            name: CLUSTER_PLATFORM_CRD.to_string(),
            source,
        })?
    {
        debug!(crd = CLUSTER_PLATFORM_CRD, "operator CRD not yet served");
        return Ok(Outcome::AwaitingOperator(CLUSTER_PLATFORM_CRD));
    }

    // Cluster-scoped platform pointer first, then the platform it points at.
    ensure_custom_resource(
        ctx,
        &cluster_platform_gvk(),
        "SonataFlowClusterPlatform",
        None,
        CLUSTER_PLATFORM_CR,
        templates::sonataflow_cluster_platform(
            CLUSTER_PLATFORM_CR,
            PLATFORM_CR,
            &sub.namespace,
        ),
    )
    .await?;

    ensure_custom_resource(
        ctx,
        &platform_gvk(),
        "SonataFlowPlatform",
        Some(&sub.namespace),
        PLATFORM_CR,
        templates::sonataflow_platform(
            PLATFORM_CR,
            &sub.namespace,
            op.platform.as_ref(),
        ),
    )
    .await?;

    info!("SonataFlow resources reconciled");
    Ok(Outcome::Installed)
}

#[instrument(skip_all)]
pub async fn teardown(
    ctx: &ControllerContext,
    orchestrator: &Orchestrator,
) -> Result<(), SubsystemError> {
    let sub = &orchestrator.spec.sonataflow_operator.subscription;

    delete_custom_resource(
        ctx,
        &cluster_platform_gvk(),
        "SonataFlowClusterPlatform",
        None,
        CLUSTER_PLATFORM_CR,
    )
    .await?;
    delete_custom_resource(
        ctx,
        &platform_gvk(),
        "SonataFlowPlatform",
        Some(&sub.namespace),
        PLATFORM_CR,
    )
    .await?;
    delete_namespace(ctx, &sub.namespace).await?;
    remove_subscription(ctx, sub).await?;
    Ok(())
}
