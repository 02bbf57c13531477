//! Eventing/serving subsystem: Knative operator subscription plus the
//! KnativeEventing and KnativeServing custom resources, each gated on its own
//! CRD.

use kube::core::GroupVersionKind;
use tracing::{debug, info, instrument};

use super::{
    Outcome, SubsystemError, delete_custom_resource, delete_namespace,
    ensure_custom_resource, ensure_operator, remove_subscription,
};
use crate::controller::ControllerContext;
use crate::crd::orchestrator::Orchestrator;
use crate::templates;

pub const OPERATOR_GROUP: &str = "serverless-operators";
pub const EVENTING_CRD: &str = "knativeeventings.operator.knative.dev";
pub const SERVING_CRD: &str = "knativeservings.operator.knative.dev";
/// Both CRs are namespaced singletons whose name equals their namespace.
pub const EVENTING_NAME: &str = "knative-eventing";
pub const SERVING_NAME: &str = "knative-serving";

fn eventing_gvk() -> GroupVersionKind {
    GroupVersionKind::gvk("operator.knative.dev", "v1beta1", "KnativeEventing")
}

fn serving_gvk() -> GroupVersionKind {
    GroupVersionKind::gvk("operator.knative.dev", "v1beta1", "KnativeServing")
}

#[instrument(skip_all)]
pub async fn reconcile(
    ctx: &ControllerContext,
    orchestrator: &Orchestrator,
) -> Result<Outcome, SubsystemError> {
    let op = &orchestrator.spec.serverless_operator;
    let sub = &op.subscription;

    if !op.enabled {
        remove_subscription(ctx, sub).await?;
        return Ok(Outcome::Disabled);
    }

    ensure_operator(ctx, OPERATOR_GROUP, sub).await?;

    if !crd_exists(ctx, EVENTING_CRD).await? {
        debug!(crd = EVENTING_CRD, "operator CRD not yet served");
        return Ok(Outcome::AwaitingOperator(EVENTING_CRD));
    }
    ensure_custom_resource(
        ctx,
        &eventing_gvk(),
        "KnativeEventing",
        Some(EVENTING_NAME),
        EVENTING_NAME,
        templates::knative_eventing(EVENTING_NAME, EVENTING_NAME),
    )
    .await?;

    if !crd_exists(ctx, SERVING_CRD).await? {
        debug!(crd = SERVING_CRD, "operator CRD not yet served");
        return Ok(Outcome::AwaitingOperator(SERVING_CRD));
    }
    ensure_custom_resource(
        ctx,
        &serving_gvk(),
        "KnativeServing",
        Some(SERVING_NAME),
        SERVING_NAME,
        templates::knative_serving(SERVING_NAME, SERVING_NAME),
    )
    .await?;

    info!("Knative resources reconciled");
    Ok(Outcome::Installed)
}

#[instrument(skip_all)]
pub async fn teardown(
    ctx: &ControllerContext,
    orchestrator: &Orchestrator,
) -> Result<(), SubsystemError> {
    let sub = &orchestrator.spec.serverless_operator.subscription;

    delete_custom_resource(
        ctx,
        &eventing_gvk(),
        "KnativeEventing",
        Some(EVENTING_NAME),
        EVENTING_NAME,
    )
    .await?;
    delete_custom_resource(
        ctx,
        &serving_gvk(),
        "KnativeServing",
        Some(SERVING_NAME),
        SERVING_NAME,
    )
    .await?;
    delete_namespace(ctx, EVENTING_NAME).await?;
    delete_namespace(ctx, SERVING_NAME).await?;
    remove_subscription(ctx, sub).await?;
    Ok(())
}

async fn crd_exists(
    ctx: &ControllerContext,
    name: &'static str,
) -> Result<bool, SubsystemError> {
    ctx.store.crd_exists(name).await.map_err(|source| {
        SubsystemError::CustomResource {
            kind: "CustomResourceDefinition",
            name: name.to_string(),
            source,
        }
    })
}
