pub mod backstage;
pub mod knative;
pub mod sonataflow;

use kube::core::GroupVersionKind;
use serde_json::Value;
use tracing::{debug, info};

use crate::cluster::{StoreError, namespace};
use crate::controller::ControllerContext;
use crate::crd::orchestrator::SubscriptionSpec;

/// Result of one subsystem install pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Subsystem is disabled; any lingering subscription was removed.
    Disabled,
    /// Namespace and subscription are in place but the operator has not yet
    /// served its CRD. Not an error: OLM may still be rolling out.
    AwaitingOperator(&'static str),
    /// Subscription and all subsystem custom resources are present.
    Installed,
}

#[derive(thiserror::Error, Debug)]
pub enum SubsystemError {
    #[error("namespace {namespace}: {source}")]
    Namespace {
        namespace: String,
        #[source]
        source: StoreError,
    },
    #[error("subscription {name} in {namespace}: {source}")]
    Subscription {
        namespace: String,
        name: String,
        #[source]
        source: StoreError,
    },
    #[error("{kind} {name}: {source}")]
    CustomResource {
        kind: &'static str,
        name: String,
        #[source]
        source: StoreError,
    },
}

/// Enabled-path head shared by all three installers: ensure the namespace,
/// then install the subscription when absent.
pub(crate) async fn ensure_operator(
    ctx: &ControllerContext,
    operator_group: &str,
    sub: &SubscriptionSpec,
) -> Result<(), SubsystemError> {
    namespace::ensure(ctx.store.as_ref(), &sub.namespace)
        .await
        .map_err(|source| SubsystemError::Namespace {
            namespace: sub.namespace.clone(),
            source,
        })?;

    let (exists, _) = ctx
        .subscriptions
        .exists(&sub.namespace, &sub.name)
        .await
        .map_err(|source| subscription_err(sub, source))?;
    if !exists {
        ctx.subscriptions
            .install(operator_group, sub)
            .await
            .map_err(|source| subscription_err(sub, source))?;
        info!(subscription = %sub.name, ns = %sub.namespace, "operator installed via subscription");
    }
    Ok(())
}

/// Disabled-path cleanup: delete the subscription when present. Absence is
/// success, the chain is idempotent.
pub(crate) async fn remove_subscription(
    ctx: &ControllerContext,
    sub: &SubscriptionSpec,
) -> Result<(), SubsystemError> {
    match ctx.subscriptions.delete(&sub.namespace, &sub.name).await {
        Ok(()) => {
            info!(subscription = %sub.name, ns = %sub.namespace, "removed subscription");
            Ok(())
        }
        Err(e) if e.is_not_found() => Ok(()),
        Err(source) => Err(subscription_err(sub, source)),
    }
}

/// Create-only idempotence: fetch by well-known identity, create on NotFound,
/// leave the object alone when present. Returns whether a create happened.
pub(crate) async fn ensure_custom_resource(
    ctx: &ControllerContext,
    gvk: &GroupVersionKind,
    kind: &'static str,
    namespace: Option<&str>,
    name: &str,
    manifest: Value,
) -> Result<bool, SubsystemError> {
    match ctx.store.get(gvk, namespace, name).await {
        Ok(_) => {
            debug!(%kind, %name, "custom resource already present");
            Ok(false)
        }
        Err(e) if e.is_not_found() => {
            info!(%kind, %name, "creating custom resource");
            match ctx.store.create(gvk, &manifest).await {
                Ok(()) | Err(StoreError::Conflict) => Ok(true),
                Err(source) => Err(SubsystemError::CustomResource {
                    kind,
                    name: name.to_string(),
                    source,
                }),
            }
        }
        Err(source) => Err(SubsystemError::CustomResource {
            kind,
            name: name.to_string(),
            source,
        }),
    }
}

/// Teardown delete tolerating absence.
pub(crate) async fn delete_custom_resource(
    ctx: &ControllerContext,
    gvk: &GroupVersionKind,
    kind: &'static str,
    namespace: Option<&str>,
    name: &str,
) -> Result<(), SubsystemError> {
    match ctx.store.delete(gvk, namespace, name).await {
        Ok(()) => {
            info!(%kind, %name, "deleted custom resource");
            Ok(())
        }
        Err(e) if e.is_not_found() => Ok(()),
        Err(source) => Err(SubsystemError::CustomResource {
            kind,
            name: name.to_string(),
            source,
        }),
    }
}

pub(crate) async fn delete_namespace(
    ctx: &ControllerContext,
    name: &str,
) -> Result<(), SubsystemError> {
    namespace::delete(ctx.store.as_ref(), name).await.map_err(
        |source| SubsystemError::Namespace {
            namespace: name.to_string(),
            source,
        },
    )
}

fn subscription_err(sub: &SubscriptionSpec, source: StoreError) -> SubsystemError {
    SubsystemError::Subscription {
        namespace: sub.namespace.clone(),
        name: sub.name.clone(),
        source,
    }
}
