use std::sync::Arc;

use async_trait::async_trait;
use kube::core::GroupVersionKind;
use serde_json::json;
use tracing::{debug, info};

use super::{ResourceStore, StoreError};
use crate::crd::orchestrator::SubscriptionSpec;
use crate::templates::operator_labels;

pub fn subscription_gvk() -> GroupVersionKind {
    GroupVersionKind::gvk("operators.coreos.com", "v1alpha1", "Subscription")
}

pub fn operator_group_gvk() -> GroupVersionKind {
    GroupVersionKind::gvk("operators.coreos.com", "v1", "OperatorGroup")
}

pub fn csv_gvk() -> GroupVersionKind {
    GroupVersionKind::gvk(
        "operators.coreos.com",
        "v1alpha1",
        "ClusterServiceVersion",
    )
}

/// Readiness details reported alongside subscription existence.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SubscriptionDetails {
    pub installed_csv: Option<String>,
    pub current_csv: Option<String>,
    pub state: Option<String>,
}

/// Install/check/delete of an operator subscription in a target namespace.
/// Abstracted behind a trait so reconciliation can run against a test double.
#[async_trait]
pub trait SubscriptionManager: Send + Sync {
    async fn exists(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<(bool, Option<SubscriptionDetails>), StoreError>;

    /// Install the operator: ensure the operator group exists, then create
    /// the subscription.
    async fn install(
        &self,
        operator_group: &str,
        subscription: &SubscriptionSpec,
    ) -> Result<(), StoreError>;

    /// Delete the subscription and the CSV it installed. Returns NotFound
    /// when the subscription is absent; callers decide whether that matters.
    async fn delete(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<(), StoreError>;
}

/// OLM-backed implementation over the resource store's dynamic API.
pub struct OlmSubscriptionManager {
    store: Arc<dyn ResourceStore>,
}

impl OlmSubscriptionManager {
    pub fn new(store: Arc<dyn ResourceStore>) -> Self {
        Self { store }
    }

    async fn ensure_operator_group(
        &self,
        name: &str,
        subscription: &SubscriptionSpec,
    ) -> Result<(), StoreError> {
        let ns = &subscription.namespace;
        match self
            .store
            .get(&operator_group_gvk(), Some(ns), name)
            .await
        {
            Ok(_) => return Ok(()),
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e),
        }
        debug!(group = %name, ns = %ns, "creating operator group");
        let manifest = json!({
            "apiVersion": "operators.coreos.com/v1",
            "kind": "OperatorGroup",
            "metadata": {
                "name": name,
                "namespace": ns,
                "labels": operator_labels(),
            },
            "spec": {
                "targetNamespaces": [subscription.target_namespace()],
            },
        });
        match self.store.create(&operator_group_gvk(), &manifest).await {
            Ok(()) | Err(StoreError::Conflict) => Ok(()),
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl SubscriptionManager for OlmSubscriptionManager {
    async fn exists(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<(bool, Option<SubscriptionDetails>), StoreError> {
        match self
            .store
            .get(&subscription_gvk(), Some(namespace), name)
            .await
        {
            Ok(obj) => {
                let status = obj.data.get("status");
                let field = |key: &str| {
                    status
                        .and_then(|s| s.get(key))
                        .and_then(|v| v.as_str())
                        .map(str::to_string)
                };
                Ok((
                    true,
                    Some(SubscriptionDetails {
                        installed_csv: field("installedCSV"),
                        current_csv: field("currentCSV"),
                        state: field("state"),
                    }),
                ))
            }
            Err(e) if e.is_not_found() => Ok((false, None)),
            Err(e) => Err(e),
        }
    }

    async fn install(
        &self,
        operator_group: &str,
        subscription: &SubscriptionSpec,
    ) -> Result<(), StoreError> {
        self.ensure_operator_group(operator_group, subscription)
            .await?;

        let mut spec = json!({
            "channel": subscription.channel,
            "name": subscription.name,
            "source": subscription.source,
            "sourceNamespace": subscription.source_namespace,
            "installPlanApproval": subscription.install_plan_approval,
        });
        if let Some(csv) = &subscription.starting_csv {
            spec["startingCSV"] = json!(csv);
        }
        let manifest = json!({
            "apiVersion": "operators.coreos.com/v1alpha1",
            "kind": "Subscription",
            "metadata": {
                "name": subscription.name,
                "namespace": subscription.namespace,
                "labels": operator_labels(),
            },
            "spec": spec,
        });
        info!(
            subscription = %subscription.name,
            ns = %subscription.namespace,
            channel = %subscription.channel,
            "installing operator via subscription"
        );
        match self.store.create(&subscription_gvk(), &manifest).await {
            Ok(()) | Err(StoreError::Conflict) => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn delete(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<(), StoreError> {
        // Read the subscription first so the installed CSV can be removed too;
        // OLM does not garbage-collect it on subscription deletion.
        let sub = self
            .store
            .get(&subscription_gvk(), Some(namespace), name)
            .await?;
        if let Some(csv) = sub
            .data
            .get("status")
            .and_then(|s| s.get("installedCSV"))
            .and_then(|v| v.as_str())
        {
            match self.store.delete(&csv_gvk(), Some(namespace), csv).await {
                Ok(()) => info!(%csv, ns = %namespace, "deleted CSV"),
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(e),
            }
        }
        self.store
            .delete(&subscription_gvk(), Some(namespace), name)
            .await?;
        info!(subscription = %name, ns = %namespace, "deleted subscription");
        Ok(())
    }
}
