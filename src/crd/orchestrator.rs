use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// The single user-authored resource driving platform installation. One live
/// instance per cluster is assumed; concurrent instances would race.
#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, JsonSchema, Default)]
#[kube(
    group = "rhdh.redhat.com",
    version = "v1alpha1",
    kind = "Orchestrator",
    plural = "orchestrators",
    namespaced,
    status = "OrchestratorStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct OrchestratorSpec {
    /// Workflow engine (SonataFlow / OpenShift Serverless Logic)
    #[serde(default)]
    pub sonataflow_operator: SonataFlowOperatorSpec,
    /// Eventing/serving layer (Knative / OpenShift Serverless)
    #[serde(default)]
    pub serverless_operator: ServerlessOperatorSpec,
    /// Developer portal (Backstage / RHDH)
    #[serde(default)]
    pub rhdh_operator: RhdhOperatorSpec,
    #[serde(default)]
    pub rhdh_plugins: RhdhPluginsSpec,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct SonataFlowOperatorSpec {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub subscription: SubscriptionSpec,
    /// Sizing hints for the workflow platform services.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<PlatformSpec>,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct ServerlessOperatorSpec {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub subscription: SubscriptionSpec,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct RhdhOperatorSpec {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub subscription: SubscriptionSpec,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct RhdhPluginsSpec {
    /// npm registry the dynamic plugins are pulled from.
    #[serde(default)]
    pub npm_registry: String,
    /// Optional notifications backend address surfaced in app-config.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notifications_email_hostname: Option<String>,
}

/// Read-only projection of one operator subscription; immutable for the
/// duration of a reconciliation pass.
#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionSpec {
    /// Subscription and package name.
    #[serde(default)]
    pub name: String,
    /// Namespace the subscription (and operator group) lives in.
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub channel: String,
    /// Catalog source providing the package.
    #[serde(default)]
    pub source: String,
    #[serde(default = "default_source_namespace")]
    pub source_namespace: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub starting_csv: Option<String>,
    /// Namespace the operator's workloads target; defaults to `namespace`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_namespace: Option<String>,
    #[serde(default = "default_approval")]
    pub install_plan_approval: String,
}

impl SubscriptionSpec {
    pub fn target_namespace(&self) -> &str {
        self.target_namespace.as_deref().unwrap_or(&self.namespace)
    }
}

fn default_source_namespace() -> String {
    "openshift-marketplace".to_string()
}

fn default_approval() -> String {
    "Automatic".to_string()
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default)]
pub struct PlatformSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceRequirementsSpec>,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default)]
pub struct ResourceRequirementsSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requests: Option<ResourceListSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limits: Option<ResourceListSpec>,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default)]
pub struct ResourceListSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory: Option<String>,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq)]
pub struct OrchestratorStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<Phase>,
    /// K8s-style conditions, unique per type (Available/Progressing/Degrading).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

/// Coarse summary distinct from the condition list; last write wins.
#[derive(Deserialize, Serialize, Clone, Copy, Debug, JsonSchema, PartialEq, Eq)]
pub enum Phase {
    Running,
    Completed,
    Failed,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, PartialEq)]
pub struct Condition {
    #[serde(rename = "type")]
    pub type_: ConditionType,
    pub status: ConditionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(
        rename = "lastTransitionTime",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_transition_time: Option<String>,
}

impl Condition {
    pub fn new(
        type_: ConditionType,
        status: ConditionStatus,
        reason: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Condition {
            type_,
            status,
            reason: Some(reason.into()),
            message: Some(message.into()),
            last_transition_time: None,
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Copy, Debug, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub enum ConditionType {
    Available,
    Progressing,
    Degrading,
}

#[derive(Deserialize, Serialize, Clone, Copy, Debug, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
}
