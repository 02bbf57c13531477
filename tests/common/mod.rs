#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use envconfig::Envconfig;
use kube::core::{DynamicObject, GroupVersionKind};
use serde_json::{Value, json};

use orchestrator_operator::cluster::subscription::{
    SubscriptionDetails, SubscriptionManager,
};
use orchestrator_operator::cluster::{ResourceStore, StoreError};
use orchestrator_operator::config::OperatorConfig;
use orchestrator_operator::controller::ControllerContext;
use orchestrator_operator::crd::orchestrator::{
    Orchestrator, OrchestratorSpec, RhdhOperatorSpec, RhdhPluginsSpec,
    ServerlessOperatorSpec, SonataFlowOperatorSpec, SubscriptionSpec,
};

fn injected_api_error() -> StoreError {
    StoreError::Api(Box::new(kube::Error::Api(kube::core::ErrorResponse {
        status: "Failure".to_string(),
        message: "injected failure".to_string(),
        reason: "InternalError".to_string(),
        code: 500,
    })))
}

type ObjectKey = (String, Option<String>, String);

/// In-memory `ResourceStore`: orchestrators keyed by ns/name with a counted
/// resource version, dynamic objects keyed by kind, plus a call log and a
/// delete-failure injection point.
#[derive(Default)]
pub struct FakeStore {
    orchestrators: Mutex<HashMap<(String, String), Orchestrator>>,
    objects: Mutex<HashMap<ObjectKey, Value>>,
    crds: Mutex<HashSet<String>>,
    log: Mutex<Vec<String>>,
    fail_deletes: Mutex<HashSet<(String, String)>>,
}

impl FakeStore {
    pub fn seed(&self, orchestrator: Orchestrator) {
        let ns = orchestrator
            .metadata
            .namespace
            .clone()
            .unwrap_or_else(|| "default".to_string());
        let name = orchestrator.metadata.name.clone().unwrap();
        self.orchestrators
            .lock()
            .unwrap()
            .insert((ns, name), orchestrator);
    }

    pub fn orchestrator(&self, ns: &str, name: &str) -> Option<Orchestrator> {
        self.orchestrators
            .lock()
            .unwrap()
            .get(&(ns.to_string(), name.to_string()))
            .cloned()
    }

    pub fn add_crd(&self, name: &str) {
        self.crds.lock().unwrap().insert(name.to_string());
    }

    pub fn object_exists(&self, kind: &str, name: &str) -> bool {
        self.objects
            .lock()
            .unwrap()
            .keys()
            .any(|(k, _, n)| k == kind && n == name)
    }

    pub fn ops(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    pub fn clear_ops(&self) {
        self.log.lock().unwrap().clear();
    }

    pub fn fail_delete(&self, kind: &str, name: &str) {
        self.fail_deletes
            .lock()
            .unwrap()
            .insert((kind.to_string(), name.to_string()));
    }

    fn record(&self, op: String) {
        self.log.lock().unwrap().push(op);
    }

    fn bump_version(orchestrator: &mut Orchestrator) {
        let next = orchestrator
            .metadata
            .resource_version
            .as_deref()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(0)
            + 1;
        orchestrator.metadata.resource_version = Some(next.to_string());
    }

    fn store_orchestrator(
        &self,
        orchestrator: &Orchestrator,
    ) -> Result<Orchestrator, StoreError> {
        let ns = orchestrator
            .metadata
            .namespace
            .clone()
            .unwrap_or_else(|| "default".to_string());
        let name = orchestrator
            .metadata
            .name
            .clone()
            .ok_or(StoreError::NotFound)?;
        let mut map = self.orchestrators.lock().unwrap();
        if !map.contains_key(&(ns.clone(), name.clone())) {
            return Err(StoreError::NotFound);
        }
        let mut updated = orchestrator.clone();
        Self::bump_version(&mut updated);
        map.insert((ns, name), updated.clone());
        Ok(updated)
    }
}

#[async_trait]
impl ResourceStore for FakeStore {
    async fn get_orchestrator(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Orchestrator, StoreError> {
        self.orchestrator(namespace, name).ok_or(StoreError::NotFound)
    }

    async fn update_orchestrator(
        &self,
        orchestrator: &Orchestrator,
    ) -> Result<Orchestrator, StoreError> {
        self.store_orchestrator(orchestrator)
    }

    async fn update_orchestrator_status(
        &self,
        orchestrator: &Orchestrator,
    ) -> Result<Orchestrator, StoreError> {
        self.store_orchestrator(orchestrator)
    }

    async fn get(
        &self,
        gvk: &GroupVersionKind,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<DynamicObject, StoreError> {
        self.record(format!("get {}/{}", gvk.kind, name));
        if gvk.kind == "CustomResourceDefinition" {
            if self.crds.lock().unwrap().contains(name) {
                let manifest = json!({
                    "apiVersion": "apiextensions.k8s.io/v1",
                    "kind": "CustomResourceDefinition",
                    "metadata": { "name": name },
                });
                return Ok(serde_json::from_value(manifest)?);
            }
            return Err(StoreError::NotFound);
        }
        let key = (
            gvk.kind.clone(),
            namespace.map(str::to_string),
            name.to_string(),
        );
        let objects = self.objects.lock().unwrap();
        let value = objects.get(&key).ok_or(StoreError::NotFound)?;
        Ok(serde_json::from_value(value.clone())?)
    }

    async fn create(
        &self,
        gvk: &GroupVersionKind,
        manifest: &Value,
    ) -> Result<(), StoreError> {
        let name = manifest["metadata"]["name"]
            .as_str()
            .unwrap_or_default()
            .to_string();
        let namespace = manifest["metadata"]["namespace"]
            .as_str()
            .map(str::to_string);
        self.record(format!("create {}/{}", gvk.kind, name));
        let key = (gvk.kind.clone(), namespace, name);
        let mut objects = self.objects.lock().unwrap();
        if objects.contains_key(&key) {
            return Err(StoreError::Conflict);
        }
        objects.insert(key, manifest.clone());
        Ok(())
    }

    async fn delete(
        &self,
        gvk: &GroupVersionKind,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<(), StoreError> {
        self.record(format!("delete {}/{}", gvk.kind, name));
        if self
            .fail_deletes
            .lock()
            .unwrap()
            .contains(&(gvk.kind.clone(), name.to_string()))
        {
            return Err(injected_api_error());
        }
        let key = (
            gvk.kind.clone(),
            namespace.map(str::to_string),
            name.to_string(),
        );
        match self.objects.lock().unwrap().remove(&key) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound),
        }
    }
}

/// Call-recording `SubscriptionManager` double.
#[derive(Default)]
pub struct FakeSubs {
    installed: Mutex<HashSet<(String, String)>>,
    log: Mutex<Vec<String>>,
    fail_install: Mutex<bool>,
}

impl FakeSubs {
    pub fn seed(&self, namespace: &str, name: &str) {
        self.installed
            .lock()
            .unwrap()
            .insert((namespace.to_string(), name.to_string()));
    }

    pub fn is_installed(&self, namespace: &str, name: &str) -> bool {
        self.installed
            .lock()
            .unwrap()
            .contains(&(namespace.to_string(), name.to_string()))
    }

    pub fn ops(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    pub fn clear_ops(&self) {
        self.log.lock().unwrap().clear();
    }

    pub fn fail_installs(&self) {
        *self.fail_install.lock().unwrap() = true;
    }

    pub fn allow_installs(&self) {
        *self.fail_install.lock().unwrap() = false;
    }
}

#[async_trait]
impl SubscriptionManager for FakeSubs {
    async fn exists(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<(bool, Option<SubscriptionDetails>), StoreError> {
        let exists = self.is_installed(namespace, name);
        Ok((exists, exists.then(SubscriptionDetails::default)))
    }

    async fn install(
        &self,
        _operator_group: &str,
        subscription: &SubscriptionSpec,
    ) -> Result<(), StoreError> {
        if *self.fail_install.lock().unwrap() {
            return Err(injected_api_error());
        }
        self.log.lock().unwrap().push(format!(
            "install {}/{}",
            subscription.namespace, subscription.name
        ));
        self.seed(&subscription.namespace, &subscription.name);
        Ok(())
    }

    async fn delete(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<(), StoreError> {
        let removed = self
            .installed
            .lock()
            .unwrap()
            .remove(&(namespace.to_string(), name.to_string()));
        if !removed {
            return Err(StoreError::NotFound);
        }
        self.log
            .lock()
            .unwrap()
            .push(format!("delete {}/{}", namespace, name));
        Ok(())
    }
}

pub fn test_ctx(
    store: Arc<FakeStore>,
    subs: Arc<FakeSubs>,
) -> ControllerContext {
    ControllerContext {
        store,
        subscriptions: subs,
        cfg: OperatorConfig::init_from_env().expect("config from defaults"),
    }
}

fn subscription(name: &str, namespace: &str) -> SubscriptionSpec {
    SubscriptionSpec {
        name: name.to_string(),
        namespace: namespace.to_string(),
        channel: "alpha".to_string(),
        source: "redhat-operators".to_string(),
        source_namespace: "openshift-marketplace".to_string(),
        starting_csv: None,
        target_namespace: None,
        install_plan_approval: "Automatic".to_string(),
    }
}

/// Orchestrator in namespace `default` with per-subsystem enablement.
pub fn orchestrator(
    name: &str,
    sonataflow: bool,
    knative: bool,
    backstage: bool,
) -> Orchestrator {
    let spec = OrchestratorSpec {
        sonataflow_operator: SonataFlowOperatorSpec {
            enabled: sonataflow,
            subscription: subscription(
                "logic-operator-rhel8",
                "openshift-serverless-logic",
            ),
            platform: None,
        },
        serverless_operator: ServerlessOperatorSpec {
            enabled: knative,
            subscription: subscription(
                "serverless-operator",
                "openshift-serverless",
            ),
        },
        rhdh_operator: RhdhOperatorSpec {
            enabled: backstage,
            subscription: subscription("rhdh", "rhdh-operator"),
        },
        rhdh_plugins: RhdhPluginsSpec {
            npm_registry: "https://npm.example.com".to_string(),
            notifications_email_hostname: None,
        },
    };
    let mut orch = Orchestrator::new(name, spec);
    orch.metadata.namespace = Some("default".to_string());
    orch.metadata.resource_version = Some("1".to_string());
    orch
}
