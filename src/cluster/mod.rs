pub mod namespace;
pub mod subscription;

use async_trait::async_trait;
use kube::api::{Api, DeleteParams, PostParams};
use kube::core::{DynamicObject, GroupVersionKind};
use kube::discovery::ApiResource;
use kube::{Client, Resource, ResourceExt};
use serde_json::Value;

use crate::crd::orchestrator::Orchestrator;

/// Error taxonomy for cluster-store operations. NotFound drives the
/// create-on-absent branches and is never logged as a failure; Conflict marks
/// an optimistic-concurrency violation and must lead to re-fetch-and-retry.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("resource not found")]
    NotFound,
    #[error("write conflict, object version is stale")]
    Conflict,
    #[error("api error: {0}")]
    Api(#[source] Box<kube::Error>),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound)
    }

    pub(crate) fn from_kube(e: kube::Error) -> Self {
        match &e {
            kube::Error::Api(ae) if ae.code == 404 => StoreError::NotFound,
            kube::Error::Api(ae) if ae.code == 409 => StoreError::Conflict,
            _ => StoreError::Api(Box::new(e)),
        }
    }
}

pub fn crd_gvk() -> GroupVersionKind {
    GroupVersionKind::gvk("apiextensions.k8s.io", "v1", "CustomResourceDefinition")
}

pub fn namespace_gvk() -> GroupVersionKind {
    GroupVersionKind::gvk("", "v1", "Namespace")
}

pub fn secret_gvk() -> GroupVersionKind {
    GroupVersionKind::gvk("", "v1", "Secret")
}

/// Typed CRUD over the cluster object store. Constructor-injected into the
/// controller so reconciliation logic runs against test doubles as well as a
/// live API server.
#[async_trait]
pub trait ResourceStore: Send + Sync {
    async fn get_orchestrator(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Orchestrator, StoreError>;

    /// Replace the Orchestrator object (metadata/spec); optimistic-concurrency
    /// aware, stale writes surface as `Conflict`. Returns the stored copy so
    /// follow-up writes in the same pass operate on the fresh version.
    async fn update_orchestrator(
        &self,
        orchestrator: &Orchestrator,
    ) -> Result<Orchestrator, StoreError>;

    async fn update_orchestrator_status(
        &self,
        orchestrator: &Orchestrator,
    ) -> Result<Orchestrator, StoreError>;

    async fn get(
        &self,
        gvk: &GroupVersionKind,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<DynamicObject, StoreError>;

    /// Create from a full manifest; the namespace is taken from the manifest
    /// metadata (absent for cluster-scoped kinds).
    async fn create(
        &self,
        gvk: &GroupVersionKind,
        manifest: &Value,
    ) -> Result<(), StoreError>;

    async fn delete(
        &self,
        gvk: &GroupVersionKind,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<(), StoreError>;

    /// CRD availability gate; NotFound folds into `false`, other errors
    /// propagate unchanged.
    async fn crd_exists(&self, name: &str) -> Result<bool, StoreError> {
        match self.get(&crd_gvk(), None, name).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }
}

/// `ResourceStore` backed by a live kube client, using the dynamic API for
/// foreign kinds (subsystem CRs, OLM objects, namespaces).
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
}

impl KubeStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn dynamic_api(
        &self,
        gvk: &GroupVersionKind,
        namespace: Option<&str>,
    ) -> Api<DynamicObject> {
        let ar = ApiResource::from_gvk(gvk);
        match namespace {
            Some(ns) => Api::namespaced_with(self.client.clone(), ns, &ar),
            None => Api::all_with(self.client.clone(), &ar),
        }
    }

    fn orchestrator_api(&self, namespace: &str) -> Api<Orchestrator> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

#[async_trait]
impl ResourceStore for KubeStore {
    async fn get_orchestrator(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Orchestrator, StoreError> {
        self.orchestrator_api(namespace)
            .get(name)
            .await
            .map_err(StoreError::from_kube)
    }

    async fn update_orchestrator(
        &self,
        orchestrator: &Orchestrator,
    ) -> Result<Orchestrator, StoreError> {
        let ns = orchestrator
            .namespace()
            .unwrap_or_else(|| "default".to_string());
        self.orchestrator_api(&ns)
            .replace(
                &orchestrator.name_any(),
                &PostParams::default(),
                orchestrator,
            )
            .await
            .map_err(StoreError::from_kube)
    }

    async fn update_orchestrator_status(
        &self,
        orchestrator: &Orchestrator,
    ) -> Result<Orchestrator, StoreError> {
        let ns = orchestrator
            .namespace()
            .unwrap_or_else(|| "default".to_string());
        let data = serde_json::to_vec(orchestrator)?;
        self.orchestrator_api(&ns)
            .replace_status(
                &orchestrator.name_any(),
                &PostParams::default(),
                data,
            )
            .await
            .map_err(StoreError::from_kube)
    }

    async fn get(
        &self,
        gvk: &GroupVersionKind,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<DynamicObject, StoreError> {
        self.dynamic_api(gvk, namespace)
            .get(name)
            .await
            .map_err(StoreError::from_kube)
    }

    async fn create(
        &self,
        gvk: &GroupVersionKind,
        manifest: &Value,
    ) -> Result<(), StoreError> {
        let obj: DynamicObject = serde_json::from_value(manifest.clone())?;
        let ns = obj.meta().namespace.clone();
        self.dynamic_api(gvk, ns.as_deref())
            .create(&PostParams::default(), &obj)
            .await
            .map_err(StoreError::from_kube)?;
        Ok(())
    }

    async fn delete(
        &self,
        gvk: &GroupVersionKind,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<(), StoreError> {
        self.dynamic_api(gvk, namespace)
            .delete(name, &DeleteParams::default())
            .await
            .map_err(StoreError::from_kube)?;
        Ok(())
    }
}
