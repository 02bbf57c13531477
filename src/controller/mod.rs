pub mod finalizer;
pub mod reconcile;
pub mod status;

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use kube::{
    Client, ResourceExt,
    api::Api,
    runtime::{
        Controller,
        controller::{self, Action},
        watcher,
    },
};
use tracing::{error, info};

use crate::cluster::{
    KubeStore, ResourceStore, StoreError,
    subscription::{OlmSubscriptionManager, SubscriptionManager},
};
use crate::config::OperatorConfig;
use crate::crd::orchestrator::Orchestrator;
use crate::subsystems::SubsystemError;

/// Dependencies of one reconciliation pass, constructor-injected so tests can
/// swap in doubles for the store and the subscription manager.
pub struct ControllerContext {
    pub store: Arc<dyn ResourceStore>,
    pub subscriptions: Arc<dyn SubscriptionManager>,
    pub cfg: OperatorConfig,
}

/// The three subsystems, in installation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubsystemId {
    SonataFlow,
    Knative,
    Backstage,
}

impl std::fmt::Display for SubsystemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubsystemId::SonataFlow => write!(f, "SonataFlow"),
            SubsystemId::Knative => write!(f, "Knative"),
            SubsystemId::Backstage => write!(f, "Backstage"),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ReconcileErr {
    #[error("failed to fetch orchestrator: {0}")]
    Fetch(#[source] StoreError),
    #[error("failed to update finalizers: {0}")]
    Finalizer(#[source] StoreError),
    #[error("failed to write initial status: {0}")]
    InitialStatus(#[source] StoreError),
    #[error("teardown of {subsystem} failed: {source}")]
    Teardown {
        subsystem: SubsystemId,
        #[source]
        source: SubsystemError,
    },
    #[error("{subsystem} reconciliation failed: {source}")]
    Subsystem {
        subsystem: SubsystemId,
        #[source]
        source: SubsystemError,
    },
}

impl ReconcileErr {
    /// Failure-class → requeue-delay mapping; deliberate backoff tiered by
    /// how noisy the failing step's retry is.
    pub fn requeue_after(&self, cfg: &OperatorConfig) -> Duration {
        match self {
            ReconcileErr::Fetch(_)
            | ReconcileErr::Finalizer(_)
            | ReconcileErr::InitialStatus(_) => cfg.requeue.transient(),
            ReconcileErr::Teardown { .. } => cfg.requeue.teardown(),
            ReconcileErr::Subsystem { subsystem, .. } => match subsystem {
                SubsystemId::SonataFlow => cfg.requeue.workflow(),
                SubsystemId::Knative | SubsystemId::Backstage => {
                    cfg.requeue.serving()
                }
            },
        }
    }
}

pub async fn run_controller(
    client: Client,
    cfg: OperatorConfig,
) -> anyhow::Result<()> {
    let store: Arc<dyn ResourceStore> =
        Arc::new(KubeStore::new(client.clone()));
    let subscriptions: Arc<dyn SubscriptionManager> =
        Arc::new(OlmSubscriptionManager::new(store.clone()));
    let concurrency = cfg.max_concurrent_reconciles;
    let ctx = Arc::new(ControllerContext {
        store,
        subscriptions,
        cfg,
    });

    let api: Api<Orchestrator> = Api::all(client);
    Controller::new(api, watcher::Config::default())
        .with_config(controller::Config::default().concurrency(concurrency))
        .run(reconcile_entry, error_policy, ctx)
        .for_each(|res| async move {
            match res {
                Ok((_obj_ref, action)) => {
                    info!("reconciled: requeue={:?}", action)
                }
                Err(e) => error!(error = ?e, "reconcile error"),
            }
        })
        .await;

    Ok(())
}

async fn reconcile_entry(
    obj: Arc<Orchestrator>,
    ctx: Arc<ControllerContext>,
) -> Result<Action, ReconcileErr> {
    let ns = obj.namespace().unwrap_or_else(|| "default".to_string());
    reconcile::reconcile_orchestrator(&ctx, &ns, &obj.name_any()).await
}

fn error_policy(
    _obj: Arc<Orchestrator>,
    error: &ReconcileErr,
    ctx: Arc<ControllerContext>,
) -> Action {
    Action::requeue(error.requeue_after(&ctx.cfg))
}
