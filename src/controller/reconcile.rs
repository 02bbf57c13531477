//! Top-level reconciliation loop: fetch the Orchestrator, branch on deletion
//! vs normal reconciliation, run the three subsystem installers in fixed
//! order, and translate outcomes into conditions, phase and requeue
//! decisions. The whole pass is a straight-line sequence of blocking calls,
//! re-entrant against a cluster whose state may have moved since the last
//! invocation.

use kube::Resource;
use kube::runtime::controller::Action;
use tracing::{debug, error, info, instrument};

use super::{ControllerContext, ReconcileErr, SubsystemId, finalizer, status};
use crate::crd::orchestrator::{
    Condition, ConditionStatus, ConditionType, Orchestrator, Phase,
};
use crate::subsystems::{Outcome, backstage, knative, sonataflow};

/// Installation order; an error in an earlier subsystem stops the pass so a
/// partially-broken dependency is never built upon.
const INSTALL_ORDER: [SubsystemId; 3] = [
    SubsystemId::SonataFlow,
    SubsystemId::Knative,
    SubsystemId::Backstage,
];

#[instrument(skip(ctx), fields(ns = %ns, name = %name))]
pub async fn reconcile_orchestrator(
    ctx: &ControllerContext,
    ns: &str,
    name: &str,
) -> Result<Action, ReconcileErr> {
    let mut orchestrator = match ctx.store.get_orchestrator(ns, name).await {
        Ok(o) => o,
        Err(e) if e.is_not_found() => {
            info!("orchestrator not found; nothing to reconcile");
            return Ok(Action::await_change());
        }
        Err(e) => return Err(ReconcileErr::Fetch(e)),
    };

    // Deletion: teardown must succeed before the finalizer comes off, so an
    // Orchestrator can never disappear leaving installed subsystems behind.
    if orchestrator.meta().deletion_timestamp.is_some() {
        info!("deletion timestamp set; tearing down subsystems");
        teardown_all(ctx, &orchestrator).await?;
        finalizer::remove(ctx.store.as_ref(), &mut orchestrator)
            .await
            .map_err(ReconcileErr::Finalizer)?;
        return Ok(Action::await_change());
    }

    // The finalizer must be persisted before any install work; a crash after
    // this point still guarantees teardown on eventual deletion.
    if finalizer::ensure(ctx.store.as_ref(), &mut orchestrator)
        .await
        .map_err(ReconcileErr::Finalizer)?
    {
        debug!("added cleanup finalizer");
    }

    // First pass on a fresh resource: establish an initial condition. This
    // persist is fatal on failure since the re-fetch below depends on it.
    if orchestrator
        .status
        .as_ref()
        .map(|s| s.conditions.is_empty())
        .unwrap_or(true)
    {
        status::update_status(
            ctx.store.as_ref(),
            &mut orchestrator,
            Phase::Running,
            Condition::new(
                ConditionType::Available,
                ConditionStatus::Unknown,
                "Reconciling",
                "Starting reconciliation",
            ),
        )
        .await
        .map_err(ReconcileErr::InitialStatus)?;
        orchestrator = ctx
            .store
            .get_orchestrator(ns, name)
            .await
            .map_err(ReconcileErr::Fetch)?;
    }

    let mut awaiting = false;
    for id in INSTALL_ORDER {
        let outcome =
            run_installer(ctx, &mut orchestrator, id, awaiting).await?;
        awaiting |= matches!(outcome, Outcome::AwaitingOperator(_));
    }

    // Every installer ran without error, so any Degrading condition left by
    // an earlier failed pass no longer describes the cluster.
    let phase = if awaiting { Phase::Running } else { Phase::Completed };
    status::update_status_best_effort(
        ctx.store.as_ref(),
        &mut orchestrator,
        phase,
        Condition::new(
            ConditionType::Degrading,
            ConditionStatus::False,
            "AsExpected",
            "All enabled subsystems reconciled",
        ),
    )
    .await;

    if awaiting {
        // Operators are still rolling out; come back once OLM has settled.
        Ok(Action::requeue(ctx.cfg.requeue.operator_settle()))
    } else {
        Ok(Action::await_change())
    }
}

async fn run_installer(
    ctx: &ControllerContext,
    orchestrator: &mut Orchestrator,
    id: SubsystemId,
    awaiting_earlier: bool,
) -> Result<Outcome, ReconcileErr> {
    let result = match id {
        SubsystemId::SonataFlow => {
            sonataflow::reconcile(ctx, orchestrator).await
        }
        SubsystemId::Knative => knative::reconcile(ctx, orchestrator).await,
        SubsystemId::Backstage => backstage::reconcile(ctx, orchestrator).await,
    };

    match result {
        Ok(outcome) => {
            let (phase, condition) =
                progress_for(id, outcome, awaiting_earlier);
            status::update_status_best_effort(
                ctx.store.as_ref(),
                orchestrator,
                phase,
                condition,
            )
            .await;
            Ok(outcome)
        }
        Err(source) => {
            error!(subsystem = %id, error = %source, "subsystem reconciliation failed");
            status::update_status_best_effort(
                ctx.store.as_ref(),
                orchestrator,
                Phase::Failed,
                Condition::new(
                    ConditionType::Degrading,
                    ConditionStatus::True,
                    format!("{id}ReconciliationFailed"),
                    source.to_string(),
                ),
            )
            .await;
            Err(ReconcileErr::Subsystem {
                subsystem: id,
                source,
            })
        }
    }
}

fn progress_for(
    id: SubsystemId,
    outcome: Outcome,
    awaiting_earlier: bool,
) -> (Phase, Condition) {
    // The pass as a whole is only Completed once no subsystem is still
    // waiting on its operator, including subsystems handled earlier.
    let settled = if awaiting_earlier {
        Phase::Running
    } else {
        Phase::Completed
    };
    match outcome {
        Outcome::Installed => (
            settled,
            Condition::new(
                ConditionType::Progressing,
                ConditionStatus::True,
                format!("{id}ResourcesCreated"),
                format!("Completed {id} reconciliation"),
            ),
        ),
        Outcome::Disabled => (
            settled,
            Condition::new(
                ConditionType::Progressing,
                ConditionStatus::True,
                format!("{id}Disabled"),
                format!("{id} is disabled; subscription removed"),
            ),
        ),
        Outcome::AwaitingOperator(crd) => (
            Phase::Running,
            Condition::new(
                ConditionType::Progressing,
                ConditionStatus::True,
                format!("{id}OperatorInstalling"),
                format!("Waiting for CRD {crd} to be served"),
            ),
        ),
    }
}

/// Teardown chain in install order; the first failure aborts so the finalizer
/// stays in place and the deletion is retried later.
async fn teardown_all(
    ctx: &ControllerContext,
    orchestrator: &Orchestrator,
) -> Result<(), ReconcileErr> {
    sonataflow::teardown(ctx, orchestrator).await.map_err(|source| {
        ReconcileErr::Teardown {
            subsystem: SubsystemId::SonataFlow,
            source,
        }
    })?;
    knative::teardown(ctx, orchestrator).await.map_err(|source| {
        ReconcileErr::Teardown {
            subsystem: SubsystemId::Knative,
            source,
        }
    })?;
    backstage::teardown(ctx, orchestrator).await.map_err(|source| {
        ReconcileErr::Teardown {
            subsystem: SubsystemId::Backstage,
            source,
        }
    })?;
    Ok(())
}
