use chrono::Utc;
use tracing::warn;

use crate::cluster::{ResourceStore, StoreError};
use crate::crd::orchestrator::{Condition, Orchestrator, Phase};

/// Set-or-update-by-type: an existing condition of the same type is replaced
/// in place (insertion order of other types preserved), a new type is
/// appended. `lastTransitionTime` advances only when `status` changes, so
/// re-asserting an identical condition leaves the list byte-stable.
pub fn set_condition(conditions: &mut Vec<Condition>, mut incoming: Condition) {
    let now = || Utc::now().to_rfc3339();
    match conditions.iter_mut().find(|c| c.type_ == incoming.type_) {
        Some(existing) => {
            if existing.status == incoming.status {
                incoming.last_transition_time =
                    existing.last_transition_time.clone();
            } else if incoming.last_transition_time.is_none() {
                incoming.last_transition_time = Some(now());
            }
            *existing = incoming;
        }
        None => {
            if incoming.last_transition_time.is_none() {
                incoming.last_transition_time = Some(now());
            }
            conditions.push(incoming);
        }
    }
}

/// Apply phase + condition to the in-memory object and persist the status
/// subresource.
pub async fn update_status(
    store: &dyn ResourceStore,
    orchestrator: &mut Orchestrator,
    phase: Phase,
    condition: Condition,
) -> Result<(), StoreError> {
    let status = orchestrator.status.get_or_insert_with(Default::default);
    status.phase = Some(phase);
    set_condition(&mut status.conditions, condition);
    *orchestrator = store.update_orchestrator_status(orchestrator).await?;
    Ok(())
}

/// Best-effort variant for mid-pass progress reporting: status is
/// observability, not control state, so a failed persist is logged and the
/// pass continues.
pub async fn update_status_best_effort(
    store: &dyn ResourceStore,
    orchestrator: &mut Orchestrator,
    phase: Phase,
    condition: Condition,
) {
    if let Err(e) =
        update_status(store, orchestrator, phase, condition).await
    {
        warn!(error = %e, "failed to persist orchestrator status");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::orchestrator::{ConditionStatus, ConditionType};

    fn cond(
        type_: ConditionType,
        status: ConditionStatus,
        reason: &str,
    ) -> Condition {
        Condition::new(type_, status, reason, "msg")
    }

    #[test]
    fn replaces_existing_type_without_duplicates() {
        let mut conds = Vec::new();
        set_condition(
            &mut conds,
            cond(ConditionType::Progressing, ConditionStatus::True, "A"),
        );
        set_condition(
            &mut conds,
            cond(ConditionType::Progressing, ConditionStatus::True, "B"),
        );
        assert_eq!(conds.len(), 1);
        assert_eq!(conds[0].reason.as_deref(), Some("B"));
    }

    #[test]
    fn transition_time_stable_when_status_unchanged() {
        let mut conds = Vec::new();
        set_condition(
            &mut conds,
            cond(ConditionType::Available, ConditionStatus::True, "Ready"),
        );
        let first = conds[0].last_transition_time.clone();
        assert!(first.is_some());
        set_condition(
            &mut conds,
            cond(ConditionType::Available, ConditionStatus::True, "Ready"),
        );
        assert_eq!(conds[0].last_transition_time, first);
    }

    #[test]
    fn transition_time_advances_on_status_change() {
        let mut conds = vec![Condition {
            type_: ConditionType::Available,
            status: ConditionStatus::True,
            reason: Some("Ready".into()),
            message: None,
            last_transition_time: Some("2020-01-01T00:00:00Z".into()),
        }];
        set_condition(
            &mut conds,
            cond(ConditionType::Available, ConditionStatus::False, "Down"),
        );
        assert_ne!(
            conds[0].last_transition_time.as_deref(),
            Some("2020-01-01T00:00:00Z")
        );
    }

    #[test]
    fn preserves_insertion_order_of_other_types() {
        let mut conds = Vec::new();
        set_condition(
            &mut conds,
            cond(ConditionType::Available, ConditionStatus::Unknown, "Init"),
        );
        set_condition(
            &mut conds,
            cond(ConditionType::Progressing, ConditionStatus::True, "Go"),
        );
        set_condition(
            &mut conds,
            cond(ConditionType::Available, ConditionStatus::True, "Ready"),
        );
        assert_eq!(conds.len(), 2);
        assert_eq!(conds[0].type_, ConditionType::Available);
        assert_eq!(conds[1].type_, ConditionType::Progressing);
    }
}
