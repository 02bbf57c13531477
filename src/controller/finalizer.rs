use kube::Resource;

use crate::cluster::{ResourceStore, StoreError};
use crate::crd::orchestrator::Orchestrator;

/// Cleanup marker blocking Orchestrator deletion until teardown has run.
pub const FINALIZER: &str = "rhdh.redhat.com/orchestrator-cleanup";

pub fn has_finalizer(orchestrator: &Orchestrator) -> bool {
    orchestrator
        .meta()
        .finalizers
        .as_ref()
        .map(|f| f.iter().any(|x| x == FINALIZER))
        .unwrap_or(false)
}

/// Add the marker when absent and persist. Returns whether a write happened.
/// Operates on the object fetched this pass; no separate fetch.
pub async fn ensure(
    store: &dyn ResourceStore,
    orchestrator: &mut Orchestrator,
) -> Result<bool, StoreError> {
    if has_finalizer(orchestrator) {
        return Ok(false);
    }
    orchestrator
        .meta_mut()
        .finalizers
        .get_or_insert_with(Vec::new)
        .push(FINALIZER.to_string());
    *orchestrator = store.update_orchestrator(orchestrator).await?;
    Ok(true)
}

pub async fn remove(
    store: &dyn ResourceStore,
    orchestrator: &mut Orchestrator,
) -> Result<(), StoreError> {
    if !has_finalizer(orchestrator) {
        return Ok(());
    }
    if let Some(finalizers) = orchestrator.meta_mut().finalizers.as_mut() {
        finalizers.retain(|f| f != FINALIZER);
    }
    *orchestrator = store.update_orchestrator(orchestrator).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_marker() {
        let mut orch = Orchestrator::new("orch", Default::default());
        assert!(!has_finalizer(&orch));
        orch.meta_mut().finalizers = Some(vec![FINALIZER.to_string()]);
        assert!(has_finalizer(&orch));
    }
}
