use std::time::Duration;

use envconfig::Envconfig;

#[derive(Envconfig, Clone, Debug)]
pub struct OperatorConfig {
    /// Bounded parallelism across distinct Orchestrator identities.
    /// Env: ORCHESTRATOR_MAX_CONCURRENT_RECONCILES
    #[envconfig(from = "ORCHESTRATOR_MAX_CONCURRENT_RECONCILES", default = "2")]
    pub max_concurrent_reconciles: u16,

    #[envconfig(nested)]
    pub requeue: RequeueConfig,
}

/// Requeue delays tiered by how expensive/noisy a retry of the failing step
/// is expected to be (OLM subscription settling, CRD propagation).
#[derive(Envconfig, Clone, Debug)]
pub struct RequeueConfig {
    /// Transient read/persist failures on the Orchestrator itself.
    /// Env: ORCHESTRATOR_REQUEUE_TRANSIENT_SECS
    #[envconfig(from = "ORCHESTRATOR_REQUEUE_TRANSIENT_SECS", default = "30")]
    pub transient_secs: u64,

    /// Workflow-engine (SonataFlow) install failures.
    /// Env: ORCHESTRATOR_REQUEUE_WORKFLOW_SECS
    #[envconfig(from = "ORCHESTRATOR_REQUEUE_WORKFLOW_SECS", default = "60")]
    pub workflow_secs: u64,

    /// Eventing/serving (Knative) and developer-portal (Backstage) failures.
    /// Env: ORCHESTRATOR_REQUEUE_SERVING_SECS
    #[envconfig(from = "ORCHESTRATOR_REQUEUE_SERVING_SECS", default = "180")]
    pub serving_secs: u64,

    /// Finalizer-path teardown failures.
    /// Env: ORCHESTRATOR_REQUEUE_TEARDOWN_SECS
    #[envconfig(from = "ORCHESTRATOR_REQUEUE_TEARDOWN_SECS", default = "300")]
    pub teardown_secs: u64,

    /// Re-check interval while waiting for OLM to serve a subsystem CRD.
    /// Env: ORCHESTRATOR_REQUEUE_OPERATOR_SETTLE_SECS
    #[envconfig(
        from = "ORCHESTRATOR_REQUEUE_OPERATOR_SETTLE_SECS",
        default = "30"
    )]
    pub operator_settle_secs: u64,
}

impl RequeueConfig {
    pub fn transient(&self) -> Duration {
        Duration::from_secs(self.transient_secs)
    }
    pub fn workflow(&self) -> Duration {
        Duration::from_secs(self.workflow_secs)
    }
    pub fn serving(&self) -> Duration {
        Duration::from_secs(self.serving_secs)
    }
    pub fn teardown(&self) -> Duration {
        Duration::from_secs(self.teardown_secs)
    }
    pub fn operator_settle(&self) -> Duration {
        Duration::from_secs(self.operator_settle_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requeue_tiers_map_to_durations() {
        let rq = RequeueConfig {
            transient_secs: 30,
            workflow_secs: 60,
            serving_secs: 180,
            teardown_secs: 300,
            operator_settle_secs: 30,
        };
        assert_eq!(rq.transient(), Duration::from_secs(30));
        assert_eq!(rq.workflow(), Duration::from_secs(60));
        assert_eq!(rq.serving(), Duration::from_secs(180));
        assert_eq!(rq.teardown(), Duration::from_secs(300));
    }
}
