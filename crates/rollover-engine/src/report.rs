//! Outcome of a restart run.

use rollover_probe::ProbeSummary;
use rollover_types::{NodeAddress, RestartState};

use crate::error::RestartError;
use crate::orchestrator::RestartMode;

/// Shards handled by one drain or undrain pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PhaseCounts {
    /// Shards whose move was confirmed.
    pub moved: usize,
    /// Shards left in place for lack of a live destination.
    pub skipped: usize,
}

/// What happened during one run.
#[derive(Debug)]
pub struct RestartReport {
    pub target: NodeAddress,
    pub mode: RestartMode,
    /// `Complete` or `Failed`.
    pub final_state: RestartState,
    /// The stage that was running when the run failed.
    pub failed_stage: Option<RestartState>,
    pub error: Option<RestartError>,
    /// Shards captured at setup, system shards included.
    pub shards: usize,
    pub drain: PhaseCounts,
    pub undrain: PhaseCounts,
    /// One summary per probed shard, in capture order.
    pub probes: Vec<ProbeSummary>,
    /// Whether the node's blacklist entry was lifted during cleanup.
    pub blacklist_cleared: bool,
}

impl RestartReport {
    /// Whether the run reached `Complete`.
    pub fn is_success(&self) -> bool {
        self.final_state == RestartState::Complete
    }

    /// Operator guidance for the failed stage, if the run failed.
    pub fn guidance(&self) -> Option<&'static str> {
        self.failed_stage.map(guidance)
    }
}

/// What an operator should do after a run failed in `stage`.
pub fn guidance(stage: RestartState) -> &'static str {
    match stage {
        RestartState::Setup => "Cannot start the rolling restart; nothing was changed. Please retry.",
        RestartState::Drain => {
            "Cannot drain the node. The balancer will reassign the remaining shards; \
             retry the rolling restart once the cluster is stable."
        }
        RestartState::RestartingNode => {
            "The node could not be restarted. Restart its storage process manually."
        }
        RestartState::Undrain => {
            "Cannot move all shards back. The balancer will rebalance the cluster."
        }
        RestartState::Complete | RestartState::Failed => "No action needed.",
    }
}
