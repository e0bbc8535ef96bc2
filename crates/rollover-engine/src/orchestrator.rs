//! [`RestartOrchestrator`] — the restart state machine.
//!
//! One run is a single sequential control flow. Setup captures the
//! target's shards and the assignment plan, blacklists the node and starts
//! one probe per shard. Drain moves every movable shard away, the node is
//! stopped and started, and undrain moves the shards back. Whatever
//! happens, cleanup then runs exactly once: probes are stopped and
//! summarized and the blacklist entry is lifted (except in drain-and-hold
//! mode, where the node is meant to stay drained).

use std::sync::Arc;
use std::time::Duration;

use rollover_cluster::{ClusterAdmin, ConnectionCache, NodeConnector, ShardReader};
use rollover_lifecycle::{LifecycleError, NodeAction, NodeController, run_checked};
use rollover_migrate::{MoveOutcome, ShardMigrator};
use rollover_probe::{ProbeSet, ProbeSummary};
use rollover_types::{AssignmentPlan, NodeAddress, RestartConfig, RestartState, ShardDescriptor};
use tokio::time::{self, Instant};
use tracing::{debug, error, info, warn};

use crate::error::RestartError;
use crate::report::{PhaseCounts, RestartReport, guidance};

/// The cluster-facing handles a run needs.
pub struct Collaborators {
    pub admin: Arc<dyn ClusterAdmin>,
    pub connector: Arc<dyn NodeConnector>,
    pub reader: Arc<dyn ShardReader>,
    pub controller: Arc<dyn NodeController>,
}

/// How far a run goes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RestartMode {
    /// Drain, restart and undrain.
    #[default]
    Full,
    /// Drain and stop the node, then leave it stopped and blacklisted.
    DrainAndHold,
}

/// Everything a run accumulates, kept outside the main sequence so
/// cleanup can see it on every exit path.
#[derive(Default)]
struct RunState {
    shards: Vec<ShardDescriptor>,
    plan: AssignmentPlan,
    probes: ProbeSet,
    blacklisted: bool,
    drain: PhaseCounts,
    undrain: PhaseCounts,
}

/// Drives one node through a rolling restart.
pub struct RestartOrchestrator {
    target: NodeAddress,
    mode: RestartMode,
    config: RestartConfig,
    admin: Arc<dyn ClusterAdmin>,
    reader: Arc<dyn ShardReader>,
    controller: Arc<dyn NodeController>,
    connections: Arc<ConnectionCache>,
    migrator: ShardMigrator,
    state: RestartState,
}

impl RestartOrchestrator {
    /// Create an orchestrator for a full restart of `target`.
    pub fn new(target: NodeAddress, config: RestartConfig, collaborators: Collaborators) -> Self {
        let connections = Arc::new(ConnectionCache::new(collaborators.connector));
        let migrator = ShardMigrator::new(
            collaborators.admin.clone(),
            connections.clone(),
            target.clone(),
            config.migration,
        );
        Self {
            target,
            mode: RestartMode::Full,
            config,
            admin: collaborators.admin,
            reader: collaborators.reader,
            controller: collaborators.controller,
            connections,
            migrator,
            state: RestartState::Setup,
        }
    }

    /// Set the run mode.
    pub fn with_mode(mut self, mode: RestartMode) -> Self {
        self.mode = mode;
        self
    }

    /// Run the restart to completion or failure.
    #[tracing::instrument(skip(self), fields(node = %self.target, mode = ?self.mode))]
    pub async fn run(mut self) -> RestartReport {
        info!("starting rolling restart");
        let mut run = RunState::default();

        let (failed_stage, error) = match self.execute(&mut run).await {
            Ok(()) => {
                self.transition(RestartState::Complete);
                (None, None)
            }
            Err(e) => {
                let stage = self.state;
                error!(%stage, error = %e, "rolling restart failed");
                error!("{}", guidance(stage));
                self.transition(RestartState::Failed);
                (Some(stage), Some(e))
            }
        };

        let (probes, blacklist_cleared) = self.cleanup(&mut run).await;

        RestartReport {
            target: self.target,
            mode: self.mode,
            final_state: self.state,
            failed_stage,
            error,
            shards: run.shards.len(),
            drain: run.drain,
            undrain: run.undrain,
            probes,
            blacklist_cleared,
        }
    }

    async fn execute(&mut self, run: &mut RunState) -> Result<(), RestartError> {
        self.setup(run).await?;

        self.transition(RestartState::Drain);
        self.migrate_all(run, self.config.drain_interval).await?;

        self.transition(RestartState::RestartingNode);
        info!(
            settle_ms = self.config.settle_before_restart.as_millis() as u64,
            "waiting before restart"
        );
        time::sleep(self.config.settle_before_restart).await;
        run_checked(self.controller.as_ref(), NodeAction::Stop, &self.target).await?;
        if self.mode == RestartMode::DrainAndHold {
            info!("node drained and stopped, leaving it down");
            return Ok(());
        }
        run_checked(self.controller.as_ref(), NodeAction::Start, &self.target).await?;
        self.wait_until_live().await?;
        time::sleep(self.config.settle_after_restart).await;

        self.transition(RestartState::Undrain);
        self.migrate_all(run, self.config.undrain_interval).await?;
        Ok(())
    }

    /// Capture shards and plan, blacklist the node, start the probes.
    async fn setup(&self, run: &mut RunState) -> Result<(), RestartError> {
        let rpc = self.connections.get(&self.target).await?;
        run.shards = rpc.owned_shards().await?;
        run.plan = self.admin.assignment_plan().await?;
        info!(
            shards = run.shards.len(),
            planned = run.plan.len(),
            "captured shards and assignment plan"
        );

        self.admin.blacklist_add(&self.target).await?;
        run.blacklisted = true;
        info!("node blacklisted");

        run.probes =
            ProbeSet::start_all(&run.shards, self.reader.clone(), self.config.probe_frequency);
        Ok(())
    }

    /// Move every movable shard for the current stage, pausing `pace`
    /// after each confirmed move.
    async fn migrate_all(&self, run: &mut RunState, pace: Duration) -> Result<(), RestartError> {
        let counts = match self.state {
            RestartState::Undrain => &mut run.undrain,
            _ => &mut run.drain,
        };

        for shard in &run.shards {
            if !shard.is_movable() {
                debug!(shard = %shard.id, "not relocating system shard");
                continue;
            }
            match self.migrator.move_shard(shard, &run.plan, self.state).await? {
                MoveOutcome::Moved { .. } => {
                    counts.moved += 1;
                    time::sleep(pace).await;
                }
                MoveOutcome::NoDestination => counts.skipped += 1,
            }
        }

        info!(
            stage = %self.state,
            moved = counts.moved,
            skipped = counts.skipped,
            "shard pass finished"
        );
        Ok(())
    }

    /// Poll the target until it reports live or the liveness deadline
    /// passes.
    async fn wait_until_live(&self) -> Result<(), LifecycleError> {
        let started = Instant::now();
        loop {
            if self.target_is_live().await {
                info!(
                    waited_ms = started.elapsed().as_millis() as u64,
                    "node is back online"
                );
                return Ok(());
            }
            if started.elapsed() >= self.config.liveness_timeout {
                return Err(LifecycleError::NotLive {
                    node: self.target.clone(),
                    waited_secs: started.elapsed().as_secs(),
                });
            }
            time::sleep(self.config.liveness_poll_interval).await;
        }
    }

    async fn target_is_live(&self) -> bool {
        let rpc = match self.connections.get(&self.target).await {
            Ok(rpc) => rpc,
            Err(e) => {
                debug!(error = %e, "node not reachable yet");
                return false;
            }
        };
        match rpc.is_stopped().await {
            Ok(stopped) => !stopped,
            Err(e) => {
                debug!(error = %e, "node not reachable yet");
                false
            }
        }
    }

    /// Stop the probes and lift the blacklist entry. Returns the probe
    /// summaries and whether the entry was lifted.
    async fn cleanup(&self, run: &mut RunState) -> (Vec<ProbeSummary>, bool) {
        let summaries = run.probes.stop_all().await;
        for summary in &summaries {
            info!(
                shard = %summary.shard,
                downtime_ms = summary.downtime.as_millis() as u64,
                errors = summary.error_count,
                "availability"
            );
            if let Some(reason) = &summary.aborted {
                warn!(shard = %summary.shard, %reason, "availability incomplete, probe aborted");
            }
        }

        if !run.blacklisted {
            return (summaries, false);
        }
        if self.mode == RestartMode::DrainAndHold {
            warn!("leaving node blacklisted");
            return (summaries, false);
        }

        match self.admin.blacklist_remove(&self.target).await {
            Ok(()) => {
                info!("node removed from blacklist");
                (summaries, true)
            }
            Err(e) => {
                error!(error = %e, "failed to remove node from blacklist; remove it manually");
                (summaries, false)
            }
        }
    }

    fn transition(&mut self, next: RestartState) {
        info!(from = %self.state, to = %next, "state transition");
        self.state = next;
    }
}
