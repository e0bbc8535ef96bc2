//! Move a single shard and confirm it arrived.
//!
//! A move is issued through the admin service and then confirmed by
//! polling the destination node until it reports serving the shard. Each
//! issue of the move is an attempt with its own deadline of
//! `move_timeout`; an attempt that runs out is reissued until
//! `move_retries` reissues have been spent.

use std::sync::Arc;
use std::time::Duration;

use rollover_cluster::{ClusterAdmin, ConnectionCache};
use rollover_types::{
    AssignmentPlan, MigrationConfig, NodeAddress, RestartState, ShardDescriptor, ShardId,
};
use tokio::time::{self, Instant};
use tracing::{debug, info, warn};

use crate::error::MigrateError;

/// Result of a move that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveOutcome {
    /// The destination confirmed ownership.
    Moved {
        /// The node now serving the shard.
        destination: NodeAddress,
        /// How many times the move was issued.
        attempts: u32,
    },
    /// No live candidate other than the drained node; the shard stays home.
    NoDestination,
}

/// In-flight state of one move.
#[derive(Debug, Clone)]
pub struct MigrationAttempt {
    /// The shard being moved.
    pub shard: ShardId,
    /// Where the shard is going.
    pub destination: NodeAddress,
    /// When the current attempt was issued.
    pub started: Instant,
    /// Number of times the move has been issued, starting at 1.
    pub attempt: u32,
}

impl MigrationAttempt {
    fn first(shard: ShardId, destination: NodeAddress) -> Self {
        Self {
            shard,
            destination,
            started: Instant::now(),
            attempt: 1,
        }
    }

    fn restart(&mut self) {
        self.attempt += 1;
        self.started = Instant::now();
    }

    fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

/// Relocates shards away from, and back to, one target node.
pub struct ShardMigrator {
    admin: Arc<dyn ClusterAdmin>,
    connections: Arc<ConnectionCache>,
    target: NodeAddress,
    config: MigrationConfig,
}

impl ShardMigrator {
    /// Create a migrator for runs against `target`.
    pub fn new(
        admin: Arc<dyn ClusterAdmin>,
        connections: Arc<ConnectionCache>,
        target: NodeAddress,
        config: MigrationConfig,
    ) -> Self {
        Self {
            admin,
            connections,
            target,
            config,
        }
    }

    /// Move `shard` according to `state` and wait for the move to land.
    ///
    /// In [`RestartState::Undrain`] the destination is always the target
    /// node. Otherwise it is the first live candidate from the current
    /// assignment plan that is not the target; `setup_plan` is used when
    /// the current plan cannot be fetched.
    #[tracing::instrument(skip(self, shard, setup_plan), fields(shard = %shard.id))]
    pub async fn move_shard(
        &self,
        shard: &ShardDescriptor,
        setup_plan: &AssignmentPlan,
        state: RestartState,
    ) -> Result<MoveOutcome, MigrateError> {
        if !shard.is_movable() {
            return Err(MigrateError::Immovable(shard.id.clone()));
        }

        let destination = if state == RestartState::Undrain {
            self.target.clone()
        } else {
            match self.pick_destination(&shard.id, setup_plan).await {
                Some(node) => node,
                None => {
                    warn!(shard = %shard.id, "no live destination, leaving shard in place");
                    return Ok(MoveOutcome::NoDestination);
                }
            }
        };

        let mut attempt = MigrationAttempt::first(shard.id.clone(), destination);
        loop {
            self.issue(&attempt).await;
            if self.await_confirmation(&attempt).await {
                info!(
                    shard = %attempt.shard,
                    destination = %attempt.destination,
                    attempts = attempt.attempt,
                    "shard moved"
                );
                return Ok(MoveOutcome::Moved {
                    destination: attempt.destination,
                    attempts: attempt.attempt,
                });
            }

            if attempt.attempt > self.config.move_retries {
                warn!(
                    shard = %attempt.shard,
                    destination = %attempt.destination,
                    attempts = attempt.attempt,
                    "move retries exhausted"
                );
                return Err(MigrateError::Exhausted {
                    shard: attempt.shard,
                    destination: attempt.destination,
                    attempts: attempt.attempt,
                });
            }

            warn!(
                shard = %attempt.shard,
                timeout_ms = self.config.move_timeout.as_millis() as u64,
                "move unconfirmed, reissuing"
            );
            attempt.restart();
        }
    }

    /// First candidate that is not the target and reports live.
    async fn pick_destination(
        &self,
        shard: &ShardId,
        setup_plan: &AssignmentPlan,
    ) -> Option<NodeAddress> {
        let current;
        let plan = match self.admin.assignment_plan().await {
            Ok(plan) => {
                current = plan;
                &current
            }
            Err(e) => {
                warn!(%shard, error = %e, "failed to re-read assignment plan, using setup plan");
                setup_plan
            }
        };

        for candidate in plan.candidates(shard) {
            if *candidate == self.target {
                continue;
            }
            if self.is_live(candidate).await {
                return Some(candidate.clone());
            }
            debug!(%shard, %candidate, "candidate not live");
        }
        None
    }

    async fn is_live(&self, node: &NodeAddress) -> bool {
        let rpc = match self.connections.get(node).await {
            Ok(rpc) => rpc,
            Err(e) => {
                debug!(%node, error = %e, "liveness check could not connect");
                return false;
            }
        };
        match rpc.is_stopped().await {
            Ok(stopped) => !stopped,
            Err(e) => {
                debug!(%node, error = %e, "liveness check failed");
                false
            }
        }
    }

    /// Ask the admin service to perform the move. A rejected request is
    /// left to the attempt deadline.
    async fn issue(&self, attempt: &MigrationAttempt) {
        debug!(
            shard = %attempt.shard,
            destination = %attempt.destination,
            attempt = attempt.attempt,
            "requesting move"
        );
        if let Err(e) = self
            .admin
            .request_move(&attempt.shard, &attempt.destination)
            .await
        {
            warn!(shard = %attempt.shard, error = %e, "move request failed");
        }
    }

    /// Poll the destination until it serves the shard or the attempt's
    /// deadline passes.
    async fn await_confirmation(&self, attempt: &MigrationAttempt) -> bool {
        loop {
            if self.serves(&attempt.destination, &attempt.shard).await {
                return true;
            }
            let elapsed = attempt.elapsed();
            if elapsed >= self.config.move_timeout {
                return false;
            }
            let remaining = self.config.move_timeout - elapsed;
            time::sleep(self.config.poll_interval.min(remaining)).await;
        }
    }

    /// Whether `node` reports serving `shard`. Errors count as "not yet".
    async fn serves(&self, node: &NodeAddress, shard: &ShardId) -> bool {
        let rpc = match self.connections.get(node).await {
            Ok(rpc) => rpc,
            Err(e) => {
                debug!(%node, %shard, error = %e, "ownership poll could not connect");
                return false;
            }
        };
        match rpc.shard_info(shard).await {
            Ok(info) => info.is_some(),
            Err(e) => {
                debug!(%node, %shard, error = %e, "ownership poll failed");
                false
            }
        }
    }
}
