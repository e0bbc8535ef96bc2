//! Cluster admin service contract.

use async_trait::async_trait;
use rollover_types::{AssignmentPlan, NodeAddress, ShardId};
use tracing::info;

use crate::error::ClusterError;

/// The cluster's control plane: it executes shard moves, owns the
/// assignment plan, and keeps the balancer blacklist.
#[async_trait]
pub trait ClusterAdmin: Send + Sync {
    /// Tell the balancer to stop assigning shards to `node`.
    async fn blacklist_add(&self, node: &NodeAddress) -> Result<(), ClusterError>;

    /// Remove `node` from the balancer blacklist.
    async fn blacklist_remove(&self, node: &NodeAddress) -> Result<(), ClusterError>;

    /// Remove every node from the balancer blacklist.
    async fn blacklist_clear_all(&self) -> Result<(), ClusterError>;

    /// Ask the cluster to move `shard` onto `destination`.
    ///
    /// Returns once the request is accepted; the move itself completes
    /// asynchronously.
    async fn request_move(
        &self,
        shard: &ShardId,
        destination: &NodeAddress,
    ) -> Result<(), ClusterError>;

    /// Fetch the current assignment plan.
    async fn assignment_plan(&self) -> Result<AssignmentPlan, ClusterError>;
}

/// Clear the balancer blacklist for every node.
///
/// Independent of any restart run; used by the "clear and exit" mode.
pub async fn clear_all_blacklists(admin: &dyn ClusterAdmin) -> Result<(), ClusterError> {
    admin.blacklist_clear_all().await?;
    info!("cleared all blacklisted nodes");
    Ok(())
}
