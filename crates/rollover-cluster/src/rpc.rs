//! Per-node RPC and routed read contracts.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use rollover_types::{NodeAddress, ShardDescriptor, ShardId};

use crate::error::ClusterError;

/// RPC handle to a single cluster node.
#[async_trait]
pub trait NodeRpc: Send + Sync {
    /// The node this handle talks to.
    fn address(&self) -> &NodeAddress;

    /// Shards the node currently serves.
    async fn owned_shards(&self) -> Result<Vec<ShardDescriptor>, ClusterError>;

    /// The node's view of `shard`, or `None` if it does not serve it.
    async fn shard_info(&self, shard: &ShardId) -> Result<Option<ShardDescriptor>, ClusterError>;

    /// Whether the node's storage process reports itself stopped.
    async fn is_stopped(&self) -> Result<bool, ClusterError>;
}

/// Opens [`NodeRpc`] handles.
#[async_trait]
pub trait NodeConnector: Send + Sync {
    /// Open a handle to `node`.
    async fn connect(&self, node: &NodeAddress) -> Result<Arc<dyn NodeRpc>, ClusterError>;
}

/// Point reads routed to whichever node currently serves a shard.
#[async_trait]
pub trait ShardReader: Send + Sync {
    /// Read `key` from `shard`. `Ok(None)` means the row does not exist,
    /// which still counts as the shard being available.
    async fn point_lookup(
        &self,
        shard: &ShardDescriptor,
        key: &[u8],
    ) -> Result<Option<Bytes>, ClusterError>;
}
