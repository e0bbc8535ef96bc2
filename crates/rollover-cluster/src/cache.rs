//! Memoized per-node RPC handles.
//!
//! Every component of a run that needs to talk to a node goes through the
//! same [`ConnectionCache`], so repeated calls to one node reuse a single
//! handle. Failed connects are not cached: the next lookup retries.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use rollover_types::NodeAddress;
use tracing::debug;

use crate::error::ClusterError;
use crate::rpc::{NodeConnector, NodeRpc};

/// Cache of live [`NodeRpc`] handles keyed by node address.
///
/// The lock is never held across an await: a miss connects without the
/// lock and inserts afterwards, keeping whichever handle landed first.
pub struct ConnectionCache {
    connector: Arc<dyn NodeConnector>,
    connections: Mutex<HashMap<NodeAddress, Arc<dyn NodeRpc>>>,
}

impl ConnectionCache {
    /// Create an empty cache backed by `connector`.
    pub fn new(connector: Arc<dyn NodeConnector>) -> Self {
        Self {
            connector,
            connections: Mutex::new(HashMap::new()),
        }
    }

    /// Return the cached handle for `node`, connecting on first use.
    pub async fn get(&self, node: &NodeAddress) -> Result<Arc<dyn NodeRpc>, ClusterError> {
        if let Some(conn) = self.cached(node) {
            return Ok(conn);
        }

        let conn = self.connector.connect(node).await?;
        debug!(%node, "opened node connection");

        let mut connections = self
            .connections
            .lock()
            .expect("connection cache lock poisoned");
        Ok(connections.entry(node.clone()).or_insert(conn).clone())
    }

    /// Whether a handle for `node` is cached.
    pub fn contains(&self, node: &NodeAddress) -> bool {
        self.cached(node).is_some()
    }

    /// Number of cached handles.
    pub fn len(&self) -> usize {
        self.connections
            .lock()
            .expect("connection cache lock poisoned")
            .len()
    }

    /// Whether the cache holds no handles.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn cached(&self, node: &NodeAddress) -> Option<Arc<dyn NodeRpc>> {
        self.connections
            .lock()
            .expect("connection cache lock poisoned")
            .get(node)
            .cloned()
    }
}

impl std::fmt::Debug for ConnectionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionCache")
            .field("connections", &self.len())
            .finish_non_exhaustive()
    }
}
