//! JSON-over-HTTP implementations of the collaborator traits.
//!
//! Endpoints used:
//!
//! | call | request |
//! |---|---|
//! | blacklist add / remove | `PUT` / `DELETE {admin}/blacklist/{host:port}` |
//! | blacklist clear | `DELETE {admin}/blacklist` |
//! | move | `POST {admin}/shards/{shard}/move` with `{"destination": ..}` |
//! | plan | `GET {admin}/assignment-plan` |
//! | owned shards | `GET http://{node}/shards` |
//! | shard info | `GET http://{node}/shards/{shard}` (404 = not served) |
//! | liveness | `GET http://{node}/status` |
//! | point read | `GET {gateway}/tables/{table}/rows/{hex key}` (404 = no row) |
//!
//! Shard names, table names and node addresses are each pushed as a single
//! percent-encoded path segment.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Response, StatusCode, Url};
use rollover_types::{AssignmentPlan, NodeAddress, ShardDescriptor, ShardId};
use serde::{Deserialize, Serialize};

use crate::admin::ClusterAdmin;
use crate::error::ClusterError;
use crate::rpc::{NodeConnector, NodeRpc, ShardReader};

pub use reqwest::Client;

/// Build the shared HTTP client with a per-request timeout.
pub fn client(request_timeout: Duration) -> Result<Client, ClusterError> {
    Ok(Client::builder().timeout(request_timeout).build()?)
}

/// Turn a non-success status into [`ClusterError::Status`].
fn check(resp: Response) -> Result<Response, ClusterError> {
    let status = resp.status();
    if status.is_success() {
        Ok(resp)
    } else {
        Err(ClusterError::Status {
            url: resp.url().to_string(),
            status: status.as_u16(),
        })
    }
}

/// Parse a base URL that endpoint paths can be appended to.
fn parse_base(url: &str) -> Result<Url, ClusterError> {
    let parsed = Url::parse(url).map_err(|e| ClusterError::InvalidUrl(format!("{url}: {e}")))?;
    if parsed.cannot_be_a_base() {
        return Err(ClusterError::InvalidUrl(url.to_string()));
    }
    Ok(parsed)
}

/// `base` with `segments` appended, one encoded path segment each.
fn endpoint(base: &Url, segments: &[&str]) -> Url {
    let mut url = base.clone();
    // parse_base rejected cannot-be-a-base URLs
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments);
    }
    url
}

// ---------------------------------------------------------------------------
// Admin service
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct MoveRequest<'a> {
    destination: &'a NodeAddress,
}

/// [`ClusterAdmin`] backed by the admin service's HTTP API.
pub struct HttpClusterAdmin {
    client: Client,
    base_url: Url,
}

impl HttpClusterAdmin {
    /// Create an admin client rooted at `base_url`.
    pub fn new(client: Client, base_url: &str) -> Result<Self, ClusterError> {
        Ok(Self {
            client,
            base_url: parse_base(base_url)?,
        })
    }

    fn blacklist_url(&self, node: &NodeAddress) -> Url {
        endpoint(&self.base_url, &["blacklist", node.to_string().as_str()])
    }

    fn move_url(&self, shard: &ShardId) -> Url {
        endpoint(&self.base_url, &["shards", shard.as_str(), "move"])
    }
}

#[async_trait]
impl ClusterAdmin for HttpClusterAdmin {
    async fn blacklist_add(&self, node: &NodeAddress) -> Result<(), ClusterError> {
        check(self.client.put(self.blacklist_url(node)).send().await?)?;
        Ok(())
    }

    async fn blacklist_remove(&self, node: &NodeAddress) -> Result<(), ClusterError> {
        check(self.client.delete(self.blacklist_url(node)).send().await?)?;
        Ok(())
    }

    async fn blacklist_clear_all(&self) -> Result<(), ClusterError> {
        let url = endpoint(&self.base_url, &["blacklist"]);
        check(self.client.delete(url).send().await?)?;
        Ok(())
    }

    async fn request_move(
        &self,
        shard: &ShardId,
        destination: &NodeAddress,
    ) -> Result<(), ClusterError> {
        let resp = self
            .client
            .post(self.move_url(shard))
            .json(&MoveRequest { destination })
            .send()
            .await?;
        check(resp)?;
        Ok(())
    }

    async fn assignment_plan(&self) -> Result<AssignmentPlan, ClusterError> {
        let url = endpoint(&self.base_url, &["assignment-plan"]);
        let resp = check(self.client.get(url).send().await?)?;
        Ok(resp.json().await?)
    }
}

// ---------------------------------------------------------------------------
// Node RPC
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct NodeStatus {
    stopped: bool,
}

/// [`NodeRpc`] over a node's HTTP status API.
pub struct HttpNodeRpc {
    client: Client,
    address: NodeAddress,
    base_url: Url,
}

impl HttpNodeRpc {
    fn open(client: Client, address: &NodeAddress) -> Result<Self, ClusterError> {
        let base_url =
            parse_base(&format!("http://{address}")).map_err(|e| ClusterError::Unreachable {
                node: address.clone(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            client,
            address: address.clone(),
            base_url,
        })
    }

    fn shard_url(&self, shard: &ShardId) -> Url {
        endpoint(&self.base_url, &["shards", shard.as_str()])
    }

    fn unreachable(&self, err: reqwest::Error) -> ClusterError {
        ClusterError::Unreachable {
            node: self.address.clone(),
            reason: err.to_string(),
        }
    }
}

#[async_trait]
impl NodeRpc for HttpNodeRpc {
    fn address(&self) -> &NodeAddress {
        &self.address
    }

    async fn owned_shards(&self) -> Result<Vec<ShardDescriptor>, ClusterError> {
        let url = endpoint(&self.base_url, &["shards"]);
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.unreachable(e))?;
        Ok(check(resp)?.json().await?)
    }

    async fn shard_info(&self, shard: &ShardId) -> Result<Option<ShardDescriptor>, ClusterError> {
        let resp = self
            .client
            .get(self.shard_url(shard))
            .send()
            .await
            .map_err(|e| self.unreachable(e))?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Ok(Some(check(resp)?.json().await?))
    }

    async fn is_stopped(&self) -> Result<bool, ClusterError> {
        let url = endpoint(&self.base_url, &["status"]);
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.unreachable(e))?;
        let status: NodeStatus = check(resp)?.json().await?;
        Ok(status.stopped)
    }
}

/// Opens [`HttpNodeRpc`] handles. Connections are lazy: no I/O happens
/// until the first call on the handle.
pub struct HttpNodeConnector {
    client: Client,
}

impl HttpNodeConnector {
    /// Create a connector sharing `client`.
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl NodeConnector for HttpNodeConnector {
    async fn connect(&self, node: &NodeAddress) -> Result<Arc<dyn NodeRpc>, ClusterError> {
        Ok(Arc::new(HttpNodeRpc::open(self.client.clone(), node)?))
    }
}

// ---------------------------------------------------------------------------
// Point reads
// ---------------------------------------------------------------------------

/// [`ShardReader`] that goes through the cluster's read gateway, which
/// routes each row to the node currently serving it.
pub struct HttpShardReader {
    client: Client,
    gateway_url: Url,
}

impl HttpShardReader {
    /// Create a reader rooted at `gateway_url`.
    pub fn new(client: Client, gateway_url: &str) -> Result<Self, ClusterError> {
        Ok(Self {
            client,
            gateway_url: parse_base(gateway_url)?,
        })
    }

    fn row_url(&self, table: &str, key: &[u8]) -> Url {
        endpoint(
            &self.gateway_url,
            &["tables", table, "rows", hex::encode(key).as_str()],
        )
    }
}

#[async_trait]
impl ShardReader for HttpShardReader {
    async fn point_lookup(
        &self,
        shard: &ShardDescriptor,
        key: &[u8],
    ) -> Result<Option<Bytes>, ClusterError> {
        let resp = self
            .client
            .get(self.row_url(&shard.table, key))
            .send()
            .await
            .map_err(|e| ClusterError::Lookup(format!("{}: {e}", shard.id)))?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Ok(Some(check(resp)?.bytes().await?))
    }
}
