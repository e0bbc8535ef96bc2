//! Shared types and identifiers for rollover.
//!
//! This crate defines the types used across the rollover workspace:
//! cluster identifiers ([`NodeAddress`], [`ShardId`]), the shard and
//! placement model ([`ShardDescriptor`], [`AssignmentPlan`]), the restart
//! state machine's [`RestartState`], and the timing knobs of a run
//! ([`RestartConfig`], [`MigrationConfig`]).

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Port assumed for a target given as a bare host name.
pub const DEFAULT_RPC_PORT: u16 = 60020;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Host and port identifying a cluster member.
///
/// Used both as the connection cache key and as the blacklist entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeAddress {
    /// Host name or IP literal.
    pub host: String,
    /// RPC port.
    pub port: u16,
}

impl NodeAddress {
    /// Build an address from its parts.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for NodeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Failure to parse a `host[:port]` string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressParseError {
    /// The host part was empty.
    #[error("empty host in node address {0:?}")]
    EmptyHost(String),

    /// The port part was not a valid `u16`.
    #[error("invalid port in node address {0:?}")]
    InvalidPort(String),
}

impl FromStr for NodeAddress {
    type Err = AddressParseError;

    /// Parse `host:port`, or a bare `host` with [`DEFAULT_RPC_PORT`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (host, port) = match s.rsplit_once(':') {
            Some((host, port)) => {
                let port = port
                    .parse::<u16>()
                    .map_err(|_| AddressParseError::InvalidPort(s.to_string()))?;
                (host, port)
            }
            None => (s, DEFAULT_RPC_PORT),
        };
        if host.is_empty() {
            return Err(AddressParseError::EmptyHost(s.to_string()));
        }
        Ok(Self::new(host, port))
    }
}

/// Name of a shard (a region), unique across the cluster.
///
/// Region names follow the `table,start_key,id` convention, so a name
/// containing `,,` denotes a shard whose start key is empty.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShardId(String);

impl ShardId {
    /// Wrap a shard name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Borrow the shard name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ShardId {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl fmt::Display for ShardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for ShardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ShardId({})", self.0)
    }
}

// ---------------------------------------------------------------------------
// Shard model
// ---------------------------------------------------------------------------

/// Identity of a contiguous key range owned by one node at a time.
///
/// Captured once at setup from the target node's assignment and never
/// mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardDescriptor {
    /// Shard name.
    pub id: ShardId,
    /// Name of the table this shard belongs to.
    pub table: String,
    /// Inclusive start of the key range (empty = start of table).
    pub start_key: Vec<u8>,
    /// Exclusive end of the key range (empty = end of table).
    pub end_key: Vec<u8>,
    /// Catalog shards (root/meta) that must never be relocated.
    #[serde(default)]
    pub is_system: bool,
}

impl ShardDescriptor {
    /// Whether the shard name marks it as a split boundary (`,,`).
    pub fn is_split_boundary(&self) -> bool {
        self.id.as_str().contains(",,")
    }

    /// Whether the migrator may relocate this shard at all.
    pub fn is_movable(&self) -> bool {
        !self.is_system && !self.is_split_boundary()
    }
}

/// The placement service's preferred owners per shard, in preference order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentPlan {
    /// Candidate nodes keyed by shard.
    pub assignments: HashMap<ShardId, Vec<NodeAddress>>,
}

impl AssignmentPlan {
    /// Build a plan from `(shard, candidates)` pairs.
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (ShardId, Vec<NodeAddress>)>,
    {
        Self {
            assignments: entries.into_iter().collect(),
        }
    }

    /// Candidates for a shard, or an empty slice if the plan has none.
    pub fn candidates(&self, shard: &ShardId) -> &[NodeAddress] {
        self.assignments
            .get(shard)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Number of shards with an entry in the plan.
    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    /// Whether the plan is empty.
    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Restart state
// ---------------------------------------------------------------------------

/// Stage of a rolling restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RestartState {
    /// Capturing shards and plan, blacklisting the node, starting probes.
    Setup,
    /// Moving shards off the target node.
    Drain,
    /// Stopping and starting the node's storage process.
    RestartingNode,
    /// Moving shards back to the target node.
    Undrain,
    /// The run finished successfully.
    Complete,
    /// The run aborted; see the run report for the stage reached.
    Failed,
}

impl fmt::Display for RestartState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Setup => "setup",
            Self::Drain => "drain",
            Self::RestartingNode => "restarting_node",
            Self::Undrain => "undrain",
            Self::Complete => "complete",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Timeout and retry knobs for a single shard move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MigrationConfig {
    /// How long one move attempt may stay unconfirmed.
    pub move_timeout: Duration,
    /// How many times a timed-out move is reissued.
    pub move_retries: u32,
    /// Interval between ownership polls on the destination.
    pub poll_interval: Duration,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            move_timeout: Duration::from_secs(60),
            move_retries: 1,
            poll_interval: Duration::from_secs(2),
        }
    }
}

/// Timing configuration for one rolling restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestartConfig {
    /// Pause after each successful move while draining.
    pub drain_interval: Duration,
    /// Pause after each successful move while undraining.
    pub undrain_interval: Duration,
    /// Settle time before stopping the node.
    pub settle_before_restart: Duration,
    /// Settle time after the node reports live again.
    pub settle_after_restart: Duration,
    /// Period of each availability probe.
    pub probe_frequency: Duration,
    /// Interval between liveness checks on the restarted node.
    pub liveness_poll_interval: Duration,
    /// Upper bound on waiting for the restarted node to report live.
    pub liveness_timeout: Duration,
    /// Per-move timeout and retry settings.
    pub migration: MigrationConfig,
}

impl Default for RestartConfig {
    fn default() -> Self {
        Self {
            drain_interval: Duration::from_secs(1),
            undrain_interval: Duration::from_secs(10),
            settle_before_restart: Duration::from_secs(10),
            settle_after_restart: Duration::from_secs(10),
            probe_frequency: Duration::from_secs(1),
            liveness_poll_interval: Duration::from_secs(1),
            liveness_timeout: Duration::from_secs(600),
            migration: MigrationConfig::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
