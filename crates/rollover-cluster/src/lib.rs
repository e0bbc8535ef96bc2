//! Collaborators of a rolling restart: the cluster admin service, per-node
//! RPC, and routed point reads.
//!
//! This crate provides:
//!
//! - [`ClusterAdmin`] — blacklist management, shard moves, assignment plan.
//! - [`NodeRpc`] / [`NodeConnector`] — per-node shard ownership and liveness.
//! - [`ShardReader`] — point lookups routed to whichever node serves a shard.
//! - [`ConnectionCache`] — one memoized [`NodeRpc`] handle per node address.
//! - [`http`] — JSON-over-HTTP implementations of the traits above.

mod admin;
mod cache;
mod error;
pub mod http;
mod rpc;

pub use admin::{ClusterAdmin, clear_all_blacklists};
pub use cache::ConnectionCache;
pub use error::ClusterError;
pub use rpc::{NodeConnector, NodeRpc, ShardReader};
