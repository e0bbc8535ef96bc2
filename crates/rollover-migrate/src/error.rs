//! Error types for shard moves.

use rollover_types::{NodeAddress, ShardId};

/// Errors that end a shard move.
#[derive(Debug, thiserror::Error)]
pub enum MigrateError {
    /// The destination never confirmed ownership within the retry budget.
    #[error("move of {shard} to {destination} unconfirmed after {attempts} attempt(s)")]
    Exhausted {
        /// The shard being moved.
        shard: ShardId,
        /// Where it was being moved to.
        destination: NodeAddress,
        /// How many times the move was issued.
        attempts: u32,
    },

    /// The shard is a system or split-boundary shard and must stay put.
    #[error("shard {0} must not be relocated")]
    Immovable(ShardId),
}
