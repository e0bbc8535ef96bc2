//! Shard relocation for rollover.
//!
//! This crate provides:
//!
//! - [`ShardMigrator`] — moves one shard to a live destination, waits for
//!   the destination to confirm ownership, and reissues timed-out moves.
//! - [`MoveOutcome`] — whether the shard moved or had nowhere to go.
//! - [`MigrationAttempt`] — the in-flight state of one move.
//! - [`MigrateError`] — a move that exhausted its retry budget.

pub mod error;
pub mod migrator;

pub use error::MigrateError;
pub use migrator::{MigrationAttempt, MoveOutcome, ShardMigrator};
