//! Read availability probes for shards in flight.
//!
//! While a node is drained and restarted, one [`AvailabilityProbe`] per
//! shard keeps issuing point reads and measures how long the shard was
//! unreadable:
//!
//! - [`key`] — picks a pseudo-random key inside a shard's range.
//! - [`ProbeRecord`] — failure history and downtime accounting.
//! - [`ProbeHandle`] / [`ProbeSet`] — stop running probes and collect
//!   their [`ProbeSummary`].

pub mod key;
mod probe;
mod record;

pub use probe::{AvailabilityProbe, ProbeHandle, ProbeSet};
pub use record::{ProbeRecord, ProbeSummary};
