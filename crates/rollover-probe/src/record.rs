//! Failure history and downtime accounting for one probe.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use rollover_cluster::ClusterError;
use rollover_types::ShardId;
use tokio::time::Instant;

/// Everything one probe observed while it ran.
///
/// Owned by the probe task; handed back to the caller only once the task
/// has stopped, so it needs no locking.
#[derive(Debug, Default)]
pub struct ProbeRecord {
    errors: BTreeMap<Instant, ClusterError>,
    failing_since: Option<Instant>,
    downtime: Duration,
}

impl ProbeRecord {
    /// Empty record: healthy, no errors, zero downtime.
    pub fn new() -> Self {
        Self::default()
    }

    /// Note a successful read fired at `at`.
    ///
    /// Returns the length of the outage this success ended, if any.
    pub fn record_success(&mut self, at: Instant) -> Option<Duration> {
        let since = self.failing_since.take()?;
        let outage = at.saturating_duration_since(since);
        self.downtime += outage;
        Some(outage)
    }

    /// Note a failed read fired at `at`.
    ///
    /// Returns `true` if this failure started a new outage.
    pub fn record_failure(&mut self, at: Instant, error: ClusterError) -> bool {
        self.errors.insert(at, error);
        if self.failing_since.is_some() {
            return false;
        }
        self.failing_since = Some(at);
        true
    }

    /// Close the record at `at`, counting an outage still in progress.
    pub fn finish(&mut self, at: Instant) {
        if let Some(since) = self.failing_since.take() {
            self.downtime += at.saturating_duration_since(since);
        }
    }

    /// Total time the shard was observed unreadable.
    pub fn downtime(&self) -> Duration {
        self.downtime
    }

    /// Number of failed reads.
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Whether the most recent read failed.
    pub fn is_failing(&self) -> bool {
        self.failing_since.is_some()
    }

    /// Condense the record into a printable summary.
    pub fn summarize(&self, shard: &ShardId) -> ProbeSummary {
        self.summary(shard, self.downtime)
    }

    /// Like [`summarize`](Self::summarize), with an outage still in
    /// progress counted up to `at`.
    pub fn summarize_at(&self, shard: &ShardId, at: Instant) -> ProbeSummary {
        let open = self
            .failing_since
            .map_or(Duration::ZERO, |since| at.saturating_duration_since(since));
        self.summary(shard, self.downtime + open)
    }

    fn summary(&self, shard: &ShardId, downtime: Duration) -> ProbeSummary {
        ProbeSummary {
            shard: shard.clone(),
            downtime,
            error_count: self.errors.len(),
            last_error: self.errors.values().next_back().map(ToString::to_string),
            aborted: None,
        }
    }
}

/// Per-shard availability result of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeSummary {
    pub shard: ShardId,
    pub downtime: Duration,
    pub error_count: usize,
    pub last_error: Option<String>,
    /// Set when the probe task died; the other fields then only cover
    /// what it saw before.
    pub aborted: Option<String>,
}

impl ProbeSummary {
    /// A summary for a shard that was never observed failing.
    pub fn clean(shard: ShardId) -> Self {
        Self {
            shard,
            downtime: Duration::ZERO,
            error_count: 0,
            last_error: None,
            aborted: None,
        }
    }
}

impl fmt::Display for ProbeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: total downtime = {}ms, number of errors = {}",
            self.shard,
            self.downtime.as_millis(),
            self.error_count
        )?;
        if let Some(reason) = &self.aborted {
            write!(f, " (probe aborted: {reason})")?;
        }
        Ok(())
    }
}
