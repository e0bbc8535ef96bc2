//! The per-shard probe task and its handles.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rollover_cluster::{ClusterError, ShardReader};
use rollover_types::{ShardDescriptor, ShardId};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::key;
use crate::record::{ProbeRecord, ProbeSummary};

/// Periodic point reader for one shard.
///
/// Fires every `frequency`, reads one pseudo-random key inside the shard's
/// range and feeds the outcome into its [`ProbeRecord`]. Runs until the
/// shutdown signal arrives, then returns the record.
pub struct AvailabilityProbe {
    shard: ShardDescriptor,
    reader: Arc<dyn ShardReader>,
    frequency: Duration,
    rng: StdRng,
    record: ProbeRecord,
    progress: watch::Sender<ProbeSummary>,
    shutdown_rx: watch::Receiver<bool>,
}

impl AvailabilityProbe {
    /// Spawn a probe for `shard` and return its handle.
    ///
    /// The first read fires one `frequency` after the call.
    pub fn start(
        shard: ShardDescriptor,
        reader: Arc<dyn ShardReader>,
        frequency: Duration,
    ) -> ProbeHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let id = shard.id.clone();
        let (progress_tx, progress_rx) = watch::channel(ProbeSummary::clean(id.clone()));

        let probe = Self {
            shard,
            reader,
            frequency,
            rng: StdRng::from_os_rng(),
            record: ProbeRecord::new(),
            progress: progress_tx,
            shutdown_rx,
        };
        let task = tokio::spawn(probe.run());

        ProbeHandle {
            shard: id,
            shutdown_tx,
            progress: progress_rx,
            task,
        }
    }

    async fn run(mut self) -> ProbeRecord {
        debug!(shard = %self.shard.id, "probe started");

        let mut interval = time::interval_at(Instant::now() + self.frequency, self.frequency);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let fired_at = tokio::select! {
                _ = self.shutdown_rx.changed() => break,
                at = interval.tick() => at,
            };

            let key = key::random_key(&self.shard, &mut self.rng);
            let result = tokio::select! {
                biased;
                _ = self.shutdown_rx.changed() => None,
                result = self.reader.point_lookup(&self.shard, &key) => Some(result),
            };
            match result {
                Some(result) => self.observe(fired_at, result),
                None => break,
            }
        }

        self.record.finish(Instant::now());
        debug!(
            shard = %self.shard.id,
            downtime_ms = self.record.downtime().as_millis() as u64,
            "probe stopped"
        );
        self.record
    }

    fn observe(&mut self, at: Instant, result: Result<Option<Bytes>, ClusterError>) {
        let shard = &self.shard.id;
        match result {
            Ok(_) => {
                if let Some(outage) = self.record.record_success(at) {
                    info!(%shard, outage_ms = outage.as_millis() as u64, "shard readable again");
                    self.publish(at);
                }
            }
            Err(e) => {
                debug!(%shard, error = %e, "probe read failed");
                if self.record.record_failure(at, e) {
                    warn!(%shard, "shard became unreadable");
                }
                self.publish(at);
            }
        }
    }

    /// Expose the record so far to the handle, in case the task dies.
    fn publish(&self, at: Instant) {
        self.progress
            .send_replace(self.record.summarize_at(&self.shard.id, at));
    }
}

// ---------------------------------------------------------------------------
// Handles
// ---------------------------------------------------------------------------

/// Handle to a running [`AvailabilityProbe`].
pub struct ProbeHandle {
    shard: ShardId,
    shutdown_tx: watch::Sender<bool>,
    progress: watch::Receiver<ProbeSummary>,
    task: JoinHandle<ProbeRecord>,
}

impl ProbeHandle {
    /// Whether the probe task is still running.
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Ask the probe to stop without waiting for it.
    pub fn signal_stop(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// Stop the probe and summarize what it observed.
    ///
    /// If the task died, the summary holds the last published progress and
    /// carries the reason in [`ProbeSummary::aborted`].
    pub async fn stop(self) -> ProbeSummary {
        self.signal_stop();
        match self.task.await {
            Ok(record) => record.summarize(&self.shard),
            Err(e) => {
                warn!(shard = %self.shard, error = %e, "probe task aborted");
                let mut summary = self.progress.borrow().clone();
                summary.aborted = Some(e.to_string());
                summary
            }
        }
    }
}

/// The probes of one run, in shard order.
#[derive(Default)]
pub struct ProbeSet {
    handles: Vec<ProbeHandle>,
}

impl ProbeSet {
    /// Start one probe per shard.
    pub fn start_all(
        shards: &[ShardDescriptor],
        reader: Arc<dyn ShardReader>,
        frequency: Duration,
    ) -> Self {
        let handles = shards
            .iter()
            .map(|shard| AvailabilityProbe::start(shard.clone(), reader.clone(), frequency))
            .collect::<Vec<_>>();
        info!(count = handles.len(), "availability probes started");
        Self { handles }
    }

    /// Number of probes in the set.
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Whether the set holds no probes.
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Stop every probe and return their summaries in shard order.
    ///
    /// All probes are signalled before any is awaited. Calling this again
    /// returns an empty list.
    pub async fn stop_all(&mut self) -> Vec<ProbeSummary> {
        for handle in &self.handles {
            handle.signal_stop();
        }
        let mut summaries = Vec::with_capacity(self.handles.len());
        for handle in self.handles.drain(..) {
            summaries.push(handle.stop().await);
        }
        summaries
    }
}
