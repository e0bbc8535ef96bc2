//! Integration test: successful restarts.
//!
//! Target `rs1` owns a catalog shard, a split-boundary shard and two user
//! shards. A run drains the user shards, restarts the node and brings them
//! back while every shard is probed.

use std::time::Duration;

use rollover_cluster::{ClusterError, ShardReader};
use rollover_engine::RestartMode;
use rollover_integration_tests::{Event, SimCluster, descriptor, node, standard_cluster};
use rollover_types::{RestartState, ShardId};

fn mv(shard: &str, n: u8) -> Event {
    Event::Move {
        shard: ShardId::from(shard),
        destination: node(n),
    }
}

/// Full run: drain in captured order, restart, undrain, unblacklist.
#[tokio::test(start_paused = true)]
async fn test_full_restart_round_trip() {
    let sim = standard_cluster();
    let report = sim.orchestrator(&node(1)).run().await;

    assert!(report.is_success(), "run failed: {:?}", report.error);
    assert_eq!(report.final_state, RestartState::Complete);
    assert_eq!(report.failed_stage, None);
    assert_eq!(report.shards, 4);
    assert_eq!((report.drain.moved, report.drain.skipped), (2, 0));
    assert_eq!((report.undrain.moved, report.undrain.skipped), (2, 0));
    assert!(report.blacklist_cleared);

    assert_eq!(
        sim.events(),
        vec![
            Event::BlacklistAdd(node(1)),
            mv("t,a,1", 2),
            mv("t,g,2", 3),
            Event::Stop(node(1)),
            Event::Start(node(1)),
            mv("t,a,1", 1),
            mv("t,g,2", 1),
            Event::BlacklistRemove(node(1)),
        ]
    );

    assert_eq!(sim.owner("t,a,1"), Some(node(1)));
    assert_eq!(sim.owner("t,g,2"), Some(node(1)));
    assert_eq!(sim.owner("t,z,9"), Some(node(2)));
    assert!(sim.blacklist().is_empty());
    assert!(!sim.is_stopped(&node(1)));

    // Every read landed inside its shard and nothing went unserved.
    assert_eq!(report.probes.len(), 4);
    for summary in &report.probes {
        assert_eq!(summary.error_count, 0, "{summary}");
        assert_eq!(summary.last_error, None, "{summary}");
        assert_eq!(summary.aborted, None, "{summary}");
    }
}

/// Catalog and split-boundary shards are probed but never relocated.
#[tokio::test(start_paused = true)]
async fn test_system_and_boundary_shards_never_move() {
    let sim = standard_cluster();
    let report = sim.orchestrator(&node(1)).run().await;
    assert!(report.is_success());

    assert!(sim.moves_of(".META.,,1").is_empty());
    assert!(sim.moves_of("t,,0").is_empty());
    assert!(sim.moves_of("t,z,9").is_empty());

    let probed: Vec<_> = report.probes.iter().map(|p| p.shard.as_str()).collect();
    assert_eq!(probed, [".META.,,1", "t,a,1", "t,,0", "t,g,2"]);
}

/// Shards left on the node are unreadable while it reboots; drained
/// shards never are.
#[tokio::test(start_paused = true)]
async fn test_probes_measure_downtime_of_shards_left_on_node() {
    let sim = standard_cluster();
    sim.with_faults(|f| f.boot_time = Duration::from_secs(3));

    let report = sim.orchestrator(&node(1)).run().await;
    assert!(report.is_success(), "run failed: {:?}", report.error);

    for summary in &report.probes {
        match summary.shard.as_str() {
            ".META.,,1" | "t,,0" => {
                assert!(summary.error_count > 0, "{summary}");
                assert!(summary.downtime >= Duration::from_millis(2_500), "{summary}");
                assert!(summary.downtime <= Duration::from_secs(4), "{summary}");
                assert!(summary.last_error.is_some());
                let last = summary.last_error.as_deref().unwrap_or_default();
                assert!(!last.contains("outside range"), "{summary}");
            }
            _ => {
                assert_eq!(summary.error_count, 0, "{summary}");
                assert_eq!(summary.downtime, Duration::ZERO, "{summary}");
            }
        }
    }
}

/// One shard has no live candidate besides the target: it stays home and
/// the run carries on to the restart.
#[tokio::test(start_paused = true)]
async fn test_shard_without_live_destination_stays_home() {
    let sim = SimCluster::new();
    sim.add_shard("t,a,1", &node(1), &[node(2)]);
    sim.add_shard("t,h,2", &node(1), &[node(1), node(3)]);
    sim.add_shard("t,q,3", &node(1), &[node(1), node(4)]);
    sim.set_stopped(&node(4), true);

    let report = sim.orchestrator(&node(1)).run().await;

    assert!(report.is_success(), "run failed: {:?}", report.error);
    assert_eq!((report.drain.moved, report.drain.skipped), (2, 1));
    assert!(sim.moves_of("t,q,3").iter().all(|dest| *dest == node(1)));
    assert_eq!(sim.count(|e| matches!(e, Event::Stop(_))), 1);
    assert_eq!(sim.owner("t,q,3"), Some(node(1)));
    assert_eq!(sim.owner("t,a,1"), Some(node(1)));
}

/// Drain never chooses the drained node even if the plan prefers it.
#[tokio::test(start_paused = true)]
async fn test_drain_skips_target_in_plan() {
    let sim = SimCluster::new();
    sim.add_shard("t,a,1", &node(1), &[node(1), node(1), node(5)]);

    let report = sim.orchestrator(&node(1)).run().await;
    assert!(report.is_success());
    assert_eq!(sim.moves_of("t,a,1"), vec![node(5), node(1)]);
}

/// Drain-and-hold stops after the node is stopped and leaves it
/// blacklisted with its shards elsewhere.
#[tokio::test(start_paused = true)]
async fn test_drain_and_hold() {
    let sim = standard_cluster();
    let report = sim
        .orchestrator(&node(1))
        .with_mode(RestartMode::DrainAndHold)
        .run()
        .await;

    assert_eq!(report.final_state, RestartState::Complete);
    assert_eq!(report.drain.moved, 2);
    assert_eq!(report.undrain.moved, 0);
    assert!(!report.blacklist_cleared);

    assert_eq!(sim.events().last(), Some(&Event::Stop(node(1))));
    assert_eq!(sim.count(|e| matches!(e, Event::Start(_))), 0);
    assert!(sim.blacklist().contains(&node(1)));
    assert!(sim.is_stopped(&node(1)));
    assert_eq!(sim.owner("t,a,1"), Some(node(2)));
    assert_eq!(sim.owner("t,g,2"), Some(node(3)));
}

/// A read outside the shard's range is an error the run reports, not a
/// crash inside the simulated cluster.
#[tokio::test(start_paused = true)]
async fn test_read_outside_shard_range_is_an_error() {
    let sim = standard_cluster();
    let shard = descriptor("t,a,1", false);

    assert!(sim.point_lookup(&shard, b"a\x10").await.is_ok());
    let err = sim.point_lookup(&shard, b"b").await.unwrap_err();
    assert!(matches!(err, ClusterError::Lookup(ref msg) if msg.contains("outside range")));

    // The cluster is still usable afterwards.
    assert!(sim.orchestrator(&node(1)).run().await.is_success());
}
