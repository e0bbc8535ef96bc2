//! Integration test: runs that fail part way.
//!
//! Each test injects one fault into the standard cluster and checks the
//! stage the run stopped in, what it left behind, and that cleanup ran
//! exactly once.

use std::time::Duration;

use rollover_engine::{RestartError, RestartReport};
use rollover_integration_tests::{Event, SimCluster, node, standard_cluster};
use rollover_lifecycle::{LifecycleError, NodeAction};
use rollover_migrate::MigrateError;
use rollover_types::{NodeAddress, RestartState, ShardId};

async fn run(sim: &SimCluster) -> RestartReport {
    sim.orchestrator(&node(1)).run().await
}

fn removals(sim: &SimCluster) -> usize {
    sim.count(|e| matches!(e, Event::BlacklistRemove(_)))
}

fn stops(sim: &SimCluster) -> usize {
    sim.count(|e| matches!(e, Event::Stop(_)))
}

fn starts(sim: &SimCluster) -> usize {
    sim.count(|e| matches!(e, Event::Start(_)))
}

// ---------------------------------------------------------------------------
// Setup
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_admin_unreachable_fails_setup_without_side_effects() {
    let sim = standard_cluster();
    sim.with_faults(|f| f.admin_unreachable = true);

    let report = run(&sim).await;

    assert_eq!(report.final_state, RestartState::Failed);
    assert_eq!(report.failed_stage, Some(RestartState::Setup));
    assert!(matches!(report.error, Some(RestartError::Setup(_))));
    assert!(report.probes.is_empty());
    assert!(!report.blacklist_cleared);
    assert!(sim.events().is_empty());
    assert!(report.guidance().unwrap().contains("Please retry"));
}

#[tokio::test(start_paused = true)]
async fn test_unreachable_target_fails_setup() {
    let sim = standard_cluster();
    sim.with_faults(|f| {
        f.unreachable.insert(node(1));
    });

    let report = run(&sim).await;

    assert_eq!(report.failed_stage, Some(RestartState::Setup));
    assert_eq!(report.shards, 0);
    assert!(sim.events().is_empty());
    assert!(sim.blacklist().is_empty());
}

// ---------------------------------------------------------------------------
// Drain
// ---------------------------------------------------------------------------

/// A move that never lands is issued once, reissued once, then fails the
/// drain before the node is touched.
#[tokio::test(start_paused = true)]
async fn test_stuck_move_fails_drain() {
    let sim = standard_cluster();
    sim.with_faults(|f| {
        f.stuck_shards.insert(ShardId::from("t,a,1"));
    });

    let report = run(&sim).await;

    assert_eq!(report.failed_stage, Some(RestartState::Drain));
    match &report.error {
        Some(RestartError::Migration(MigrateError::Exhausted {
            shard,
            destination,
            attempts,
        })) => {
            assert_eq!(shard.as_str(), "t,a,1");
            assert_eq!(*destination, node(2));
            assert_eq!(*attempts, 2);
        }
        other => panic!("unexpected error: {other:?}"),
    }

    assert_eq!(sim.moves_of("t,a,1"), vec![node(2), node(2)]);
    assert!(sim.moves_of("t,g,2").is_empty());
    assert_eq!(stops(&sim), 0);
    assert_eq!(removals(&sim), 1);
    assert_eq!(sim.events().last(), Some(&Event::BlacklistRemove(node(1))));
    assert!(sim.blacklist().is_empty());
    assert!(report.blacklist_cleared);
    assert!(report.guidance().unwrap().contains("balancer will reassign"));
}

/// The plan can only be read once: drain falls back to the plan captured
/// during setup and still completes.
#[tokio::test(start_paused = true)]
async fn test_plan_outage_falls_back_to_setup_plan() {
    let sim = standard_cluster();
    sim.with_faults(|f| f.plan_reads_before_failure = Some(1));

    let report = run(&sim).await;

    assert!(report.is_success(), "run failed: {:?}", report.error);
    assert_eq!(sim.moves_of("t,a,1"), vec![node(2), node(1)]);
    assert_eq!(sim.moves_of("t,g,2"), vec![node(3), node(1)]);
}

// ---------------------------------------------------------------------------
// Restarting the node
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_failed_stop_command_aborts_before_start() {
    let sim = standard_cluster();
    sim.with_faults(|f| f.stop_exit_code = 1);

    let report = run(&sim).await;

    assert_eq!(report.failed_stage, Some(RestartState::RestartingNode));
    assert!(matches!(
        report.error,
        Some(RestartError::Lifecycle(LifecycleError::CommandFailed {
            action: NodeAction::Stop,
            ..
        }))
    ));
    assert_eq!(stops(&sim), 1);
    assert_eq!(starts(&sim), 0);
    assert_eq!(report.drain.moved, 2);
    assert_eq!(report.undrain.moved, 0);
    assert_eq!(removals(&sim), 1);
    assert!(report.guidance().unwrap().contains("manually"));
}

#[tokio::test(start_paused = true)]
async fn test_failed_start_command_leaves_node_down() {
    let sim = standard_cluster();
    sim.with_faults(|f| f.start_exit_code = 3);

    let report = run(&sim).await;

    assert_eq!(report.failed_stage, Some(RestartState::RestartingNode));
    assert!(matches!(
        report.error,
        Some(RestartError::Lifecycle(LifecycleError::CommandFailed {
            action: NodeAction::Start,
            ..
        }))
    ));
    assert_eq!(starts(&sim), 1);
    assert!(sim.is_stopped(&node(1)));
    assert_eq!(sim.owner("t,a,1"), Some(node(2)));
    assert_eq!(removals(&sim), 1);
}

/// The start command succeeds but the node never reports live.
#[tokio::test(start_paused = true)]
async fn test_node_never_live_times_out() {
    let sim = standard_cluster();
    sim.with_faults(|f| f.stays_down_after_start = true);

    let started = tokio::time::Instant::now();
    let report = run(&sim).await;

    assert_eq!(report.failed_stage, Some(RestartState::RestartingNode));
    match &report.error {
        Some(RestartError::Lifecycle(LifecycleError::NotLive { node: n, .. })) => {
            assert_eq!(*n, node(1));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    // Drain, settle and the 30s liveness deadline, nothing close to forever.
    assert!(started.elapsed() >= Duration::from_secs(30));
    assert!(started.elapsed() < Duration::from_secs(60));
    assert_eq!(removals(&sim), 1);
}

// ---------------------------------------------------------------------------
// Undrain
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_undrain_failure_is_reported_and_cleaned_up() {
    let sim = standard_cluster();
    sim.with_faults(|f| {
        f.refuse_moves_to.insert(node(1));
    });

    let report = run(&sim).await;

    assert_eq!(report.failed_stage, Some(RestartState::Undrain));
    assert!(matches!(
        report.error,
        Some(RestartError::Migration(MigrateError::Exhausted { .. }))
    ));
    assert_eq!(report.undrain.moved, 0);
    assert_eq!(starts(&sim), 1);
    assert_eq!(sim.moves_of("t,a,1"), vec![node(2), node(1), node(1)]);
    assert!(report.blacklist_cleared);
    assert!(sim.blacklist().is_empty());
    assert!(report.guidance().unwrap().contains("rebalance"));
}

// ---------------------------------------------------------------------------
// Cleanup
// ---------------------------------------------------------------------------

/// However a blacklisted run ends, the blacklist is lifted exactly once and
/// nothing happens afterwards.
#[tokio::test(start_paused = true)]
async fn test_cleanup_runs_once_for_every_failing_stage() {
    let stuck = |sim: &SimCluster| {
        sim.with_faults(|f| {
            f.stuck_shards.insert(ShardId::from("t,g,2"));
        })
    };
    let bad_stop = |sim: &SimCluster| sim.with_faults(|f| f.stop_exit_code = 1);
    let bad_start = |sim: &SimCluster| sim.with_faults(|f| f.start_exit_code = 1);
    let refuse = |sim: &SimCluster| {
        sim.with_faults(|f| {
            f.refuse_moves_to.insert(node(1));
        })
    };
    let injections: [&dyn Fn(&SimCluster); 4] = [&stuck, &bad_stop, &bad_start, &refuse];

    for inject in injections {
        let sim = standard_cluster();
        inject(&sim);

        let report = run(&sim).await;

        assert_eq!(report.final_state, RestartState::Failed);
        assert_eq!(removals(&sim), 1, "events: {:?}", sim.events());
        assert_eq!(sim.events().last(), Some(&Event::BlacklistRemove(node(1))));
        assert_eq!(report.probes.len(), 4);
    }
}

/// An unrelated node already on the blacklist is left alone.
#[tokio::test(start_paused = true)]
async fn test_cleanup_only_lifts_target() {
    let sim = standard_cluster();
    let other = NodeAddress::new("rs9.test", 60020);
    sim.blacklist_node(&other);
    sim.with_faults(|f| f.stop_exit_code = 1);

    let report = run(&sim).await;

    assert!(report.blacklist_cleared);
    assert_eq!(sim.blacklist().into_iter().collect::<Vec<_>>(), vec![other]);
}
