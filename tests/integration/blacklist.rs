//! Integration test: the clear-all-blacklists maintenance operation.

use rollover_cluster::{ClusterError, clear_all_blacklists};
use rollover_engine::RestartMode;
use rollover_integration_tests::{Event, SimCluster, node, standard_cluster};

#[tokio::test]
async fn test_clear_all_empties_blacklist() {
    let sim = SimCluster::new();
    sim.blacklist_node(&node(1));
    sim.blacklist_node(&node(4));

    clear_all_blacklists(&sim).await.unwrap();

    assert!(sim.blacklist().is_empty());
    assert_eq!(sim.events(), vec![Event::BlacklistClearAll]);
}

#[tokio::test]
async fn test_clear_all_on_empty_blacklist_is_harmless() {
    let sim = SimCluster::new();
    clear_all_blacklists(&sim).await.unwrap();
    assert!(sim.blacklist().is_empty());
}

#[tokio::test]
async fn test_clear_all_reports_unreachable_admin() {
    let sim = SimCluster::new();
    sim.blacklist_node(&node(2));
    sim.with_faults(|f| f.admin_unreachable = true);

    let err = clear_all_blacklists(&sim).await.unwrap_err();

    assert!(matches!(err, ClusterError::Admin(_)));
    assert!(sim.blacklist().contains(&node(2)));
    assert!(sim.events().is_empty());
}

/// A node held out by drain-and-hold is released by a later clear.
#[tokio::test(start_paused = true)]
async fn test_clear_all_releases_held_node() {
    let sim = standard_cluster();
    let report = sim
        .orchestrator(&node(1))
        .with_mode(RestartMode::DrainAndHold)
        .run()
        .await;
    assert!(report.is_success());
    assert!(sim.blacklist().contains(&node(1)));

    clear_all_blacklists(&sim).await.unwrap();

    assert!(sim.blacklist().is_empty());
    assert_eq!(sim.events().last(), Some(&Event::BlacklistClearAll));
}
