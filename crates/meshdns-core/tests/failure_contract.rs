//! Contract Test: Failure Handling
//!
//! This test verifies how a run reacts when one of the remote APIs fails.
//!
//! Constraints verified:
//! - A failed device listing aborts the run before DNS is read or changed
//! - A failed record listing aborts the run before anything is changed
//! - A failed operation does not stop operations on other names
//! - No retries happen inside a run
//! - A run exceeding its time budget is aborted with a timeout error

mod common;

use common::*;
use meshdns_core::{Error, ProviderOperation, SyncEvent, SyncRunner};
use std::time::Duration;

#[tokio::test]
async fn directory_failure_aborts_before_touching_dns() {
    let zone = InMemoryZone::new();
    zone.seed(managed_a("alice.example.com", "1.2.3.4"));

    let (runner, mut event_rx) = SyncRunner::new(
        Box::new(StaticDirectory::unavailable()),
        Box::new(zone.clone()),
        minimal_config(),
    )
    .unwrap();

    let err = runner.run_once().await.expect_err("run must fail");

    assert!(matches!(err, Error::DirectoryUnavailable(_)));
    assert!(err.is_fatal());
    assert_eq!(zone.list_calls(), 0);
    assert!(zone.change_calls().is_empty());
    // An empty device list would have deleted alice; a failed one must not
    assert!(zone.find("alice.example.com").is_some());

    let mut aborted = false;
    while let Ok(event) = event_rx.try_recv() {
        if let SyncEvent::RunAborted { .. } = event {
            aborted = true;
        }
    }
    assert!(aborted, "RunAborted event expected");
}

#[tokio::test]
async fn listing_failure_aborts_without_changes() {
    let zone = InMemoryZone::new();
    zone.fail_listing();

    let directory = StaticDirectory::new(vec![device("alice", &["1.2.3.4"])]);
    let (runner, _event_rx) =
        SyncRunner::new(Box::new(directory), Box::new(zone.clone()), minimal_config()).unwrap();

    let err = runner.run_once().await.expect_err("run must fail");

    match err {
        Error::Provider { operation, .. } => assert_eq!(operation, ProviderOperation::List),
        other => panic!("unexpected error: {}", other),
    }
    assert!(zone.change_calls().is_empty());
}

#[tokio::test]
async fn failed_operation_does_not_block_others() {
    let zone = InMemoryZone::new();
    zone.seed(managed_a("alice.example.com", "1.1.1.1"));
    zone.seed(managed_a("carol.example.com", "9.9.9.9"));
    zone.fail_changes_to("alice.example.com");

    let directory = StaticDirectory::new(vec![
        device("alice", &["2.2.2.2"]),
        device("bob", &["1.2.3.5"]),
    ]);
    let (runner, _event_rx) =
        SyncRunner::new(Box::new(directory), Box::new(zone.clone()), minimal_config()).unwrap();

    let report = runner.run_once().await.expect("partial failure is not fatal");

    assert!(!report.is_success());
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].operation.name(), "alice.example.com");
    assert!(!report.failures[0].error.is_fatal());
    assert_eq!(report.created, 1);
    assert_eq!(report.deleted, 1);

    // Exactly one attempt on alice: no retry inside a run
    let alice_calls = zone
        .change_calls()
        .into_iter()
        .filter(|(_, name)| name == "alice.example.com")
        .count();
    assert_eq!(alice_calls, 1);

    assert_eq!(zone.find("alice.example.com").unwrap().value, ip("1.1.1.1"));
    assert!(zone.find("bob.example.com").is_some());
    assert!(zone.find("carol.example.com").is_none());
}

#[tokio::test]
async fn next_run_repairs_what_the_last_one_missed() {
    let zone = InMemoryZone::new();
    zone.seed(managed_a("alice.example.com", "1.1.1.1"));
    zone.fail_changes_to("alice.example.com");

    let devices = vec![device("alice", &["2.2.2.2"])];
    let (first, _rx) = SyncRunner::new(
        Box::new(StaticDirectory::new(devices.clone())),
        Box::new(zone.clone()),
        minimal_config(),
    )
    .unwrap();
    assert_eq!(first.run_once().await.unwrap().failures.len(), 1);

    // Same zone state, provider healthy again
    let healthy = InMemoryZone::new();
    for record in zone.records() {
        healthy.seed(record);
    }
    let (second, _rx) = SyncRunner::new(
        Box::new(StaticDirectory::new(devices)),
        Box::new(healthy.clone()),
        minimal_config(),
    )
    .unwrap();
    let report = second.run_once().await.unwrap();

    assert_eq!(report.updated, 1);
    assert_eq!(healthy.find("alice.example.com").unwrap().value, ip("2.2.2.2"));
}

#[tokio::test(start_paused = true)]
async fn run_exceeding_budget_times_out() {
    let zone = InMemoryZone::new();
    zone.slow_down(Duration::from_secs(60));

    let mut config = minimal_config();
    config.runner.timeout_secs = 10;

    let directory = StaticDirectory::new(vec![device("alice", &["1.2.3.4"])]);
    let (runner, _event_rx) =
        SyncRunner::new(Box::new(directory), Box::new(zone.clone()), config).unwrap();

    let err = runner.run_with_timeout().await.expect_err("run must time out");

    assert!(matches!(err, Error::Timeout(10)));
    assert!(zone.change_calls().is_empty());
}

#[test]
fn invalid_config_is_rejected_at_construction() {
    let mut config = minimal_config();
    config.zone.name = String::new();

    let result = SyncRunner::new(
        Box::new(StaticDirectory::new(Vec::new())),
        Box::new(InMemoryZone::new()),
        config,
    );

    assert!(matches!(result, Err(Error::Config(_))));
}
