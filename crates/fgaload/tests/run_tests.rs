//! End-to-end runs against an in-process service.

mod common;

use std::sync::atomic::Ordering;
use std::time::Duration;

use common::FakeFga;
use fgaload::{plan, run, RunError};
use fgaload_client::assertions::{CHECK_ALLOWED, CHECK_OK, DELETE_OK, MODEL_CREATED, WRITE_OK};

/// Test: a full run writes, probes and leaves the store empty
#[tokio::test]
async fn test_full_run_round_trip() {
    let fga = FakeFga::start().await;
    let config = fga.config();
    let profile = config.profile().unwrap();

    let summary = run(&config, profile, true).await.unwrap();

    assert_eq!(summary.seed, 1234);
    assert_eq!(summary.vus, 2);
    assert_eq!(summary.setup.model_id.as_deref(), Some("01RUNMODEL"));
    assert_eq!(summary.setup.writes.failed, 0);
    assert!(summary.iterations > 0);
    assert_eq!(summary.failed_iterations, 0);
    assert!(summary.latency.is_some());
    assert_eq!(summary.iterations, fga.store.checks.load(Ordering::SeqCst) as u64);

    let teardown = summary.teardown.unwrap();
    assert_eq!(teardown.failed, 0);
    assert_eq!(fga.stored(), 0);

    assert_eq!(summary.assertion_failures(), 0);
    let names: Vec<&str> = summary.assertions.iter().map(|a| a.name.as_str()).collect();
    for expected in [MODEL_CREATED, WRITE_OK, CHECK_OK, CHECK_ALLOWED, DELETE_OK] {
        assert!(names.contains(&expected), "missing assertion {expected}");
    }
}

/// Test: disabling teardown leaves every generated tuple in the store
#[tokio::test]
async fn test_run_without_teardown_keeps_tuples() {
    let fga = FakeFga::start().await;
    let config = fga.config();
    let expected = plan(&config).workload.tuples().len();

    let summary = run(&config, config.profile().unwrap(), false).await.unwrap();

    assert!(summary.teardown.is_none());
    assert_eq!(fga.stored(), expected);
}

/// Test: an empty graph skips the probe phase
#[tokio::test]
async fn test_empty_workload_skips_probes() {
    let fga = FakeFga::start().await;
    let mut config = fga.config();
    config.workload.total_users = 0;
    config.workload.total_repos = 0;
    config.workload.total_orgs = 0;

    let summary = run(&config, config.profile().unwrap(), true).await.unwrap();

    assert_eq!(summary.iterations, 0);
    assert!(summary.latency.is_none());
    assert_eq!(fga.store.checks.load(Ordering::SeqCst), 0);
    assert_eq!(fga.store.writes.load(Ordering::SeqCst), 0);
}

/// Test: a missing store id is fatal before any traffic
#[tokio::test]
async fn test_missing_store_id_is_fatal() {
    let fga = FakeFga::start().await;
    let mut config = fga.config();
    config.api.store_id = None;

    let err = run(&config, config.profile().unwrap(), true).await.unwrap_err();

    assert!(matches!(err, RunError::Config(_)));
    assert_eq!(fga.store.writes.load(Ordering::SeqCst), 0);
}

/// Test: batches written before a setup timeout are deleted before the error returns
#[tokio::test]
async fn test_setup_timeout_tears_down_partial_writes() {
    let fga = FakeFga::start_with_write_delay(Duration::from_millis(400)).await;
    let mut config = fga.config();
    config.run.scenario = "load".to_string();
    config.workload.tuples_per_write = 5;
    config.run.setup_timeout_secs = 1;
    config.run.teardown_timeout_secs = 10;

    let err = run(&config, config.profile().unwrap(), true).await.unwrap_err();

    assert!(matches!(err, RunError::SetupTimeout(_)));
    assert!(fga.store.writes.load(Ordering::SeqCst) > 2);
    assert_eq!(fga.stored(), 0);
    assert_eq!(fga.store.checks.load(Ordering::SeqCst), 0);
}

/// Test: with teardown disabled a setup timeout leaves the partial writes in place
#[tokio::test]
async fn test_setup_timeout_without_teardown_keeps_partial_writes() {
    let fga = FakeFga::start_with_write_delay(Duration::from_millis(400)).await;
    let mut config = fga.config();
    config.run.scenario = "load".to_string();
    config.workload.tuples_per_write = 5;
    config.run.setup_timeout_secs = 1;
    let total = plan(&config).workload.tuples().len();

    let err = run(&config, config.profile().unwrap(), false).await.unwrap_err();

    assert!(matches!(err, RunError::SetupTimeout(_)));
    let left = fga.stored();
    assert!(left > 0);
    assert!(left < total);
}
