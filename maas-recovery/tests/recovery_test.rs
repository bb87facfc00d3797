// Integration tests for the recovery flow.
// IMPORTANT: all provisioning in tests goes through the mock provider only.

use std::time::Duration;

use maas_providers::mock::MockProvider;
use maas_providers::{CloudProvider, DATA_DEVICE, ROOT_DEVICE};
use maas_recovery::config::Settings;
use maas_recovery::error::RecoveryError;
use maas_recovery::logger::ActionLog;
use maas_recovery::recovery;
use maas_recovery::wait::WaitPolicy;

fn test_settings() -> Settings {
    Settings {
        instance_type: "m3.large".to_string(),
        data_volume_size: "20G".to_string(),
        data_volume_rate: 600,
        data_volume_type: "io1".to_string(),
        image_id: "ami-0123456".to_string(),
        key_name: "maas-key".to_string(),
        security_group_ids: vec!["sg-1".to_string(), "sg-2".to_string()],
        subnet_id: "subnet-1".to_string(),
        recovery_payload: "here is some data that you want to pass to server".to_string(),
    }
}

fn fast_policy() -> WaitPolicy {
    WaitPolicy {
        interval: Duration::from_millis(5),
        deadline: Duration::from_millis(500),
    }
}

#[tokio::test]
async fn recovers_on_first_attempt() {
    let provider = MockProvider::new()
        .with_polls_until_stopped(2)
        .with_polls_until_running(2);
    provider.seed_instance("i-abc", "running").await;
    let log = ActionLog::new();

    let view = recovery::create_instance(
        &provider,
        &test_settings(),
        Some("snap-123"),
        "i-abc",
        5,
        fast_policy(),
        &log,
    )
    .await
    .expect("first attempt should succeed");

    assert_eq!(view.state, "running");
    assert!(view.public_ip.as_deref().is_some_and(|ip| !ip.is_empty()));
    assert_eq!(provider.run_calls().await, 1);

    // The old instance really was stopped first.
    let old = provider
        .describe_instance("i-abc")
        .await
        .unwrap()
        .expect("old instance still known");
    assert_eq!(old.state, "stopped");

    // The launch request carried exactly the two fixed device paths.
    let request = provider.last_launch_request().await.expect("launch recorded");
    assert_eq!(request.block_devices.len(), 2);
    assert!(request.block_devices.contains_key(ROOT_DEVICE));
    assert!(request.block_devices.contains_key(DATA_DEVICE));

    let data = &request.block_devices[DATA_DEVICE];
    assert_eq!(data.size_gb, Some(20));
    assert_eq!(data.volume_type.as_deref(), Some("io1"));
    assert_eq!(data.iops, Some(600));
    assert_eq!(data.delete_on_termination, Some(false));
    assert_eq!(data.snapshot_id.as_deref(), Some("snap-123"));

    assert_eq!(request.image_id, "ami-0123456");
    assert_eq!(request.instance_type, "m3.large");
    assert_eq!(request.subnet_id, "subnet-1");
    assert_eq!(request.security_group_ids, vec!["sg-1", "sg-2"]);
    assert!(request.user_data.contains("/mnt/data"));
    assert!(request.user_data.contains("supervisorctl start all"));
}

#[tokio::test]
async fn stop_waits_for_exact_stopped_state() {
    let provider = MockProvider::new().with_polls_until_stopped(3);
    provider.seed_instance("i-abc", "running").await;
    let log = ActionLog::new();

    recovery::stop_instance(&provider, "i-abc", fast_policy(), &log)
        .await
        .expect("stop should succeed");

    // Three polls observed the transitional state, the fourth saw "stopped".
    assert_eq!(provider.describe_calls("i-abc").await, 4);
    assert_eq!(provider.stop_calls().await, 1);
    let stopped = provider
        .describe_instance("i-abc")
        .await
        .unwrap()
        .expect("instance still known");
    assert_eq!(stopped.state, "stopped");
}

#[tokio::test]
async fn launch_requires_address_and_running_simultaneously() {
    let provider = MockProvider::new().without_public_ip();
    provider.seed_instance("i-abc", "running").await;
    let log = ActionLog::new();

    let err = recovery::create_instance(
        &provider,
        &test_settings(),
        Some("snap-123"),
        "i-abc",
        1,
        fast_policy(),
        &log,
    )
    .await
    .expect_err("missing address must fail the launch");

    match err {
        RecoveryError::AttemptsExhausted { attempts, last } => {
            assert_eq!(attempts, 1);
            assert!(matches!(
                last.as_deref(),
                Some(RecoveryError::MissingAddress { .. })
            ));
        }
        other => panic!("expected AttemptsExhausted, got {other:?}"),
    }
}

#[tokio::test]
async fn retry_driver_raises_fatal_error_after_budget() {
    let provider = MockProvider::new().failing_run_instances();
    provider.seed_instance("i-abc", "running").await;
    let log = ActionLog::new();

    let err = recovery::create_instance(
        &provider,
        &test_settings(),
        Some("snap-123"),
        "i-abc",
        3,
        fast_policy(),
        &log,
    )
    .await
    .expect_err("persistent provider failure must exhaust the budget");

    assert!(err.to_string().contains("can't create an instance"));
    match err {
        RecoveryError::AttemptsExhausted { attempts, last } => {
            assert_eq!(attempts, 3);
            assert!(matches!(last.as_deref(), Some(RecoveryError::Provider(_))));
        }
        other => panic!("expected AttemptsExhausted, got {other:?}"),
    }
    // The counter really advanced: one launch per attempt, then it stopped.
    assert_eq!(provider.run_calls().await, 3);
}

#[tokio::test]
async fn wait_timeout_is_distinct_from_provider_error() {
    let provider = MockProvider::new().with_polls_until_running(u32::MAX);
    provider.seed_instance("i-abc", "running").await;
    let log = ActionLog::new();

    let err = recovery::create_instance(
        &provider,
        &test_settings(),
        None,
        "i-abc",
        1,
        fast_policy(),
        &log,
    )
    .await
    .expect_err("an instance stuck in pending must time the wait out");

    match err {
        RecoveryError::AttemptsExhausted { last, .. } => match last.as_deref() {
            Some(RecoveryError::WaitTimeout {
                target, last_state, ..
            }) => {
                assert_eq!(target, "running");
                assert_eq!(last_state.as_deref(), Some("pending"));
            }
            other => panic!("expected WaitTimeout cause, got {other:?}"),
        },
        other => panic!("expected AttemptsExhausted, got {other:?}"),
    }
}

#[tokio::test]
async fn stop_failure_does_not_abort_the_launch() {
    let provider = MockProvider::new().failing_stop_instances();
    let log = ActionLog::new();

    let view = recovery::create_instance(
        &provider,
        &test_settings(),
        Some("snap-123"),
        "i-gone",
        5,
        fast_policy(),
        &log,
    )
    .await
    .expect("launch should proceed past a failed stop");

    assert_eq!(view.state, "running");
    assert_eq!(provider.stop_calls().await, 1);
    assert_eq!(provider.run_calls().await, 1);

    // The failed stop is still visible in the action log.
    let records = log.records();
    let stop = records
        .iter()
        .find(|record| record.action == "STOP_INSTANCE")
        .expect("stop attempt logged");
    assert_eq!(stop.status, "failed");
}

#[tokio::test]
async fn recovered_instance_exposes_its_data_volume_id() {
    let provider = MockProvider::new();
    provider.seed_instance("i-abc", "running").await;
    let log = ActionLog::new();

    let view = recovery::create_instance(
        &provider,
        &test_settings(),
        Some("snap-123"),
        "i-abc",
        5,
        fast_policy(),
        &log,
    )
    .await
    .expect("recovery should succeed");

    let volume_id = view.data_volume_id.expect("data volume attached");
    assert!(volume_id.starts_with("vol-"));
}
