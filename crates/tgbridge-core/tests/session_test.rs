#![allow(clippy::unwrap_used)]
// Integration tests for `SessionController` against the in-memory repository.

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use tokio_test::{assert_err, assert_ok};
use tokio_util::sync::CancellationToken;

use tgbridge_api::{
    CallKind, ControlAction, ControlKind, EntityKind, EntityRef, Error, MemoryRepository,
    ResourceKind, ResourceOperation, ResourcePath, TelemetryKind, TelemetrySnapshot,
};
use tgbridge_core::{
    AbstractConfig, Capture, CommandResult, ConfigPhase, CoreError, Flow, Latency, Port,
    SessionConfig, SessionController, SessionState, TranslationError,
};

// ── Helpers ─────────────────────────────────────────────────────────

fn open() -> (Arc<MemoryRepository>, SessionController<MemoryRepository>) {
    let repo = Arc::new(MemoryRepository::new());
    let session = SessionController::open(Arc::clone(&repo), SessionConfig::default());
    (repo, session)
}

fn port(name: &str) -> Port {
    Port {
        name: Some(name.into()),
        location: Some(format!("10.36.74.26;1;{name}")),
    }
}

fn flow(name: &str, tx: &str, rx: &str) -> Flow {
    Flow {
        name: Some(name.into()),
        tx_names: vec![tx.into()],
        rx_names: vec![rx.into()],
        ..Default::default()
    }
}

fn with_latency(mut flow: Flow, mode: &str) -> Flow {
    flow.latency = Some(Latency { mode: mode.into() });
    flow
}

/// Two ports, two flows between them, one capture on p2.
fn two_port_config() -> AbstractConfig {
    AbstractConfig {
        ports: vec![port("p1"), port("p2")],
        flows: vec![flow("f1", "p1", "p2"), flow("f2", "p2", "p1")],
        captures: vec![Capture {
            name: Some("cap".into()),
            port_names: vec!["p2".into()],
            ..Default::default()
        }],
        ..Default::default()
    }
}

fn vport(name: &str) -> ResourceOperation {
    ResourceOperation::create(
        ResourcePath::root(ResourceKind::Vport, name),
        EntityRef::new(EntityKind::Port, name),
    )
}

/// A device group under a topology that was never created; the repository
/// rejects it after everything before it went in.
fn orphan() -> ResourceOperation {
    ResourceOperation::create(
        ResourcePath::root(ResourceKind::Topology, "ghost").child(ResourceKind::DeviceGroup, "x"),
        EntityRef::new(EntityKind::Device, "ghost"),
    )
}

fn resource_paths(repo: &MemoryRepository) -> Vec<String> {
    repo.resources().iter().map(|r| r.path.to_string()).collect()
}

fn names(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_owned()).collect()
}

fn configured(transmitting: bool, capturing: bool) -> SessionState {
    SessionState {
        phase: ConfigPhase::ConfigApplied,
        transmitting,
        capturing,
    }
}

// ── State machine ───────────────────────────────────────────────────

#[tokio::test]
async fn test_transmit_before_apply_is_invalid() {
    let (repo, session) = open();

    let result = session.set_transmit(&[], ControlAction::Start).await;
    match result {
        Err(CoreError::InvalidState { operation, state }) => {
            assert_eq!(operation, "start transmit");
            assert_eq!(state, SessionState::default());
        }
        other => panic!("expected InvalidState, got: {other:?}"),
    }
    assert!(repo.calls().is_empty());
}

#[tokio::test]
async fn test_stop_twice_is_a_no_op() {
    let (repo, session) = open();
    session.apply(&two_port_config()).await.unwrap();

    for _ in 0..2 {
        let result = session.set_transmit(&[], ControlAction::Stop).await.unwrap();
        assert_eq!(result, CommandResult::Unchanged);
    }
    assert_eq!(session.state(), configured(false, false));
    assert_eq!(repo.call_count(CallKind::SetControlState), 0);
}

#[tokio::test]
async fn test_transmit_start_and_stop() {
    let (repo, session) = open();
    session.apply(&two_port_config()).await.unwrap();

    let started = session.set_transmit(&[], ControlAction::Start).await.unwrap();
    assert_eq!(
        started,
        CommandResult::Changed {
            kind: ControlKind::Transmit,
            action: ControlAction::Start,
            targets: names(&["f1", "f2"]),
        }
    );
    assert_eq!(session.state(), configured(true, false));
    assert_eq!(repo.running(ControlKind::Transmit).len(), 2);

    // Already running.
    let again = session
        .set_transmit(&names(&["f1"]), ControlAction::Start)
        .await
        .unwrap();
    assert_eq!(again, CommandResult::Unchanged);

    session
        .set_transmit(&names(&["f1"]), ControlAction::Stop)
        .await
        .unwrap();
    assert!(session.state().transmitting, "f2 is still running");

    session
        .set_transmit(&names(&["f2"]), ControlAction::Stop)
        .await
        .unwrap();
    assert_eq!(session.state(), configured(false, false));
    assert!(repo.running(ControlKind::Transmit).is_empty());
    assert_eq!(repo.call_count(CallKind::SetControlState), 3);
}

#[tokio::test]
async fn test_unknown_flow_name() {
    let (repo, session) = open();
    session.apply(&two_port_config()).await.unwrap();

    let result = session
        .set_transmit(&names(&["f1", "f9"]), ControlAction::Start)
        .await;
    assert!(
        matches!(&result, Err(CoreError::UnresolvedTarget { kind: ControlKind::Transmit, name }) if name == "f9"),
        "expected UnresolvedTarget, got: {result:?}"
    );
    assert_eq!(repo.call_count(CallKind::SetControlState), 0);
    assert_eq!(session.state(), configured(false, false));
}

#[tokio::test]
async fn test_capture_start_and_stop() {
    let (repo, session) = open();
    session.apply(&two_port_config()).await.unwrap();

    session.set_capture(&[], ControlAction::Start).await.unwrap();
    assert_eq!(session.state(), configured(false, true));
    assert!(repo.running(ControlKind::Capture).contains("cap"));

    session
        .set_capture(&names(&["cap"]), ControlAction::Stop)
        .await
        .unwrap();
    assert_eq!(session.state(), configured(false, false));
}

// ── Apply ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_reapply_replaces_previous_configuration() {
    let (repo, session) = open();
    session.apply(&two_port_config()).await.unwrap();
    session.set_transmit(&[], ControlAction::Start).await.unwrap();

    let replacement = AbstractConfig {
        ports: vec![port("p1"), port("p3")],
        flows: vec![flow("f3", "p1", "p3")],
        ..Default::default()
    };
    let result = session.apply(&replacement).await.unwrap();
    assert_eq!(
        result,
        CommandResult::Applied {
            operations: 3,
            cleared: 4,
        }
    );

    let paths: Vec<String> = repo
        .resources()
        .iter()
        .map(|r| r.path.to_string())
        .collect();
    assert_eq!(paths, vec!["vport[p1]", "vport[p3]", "trafficItem[f3]"]);
    assert_eq!(session.state(), configured(false, false));
    assert!(repo.running(ControlKind::Transmit).is_empty());

    // Old flow names are gone with the old configuration.
    let result = session.set_transmit(&names(&["f1"]), ControlAction::Start).await;
    assert!(matches!(result, Err(CoreError::UnresolvedTarget { .. })));
}

#[tokio::test]
async fn test_empty_config_is_a_valid_clear() {
    let (repo, session) = open();
    session.apply(&two_port_config()).await.unwrap();
    assert!(!repo.is_empty());

    let result = session.apply(&AbstractConfig::default()).await.unwrap();
    assert_eq!(
        result,
        CommandResult::Applied {
            operations: 0,
            cleared: 4,
        }
    );
    assert!(repo.is_empty());
    assert_eq!(session.state(), configured(false, false));

    // Nothing to transmit, but the request itself is valid.
    let result = session.set_transmit(&[], ControlAction::Start).await.unwrap();
    assert_eq!(result, CommandResult::Unchanged);
}

#[tokio::test]
async fn test_empty_config_from_idle() {
    let (repo, session) = open();
    session.apply_config(Vec::new()).await.unwrap();

    assert_eq!(session.state(), configured(false, false));
    assert!(repo.calls().is_empty());
}

#[tokio::test]
async fn test_repository_failure_keeps_prior_state() {
    let (repo, session) = open();
    session.apply(&two_port_config()).await.unwrap();
    session.set_transmit(&[], ControlAction::Start).await.unwrap();
    let before = session.state();

    repo.fail_next(
        CallKind::Apply,
        Error::Rejected {
            message: "chassis busy".into(),
        },
    );
    let result = session.apply(&two_port_config()).await;
    assert!(
        matches!(&result, Err(CoreError::Repository(Error::Rejected { message })) if message == "chassis busy"),
        "expected repository error, got: {result:?}"
    );
    assert_eq!(session.state(), before);
}

#[tokio::test]
async fn test_failed_first_apply_stays_idle() {
    let (repo, session) = open();
    repo.fail_next(
        CallKind::Apply,
        Error::Unreachable {
            reason: "connection refused".into(),
        },
    );

    assert!(session.apply(&two_port_config()).await.is_err());
    assert_eq!(session.state(), SessionState::default());
}

#[tokio::test]
async fn test_partial_apply_can_be_retried() {
    let (repo, session) = open();
    assert_ok!(session.apply_config(vec![vport("p1")]).await);

    let result = session
        .apply_config(vec![vport("p2"), orphan(), vport("p3")])
        .await;
    let err = assert_err!(result);
    assert!(
        matches!(err, CoreError::Repository(Error::MissingParent { .. })),
        "expected MissingParent, got: {err:?}"
    );
    // p1 was cleared, p2 went in before the failure, p3 never ran.
    assert_eq!(resource_paths(&repo), vec!["vport[p2]"]);

    let result = assert_ok!(session.apply_config(vec![vport("p2")]).await);
    assert_eq!(
        result,
        CommandResult::Applied {
            operations: 1,
            cleared: 1,
        }
    );
    assert_eq!(resource_paths(&repo), vec!["vport[p2]"]);
    assert_eq!(session.state(), configured(false, false));

    // Everything is confirmed again, so the next clear is a single batch.
    let applies = repo.call_count(CallKind::Apply);
    assert_ok!(session.apply_config(Vec::new()).await);
    assert_eq!(repo.call_count(CallKind::Apply), applies + 1);
    assert!(repo.is_empty());
}

#[tokio::test]
async fn test_partial_apply_resets_running_flags() {
    let (repo, session) = open();
    assert_ok!(session.apply(&two_port_config()).await);
    assert_ok!(session.set_transmit(&[], ControlAction::Start).await);
    assert_ok!(session.set_capture(&[], ControlAction::Start).await);
    assert_eq!(session.state(), configured(true, true));

    assert_err!(session.apply_config(vec![vport("p9"), orphan()]).await);
    assert!(repo.running(ControlKind::Transmit).is_empty());
    assert_eq!(session.state(), configured(false, false));

    let result = assert_ok!(session.set_transmit(&[], ControlAction::Stop).await);
    assert_eq!(result, CommandResult::Unchanged);
    assert_eq!(
        session.state().transmitting,
        !repo.running(ControlKind::Transmit).is_empty()
    );

    // A full retry lands cleanly and control works again.
    assert_ok!(session.apply(&two_port_config()).await);
    assert_eq!(
        resource_paths(&repo),
        vec!["vport[p1]", "vport[p2]", "trafficItem[f1]", "trafficItem[f2]"]
    );
    assert_ok!(session.set_transmit(&[], ControlAction::Start).await);
    assert_eq!(session.state(), configured(true, false));
    assert_eq!(repo.running(ControlKind::Transmit).len(), 2);
}

#[tokio::test]
async fn test_conflicting_latency_modes_reach_nothing() {
    let (repo, session) = open();
    let config = AbstractConfig {
        ports: vec![port("p1"), port("p2")],
        flows: vec![
            with_latency(flow("f1", "p1", "p2"), "cut-through"),
            with_latency(flow("f2", "p2", "p1"), "store-forward"),
        ],
        ..Default::default()
    };

    let result = session.apply(&config).await;
    assert!(
        matches!(&result, Err(CoreError::ConflictingLatencyMode { first_flow, flow, .. }) if first_flow == "f1" && flow == "f2"),
        "expected ConflictingLatencyMode, got: {result:?}"
    );
    assert!(repo.calls().is_empty());
    assert_eq!(session.state(), SessionState::default());
}

#[tokio::test]
async fn test_agreeing_latency_modes_apply() {
    let (_repo, session) = open();
    let config = AbstractConfig {
        ports: vec![port("p1"), port("p2")],
        flows: vec![
            with_latency(flow("f1", "p1", "p2"), "cut-through"),
            with_latency(flow("f2", "p2", "p1"), "cut-through"),
            flow("f3", "p1", "p2"),
        ],
        ..Default::default()
    };

    session.apply(&config).await.unwrap();
    assert!(session.state().is_configured());
}

#[tokio::test]
async fn test_translation_error_reaches_nothing() {
    let (repo, session) = open();
    let config = AbstractConfig {
        ports: vec![port("p1"), port("p1")],
        ..Default::default()
    };

    let result = session.apply(&config).await;
    assert!(
        matches!(result, Err(CoreError::Translation(TranslationError::DuplicateName(_)))),
        "expected DuplicateName, got: {result:?}"
    );
    assert!(repo.calls().is_empty());
}

// ── Observation ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_subscribers_see_transitions() {
    let (_repo, session) = open();
    let mut rx = session.subscribe();
    assert_eq!(*rx.borrow_and_update(), SessionState::default());

    session.apply(&two_port_config()).await.unwrap();
    rx.changed().await.unwrap();
    assert_eq!(*rx.borrow_and_update(), configured(false, false));

    session.set_transmit(&[], ControlAction::Start).await.unwrap();
    rx.changed().await.unwrap();
    assert_eq!(*rx.borrow_and_update(), configured(true, false));
}

#[tokio::test]
async fn test_concurrent_callers_are_serialized() {
    let (repo, session) = open();
    session.apply(&two_port_config()).await.unwrap();

    let mut handles = Vec::new();
    for i in 0..16 {
        let session = session.clone();
        handles.push(tokio::spawn(async move {
            let action = if i % 2 == 0 {
                ControlAction::Start
            } else {
                ControlAction::Stop
            };
            session.set_transmit(&[], action).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    // Whatever order the requests landed in, the session and the
    // appliance agree on what is running.
    let running = repo.running(ControlKind::Transmit);
    assert_eq!(session.state().transmitting, !running.is_empty());
}

// ── Polling ─────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_await_all_flows_started() {
    let (_repo, session) = open();
    session.apply(&two_port_config()).await.unwrap();
    session.set_transmit(&[], ControlAction::Start).await.unwrap();

    let options = session.poll_options().with_kind(TelemetryKind::Flow);
    let result = session
        .await_condition(options, |snap| {
            snap.entities()
                .all(|flow| snap.metric_str(flow, "transmit") == Some("started"))
        })
        .await
        .unwrap();

    assert_eq!(result.ticks, 1);
    assert_eq!(result.elapsed, Duration::ZERO);
    assert_eq!(result.snapshot.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_polling_does_not_block_commands() {
    let (repo, session) = open();
    session.apply(&two_port_config()).await.unwrap();

    let poller = {
        let session = session.clone();
        tokio::spawn(async move {
            let options = session
                .poll_options()
                .with_interval(Duration::from_millis(100))
                .with_timeout(Duration::from_secs(5));
            session
                .await_condition(options, |snap| {
                    snap.metric_str("f1", "transmit") == Some("started")
                })
                .await
        })
    };

    tokio::time::sleep(Duration::from_millis(250)).await;
    session
        .set_transmit(&names(&["f1"]), ControlAction::Start)
        .await
        .unwrap();

    let result = poller.await.unwrap().unwrap();
    assert!(result.ticks >= 2);
    assert!(repo.call_count(CallKind::FetchTelemetry) >= 2);
}

#[tokio::test(start_paused = true)]
async fn test_await_times_out() {
    let (repo, session) = open();
    repo.push_telemetry(TelemetrySnapshot::new(TelemetryKind::Port).with_metric("p1", "link", "down"));

    let options = session
        .poll_options()
        .with_kind(TelemetryKind::Port)
        .with_timeout(Duration::from_secs(3));
    let started = tokio::time::Instant::now();
    let result = session
        .await_condition(options, |snap| snap.metric_str("p1", "link") == Some("up"))
        .await;

    assert!(matches!(result, Err(CoreError::Timeout { .. })));
    assert!(started.elapsed() >= Duration::from_secs(3));
}

#[tokio::test(start_paused = true)]
async fn test_caller_cancellation() {
    let (_repo, session) = open();
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(2_500)).await;
            cancel.cancel();
        });
    }

    let result = session
        .await_condition_with_cancel(session.poll_options(), |_| false, &cancel)
        .await;
    assert!(
        matches!(result, Err(CoreError::Cancelled { ticks: 3 })),
        "expected Cancelled after three polls, got: {result:?}"
    );
    assert!(!session.is_closed());
}

// ── Lifecycle ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_close_rejects_further_commands() {
    let (repo, session) = open();
    session.apply(&two_port_config()).await.unwrap();
    session.close().await;

    assert!(session.is_closed());
    let result = session.set_transmit(&[], ControlAction::Start).await;
    assert!(matches!(result, Err(CoreError::SessionClosed)));

    let poll = session
        .await_condition(session.poll_options(), |_| true)
        .await;
    assert!(matches!(poll, Err(CoreError::Cancelled { ticks: 0 })));

    // Closing leaves the appliance untouched.
    assert_eq!(repo.len(), 2 + 2);
}

#[tokio::test]
async fn test_close_from_any_handle_once() {
    let (_repo, session) = open();
    let other = session.clone();

    other.close().await;
    assert!(session.is_closed());
    // The processor task was already joined by the first close.
    session.close().await;
    let err = assert_err!(session.apply_config(Vec::new()).await);
    assert!(matches!(err, CoreError::SessionClosed));
}
