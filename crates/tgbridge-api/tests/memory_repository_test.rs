#![allow(clippy::unwrap_used)]
// Integration tests for `MemoryRepository` through the `ResourceRepository` trait.

use pretty_assertions::assert_eq;
use tokio_test::{assert_err, assert_ok};

use tgbridge_api::{
    Attribute, CallKind, ControlAction, ControlKind, EntityKind, EntityRef, Error,
    MemoryRepository, ResourceKind, ResourceOperation, ResourcePath, ResourceRepository,
    TelemetryKind, TelemetrySnapshot,
};

// ── Helpers ─────────────────────────────────────────────────────────

fn port(name: &str) -> ResourceOperation {
    ResourceOperation::create(
        ResourcePath::root(ResourceKind::Vport, name),
        EntityRef::new(EntityKind::Port, name),
    )
    .with(Attribute::Name, name.to_owned())
}

fn flow(name: &str) -> ResourceOperation {
    ResourceOperation::create(
        ResourcePath::root(ResourceKind::TrafficItem, name),
        EntityRef::new(EntityKind::Flow, name),
    )
    .with(Attribute::Name, name.to_owned())
}

fn capture_on(port: &str, capture: &str) -> ResourceOperation {
    ResourceOperation::update(
        ResourcePath::root(ResourceKind::Vport, port),
        EntityRef::new(EntityKind::Capture, capture),
    )
    .with(Attribute::CaptureEnabled, true)
    .with(Attribute::CaptureName, capture.to_owned())
}

// ── Structure ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_nested_create_requires_parent() {
    let repo = MemoryRepository::new();
    let topo = ResourcePath::root(ResourceKind::Topology, "east");
    let dg = topo.child(ResourceKind::DeviceGroup, "east");

    let orphan = ResourceOperation::create(dg.clone(), EntityRef::new(EntityKind::Device, "east"));
    let result = repo.apply(&[orphan.clone()]).await;
    assert!(
        matches!(result, Err(Error::MissingParent { .. })),
        "expected MissingParent, got: {result:?}"
    );

    let parent = ResourceOperation::create(topo, EntityRef::new(EntityKind::Device, "east"));
    assert_ok!(repo.apply(&[parent, orphan]).await);
    assert_eq!(repo.len(), 2);
}

#[tokio::test]
async fn test_delete_removes_subtree() {
    let repo = MemoryRepository::new();
    let topo = ResourcePath::root(ResourceKind::Topology, "east");
    let dg = topo.child(ResourceKind::DeviceGroup, "east");
    let eth = dg.child(ResourceKind::Ethernet, "east-eth");
    let origin = EntityRef::new(EntityKind::Device, "east");

    repo.apply(&[
        port("p1"),
        ResourceOperation::create(topo.clone(), origin.clone()),
        ResourceOperation::create(dg, origin.clone()),
        ResourceOperation::create(eth, origin.clone()),
    ])
    .await
    .unwrap();
    assert_eq!(repo.len(), 4);

    repo.apply(&[ResourceOperation::delete(topo, origin)])
        .await
        .unwrap();
    let remaining: Vec<String> = repo
        .resources()
        .iter()
        .map(|r| r.path.to_string())
        .collect();
    assert_eq!(remaining, vec!["vport[p1]".to_string()]);
}

#[tokio::test]
async fn test_deleting_absent_root_is_not_found() {
    let repo = MemoryRepository::new();
    let path = ResourcePath::root(ResourceKind::Vport, "p1");
    let delete = ResourceOperation::delete(path, EntityRef::new(EntityKind::Port, "p1"));

    let err = assert_err!(repo.apply(std::slice::from_ref(&delete)).await);
    assert!(err.is_not_found(), "expected a not-found error, got: {err:?}");

    assert_ok!(repo.apply(&[port("p1")]).await);
    assert_ok!(repo.apply(&[delete]).await);
    assert!(repo.is_empty());
}

#[tokio::test]
async fn test_partial_application_on_failure() {
    let repo = MemoryRepository::new();
    let missing = ResourceOperation::update(
        ResourcePath::root(ResourceKind::Vport, "ghost"),
        EntityRef::new(EntityKind::Capture, "c1"),
    );

    let result = repo.apply(&[port("p1"), missing, port("p2")]).await;
    assert!(matches!(result, Err(Error::NotFound { .. })));
    // p1 went in before the failure, p2 never ran.
    assert_eq!(repo.len(), 1);
}

// ── Control state ───────────────────────────────────────────────────

#[tokio::test]
async fn test_transmit_all_and_subset() {
    let repo = MemoryRepository::new();
    repo.apply(&[flow("f1"), flow("f2")]).await.unwrap();

    repo.set_control_state(ControlKind::Transmit, &[], ControlAction::Start)
        .await
        .unwrap();
    assert_eq!(repo.running(ControlKind::Transmit).len(), 2);

    repo.set_control_state(
        ControlKind::Transmit,
        &["f1".to_string()],
        ControlAction::Stop,
    )
    .await
    .unwrap();
    let running: Vec<String> = repo.running(ControlKind::Transmit).into_iter().collect();
    assert_eq!(running, vec!["f2".to_string()]);
}

#[tokio::test]
async fn test_unknown_control_target() {
    let repo = MemoryRepository::new();
    repo.apply(&[flow("f1")]).await.unwrap();

    let result = repo
        .set_control_state(
            ControlKind::Transmit,
            &["nope".to_string()],
            ControlAction::Start,
        )
        .await;
    match result {
        Err(Error::UnknownTarget { ref kind, ref name }) => {
            assert_eq!(kind, "transmit");
            assert_eq!(name, "nope");
        }
        other => panic!("expected UnknownTarget error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_capture_targets_come_from_vports() {
    let repo = MemoryRepository::new();
    repo.apply(&[port("p1"), port("p2"), capture_on("p1", "cap")])
        .await
        .unwrap();

    repo.set_control_state(ControlKind::Capture, &[], ControlAction::Start)
        .await
        .unwrap();
    assert!(repo.running(ControlKind::Capture).contains("cap"));

    let snap = repo.fetch_telemetry(TelemetryKind::Port).await.unwrap();
    assert_eq!(snap.metric_str("p1", "capture"), Some("started"));
    assert_eq!(snap.metric_str("p2", "capture"), Some("stopped"));
}

#[tokio::test]
async fn test_deleting_flow_clears_running_state() {
    let repo = MemoryRepository::new();
    repo.apply(&[flow("f1")]).await.unwrap();
    repo.set_control_state(ControlKind::Transmit, &[], ControlAction::Start)
        .await
        .unwrap();

    repo.apply(&[ResourceOperation::delete(
        ResourcePath::root(ResourceKind::TrafficItem, "f1"),
        EntityRef::new(EntityKind::Flow, "f1"),
    )])
    .await
    .unwrap();
    assert!(repo.running(ControlKind::Transmit).is_empty());
}

// ── Telemetry ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_scripted_telemetry_sequence() {
    let repo = MemoryRepository::new();
    repo.push_telemetry(TelemetrySnapshot::new(TelemetryKind::Flow).with_metric("f1", "frames_rx", 0u64));
    repo.push_telemetry(TelemetrySnapshot::new(TelemetryKind::Flow).with_metric("f1", "frames_rx", 50u64));

    let first = repo.fetch_telemetry(TelemetryKind::Flow).await.unwrap();
    let second = repo.fetch_telemetry(TelemetryKind::Flow).await.unwrap();
    let third = repo.fetch_telemetry(TelemetryKind::Flow).await.unwrap();

    assert_eq!(first.metric_u64("f1", "frames_rx"), Some(0));
    assert_eq!(second.metric_u64("f1", "frames_rx"), Some(50));
    assert_eq!(third, second);
    assert_eq!(repo.call_count(CallKind::FetchTelemetry), 3);
}

#[tokio::test]
async fn test_synthesized_flow_telemetry() {
    let repo = MemoryRepository::new();
    repo.apply(&[flow("f1"), flow("f2")]).await.unwrap();
    repo.set_control_state(
        ControlKind::Transmit,
        &["f2".to_string()],
        ControlAction::Start,
    )
    .await
    .unwrap();

    let snap = repo.fetch_telemetry(TelemetryKind::Flow).await.unwrap();
    assert_eq!(snap.metric_str("f1", "transmit"), Some("stopped"));
    assert_eq!(snap.metric_str("f2", "transmit"), Some("started"));
}

#[tokio::test]
async fn test_armed_fetch_failure() {
    let repo = MemoryRepository::new();
    repo.fail_next(CallKind::FetchTelemetry, Error::Timeout { timeout_secs: 5 });

    let result = repo.fetch_telemetry(TelemetryKind::Port).await;
    assert_eq!(result, Err(Error::Timeout { timeout_secs: 5 }));
    assert!(repo.fetch_telemetry(TelemetryKind::Port).await.is_ok());
}
