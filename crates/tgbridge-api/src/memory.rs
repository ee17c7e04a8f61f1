// ── In-memory resource repository ──
//
// Concurrent stand-in for an appliance: resources keyed by path in a
// `DashMap`, running flows/captures per control kind, and scripted
// telemetry. Every mutation bumps a version counter that observers can
// watch. Used by tests and dry runs.

use std::collections::{BTreeSet, HashSet, VecDeque};
use std::future::{Future, ready};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use dashmap::DashMap;
use tokio::sync::watch;
use tracing::{debug, trace};

use crate::error::Error;
use crate::operation::{
    Attribute, AttributeValue, EntityRef, OperationKind, Payload, ResourceKind, ResourceOperation,
    ResourcePath,
};
use crate::repository::ResourceRepository;
use crate::telemetry::{ControlAction, ControlKind, TelemetryKind, TelemetrySnapshot};

/// A resource as currently held by the repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredResource {
    pub path: ResourcePath,
    pub payload: Payload,
    pub origin: EntityRef,
    seq: u64,
}

/// Which repository entry point a call went through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    Apply,
    SetControlState,
    FetchTelemetry,
}

/// Journal entry recorded for every call, successful or not.
#[derive(Debug, Clone, PartialEq)]
pub enum RepositoryCall {
    Apply(Vec<ResourceOperation>),
    SetControlState {
        kind: ControlKind,
        targets: Vec<String>,
        action: ControlAction,
    },
    FetchTelemetry(TelemetryKind),
}

impl RepositoryCall {
    pub fn kind(&self) -> CallKind {
        match self {
            Self::Apply(_) => CallKind::Apply,
            Self::SetControlState { .. } => CallKind::SetControlState,
            Self::FetchTelemetry(_) => CallKind::FetchTelemetry,
        }
    }
}

/// In-memory [`ResourceRepository`].
///
/// Enforces the same structural rules a real appliance does: nested
/// resources need an existing parent, creates may not collide, updates and
/// deletes need an existing target, and deleting a resource removes its
/// whole subtree. Operations are applied one at a time; a failing
/// operation leaves earlier ones in place.
pub struct MemoryRepository {
    resources: DashMap<ResourcePath, StoredResource>,
    running: DashMap<ControlKind, HashSet<String>>,
    telemetry: DashMap<TelemetryKind, VecDeque<TelemetrySnapshot>>,
    armed: DashMap<CallKind, Error>,
    journal: Mutex<Vec<RepositoryCall>>,
    seq: AtomicU64,
    version: watch::Sender<u64>,
}

impl Default for MemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRepository {
    pub fn new() -> Self {
        let (version, _) = watch::channel(0u64);
        Self {
            resources: DashMap::new(),
            running: DashMap::new(),
            telemetry: DashMap::new(),
            armed: DashMap::new(),
            journal: Mutex::new(Vec::new()),
            seq: AtomicU64::new(0),
            version,
        }
    }

    // ── Scripting ────────────────────────────────────────────────────

    /// Make the next call through `call` fail with `error`.
    pub fn fail_next(&self, call: CallKind, error: Error) {
        self.armed.insert(call, error);
    }

    /// Queue a telemetry snapshot. Queued snapshots are served in order;
    /// the last one keeps being served once the queue is drained.
    pub fn push_telemetry(&self, snapshot: TelemetrySnapshot) {
        self.telemetry
            .entry(snapshot.kind)
            .or_default()
            .push_back(snapshot);
    }

    // ── Inspection ───────────────────────────────────────────────────

    /// All stored resources, in creation order.
    pub fn resources(&self) -> Vec<StoredResource> {
        let mut all: Vec<StoredResource> =
            self.resources.iter().map(|r| r.value().clone()).collect();
        all.sort_by_key(|r| r.seq);
        all
    }

    pub fn get(&self, path: &ResourcePath) -> Option<StoredResource> {
        self.resources.get(path).map(|r| r.value().clone())
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Names currently started for a control kind.
    pub fn running(&self, kind: ControlKind) -> BTreeSet<String> {
        self.running
            .get(&kind)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Every call received so far.
    pub fn calls(&self) -> Vec<RepositoryCall> {
        self.journal
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of calls received through `call`.
    pub fn call_count(&self, call: CallKind) -> usize {
        self.journal
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|c| c.kind() == call)
            .count()
    }

    /// Subscribe to the mutation counter.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.version.subscribe()
    }

    // ── Internals ────────────────────────────────────────────────────

    fn record(&self, call: RepositoryCall) {
        self.journal
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
    }

    fn take_armed(&self, call: CallKind) -> Result<(), Error> {
        match self.armed.remove(&call) {
            Some((_, error)) => Err(error),
            None => Ok(()),
        }
    }

    fn bump_version(&self) {
        self.version.send_modify(|v| *v += 1);
    }

    fn apply_now(&self, operations: &[ResourceOperation]) -> Result<(), Error> {
        self.record(RepositoryCall::Apply(operations.to_vec()));
        self.take_armed(CallKind::Apply)?;

        let mut result = Ok(());
        let mut applied = 0usize;
        for op in operations {
            if let Err(e) = self.apply_one(op) {
                result = Err(e);
                break;
            }
            applied += 1;
        }

        if applied > 0 {
            self.prune_running();
            self.bump_version();
        }
        debug!(applied, total = operations.len(), "memory repository apply");
        result
    }

    fn apply_one(&self, op: &ResourceOperation) -> Result<(), Error> {
        trace!(operation = %op, "applying");
        match op.action {
            OperationKind::Create => {
                if self.resources.contains_key(&op.path) {
                    return Err(Error::AlreadyExists {
                        path: op.path.to_string(),
                    });
                }
                if let Some(parent) = op.path.parent() {
                    if !self.resources.contains_key(&parent) {
                        return Err(Error::MissingParent {
                            path: op.path.to_string(),
                        });
                    }
                }
                let seq = self.seq.fetch_add(1, Ordering::Relaxed);
                self.resources.insert(
                    op.path.clone(),
                    StoredResource {
                        path: op.path.clone(),
                        payload: op.payload.clone(),
                        origin: op.origin.clone(),
                        seq,
                    },
                );
            }
            OperationKind::Update => {
                let mut entry = self
                    .resources
                    .get_mut(&op.path)
                    .ok_or_else(|| Error::NotFound {
                        path: op.path.to_string(),
                    })?;
                entry.payload.merge(&op.payload);
            }
            OperationKind::Delete => {
                if !self.resources.contains_key(&op.path) {
                    return Err(Error::NotFound {
                        path: op.path.to_string(),
                    });
                }
                self.resources
                    .retain(|path, _| path != &op.path && !path.is_descendant_of(&op.path));
            }
        }
        Ok(())
    }

    fn flow_names(&self) -> BTreeSet<String> {
        self.resources
            .iter()
            .filter(|r| r.key().kind() == ResourceKind::TrafficItem)
            .map(|r| r.key().name().to_owned())
            .collect()
    }

    /// Capture names declared on capture-enabled vports.
    fn capture_names(&self) -> BTreeSet<String> {
        self.resources
            .iter()
            .filter(|r| r.key().kind() == ResourceKind::Vport)
            .filter(|r| {
                r.payload
                    .get(Attribute::CaptureEnabled)
                    .and_then(AttributeValue::as_bool)
                    .unwrap_or(false)
            })
            .filter_map(|r| {
                r.payload
                    .get(Attribute::CaptureName)
                    .and_then(AttributeValue::as_text)
                    .map(str::to_owned)
            })
            .collect()
    }

    fn known_targets(&self, kind: ControlKind) -> BTreeSet<String> {
        match kind {
            ControlKind::Transmit => self.flow_names(),
            ControlKind::Capture => self.capture_names(),
        }
    }

    /// Drop running entries whose resources no longer exist.
    fn prune_running(&self) {
        for kind in [ControlKind::Transmit, ControlKind::Capture] {
            let known = self.known_targets(kind);
            if let Some(mut set) = self.running.get_mut(&kind) {
                set.retain(|name| known.contains(name));
            }
        }
    }

    fn set_control_now(
        &self,
        kind: ControlKind,
        targets: &[String],
        action: ControlAction,
    ) -> Result<(), Error> {
        self.record(RepositoryCall::SetControlState {
            kind,
            targets: targets.to_vec(),
            action,
        });
        self.take_armed(CallKind::SetControlState)?;

        let known = self.known_targets(kind);
        let selected: Vec<String> = if targets.is_empty() {
            known.into_iter().collect()
        } else {
            if let Some(unknown) = targets.iter().find(|t| !known.contains(*t)) {
                return Err(Error::UnknownTarget {
                    kind: kind.to_string(),
                    name: unknown.clone(),
                });
            }
            targets.to_vec()
        };

        let mut running = self.running.entry(kind).or_default();
        for name in selected {
            match action {
                ControlAction::Start => {
                    running.insert(name);
                }
                ControlAction::Stop => {
                    running.remove(&name);
                }
            }
        }
        drop(running);

        debug!(%kind, %action, "memory repository control state");
        self.bump_version();
        Ok(())
    }

    fn fetch_now(&self, kind: TelemetryKind) -> Result<TelemetrySnapshot, Error> {
        self.record(RepositoryCall::FetchTelemetry(kind));
        self.take_armed(CallKind::FetchTelemetry)?;

        let scripted = self.telemetry.get_mut(&kind).and_then(|mut queue| {
            if queue.len() > 1 {
                queue.pop_front()
            } else {
                queue.front().cloned()
            }
        });
        Ok(scripted.unwrap_or_else(|| self.synthesize(kind)))
    }

    /// Default telemetry when nothing was scripted: run state per flow or
    /// capture state per vport.
    fn synthesize(&self, kind: TelemetryKind) -> TelemetrySnapshot {
        let mut snapshot = TelemetrySnapshot::new(kind);
        match kind {
            TelemetryKind::Flow => {
                let running = self.running(ControlKind::Transmit);
                for flow in self.flow_names() {
                    let state = if running.contains(&flow) {
                        "started"
                    } else {
                        "stopped"
                    };
                    snapshot = snapshot.with_metric(flow, "transmit", state);
                }
            }
            TelemetryKind::Port => {
                let running = self.running(ControlKind::Capture);
                for resource in self.resources() {
                    if resource.path.kind() != ResourceKind::Vport {
                        continue;
                    }
                    let capturing = resource
                        .payload
                        .get(Attribute::CaptureName)
                        .and_then(AttributeValue::as_text)
                        .is_some_and(|name| running.contains(name));
                    let state = if capturing { "started" } else { "stopped" };
                    snapshot = snapshot.with_metric(resource.path.name(), "capture", state);
                }
            }
        }
        snapshot
    }
}

impl ResourceRepository for MemoryRepository {
    fn apply(
        &self,
        operations: &[ResourceOperation],
    ) -> impl Future<Output = Result<(), Error>> + Send {
        ready(self.apply_now(operations))
    }

    fn set_control_state(
        &self,
        kind: ControlKind,
        targets: &[String],
        action: ControlAction,
    ) -> impl Future<Output = Result<(), Error>> + Send {
        ready(self.set_control_now(kind, targets, action))
    }

    fn fetch_telemetry(
        &self,
        kind: TelemetryKind,
    ) -> impl Future<Output = Result<TelemetrySnapshot, Error>> + Send {
        ready(self.fetch_now(kind))
    }
}
