// ── Session controller ──
//
// Owns the single logical session with an appliance. Configuration and
// control changes are serialized through one command processor task, which
// is also the only owner of the ledger of what this session has applied.
// State is published through a watch channel; telemetry polling runs
// alongside without touching the command channel.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use tgbridge_api::{
    Attribute, AttributeValue, ControlAction, ControlKind, EntityRef, OperationKind, ResourceKind,
    ResourceOperation, ResourcePath, ResourceRepository, TelemetrySnapshot,
};

use super::command::{Command, CommandEnvelope, CommandResult};
use super::{ConfigPhase, SessionState};
use crate::config::SessionConfig;
use crate::error::CoreError;
use crate::model::AbstractConfig;
use crate::poller::{self, PollOptions, PollResult};
use crate::translate::translate;

// ── SessionController ────────────────────────────────────────────

/// Handle to one appliance session.
///
/// Cheaply cloneable. The processor task stops when the session is closed
/// or when the last handle is dropped.
pub struct SessionController<R: ResourceRepository> {
    shared: Arc<Shared<R>>,
    command_tx: mpsc::Sender<CommandEnvelope>,
}

impl<R: ResourceRepository> Clone for SessionController<R> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            command_tx: self.command_tx.clone(),
        }
    }
}

/// State reachable from both the handles and the processor task.
struct Shared<R> {
    config: SessionConfig,
    repository: Arc<R>,
    state: watch::Sender<SessionState>,
    cancel: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl<R: ResourceRepository> SessionController<R> {
    /// Open a session over `repository` and start its command processor.
    ///
    /// Must be called from within a tokio runtime. The session starts
    /// [`ConfigPhase::Idle`]; nothing is sent to the appliance until the
    /// first command.
    pub fn open(repository: Arc<R>, config: SessionConfig) -> Self {
        let (state, _) = watch::channel(SessionState::default());
        let (command_tx, command_rx) = mpsc::channel(config.command_channel_size.max(1));

        let shared = Arc::new(Shared {
            config,
            repository,
            state,
            cancel: CancellationToken::new(),
            task: Mutex::new(None),
        });

        let handle = tokio::spawn(command_processor_task(Arc::clone(&shared), command_rx));
        *shared.task.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
        debug!("session opened");

        Self { shared, command_tx }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.shared.config
    }

    pub fn repository(&self) -> &Arc<R> {
        &self.shared.repository
    }

    // ── Command execution ────────────────────────────────────────

    /// Execute a command through the command processor and await its result.
    pub async fn execute(&self, command: Command) -> Result<CommandResult, CoreError> {
        if self.shared.cancel.is_cancelled() {
            return Err(CoreError::SessionClosed);
        }

        let (tx, rx) = oneshot::channel();
        self.command_tx
            .send(CommandEnvelope {
                command,
                response_tx: tx,
            })
            .await
            .map_err(|_| CoreError::SessionClosed)?;

        rx.await.map_err(|_| CoreError::SessionClosed)?
    }

    /// Translate `config` and apply the result.
    ///
    /// Translation errors are reported before anything reaches the
    /// command channel.
    pub async fn apply(&self, config: &AbstractConfig) -> Result<CommandResult, CoreError> {
        let operations = translate(config)?;
        self.apply_config(operations).await
    }

    /// Replace whatever this session applied before with `operations`.
    pub async fn apply_config(
        &self,
        operations: Vec<ResourceOperation>,
    ) -> Result<CommandResult, CoreError> {
        self.execute(Command::ApplyConfig { operations }).await
    }

    /// Start or stop flows. Empty `names` targets every applied flow.
    pub async fn set_transmit(
        &self,
        names: &[String],
        action: ControlAction,
    ) -> Result<CommandResult, CoreError> {
        self.execute(Command::SetControl {
            kind: ControlKind::Transmit,
            names: names.to_vec(),
            action,
        })
        .await
    }

    /// Start or stop captures. Empty `names` targets every applied capture.
    pub async fn set_capture(
        &self,
        names: &[String],
        action: ControlAction,
    ) -> Result<CommandResult, CoreError> {
        self.execute(Command::SetControl {
            kind: ControlKind::Capture,
            names: names.to_vec(),
            action,
        })
        .await
    }

    // ── State observation ────────────────────────────────────────

    /// Current state snapshot.
    pub fn state(&self) -> SessionState {
        *self.shared.state.borrow()
    }

    /// Subscribe to state changes.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.shared.state.subscribe()
    }

    // ── Polling ──────────────────────────────────────────────────

    /// Poll defaults taken from the session configuration.
    pub fn poll_options(&self) -> PollOptions {
        PollOptions::from(&self.shared.config)
    }

    /// Poll telemetry until `predicate` holds. Closing the session cancels
    /// the poll.
    pub async fn await_condition<F>(
        &self,
        options: PollOptions,
        predicate: F,
    ) -> Result<PollResult, CoreError>
    where
        F: FnMut(&TelemetrySnapshot) -> bool + Send,
    {
        let cancel = self.shared.cancel.child_token();
        poller::await_condition(&*self.shared.repository, options, predicate, &cancel).await
    }

    /// Like [`await_condition`](Self::await_condition), additionally
    /// cancelled by `cancel`.
    pub async fn await_condition_with_cancel<F>(
        &self,
        options: PollOptions,
        predicate: F,
        cancel: &CancellationToken,
    ) -> Result<PollResult, CoreError>
    where
        F: FnMut(&TelemetrySnapshot) -> bool + Send,
    {
        let merged = self.shared.cancel.child_token();
        let link = {
            let caller = cancel.clone();
            let merged = merged.clone();
            tokio::spawn(async move {
                caller.cancelled().await;
                merged.cancel();
            })
        };

        let result =
            poller::await_condition(&*self.shared.repository, options, predicate, &merged).await;
        link.abort();
        result
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Stop the command processor and cancel outstanding polls.
    ///
    /// Commands already queued are dropped and their callers receive
    /// `SessionClosed`. Resources on the appliance are left as they are.
    pub async fn close(&self) {
        self.shared.cancel.cancel();
        let handle = self
            .shared
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
        debug!("session closed");
    }

    pub fn is_closed(&self) -> bool {
        self.shared.cancel.is_cancelled()
    }
}

// ── Command processor ────────────────────────────────────────────

/// Process commands from the channel one at a time.
async fn command_processor_task<R: ResourceRepository>(
    shared: Arc<Shared<R>>,
    mut rx: mpsc::Receiver<CommandEnvelope>,
) {
    let mut ledger = Ledger::default();

    loop {
        tokio::select! {
            biased;
            () = shared.cancel.cancelled() => break,
            envelope = rx.recv() => {
                let Some(envelope) = envelope else { break };
                let result = route_command(&shared, &mut ledger, envelope.command).await;
                let _ = envelope.response_tx.send(result);
            }
        }
    }
}

async fn route_command<R: ResourceRepository>(
    shared: &Shared<R>,
    ledger: &mut Ledger,
    command: Command,
) -> Result<CommandResult, CoreError> {
    match command {
        Command::ApplyConfig { operations } => apply_config(shared, ledger, operations).await,
        Command::SetControl {
            kind,
            names,
            action,
        } => set_control(shared, ledger, kind, &names, action).await,
    }
}

async fn apply_config<R: ResourceRepository>(
    shared: &Shared<R>,
    ledger: &mut Ledger,
    operations: Vec<ResourceOperation>,
) -> Result<CommandResult, CoreError> {
    check_latency_modes(&operations)?;

    let cleared = clear_previous(shared, ledger).await?;
    // Nothing applied before survives from here on, so nothing can still
    // be transmitting or capturing.
    *ledger = Ledger::default();
    shared.state.send_if_modified(|s| {
        let changed = s.transmitting || s.capturing;
        s.transmitting = false;
        s.capturing = false;
        changed
    });

    if !operations.is_empty() {
        debug!(operations = operations.len(), "applying configuration");
        // The repository is not transactional: a batch failing part-way
        // leaves some of these roots behind for the next clear.
        ledger.expect(&operations);
        shared
            .repository
            .apply(&operations)
            .await
            .inspect_err(|e| warn!(error = %e, "failed to apply configuration"))?;
    }
    ledger.record(&operations);

    shared.state.send_replace(SessionState {
        phase: ConfigPhase::ConfigApplied,
        transmitting: false,
        capturing: false,
    });
    info!(
        operations = operations.len(),
        cleared,
        flows = ledger.flows.len(),
        captures = ledger.captures.len(),
        "configuration applied"
    );

    Ok(CommandResult::Applied {
        operations: operations.len(),
        cleared,
    })
}

/// Delete every root this session created, newest first.
///
/// Confirmed roots go out as one batch. If any root is unconfirmed, each
/// delete is sent on its own and a "not found" reply counts as cleared.
/// Returns the number of resources actually deleted.
async fn clear_previous<R: ResourceRepository>(
    shared: &Shared<R>,
    ledger: &mut Ledger,
) -> Result<usize, CoreError> {
    let teardown = ledger.teardown();
    if teardown.is_empty() {
        return Ok(0);
    }

    if ledger.all_confirmed() {
        debug!(operations = teardown.len(), "clearing previous configuration");
        if let Err(e) = shared.repository.apply(&teardown).await {
            warn!(error = %e, "failed to clear previous configuration");
            ledger.unconfirm();
            return Err(e.into());
        }
        return Ok(teardown.len());
    }

    debug!(
        operations = teardown.len(),
        "clearing partially applied configuration"
    );
    let mut cleared = 0;
    for op in teardown {
        match shared.repository.apply(std::slice::from_ref(&op)).await {
            Ok(()) => cleared += 1,
            Err(e) if e.is_not_found() => debug!(path = %op.path, "already absent"),
            Err(e) => {
                warn!(path = %op.path, error = %e, "failed to clear previous configuration");
                return Err(e.into());
            }
        }
        ledger.forget(&op.path);
    }
    Ok(cleared)
}

async fn set_control<R: ResourceRepository>(
    shared: &Shared<R>,
    ledger: &mut Ledger,
    kind: ControlKind,
    names: &[String],
    action: ControlAction,
) -> Result<CommandResult, CoreError> {
    let state = *shared.state.borrow();
    if !state.is_configured() {
        return Err(CoreError::InvalidState {
            operation: operation_name(kind, action),
            state,
        });
    }

    let known = ledger.known(kind);
    let targets: BTreeSet<&String> = if names.is_empty() {
        known.iter().collect()
    } else {
        if let Some(unknown) = names.iter().find(|n| !known.contains(*n)) {
            return Err(CoreError::UnresolvedTarget {
                kind,
                name: unknown.clone(),
            });
        }
        names.iter().collect()
    };

    let running = ledger.running(kind);
    let pending: Vec<String> = targets
        .into_iter()
        .filter(|t| match action {
            ControlAction::Start => !running.contains(*t),
            ControlAction::Stop => running.contains(*t),
        })
        .cloned()
        .collect();

    if pending.is_empty() {
        debug!(%kind, %action, "all targets already in requested state");
        return Ok(CommandResult::Unchanged);
    }

    shared
        .repository
        .set_control_state(kind, &pending, action)
        .await
        .inspect_err(|e| warn!(%kind, %action, error = %e, "control request failed"))?;

    let running = ledger.running_mut(kind);
    for target in &pending {
        match action {
            ControlAction::Start => running.insert(target.clone()),
            ControlAction::Stop => running.remove(target),
        };
    }
    let active = !running.is_empty();

    shared.state.send_modify(|s| match kind {
        ControlKind::Transmit => s.transmitting = active,
        ControlKind::Capture => s.capturing = active,
    });
    info!(%kind, %action, targets = pending.len(), active, "control state changed");

    Ok(CommandResult::Changed {
        kind,
        action,
        targets: pending,
    })
}

fn operation_name(kind: ControlKind, action: ControlAction) -> &'static str {
    match (kind, action) {
        (ControlKind::Transmit, ControlAction::Start) => "start transmit",
        (ControlKind::Transmit, ControlAction::Stop) => "stop transmit",
        (ControlKind::Capture, ControlAction::Start) => "start capture",
        (ControlKind::Capture, ControlAction::Stop) => "stop capture",
    }
}

/// The appliance supports one latency mode per configuration, so every
/// flow that asks for latency must ask for the same mode.
fn check_latency_modes(operations: &[ResourceOperation]) -> Result<(), CoreError> {
    let mut first: Option<(&str, &str)> = None;

    let flows = operations
        .iter()
        .filter(|op| op.action == OperationKind::Create && op.kind() == ResourceKind::TrafficItem);
    for op in flows {
        let Some(mode) = op
            .payload
            .get(Attribute::LatencyMode)
            .and_then(AttributeValue::as_text)
        else {
            continue;
        };
        match first {
            None => first = Some((op.path.name(), mode)),
            Some((first_flow, first_mode)) if first_mode != mode => {
                return Err(CoreError::ConflictingLatencyMode {
                    first_flow: first_flow.to_owned(),
                    first_mode: first_mode.to_owned(),
                    flow: op.path.name().to_owned(),
                    mode: mode.to_owned(),
                });
            }
            Some(_) => {}
        }
    }
    Ok(())
}

// ── Ledger ───────────────────────────────────────────────────────

/// What this session has put on the appliance. Owned by the processor task.
#[derive(Debug, Default)]
struct Ledger {
    /// Root resources in creation order; deleting them removes everything
    /// nested underneath.
    roots: Vec<Root>,
    flows: BTreeSet<String>,
    captures: BTreeSet<String>,
    transmitting: BTreeSet<String>,
    capturing: BTreeSet<String>,
}

#[derive(Debug)]
struct Root {
    path: ResourcePath,
    origin: EntityRef,
    /// `false` while the root may or may not exist on the appliance.
    confirmed: bool,
}

impl Ledger {
    /// Track the roots a batch is about to create before sending it.
    fn expect(&mut self, operations: &[ResourceOperation]) {
        for op in operations {
            if op.action == OperationKind::Create && op.path.is_root() {
                self.track_root(op, false);
            }
        }
    }

    /// Record a batch the repository accepted in full.
    fn record(&mut self, operations: &[ResourceOperation]) {
        for op in operations {
            match op.action {
                OperationKind::Create if op.path.is_root() => self.track_root(op, true),
                OperationKind::Delete => self.forget(&op.path),
                _ => {}
            }

            match op.kind() {
                ResourceKind::TrafficItem if op.action == OperationKind::Create => {
                    self.flows.insert(op.path.name().to_owned());
                }
                ResourceKind::Vport if op.action != OperationKind::Delete => {
                    let enabled = op
                        .payload
                        .get(Attribute::CaptureEnabled)
                        .and_then(AttributeValue::as_bool);
                    let name = op
                        .payload
                        .get(Attribute::CaptureName)
                        .and_then(AttributeValue::as_text);
                    if let (Some(true), Some(name)) = (enabled, name) {
                        self.captures.insert(name.to_owned());
                    }
                }
                _ => {}
            }
        }
    }

    fn track_root(&mut self, op: &ResourceOperation, confirmed: bool) {
        match self.roots.iter_mut().find(|r| r.path == op.path) {
            Some(root) => root.confirmed = confirmed,
            None => self.roots.push(Root {
                path: op.path.clone(),
                origin: op.origin.clone(),
                confirmed,
            }),
        }
    }

    fn forget(&mut self, path: &ResourcePath) {
        self.roots
            .retain(|r| &r.path != path && !r.path.is_descendant_of(path));
    }

    fn all_confirmed(&self) -> bool {
        self.roots.iter().all(|r| r.confirmed)
    }

    /// A failed teardown batch may have removed any of the roots.
    fn unconfirm(&mut self) {
        for root in &mut self.roots {
            root.confirmed = false;
        }
    }

    /// Deletes for every root resource, newest first.
    fn teardown(&self) -> Vec<ResourceOperation> {
        self.roots
            .iter()
            .rev()
            .map(|r| ResourceOperation::delete(r.path.clone(), r.origin.clone()))
            .collect()
    }

    fn known(&self, kind: ControlKind) -> &BTreeSet<String> {
        match kind {
            ControlKind::Transmit => &self.flows,
            ControlKind::Capture => &self.captures,
        }
    }

    fn running(&self, kind: ControlKind) -> &BTreeSet<String> {
        match kind {
            ControlKind::Transmit => &self.transmitting,
            ControlKind::Capture => &self.capturing,
        }
    }

    fn running_mut(&mut self, kind: ControlKind) -> &mut BTreeSet<String> {
        match kind {
            ControlKind::Transmit => &mut self.transmitting,
            ControlKind::Capture => &mut self.capturing,
        }
    }
}
