// ── Resource repository contract ──
//
// The narrow surface through which the session core reaches the appliance.
// Implementations own the wire transport, authentication, and the
// appliance's object model; the core only hands them ordered operations,
// control requests, and telemetry queries.

use std::future::Future;

use crate::error::Error;
use crate::operation::ResourceOperation;
use crate::telemetry::{ControlAction, ControlKind, TelemetryKind, TelemetrySnapshot};

/// Stateful resource store backed by a traffic-generation appliance.
///
/// Implementations must be safe to share between the session's command
/// processor and any number of concurrent telemetry pollers.
pub trait ResourceRepository: Send + Sync + 'static {
    /// Apply `operations` in the given order.
    ///
    /// The repository is not transactional: on error, operations before the
    /// failing one may or may not have taken effect.
    fn apply(
        &self,
        operations: &[ResourceOperation],
    ) -> impl Future<Output = Result<(), Error>> + Send;

    /// Start or stop flows (`ControlKind::Transmit`) or captures
    /// (`ControlKind::Capture`). An empty `targets` slice means "all".
    fn set_control_state(
        &self,
        kind: ControlKind,
        targets: &[String],
        action: ControlAction,
    ) -> impl Future<Output = Result<(), Error>> + Send;

    /// Fetch a point-in-time statistics view.
    fn fetch_telemetry(
        &self,
        kind: TelemetryKind,
    ) -> impl Future<Output = Result<TelemetrySnapshot, Error>> + Send;
}
