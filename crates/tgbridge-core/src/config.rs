// ── Runtime session configuration ──
//
// Tuning for one session controller. Built by the embedding program (or by
// `tgbridge-config` from TOML and environment) and handed in; core never
// reads config files.

use std::time::Duration;

use tgbridge_api::TelemetryKind;

/// Configuration for a single appliance session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Bound of the command channel feeding the processor task.
    pub command_channel_size: usize,
    /// Default delay between telemetry fetches while polling.
    pub poll_interval: Duration,
    /// Default overall bound on a poll.
    pub poll_timeout: Duration,
    /// Telemetry view polled when the caller does not pick one.
    pub telemetry_kind: TelemetryKind,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            command_channel_size: 64,
            poll_interval: Duration::from_secs(1),
            poll_timeout: Duration::from_secs(60),
            telemetry_kind: TelemetryKind::Flow,
        }
    }
}
