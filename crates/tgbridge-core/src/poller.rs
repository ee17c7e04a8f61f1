// ── Result poller ──
//
// Fetch telemetry until a caller predicate holds, the deadline passes, or
// the poll is cancelled. Polling is read-only and runs outside the command
// channel, so it never holds up configuration or control changes.

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use tgbridge_api::{ResourceRepository, TelemetryKind, TelemetrySnapshot};

use crate::config::SessionConfig;
use crate::error::CoreError;

/// Lower bound on the delay between fetches.
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// What to poll and for how long.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOptions {
    pub kind: TelemetryKind,
    pub timeout: Duration,
    pub interval: Duration,
}

impl PollOptions {
    pub fn new(kind: TelemetryKind, timeout: Duration, interval: Duration) -> Self {
        Self {
            kind,
            timeout,
            interval,
        }
    }

    pub fn with_kind(mut self, kind: TelemetryKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

impl From<&SessionConfig> for PollOptions {
    fn from(config: &SessionConfig) -> Self {
        Self::new(config.telemetry_kind, config.poll_timeout, config.poll_interval)
    }
}

/// The snapshot that satisfied the predicate.
#[derive(Debug, Clone, PartialEq)]
pub struct PollResult {
    pub snapshot: TelemetrySnapshot,
    /// Number of fetches, including the one that satisfied the predicate.
    pub ticks: u32,
    pub elapsed: Duration,
}

/// Poll `repository` until `predicate` holds for a fetched snapshot.
///
/// The first fetch happens immediately. A predicate that holds on it
/// returns without sleeping. `Timeout` is only reported once the deadline
/// has been reached, and only after a final fetch at or past it.
/// Repository errors end the poll and are returned unchanged.
pub async fn await_condition<R, F>(
    repository: &R,
    options: PollOptions,
    mut predicate: F,
    cancel: &CancellationToken,
) -> Result<PollResult, CoreError>
where
    R: ResourceRepository,
    F: FnMut(&TelemetrySnapshot) -> bool + Send,
{
    let started = Instant::now();
    let deadline = started + options.timeout;
    let interval = options.interval.max(MIN_POLL_INTERVAL);
    let mut ticks: u32 = 0;

    loop {
        let snapshot = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(CoreError::Cancelled { ticks }),
            fetched = repository.fetch_telemetry(options.kind) => fetched?,
        };
        ticks = ticks.saturating_add(1);

        if predicate(&snapshot) {
            let elapsed = started.elapsed();
            debug!(kind = %options.kind, ticks, ?elapsed, "condition met");
            return Ok(PollResult {
                snapshot,
                ticks,
                elapsed,
            });
        }

        let now = Instant::now();
        if now >= deadline {
            debug!(kind = %options.kind, ticks, "condition not met before deadline");
            return Err(CoreError::Timeout {
                timeout: options.timeout,
                ticks,
            });
        }

        let pause = interval.min(deadline - now);
        tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(CoreError::Cancelled { ticks }),
            () = tokio::time::sleep(pause) => {}
        }
    }
}
