// ── Command API ──
//
// Every state-changing request is a `Command`. The session controller
// sends each one through its command channel and the processor task runs
// them one at a time, in submission order.

use serde::Serialize;

use tgbridge_api::{ControlAction, ControlKind, ResourceOperation};

use crate::error::CoreError;

/// A command envelope sent through the command channel.
/// Contains the command and a oneshot response channel.
pub(crate) struct CommandEnvelope {
    pub command: Command,
    pub response_tx: tokio::sync::oneshot::Sender<Result<CommandResult, CoreError>>,
}

/// All state-changing operations on a session.
#[derive(Debug, Clone)]
pub enum Command {
    /// Clear whatever the session previously applied, then apply
    /// `operations` in order.
    ApplyConfig { operations: Vec<ResourceOperation> },

    /// Start or stop flows or captures. Empty `names` means all of them.
    SetControl {
        kind: ControlKind,
        names: Vec<String>,
        action: ControlAction,
    },
}

/// Result of a command execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "kebab-case")]
pub enum CommandResult {
    Applied {
        operations: usize,
        /// Resources deleted from the previous configuration.
        cleared: usize,
    },
    Changed {
        kind: ControlKind,
        action: ControlAction,
        targets: Vec<String>,
    },
    /// Every requested target was already in the requested state.
    Unchanged,
}
