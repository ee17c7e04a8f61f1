// ── Session control ──
//
// One logical session with one appliance. All state-changing requests go
// through a single command processor task; observers read state through a
// watch channel.

pub mod command;
pub mod controller;

use std::fmt;

use serde::Serialize;
use strum::{AsRefStr, Display};

pub use command::{Command, CommandResult};
pub use controller::SessionController;

/// Whether a configuration is currently in place on the appliance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Display, AsRefStr)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum ConfigPhase {
    #[default]
    Idle,
    ConfigApplied,
}

/// Observable session state.
///
/// `transmitting` and `capturing` can only be `true` in
/// [`ConfigPhase::ConfigApplied`]; every successful apply resets both.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionState {
    pub phase: ConfigPhase,
    pub transmitting: bool,
    pub capturing: bool,
}

impl SessionState {
    pub fn is_configured(&self) -> bool {
        self.phase == ConfigPhase::ConfigApplied
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.phase)?;
        match (self.transmitting, self.capturing) {
            (false, false) => Ok(()),
            (true, false) => f.write_str(" (transmitting)"),
            (false, true) => f.write_str(" (capturing)"),
            (true, true) => f.write_str(" (transmitting, capturing)"),
        }
    }
}
