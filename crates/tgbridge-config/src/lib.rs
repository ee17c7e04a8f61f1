//! Session configuration for tgbridge.
//!
//! Layered loading (built-in defaults, then a TOML file, then `TGBRIDGE_`
//! environment variables) and translation to
//! `tgbridge_core::SessionConfig`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use tgbridge_api::TelemetryKind;
use tgbridge_core::SessionConfig;

const ENV_PREFIX: &str = "TGBRIDGE_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub session: SessionSettings,
}

/// `[session]` table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SessionSettings {
    /// Delay between telemetry fetches while polling, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Overall bound on a poll, in milliseconds.
    #[serde(default = "default_poll_timeout_ms")]
    pub poll_timeout_ms: u64,

    #[serde(default = "default_command_channel_size")]
    pub command_channel_size: usize,

    /// Default telemetry view: "flow" or "port".
    #[serde(default = "default_telemetry")]
    pub telemetry: String,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            poll_timeout_ms: default_poll_timeout_ms(),
            command_channel_size: default_command_channel_size(),
            telemetry: default_telemetry(),
        }
    }
}

fn default_poll_interval_ms() -> u64 {
    1_000
}
fn default_poll_timeout_ms() -> u64 {
    60_000
}
fn default_command_channel_size() -> usize {
    64
}
fn default_telemetry() -> String {
    "flow".into()
}

impl Config {
    /// Validate and convert to the runtime session configuration.
    pub fn to_session_config(&self) -> Result<SessionConfig, ConfigError> {
        let s = &self.session;

        if s.poll_interval_ms == 0 {
            return Err(ConfigError::Validation {
                field: "session.poll_interval_ms".into(),
                reason: "must be greater than zero".into(),
            });
        }
        if s.command_channel_size == 0 {
            return Err(ConfigError::Validation {
                field: "session.command_channel_size".into(),
                reason: "must be greater than zero".into(),
            });
        }
        let telemetry_kind: TelemetryKind =
            s.telemetry.parse().map_err(|_| ConfigError::Validation {
                field: "session.telemetry".into(),
                reason: format!("expected 'flow' or 'port', got '{}'", s.telemetry),
            })?;

        Ok(SessionConfig {
            command_channel_size: s.command_channel_size,
            poll_interval: Duration::from_millis(s.poll_interval_ms),
            poll_timeout: Duration::from_millis(s.poll_timeout_ms),
            telemetry_kind,
        })
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "tgbridge", "tgbridge").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("tgbridge");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from `path` + environment. A missing file just means defaults.
///
/// Environment keys use `__` as the table separator, e.g.
/// `TGBRIDGE_SESSION__POLL_TIMEOUT_MS=5000`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if loading fails.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

/// Load and validate in one step.
pub fn load_session_config() -> Result<SessionConfig, ConfigError> {
    load_config()?.to_session_config()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}
