// ── Core error types ──
//
// Translation errors are detected locally and are fatal to the current
// `translate` / `apply` call; nothing is sent to the appliance. Repository
// errors are propagated unchanged: retry policy for a stateful device
// session belongs to the caller.

use std::time::Duration;

use thiserror::Error;

use tgbridge_api::{ControlKind, EntityKind, EntityRef};

use crate::mapper::OptionFamily;
use crate::session::SessionState;

/// Failure to resolve an abstract option identifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MappingError {
    #[error("unknown {family} option '{option}'")]
    UnknownOption { family: OptionFamily, option: String },
}

/// Two entities in one submission claimed the same name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("duplicate name '{name}': {kind} conflicts with existing {existing}")]
pub struct DuplicateName {
    pub name: String,
    pub kind: EntityKind,
    pub existing: EntityKind,
}

/// First error hit while translating an abstract configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranslationError {
    #[error("{entity}: unknown {family} option '{option}'")]
    UnknownOption {
        entity: EntityRef,
        family: OptionFamily,
        option: String,
    },

    #[error(transparent)]
    DuplicateName(#[from] DuplicateName),

    #[error("{entity}: unresolved reference '{reference}' (expected {expected})")]
    UnresolvedReference {
        entity: EntityRef,
        reference: String,
        expected: String,
    },

    /// A resolved token does not name a payload attribute.
    #[error("{entity}: '{token}' is not a known attribute")]
    UnknownAttribute {
        entity: EntityRef,
        token: &'static str,
    },
}

impl TranslationError {
    /// Attribute a mapping failure to the entity being translated.
    pub(crate) fn option(entity: &EntityRef, err: MappingError) -> Self {
        match err {
            MappingError::UnknownOption { family, option } => Self::UnknownOption {
                entity: entity.clone(),
                family,
                option,
            },
        }
    }
}

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Translation ──────────────────────────────────────────────────
    #[error("Translation failed: {0}")]
    Translation(#[from] TranslationError),

    // ── Validation ───────────────────────────────────────────────────
    #[error(
        "Conflicting latency modes: flow '{flow}' requests {mode}, flow '{first_flow}' requests {first_mode}"
    )]
    ConflictingLatencyMode {
        first_flow: String,
        first_mode: String,
        flow: String,
        mode: String,
    },

    // ── Session state ────────────────────────────────────────────────
    #[error("Cannot {operation} while session is {state}")]
    InvalidState {
        operation: &'static str,
        state: SessionState,
    },

    #[error("Unknown {kind} target: {name}")]
    UnresolvedTarget { kind: ControlKind, name: String },

    #[error("Session closed")]
    SessionClosed,

    // ── Repository (propagated unchanged) ────────────────────────────
    #[error("Repository error: {0}")]
    Repository(#[from] tgbridge_api::Error),

    // ── Polling ──────────────────────────────────────────────────────
    #[error("Condition not met within {timeout:?} ({ticks} polls)")]
    Timeout { timeout: Duration, ticks: u32 },

    #[error("Polling cancelled after {ticks} polls")]
    Cancelled { ticks: u32 },
}

impl CoreError {
    /// Returns `true` if the session is still usable after this error.
    ///
    /// Only a closed session is terminal; every other failure leaves the
    /// controller in a well-defined state.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::SessionClosed)
    }
}
