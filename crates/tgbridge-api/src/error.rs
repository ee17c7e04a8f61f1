use thiserror::Error;

/// Top-level error type for the `tgbridge-api` crate.
///
/// Covers every failure mode a resource repository can report: rejected
/// resource operations, unknown control targets, and transport-level
/// unavailability. `tgbridge-core` propagates these unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    // ── Resource operations ─────────────────────────────────────────
    /// Update or delete against a resource that does not exist.
    #[error("Resource not found: {path}")]
    NotFound { path: String },

    /// Create against a path that is already occupied.
    #[error("Resource already exists: {path}")]
    AlreadyExists { path: String },

    /// Create of a nested resource whose parent has not been created.
    #[error("Parent resource missing for {path}")]
    MissingParent { path: String },

    // ── Control state ───────────────────────────────────────────────
    /// A start/stop request named a flow or capture the appliance does not know.
    #[error("Unknown {kind} target: {name}")]
    UnknownTarget { kind: String, name: String },

    // ── Appliance ───────────────────────────────────────────────────
    /// The appliance accepted the request but refused to carry it out.
    #[error("Appliance rejected request: {message}")]
    Rejected { message: String },

    /// The appliance could not be reached.
    #[error("Appliance unreachable: {reason}")]
    Unreachable { reason: String },

    /// Request timed out.
    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },
}

impl Error {
    /// Returns `true` if this is a transient error a caller may retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unreachable { .. } | Self::Timeout { .. })
    }

    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::UnknownTarget { .. })
    }
}
