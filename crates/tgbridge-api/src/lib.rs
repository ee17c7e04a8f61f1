//! Resource repository boundary for traffic-generator appliance sessions.
//!
//! This crate defines everything that crosses between the session core and
//! the transport layer that talks to an appliance:
//!
//! - **[`ResourceOperation`]**: one create/update/delete against a resource
//!   identified by a [`ResourcePath`], carrying a [`Payload`] drawn from the
//!   closed [`Attribute`] vocabulary.
//!
//! - **[`ResourceRepository`]**: the trait a transport implements to apply
//!   operations, flip transmit/capture state, and serve telemetry.
//!
//! - **[`TelemetrySnapshot`]**: per-entity metric maps returned by the
//!   repository and handed to convergence predicates.
//!
//! - **[`MemoryRepository`]**: a concurrent in-memory implementation with
//!   scripted telemetry and failure injection, for tests and dry runs.

pub mod error;
pub mod memory;
pub mod operation;
pub mod repository;
pub mod telemetry;

pub use error::Error;
pub use memory::{CallKind, MemoryRepository, RepositoryCall, StoredResource};
pub use operation::{
    Attribute, AttributeValue, EntityKind, EntityRef, OperationKind, PathSegment, Payload,
    ResourceKind, ResourceOperation, ResourcePath,
};
pub use repository::ResourceRepository;
pub use telemetry::{ControlAction, ControlKind, Metrics, TelemetryKind, TelemetrySnapshot};
