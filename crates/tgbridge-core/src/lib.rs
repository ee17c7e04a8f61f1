//! Configuration translation and session control for traffic-generator
//! appliances, on top of the `tgbridge-api` repository boundary.
//!
//! - **[`mapper`]**: closed tables turning abstract protocol option
//!   identifiers (`include-as-seq`, `gcm-aes-256`, ...) into appliance
//!   tokens. Unknown identifiers are errors, never silent defaults.
//!
//! - **[`translate()`]**: walks an [`AbstractConfig`] and produces the
//!   ordered [`ResourceOperation`](tgbridge_api::ResourceOperation) list that
//!   builds it, enforcing one flat [`NameRegistry`] namespace per submission.
//!
//! - **[`SessionController`]**: owns one appliance session. Applies
//!   configurations (clear, then build), flips transmit and capture state,
//!   and serializes every mutation through a single command processor task.
//!   State is observable via [`SessionController::subscribe()`].
//!
//! - **[`await_condition()`]**: polls telemetry until a caller predicate
//!   holds, with a bounded wait and cancellation.

pub mod config;
pub mod error;
pub mod mapper;
pub mod model;
pub mod poller;
pub mod registry;
pub mod session;
pub mod translate;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::SessionConfig;
pub use error::{CoreError, DuplicateName, MappingError, TranslationError};
pub use mapper::{OptionFamily, OptionMapping};
pub use poller::{PollOptions, PollResult, await_condition};
pub use registry::NameRegistry;
pub use session::{Command, CommandResult, ConfigPhase, SessionController, SessionState};
pub use translate::translate;

pub use model::{
    AbstractConfig, AddressPool, AsPath, AsPathSegment, BgpInterface, BgpPeer, BgpRouter, Capture,
    Community, Device, Ethernet, Flow, Ipv4Interface, Latency, Macsec, Options, Port, RouteRange,
};
