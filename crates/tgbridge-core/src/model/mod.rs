// ── Abstract test configuration ──
//
// Vendor-neutral description of a traffic-generation test. Every entity
// that can be referenced by name carries an optional `name`; missing or
// empty names are filled in deterministically at translation time.
// Fields that name a protocol option (`as_type`, `cipher_suite`, ...) hold
// abstract identifiers resolved through `crate::mapper`; everything else is
// a literal passed through to the appliance unchanged.

pub mod bgp;
pub mod device;
pub mod flow;

use serde::{Deserialize, Serialize};

pub use bgp::{
    AddressPool, AsPath, AsPathSegment, BgpInterface, BgpPeer, BgpRouter, Community, RouteRange,
};
pub use device::{Device, Ethernet, Ipv4Interface, Macsec};
pub use flow::{Capture, Flow, Latency};

/// Root of one configuration submission.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AbstractConfig {
    pub ports: Vec<Port>,
    pub devices: Vec<Device>,
    pub flows: Vec<Flow>,
    pub captures: Vec<Capture>,
    pub options: Options,
}

/// A test port bound to an appliance location (chassis/card/port).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Port {
    pub name: Option<String>,
    pub location: Option<String>,
}

/// Global options applied across the submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Take ownership of ports already held by another session.
    pub location_preemption: bool,
}

/// Treat a missing or empty name the same way.
pub(crate) fn explicit_name(name: Option<&String>) -> Option<&str> {
    name.map(String::as_str).filter(|n| !n.is_empty())
}
