// ── BGP configuration ──

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BgpRouter {
    pub router_id: String,
    pub interfaces: Vec<BgpInterface>,
}

/// Peers reached through one IPv4 interface of the same device.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BgpInterface {
    /// Name of an `Ipv4Interface` on the enclosing device.
    pub ipv4_name: String,
    pub peers: Vec<BgpPeer>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BgpPeer {
    pub name: Option<String>,
    pub peer_address: String,
    /// Peer type option identifier: `ibgp` or `ebgp`.
    pub as_type: String,
    pub as_number: u32,
    pub v4_routes: Vec<RouteRange>,
}

impl Default for BgpPeer {
    fn default() -> Self {
        Self {
            name: None,
            peer_address: "0.0.0.0".into(),
            as_type: "ibgp".into(),
            as_number: 65000,
            v4_routes: Vec::new(),
        }
    }
}

/// Routes advertised by a peer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteRange {
    pub name: Option<String>,
    pub addresses: Vec<AddressPool>,
    /// Route origin option identifier: `igp`, `egp` or `incomplete`.
    pub origin: Option<String>,
    pub as_path: Option<AsPath>,
    pub communities: Vec<Community>,
}

/// A generated block of prefixes: `count` networks of length `prefix`
/// starting at `address`, `step` networks apart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AddressPool {
    pub address: String,
    pub prefix: u32,
    pub count: u32,
    pub step: u32,
}

impl Default for AddressPool {
    fn default() -> Self {
        Self {
            address: "0.0.0.0".into(),
            prefix: 24,
            count: 1,
            step: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AsPath {
    /// How the local AS is added, e.g. `include-as-seq`.
    pub as_set_mode: String,
    pub segments: Vec<AsPathSegment>,
}

impl Default for AsPath {
    fn default() -> Self {
        Self {
            as_set_mode: "do-not-include-local-as".into(),
            segments: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AsPathSegment {
    /// Segment type option identifier, e.g. `as-seq`.
    pub segment_type: String,
    pub as_numbers: Vec<u32>,
}

impl Default for AsPathSegment {
    fn default() -> Self {
        Self {
            segment_type: "as-seq".into(),
            as_numbers: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Community {
    /// Community type option identifier, e.g. `no-export`.
    pub community_type: String,
    pub as_number: u32,
    pub as_custom: u32,
}

impl Default for Community {
    fn default() -> Self {
        Self {
            community_type: "manual-as-number".into(),
            as_number: 0,
            as_custom: 0,
        }
    }
}
