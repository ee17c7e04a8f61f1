// ── Emulated device stacks ──

use serde::{Deserialize, Serialize};

use super::bgp::BgpRouter;

/// An emulated device hosted on one test port.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Device {
    pub name: Option<String>,
    /// Name of the port this device lives on.
    pub container_port: String,
    pub ethernets: Vec<Ethernet>,
    pub bgp: Option<BgpRouter>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Ethernet {
    pub name: Option<String>,
    pub mac: String,
    pub mtu: u32,
    pub ipv4_addresses: Vec<Ipv4Interface>,
    pub macsec: Option<Macsec>,
}

impl Default for Ethernet {
    fn default() -> Self {
        Self {
            name: None,
            mac: "00:00:00:00:00:01".into(),
            mtu: 1500,
            ipv4_addresses: Vec::new(),
            macsec: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Ipv4Interface {
    pub name: Option<String>,
    pub address: String,
    pub gateway: String,
    pub prefix: u32,
}

impl Default for Ipv4Interface {
    fn default() -> Self {
        Self {
            name: None,
            address: "0.0.0.0".into(),
            gateway: "0.0.0.0".into(),
            prefix: 24,
        }
    }
}

/// MACsec secure channel on an ethernet interface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Macsec {
    pub name: Option<String>,
    /// Cipher suite option identifier, e.g. `gcm-aes-256`.
    pub cipher_suite: String,
}

impl Default for Macsec {
    fn default() -> Self {
        Self {
            name: None,
            cipher_suite: "gcm-aes-128".into(),
        }
    }
}
