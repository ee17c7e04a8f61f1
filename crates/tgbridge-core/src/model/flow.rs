// ── Traffic flows and captures ──

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Flow {
    pub name: Option<String>,
    /// Transmit endpoints: port names for port flows, device/interface/route
    /// names for device flows.
    pub tx_names: Vec<String>,
    pub rx_names: Vec<String>,
    pub latency: Option<Latency>,
    /// Fixed frame size in bytes.
    pub size: u32,
    /// Packets per second. `None` leaves the appliance default.
    pub rate_pps: Option<u64>,
    /// Fixed packet count. `None` transmits continuously.
    pub packets: Option<u64>,
    /// Raw header patterns, passed through untouched.
    pub headers: Vec<String>,
}

impl Default for Flow {
    fn default() -> Self {
        Self {
            name: None,
            tx_names: Vec::new(),
            rx_names: Vec::new(),
            latency: None,
            size: 64,
            rate_pps: None,
            packets: None,
            headers: Vec::new(),
        }
    }
}

/// Latency measurement request for a flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Latency {
    /// Latency mode option identifier: `store-forward` or `cut-through`.
    pub mode: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Capture {
    pub name: Option<String>,
    pub port_names: Vec<String>,
    /// Capture file format option identifier: `pcap` or `pcapng`.
    pub format: String,
}

impl Default for Capture {
    fn default() -> Self {
        Self {
            name: None,
            port_names: Vec::new(),
            format: "pcap".into(),
        }
    }
}
