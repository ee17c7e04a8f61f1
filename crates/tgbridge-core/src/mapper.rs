// ── Option mapping tables ──
//
// Abstract protocol option identifiers -> appliance attribute tokens, one
// closed table per option family. Tables are immutable statics; the lookup
// index is built once on first use and shared by every translation.

use std::collections::HashMap;
use std::sync::LazyLock;

use serde::Serialize;
use strum::{AsRefStr, Display, EnumIter, IntoEnumIterator};

use crate::error::MappingError;

/// A family of abstract options sharing one mapping table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, AsRefStr, EnumIter)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum OptionFamily {
    /// How the local AS is inserted into advertised AS paths.
    AsPathMode,
    AsPathSegmentType,
    /// Address-pool fields; resolves to attribute *names*, shared by every
    /// protocol that generates address pools.
    AddressPoolField,
    CipherSuite,
    CommunityType,
    PeerType,
    RouteOrigin,
    LatencyMode,
    CaptureFormat,
}

/// One family's identifier -> token table.
#[derive(Debug, Clone, Copy)]
pub struct OptionMapping {
    pub family: OptionFamily,
    pub entries: &'static [(&'static str, &'static str)],
}

const AS_PATH_MODE: &[(&str, &str)] = &[
    ("do-not-include-local-as", "dontincludelocalas"),
    ("include-as-seq", "includelocalasasasseq"),
    ("include-as-set", "includelocalasasasset"),
    ("include-as-confed-seq", "includelocalasasasseqconfederation"),
    ("include-as-confed-set", "includelocalasasassetconfederation"),
    ("prepend-to-first-segment", "prependlocalastofirstsegment"),
];

const AS_PATH_SEGMENT_TYPE: &[(&str, &str)] = &[
    ("as-seq", "asseq"),
    ("as-set", "asset"),
    ("as-confed-seq", "asseqconfederation"),
    ("as-confed-set", "assetconfederation"),
];

const ADDRESS_POOL_FIELD: &[(&str, &str)] = &[
    ("address", "networkAddress"),
    ("prefix", "prefixLength"),
    ("count", "numberOfAddresses"),
    ("step", "prefixAddrStep"),
];

const CIPHER_SUITE: &[(&str, &str)] = &[
    ("gcm-aes-128", "aes128"),
    ("gcm-aes-256", "aes256"),
    ("gcm-aes-xpn-128", "aesxpn128"),
    ("gcm-aes-xpn-256", "aesxpn256"),
];

const COMMUNITY_TYPE: &[(&str, &str)] = &[
    ("manual-as-number", "manual"),
    ("no-export", "noexport"),
    ("no-advertised", "noadvertised"),
    ("no-export-subconfed", "noexport_subconfed"),
    ("llgr-stale", "llgr_stale"),
    ("no-llgr", "no_llgr"),
];

const PEER_TYPE: &[(&str, &str)] = &[("ibgp", "internal"), ("ebgp", "external")];

const ROUTE_ORIGIN: &[(&str, &str)] = &[
    ("igp", "igp"),
    ("egp", "egp"),
    ("incomplete", "incomplete"),
];

const LATENCY_MODE: &[(&str, &str)] = &[
    ("store-forward", "storeForward"),
    ("cut-through", "cutThrough"),
];

const CAPTURE_FORMAT: &[(&str, &str)] = &[("pcap", "pcap"), ("pcapng", "pcapng")];

/// Every family's table.
pub static MAPPINGS: &[OptionMapping] = &[
    OptionMapping {
        family: OptionFamily::AsPathMode,
        entries: AS_PATH_MODE,
    },
    OptionMapping {
        family: OptionFamily::AsPathSegmentType,
        entries: AS_PATH_SEGMENT_TYPE,
    },
    OptionMapping {
        family: OptionFamily::AddressPoolField,
        entries: ADDRESS_POOL_FIELD,
    },
    OptionMapping {
        family: OptionFamily::CipherSuite,
        entries: CIPHER_SUITE,
    },
    OptionMapping {
        family: OptionFamily::CommunityType,
        entries: COMMUNITY_TYPE,
    },
    OptionMapping {
        family: OptionFamily::PeerType,
        entries: PEER_TYPE,
    },
    OptionMapping {
        family: OptionFamily::RouteOrigin,
        entries: ROUTE_ORIGIN,
    },
    OptionMapping {
        family: OptionFamily::LatencyMode,
        entries: LATENCY_MODE,
    },
    OptionMapping {
        family: OptionFamily::CaptureFormat,
        entries: CAPTURE_FORMAT,
    },
];

type Index = HashMap<OptionFamily, HashMap<&'static str, &'static str>>;

static INDEX: LazyLock<Index> = LazyLock::new(|| {
    MAPPINGS
        .iter()
        .map(|m| (m.family, m.entries.iter().copied().collect()))
        .collect()
});

/// Resolve an abstract option identifier to its device token.
///
/// Matching is exact and case-sensitive. An identifier outside the family's
/// table is always an error; there is no fallback token.
pub fn resolve(family: OptionFamily, option: &str) -> Result<&'static str, MappingError> {
    INDEX
        .get(&family)
        .and_then(|table| table.get(option))
        .copied()
        .ok_or_else(|| MappingError::UnknownOption {
            family,
            option: option.to_owned(),
        })
}

/// The mapping table for `family`.
pub fn mapping(family: OptionFamily) -> Option<&'static OptionMapping> {
    MAPPINGS.iter().find(|m| m.family == family)
}

/// Identifiers supported by `family`, in table order.
pub fn options(family: OptionFamily) -> impl Iterator<Item = &'static str> {
    mapping(family)
        .into_iter()
        .flat_map(|m| m.entries.iter().map(|(id, _)| *id))
}

pub fn families() -> impl Iterator<Item = OptionFamily> {
    OptionFamily::iter()
}
