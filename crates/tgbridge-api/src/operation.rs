// ── Resource operation vocabulary ──
//
// The unit of work a resource repository consumes. Every value that
// crosses this boundary is drawn from a closed vocabulary: resource kinds,
// attribute keys, and device tokens are enums or `&'static str` tables,
// never free-form attribute names assembled at the transport layer.

use std::fmt;

use indexmap::IndexMap;
use serde::{Serialize, Serializer};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoStaticStr};

// ── ResourceKind ────────────────────────────────────────────────────

/// Kind of appliance resource an operation targets.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, AsRefStr, EnumIter, EnumString,
)]
pub enum ResourceKind {
    #[strum(serialize = "vport")]
    #[serde(rename = "vport")]
    Vport,
    #[strum(serialize = "topology")]
    #[serde(rename = "topology")]
    Topology,
    #[strum(serialize = "deviceGroup")]
    #[serde(rename = "deviceGroup")]
    DeviceGroup,
    #[strum(serialize = "ethernet")]
    #[serde(rename = "ethernet")]
    Ethernet,
    #[strum(serialize = "ipv4")]
    #[serde(rename = "ipv4")]
    Ipv4,
    #[strum(serialize = "bgpIpv4Peer")]
    #[serde(rename = "bgpIpv4Peer")]
    BgpPeer,
    #[strum(serialize = "networkGroup")]
    #[serde(rename = "networkGroup")]
    NetworkGroup,
    #[strum(serialize = "ipv4PrefixPools")]
    #[serde(rename = "ipv4PrefixPools")]
    PrefixPool,
    #[strum(serialize = "bgpAsPathSegmentList")]
    #[serde(rename = "bgpAsPathSegmentList")]
    AsPathSegment,
    #[strum(serialize = "bgpCommunitiesList")]
    #[serde(rename = "bgpCommunitiesList")]
    Community,
    #[strum(serialize = "macsec")]
    #[serde(rename = "macsec")]
    Macsec,
    #[strum(serialize = "trafficItem")]
    #[serde(rename = "trafficItem")]
    TrafficItem,
}

// ── Attribute ───────────────────────────────────────────────────────

/// Closed set of attribute keys a resource payload may carry.
///
/// The string form is the appliance's attribute name. Address-pool keys are
/// reached through the option tables in `tgbridge-core`, which parse the
/// resolved token back into this enum so an unknown attribute name is
/// caught at translation time.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr, EnumIter, EnumString, IntoStaticStr,
)]
#[strum(serialize_all = "camelCase")]
pub enum Attribute {
    Name,
    Location,
    ClearOwnership,
    Vports,
    RouterId,
    Mac,
    Mtu,
    Address,
    GatewayIp,
    Prefix,
    DutIp,
    PeerType,
    LocalAs,
    Peer,
    NetworkAddress,
    PrefixLength,
    NumberOfAddresses,
    PrefixAddrStep,
    Origin,
    AsSetMode,
    SegmentType,
    AsNumbers,
    CommunityType,
    AsNumber,
    LastTwoOctets,
    CipherSuite,
    Sources,
    Destinations,
    FrameSize,
    Rate,
    TransmitMode,
    FrameCount,
    LatencyMode,
    Stack,
    CaptureEnabled,
    CaptureName,
    CaptureFormat,
}

impl Attribute {
    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

impl Serialize for Attribute {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

// ── AttributeValue ──────────────────────────────────────────────────

/// A resolved attribute value.
///
/// `Token` holds a device token drawn from a static option table; the
/// other variants carry literal values passed through from the abstract
/// configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Token(&'static str),
    Text(String),
    Int(u64),
    Bool(bool),
    List(Vec<AttributeValue>),
}

impl AttributeValue {
    pub fn as_token(&self) -> Option<&'static str> {
        match self {
            Self::Token(t) => Some(*t),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s.as_str()),
            Self::Token(t) => Some(*t),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<u64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Build a `List` of `Text` values.
    pub fn text_list<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::List(items.into_iter().map(|s| Self::Text(s.into())).collect())
    }
}

impl From<&'static str> for AttributeValue {
    fn from(token: &'static str) -> Self {
        Self::Token(token)
    }
}

impl From<String> for AttributeValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<u64> for AttributeValue {
    fn from(i: u64) -> Self {
        Self::Int(i)
    }
}

impl From<u32> for AttributeValue {
    fn from(i: u32) -> Self {
        Self::Int(u64::from(i))
    }
}

impl From<bool> for AttributeValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

// ── Payload ─────────────────────────────────────────────────────────

/// Insertion-ordered attribute map carried by a resource operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Payload(IndexMap<Attribute, AttributeValue>);

impl Payload {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an attribute, returning the previous value if any.
    pub fn insert(
        &mut self,
        key: Attribute,
        value: impl Into<AttributeValue>,
    ) -> Option<AttributeValue> {
        self.0.insert(key, value.into())
    }

    pub fn get(&self, key: Attribute) -> Option<&AttributeValue> {
        self.0.get(&key)
    }

    pub fn contains(&self, key: Attribute) -> bool {
        self.0.contains_key(&key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Attribute, &AttributeValue)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Overlay `other` on top of this payload (update semantics).
    pub fn merge(&mut self, other: &Payload) {
        for (key, value) in other.iter() {
            self.0.insert(*key, value.clone());
        }
    }
}

// ── ResourcePath ────────────────────────────────────────────────────

/// One `kind[name]` step of a resource path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathSegment {
    pub kind: ResourceKind,
    pub name: String,
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.kind, self.name)
    }
}

/// Location of a resource in the appliance's containment tree.
///
/// Rendered as `topology[east]/deviceGroup[east]/ethernet[east-eth]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourcePath {
    ancestors: Vec<PathSegment>,
    leaf: PathSegment,
}

impl ResourcePath {
    /// A top-level resource with no parent.
    pub fn root(kind: ResourceKind, name: impl Into<String>) -> Self {
        Self {
            ancestors: Vec::new(),
            leaf: PathSegment {
                kind,
                name: name.into(),
            },
        }
    }

    /// A resource nested directly under `self`.
    pub fn child(&self, kind: ResourceKind, name: impl Into<String>) -> Self {
        let mut ancestors = self.ancestors.clone();
        ancestors.push(self.leaf.clone());
        Self {
            ancestors,
            leaf: PathSegment {
                kind,
                name: name.into(),
            },
        }
    }

    /// The enclosing resource, or `None` for a root.
    pub fn parent(&self) -> Option<Self> {
        let mut ancestors = self.ancestors.clone();
        let leaf = ancestors.pop()?;
        Some(Self { ancestors, leaf })
    }

    pub fn is_root(&self) -> bool {
        self.ancestors.is_empty()
    }

    pub fn kind(&self) -> ResourceKind {
        self.leaf.kind
    }

    pub fn name(&self) -> &str {
        &self.leaf.name
    }

    pub fn depth(&self) -> usize {
        self.ancestors.len() + 1
    }

    /// `true` if `self` is nested (at any depth) under `other`.
    pub fn is_descendant_of(&self, other: &ResourcePath) -> bool {
        let depth = other.depth();
        if self.depth() <= depth {
            return false;
        }
        self.segments().take(depth).eq(other.segments())
    }

    pub fn segments(&self) -> impl Iterator<Item = &PathSegment> {
        self.ancestors.iter().chain(std::iter::once(&self.leaf))
    }
}

impl fmt::Display for ResourcePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

impl Serialize for ResourcePath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

// ── Origin ──────────────────────────────────────────────────────────

/// Kind of abstract-configuration entity that produced an operation.
///
/// Also the namespace tag for name registration and default naming
/// (`port-1`, `bgp-peer-2`, ...).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, AsRefStr, EnumIter, EnumString,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum EntityKind {
    Port,
    Device,
    Ethernet,
    Ipv4,
    BgpPeer,
    RouteRange,
    Macsec,
    Flow,
    Capture,
}

/// Back-reference from an operation to the abstract entity it came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct EntityRef {
    pub kind: EntityKind,
    pub name: String,
}

impl EntityRef {
    pub fn new(kind: EntityKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}'", self.kind, self.name)
    }
}

// ── ResourceOperation ───────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, AsRefStr)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Create,
    Update,
    Delete,
}

/// One create/update/delete against one appliance resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceOperation {
    pub action: OperationKind,
    pub path: ResourcePath,
    pub payload: Payload,
    pub origin: EntityRef,
}

impl ResourceOperation {
    pub fn create(path: ResourcePath, origin: EntityRef) -> Self {
        Self::new(OperationKind::Create, path, origin)
    }

    pub fn update(path: ResourcePath, origin: EntityRef) -> Self {
        Self::new(OperationKind::Update, path, origin)
    }

    pub fn delete(path: ResourcePath, origin: EntityRef) -> Self {
        Self::new(OperationKind::Delete, path, origin)
    }

    fn new(action: OperationKind, path: ResourcePath, origin: EntityRef) -> Self {
        Self {
            action,
            path,
            payload: Payload::new(),
            origin,
        }
    }

    /// Builder-style attribute insert.
    #[must_use]
    pub fn with(mut self, key: Attribute, value: impl Into<AttributeValue>) -> Self {
        self.payload.insert(key, value);
        self
    }

    pub fn kind(&self) -> ResourceKind {
        self.path.kind()
    }
}

impl fmt::Display for ResourceOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.action, self.path)
    }
}
