// ── Config translator ──
//
// Walks an `AbstractConfig` and emits the ordered resource operations that
// build it on the appliance. Order is fixed: ports, then devices with their
// nested layers, then flows, then captures. A parent resource is always
// created before anything nested under it, and the whole translation fails
// on the first error with no partial output.

use std::collections::HashMap;

use tracing::debug;

use tgbridge_api::{
    Attribute, AttributeValue, EntityKind, EntityRef, ResourceKind, ResourceOperation,
    ResourcePath,
};

use crate::error::TranslationError;
use crate::mapper::{self, OptionFamily};
use crate::model::{
    AbstractConfig, AddressPool, BgpPeer, Capture, Device, Ethernet, Flow, Port, RouteRange,
    explicit_name,
};
use crate::registry::NameRegistry;

/// Entity kinds a flow endpoint may name.
const ENDPOINT_KINDS: &[EntityKind] = &[
    EntityKind::Port,
    EntityKind::Device,
    EntityKind::Ipv4,
    EntityKind::RouteRange,
];

const TRANSMIT_CONTINUOUS: &str = "continuous";
const TRANSMIT_FIXED_COUNT: &str = "fixedFrameCount";

/// Translate `config` into an ordered list of resource operations.
pub fn translate(config: &AbstractConfig) -> Result<Vec<ResourceOperation>, TranslationError> {
    let mut translator = Translator {
        config,
        registry: NameRegistry::with_reserved(explicit_names(config)),
        ops: Vec::new(),
    };

    for port in &config.ports {
        translator.port(port)?;
    }
    for device in &config.devices {
        translator.device(device)?;
    }
    for flow in &config.flows {
        translator.flow(flow)?;
    }
    for capture in &config.captures {
        translator.capture(capture)?;
    }

    debug!(
        operations = translator.ops.len(),
        names = translator.registry.len(),
        "translated configuration"
    );
    Ok(translator.ops)
}

/// Every non-empty explicit name in the submission, in visit order.
fn explicit_names(config: &AbstractConfig) -> Vec<&str> {
    let mut names = Vec::new();
    names.extend(config.ports.iter().filter_map(|p| explicit_name(p.name.as_ref())));

    for device in &config.devices {
        names.extend(explicit_name(device.name.as_ref()));
        for eth in &device.ethernets {
            names.extend(explicit_name(eth.name.as_ref()));
            names.extend(eth.ipv4_addresses.iter().filter_map(|ip| explicit_name(ip.name.as_ref())));
            if let Some(macsec) = &eth.macsec {
                names.extend(explicit_name(macsec.name.as_ref()));
            }
        }
        let peers = device
            .bgp
            .iter()
            .flat_map(|bgp| &bgp.interfaces)
            .flat_map(|iface| &iface.peers);
        for peer in peers {
            names.extend(explicit_name(peer.name.as_ref()));
            names.extend(peer.v4_routes.iter().filter_map(|r| explicit_name(r.name.as_ref())));
        }
    }

    names.extend(config.flows.iter().filter_map(|f| explicit_name(f.name.as_ref())));
    names.extend(config.captures.iter().filter_map(|c| explicit_name(c.name.as_ref())));
    names
}

struct Translator<'a> {
    config: &'a AbstractConfig,
    registry: NameRegistry,
    ops: Vec<ResourceOperation>,
}

impl Translator<'_> {
    // ── Ports ────────────────────────────────────────────────────────

    fn port(&mut self, port: &Port) -> Result<(), TranslationError> {
        let name = self.registry.assign(port.name.as_ref(), EntityKind::Port)?;

        let mut op = ResourceOperation::create(
            ResourcePath::root(ResourceKind::Vport, &name),
            EntityRef::new(EntityKind::Port, &name),
        )
        .with(Attribute::Name, name.clone());
        if let Some(location) = &port.location {
            op = op.with(Attribute::Location, location.clone());
        }
        if self.config.options.location_preemption {
            op = op.with(Attribute::ClearOwnership, true);
        }
        self.ops.push(op);
        Ok(())
    }

    // ── Devices ──────────────────────────────────────────────────────

    fn device(&mut self, device: &Device) -> Result<(), TranslationError> {
        let name = self.registry.assign(device.name.as_ref(), EntityKind::Device)?;
        let origin = EntityRef::new(EntityKind::Device, &name);
        self.expect_reference(&origin, &device.container_port, &[EntityKind::Port])?;

        let topology = ResourcePath::root(ResourceKind::Topology, &name);
        self.ops.push(
            ResourceOperation::create(topology.clone(), origin.clone())
                .with(Attribute::Name, name.clone())
                .with(
                    Attribute::Vports,
                    AttributeValue::text_list([device.container_port.as_str()]),
                ),
        );

        let group = topology.child(ResourceKind::DeviceGroup, &name);
        let mut op = ResourceOperation::create(group.clone(), origin.clone())
            .with(Attribute::Name, name.clone());
        if let Some(bgp) = &device.bgp {
            op = op.with(Attribute::RouterId, bgp.router_id.clone());
        }
        self.ops.push(op);

        // ipv4 name -> path, for binding BGP interfaces on this device only.
        let mut ipv4_paths = HashMap::new();
        let mut eth_paths = Vec::with_capacity(device.ethernets.len());
        for eth in &device.ethernets {
            let path = self.ethernet(&group, eth, &mut ipv4_paths)?;
            eth_paths.push(path);
        }

        if let Some(bgp) = &device.bgp {
            for iface in &bgp.interfaces {
                let Some(ipv4) = ipv4_paths.get(&iface.ipv4_name) else {
                    return Err(TranslationError::UnresolvedReference {
                        entity: origin,
                        reference: iface.ipv4_name.clone(),
                        expected: "ipv4 interface on the same device".into(),
                    });
                };
                for peer in &iface.peers {
                    self.bgp_peer(&group, ipv4, peer)?;
                }
            }
        }

        for (eth, path) in device.ethernets.iter().zip(&eth_paths) {
            self.macsec(path, eth)?;
        }
        Ok(())
    }

    fn ethernet(
        &mut self,
        group: &ResourcePath,
        eth: &Ethernet,
        ipv4_paths: &mut HashMap<String, ResourcePath>,
    ) -> Result<ResourcePath, TranslationError> {
        let name = self.registry.assign(eth.name.as_ref(), EntityKind::Ethernet)?;
        let path = group.child(ResourceKind::Ethernet, &name);
        self.ops.push(
            ResourceOperation::create(path.clone(), EntityRef::new(EntityKind::Ethernet, &name))
                .with(Attribute::Name, name.clone())
                .with(Attribute::Mac, eth.mac.clone())
                .with(Attribute::Mtu, eth.mtu),
        );

        for ip in &eth.ipv4_addresses {
            let ip_name = self.registry.assign(ip.name.as_ref(), EntityKind::Ipv4)?;
            let ip_path = path.child(ResourceKind::Ipv4, &ip_name);
            self.ops.push(
                ResourceOperation::create(ip_path.clone(), EntityRef::new(EntityKind::Ipv4, &ip_name))
                    .with(Attribute::Name, ip_name.clone())
                    .with(Attribute::Address, ip.address.clone())
                    .with(Attribute::GatewayIp, ip.gateway.clone())
                    .with(Attribute::Prefix, ip.prefix),
            );
            ipv4_paths.insert(ip_name, ip_path);
        }
        Ok(path)
    }

    fn macsec(&mut self, eth_path: &ResourcePath, eth: &Ethernet) -> Result<(), TranslationError> {
        let Some(macsec) = &eth.macsec else {
            return Ok(());
        };
        let name = self.registry.assign(macsec.name.as_ref(), EntityKind::Macsec)?;
        let origin = EntityRef::new(EntityKind::Macsec, &name);
        let cipher = option(&origin, OptionFamily::CipherSuite, &macsec.cipher_suite)?;

        self.ops.push(
            ResourceOperation::create(eth_path.child(ResourceKind::Macsec, &name), origin)
                .with(Attribute::Name, name.clone())
                .with(Attribute::CipherSuite, cipher),
        );
        Ok(())
    }

    // ── BGP ──────────────────────────────────────────────────────────

    fn bgp_peer(
        &mut self,
        group: &ResourcePath,
        ipv4: &ResourcePath,
        peer: &BgpPeer,
    ) -> Result<(), TranslationError> {
        let name = self.registry.assign(peer.name.as_ref(), EntityKind::BgpPeer)?;
        let origin = EntityRef::new(EntityKind::BgpPeer, &name);
        let peer_type = option(&origin, OptionFamily::PeerType, &peer.as_type)?;

        self.ops.push(
            ResourceOperation::create(ipv4.child(ResourceKind::BgpPeer, &name), origin)
                .with(Attribute::Name, name.clone())
                .with(Attribute::DutIp, peer.peer_address.clone())
                .with(Attribute::PeerType, peer_type)
                .with(Attribute::LocalAs, peer.as_number),
        );

        for route in &peer.v4_routes {
            self.route_range(group, &name, route)?;
        }
        Ok(())
    }

    fn route_range(
        &mut self,
        group: &ResourcePath,
        peer: &str,
        route: &RouteRange,
    ) -> Result<(), TranslationError> {
        let name = self.registry.assign(route.name.as_ref(), EntityKind::RouteRange)?;
        let origin = EntityRef::new(EntityKind::RouteRange, &name);
        let path = group.child(ResourceKind::NetworkGroup, &name);

        let mut op = ResourceOperation::create(path.clone(), origin.clone())
            .with(Attribute::Name, name.clone())
            .with(Attribute::Peer, peer.to_owned());
        if let Some(origin_id) = &route.origin {
            op = op.with(
                Attribute::Origin,
                option(&origin, OptionFamily::RouteOrigin, origin_id)?,
            );
        }
        if let Some(as_path) = &route.as_path {
            op = op.with(
                Attribute::AsSetMode,
                option(&origin, OptionFamily::AsPathMode, &as_path.as_set_mode)?,
            );
        }
        self.ops.push(op);

        for (i, pool) in route.addresses.iter().enumerate() {
            let op = address_pool(
                &origin,
                path.child(ResourceKind::PrefixPool, format!("{name}-pool-{}", i + 1)),
                pool,
            )?;
            self.ops.push(op);
        }

        let segments = route.as_path.iter().flat_map(|p| &p.segments);
        for (i, segment) in segments.enumerate() {
            let segment_type = option(&origin, OptionFamily::AsPathSegmentType, &segment.segment_type)?;
            self.ops.push(
                ResourceOperation::create(
                    path.child(ResourceKind::AsPathSegment, format!("{name}-segment-{}", i + 1)),
                    origin.clone(),
                )
                .with(Attribute::SegmentType, segment_type)
                .with(
                    Attribute::AsNumbers,
                    AttributeValue::List(
                        segment.as_numbers.iter().map(|n| AttributeValue::from(*n)).collect(),
                    ),
                ),
            );
        }

        for (i, community) in route.communities.iter().enumerate() {
            let community_type =
                option(&origin, OptionFamily::CommunityType, &community.community_type)?;
            self.ops.push(
                ResourceOperation::create(
                    path.child(ResourceKind::Community, format!("{name}-community-{}", i + 1)),
                    origin.clone(),
                )
                .with(Attribute::CommunityType, community_type)
                .with(Attribute::AsNumber, community.as_number)
                .with(Attribute::LastTwoOctets, community.as_custom),
            );
        }
        Ok(())
    }

    // ── Flows ────────────────────────────────────────────────────────

    fn flow(&mut self, flow: &Flow) -> Result<(), TranslationError> {
        let name = self.registry.assign(flow.name.as_ref(), EntityKind::Flow)?;
        let origin = EntityRef::new(EntityKind::Flow, &name);

        for endpoint in flow.tx_names.iter().chain(&flow.rx_names) {
            self.expect_reference(&origin, endpoint, ENDPOINT_KINDS)?;
        }

        let mut op = ResourceOperation::create(
            ResourcePath::root(ResourceKind::TrafficItem, &name),
            origin.clone(),
        )
        .with(Attribute::Name, name.clone())
        .with(Attribute::Sources, AttributeValue::text_list(flow.tx_names.iter().cloned()))
        .with(
            Attribute::Destinations,
            AttributeValue::text_list(flow.rx_names.iter().cloned()),
        )
        .with(Attribute::FrameSize, flow.size);

        if let Some(rate) = flow.rate_pps {
            op = op.with(Attribute::Rate, rate);
        }
        op = match flow.packets {
            Some(count) => op
                .with(Attribute::TransmitMode, TRANSMIT_FIXED_COUNT)
                .with(Attribute::FrameCount, count),
            None => op.with(Attribute::TransmitMode, TRANSMIT_CONTINUOUS),
        };
        if let Some(latency) = &flow.latency {
            op = op.with(
                Attribute::LatencyMode,
                option(&origin, OptionFamily::LatencyMode, &latency.mode)?,
            );
        }
        if !flow.headers.is_empty() {
            op = op.with(Attribute::Stack, AttributeValue::text_list(flow.headers.iter().cloned()));
        }
        self.ops.push(op);
        Ok(())
    }

    // ── Captures ─────────────────────────────────────────────────────

    fn capture(&mut self, capture: &Capture) -> Result<(), TranslationError> {
        let name = self.registry.assign(capture.name.as_ref(), EntityKind::Capture)?;
        let origin = EntityRef::new(EntityKind::Capture, &name);
        let format = option(&origin, OptionFamily::CaptureFormat, &capture.format)?;

        for port in &capture.port_names {
            self.expect_reference(&origin, port, &[EntityKind::Port])?;
            self.ops.push(
                ResourceOperation::update(ResourcePath::root(ResourceKind::Vport, port), origin.clone())
                    .with(Attribute::CaptureEnabled, true)
                    .with(Attribute::CaptureName, name.clone())
                    .with(Attribute::CaptureFormat, format),
            );
        }
        Ok(())
    }

    // ── Helpers ──────────────────────────────────────────────────────

    /// `reference` must already be registered as one of `expected`.
    fn expect_reference(
        &self,
        entity: &EntityRef,
        reference: &str,
        expected: &[EntityKind],
    ) -> Result<(), TranslationError> {
        match self.registry.lookup(reference) {
            Some(kind) if expected.contains(&kind) => Ok(()),
            _ => Err(TranslationError::UnresolvedReference {
                entity: entity.clone(),
                reference: reference.to_owned(),
                expected: expected
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(" or "),
            }),
        }
    }
}

fn option(
    entity: &EntityRef,
    family: OptionFamily,
    id: &str,
) -> Result<&'static str, TranslationError> {
    mapper::resolve(family, id).map_err(|err| TranslationError::option(entity, err))
}

/// Pool attribute keys come from the shared address-pool table and are
/// parsed back into the attribute vocabulary.
fn pool_attribute(entity: &EntityRef, field: &str) -> Result<Attribute, TranslationError> {
    let token = option(entity, OptionFamily::AddressPoolField, field)?;
    token
        .parse::<Attribute>()
        .map_err(|_| TranslationError::UnknownAttribute {
            entity: entity.clone(),
            token,
        })
}

fn address_pool(
    origin: &EntityRef,
    path: ResourcePath,
    pool: &AddressPool,
) -> Result<ResourceOperation, TranslationError> {
    Ok(ResourceOperation::create(path, origin.clone())
        .with(pool_attribute(origin, "address")?, pool.address.clone())
        .with(pool_attribute(origin, "prefix")?, pool.prefix)
        .with(pool_attribute(origin, "count")?, pool.count)
        .with(pool_attribute(origin, "step")?, pool.step))
}
