//! The per-packet state machine.
//!
//! Classifies each received packet, applies source policy and flood
//! suppression, resolves the MAC, and builds the response according to
//! RFC 2131. The engine owns no sockets: it consumes a parsed packet and
//! produces a reply plus the facts the transmitter needs to route it, so
//! the whole decision surface is testable without the network.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use eui48::MacAddress;

use protocol::*;

use backend::{BackendError, Definition};
use cache::DefinitionCache;
use config::Config;
use hooks::{Hooks, Verdict};
use resolver::{Resolution, Resolver};
use suspend::{self, SourceKey, SourceState, Suspender};

/// Which listening port a packet arrived on; PXE traffic follows the same
/// rules but answers from the proxy port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortClass {
    Server,
    Proxy,
}

/// The classified request, with REQUEST refined into its RFC 2131 §4.3.2
/// sub-states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketType {
    Discover,
    RequestSelecting,
    RequestInitReboot,
    RequestRenew,
    RequestRebind,
    Decline,
    Release,
    Inform,
}

impl fmt::Display for PacketType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use self::PacketType::*;
        match self {
            Discover => write!(f, "DISCOVER"),
            RequestSelecting => write!(f, "REQUEST:SELECTING"),
            RequestInitReboot => write!(f, "REQUEST:INIT-REBOOT"),
            RequestRenew => write!(f, "REQUEST:RENEW"),
            RequestRebind => write!(f, "REQUEST:REBIND"),
            Decline => write!(f, "DECLINE"),
            Release => write!(f, "RELEASE"),
            Inform => write!(f, "INFORM"),
        }
    }
}

/// The commonly needed request facts, extracted once and passed to the
/// hooks and the transmitter.
#[derive(Debug, Clone)]
pub struct RequestMeta {
    pub method: PacketType,
    pub mac: MacAddress,
    pub ciaddr: Option<Ipv4Addr>,
    pub giaddr: Option<Ipv4Addr>,
    pub port: PortClass,
}

/// A finished response and the facts the transmitter routes by.
#[derive(Debug)]
pub struct Reply {
    pub packet: Packet,
    pub method: PacketType,
    /// Where the request came from.
    pub source: SocketAddr,
    /// Which port class it arrived on.
    pub port: PortClass,
}

pub struct Engine {
    config: Arc<Config>,
    resolver: Resolver,
    suspender: Arc<Suspender>,
    hooks: Arc<dyn Hooks>,
}

impl Engine {
    pub fn new(
        config: Arc<Config>,
        cache: Arc<DefinitionCache>,
        suspender: Arc<Suspender>,
        hooks: Arc<dyn Hooks>,
    ) -> Self {
        Engine {
            config,
            resolver: Resolver::new(cache, hooks.to_owned()),
            suspender,
            hooks,
        }
    }

    /// Flushes the cache and reinitialises the backend; called on reload.
    pub fn reinitialise(&self) -> Result<(), BackendError> {
        self.resolver.reinitialise()
    }

    /// Scores a source that sent something unparseable.
    pub fn penalise_source(&self, source: SocketAddr) {
        let relay = match source.ip() {
            IpAddr::V4(ip) if !ip.is_unspecified() => Some(ip),
            _ => None,
        };
        self.suspender.note(&suspend::source_key(None, relay));
    }

    /// Drives one packet through classification, policy, resolution, and
    /// response construction. `None` means silence.
    pub fn handle(&self, packet: Packet, source: SocketAddr, port: PortClass) -> Option<Reply> {
        let message_type = match packet.validate() {
            Ok(message_type) => message_type,
            Err(error) => {
                warn!("The request from {} is invalid: {}", source, error);
                let key =
                    suspend::source_key(Some(&packet.client_hardware_address), packet.giaddr());
                self.suspender.note(&key);
                return None;
            }
        };

        let source_unicast = match source.ip() {
            IpAddr::V4(ip) => !ip.is_unspecified() && !ip.is_broadcast(),
            IpAddr::V6(_) => false,
        };

        let method = match message_type {
            MessageType::DhcpDiscover => PacketType::Discover,
            MessageType::DhcpRequest => {
                let server_id = packet.options.ipv4(OPTION_SERVER_ID);
                let ciaddr = packet.ciaddr();
                let requested = packet.option_ipv4(OPTION_REQUESTED_IP);
                if server_id.is_some() && ciaddr.is_none() {
                    PacketType::RequestSelecting
                } else if server_id.is_none() && ciaddr.is_none() && requested.is_some() {
                    PacketType::RequestInitReboot
                } else if server_id.is_none() && ciaddr.is_some() && requested.is_none() {
                    if source_unicast {
                        PacketType::RequestRenew
                    } else {
                        PacketType::RequestRebind
                    }
                } else {
                    warn!(
                        "REQUEST ({:?}|{:?}|{:?}) from {} unhandled: packet not compliant with the DHCP spec",
                        server_id, ciaddr, requested, packet.client_hardware_address
                    );
                    return None;
                }
            }
            MessageType::DhcpDecline => PacketType::Decline,
            MessageType::DhcpRelease => PacketType::Release,
            MessageType::DhcpInform => PacketType::Inform,
            _ => {
                debug!("Ignoring {} from {}", message_type, source);
                return None;
            }
        };

        let meta = RequestMeta {
            method,
            mac: packet.client_hardware_address.to_owned(),
            ciaddr: packet.ciaddr(),
            giaddr: packet.giaddr(),
            port,
        };
        debug!("{} from {} via {}", method, meta.mac, source);

        /*
        RFC-independent source policy: relays must be enabled (and listed,
        when a list is configured); link-local traffic must be enabled
        unless it arrived on the proxy port.
        */
        if let Some(giaddr) = meta.giaddr {
            if !self.config.allow_relays {
                warn!(
                    "Request from {} ignored: relay support not enabled",
                    giaddr
                );
                return None;
            }
            if !self.config.allowed_relays.is_empty()
                && !self.config.allowed_relays.contains(&giaddr)
            {
                warn!("Request from {} ignored: relay not authorised", giaddr);
                return None;
            }
        } else if !self.config.allow_local && meta.port != PortClass::Proxy {
            debug!(
                "Request from {} ignored: link-local traffic not enabled",
                meta.mac
            );
            return None;
        }

        let key = suspend::source_key(Some(&meta.mac), meta.giaddr);
        match self.suspender.note(&key) {
            SourceState::Allowed => {}
            SourceState::Throttled => {
                debug!("{} is ignored for excessive activity", meta.mac);
                return None;
            }
            SourceState::Blocked => {
                debug!("{} is on cooldown", meta.mac);
                return None;
            }
        }

        match self.checked_filter(&packet, &meta) {
            Verdict::Accept => {}
            Verdict::Ignore => {
                debug!("Ignoring {} from {} per the filter hook", method, meta.mac);
                return None;
            }
            Verdict::Reject => {
                self.suspender
                    .block(&key, self.config.unauthorized_client_timeout);
                return None;
            }
        }

        match method {
            PacketType::Decline => {
                self.observe_decline(&packet, &meta);
                None
            }
            PacketType::Release => {
                self.observe_release(&packet, &meta);
                None
            }
            _ => self.respond(packet, meta, key, source),
        }
    }

    fn respond(
        &self,
        mut packet: Packet,
        meta: RequestMeta,
        key: SourceKey,
        source: SocketAddr,
    ) -> Option<Reply> {
        let resolution = match self.resolver.resolve(&packet, &meta) {
            Ok(resolution) => resolution,
            Err(error) => {
                error!(
                    "Lookup for {} failed: {}; dropping the request",
                    meta.mac, error
                );
                return None;
            }
        };

        match meta.method {
            PacketType::Discover => match resolution {
                Resolution::Known(definition) => {
                    if packet.options.contains(OPTION_RAPID_COMMIT) {
                        info!("{} from {} requested rapid commit", meta.method, meta.mac);
                        packet.transform_to_ack();
                        packet.force_option(OPTION_RAPID_COMMIT, Vec::new());
                    } else {
                        packet.transform_to_offer();
                    }
                    self.accept(packet, meta, definition, source, false)
                }
                Resolution::Unknown => {
                    // A DISCOVER is never NAKed, authoritative or not.
                    debug!("{} is unknown; staying silent", meta.mac);
                    self.suspender
                        .block(&key, self.config.unauthorized_client_timeout);
                    None
                }
            },

            PacketType::RequestSelecting => {
                if packet.options.ipv4(OPTION_SERVER_ID) != Some(self.config.server_ip) {
                    debug!("REQUEST from {} selects another server", meta.mac);
                    return None;
                }
                let requested = packet.option_ipv4(OPTION_REQUESTED_IP);
                match resolution {
                    Resolution::Known(definition) => {
                        if requested == Some(definition.ip) {
                            packet.transform_to_ack();
                            self.accept(packet, meta, definition, source, false)
                        } else {
                            info!(
                                "{} from {} for {:?}, but its assigned IP is {}",
                                meta.method, meta.mac, requested, definition.ip
                            );
                            self.reject(packet, meta, source)
                        }
                    }
                    Resolution::Unknown => {
                        if self.config.authoritative {
                            self.reject(packet, meta, source)
                        } else {
                            debug!("{} is unknown; staying silent", meta.mac);
                            None
                        }
                    }
                }
            }

            PacketType::RequestInitReboot
            | PacketType::RequestRenew
            | PacketType::RequestRebind => {
                if self.config.nak_renewals
                    && meta.port != PortClass::Proxy
                    && meta.method != PacketType::RequestInitReboot
                {
                    info!(
                        "NAKing {} from {}: renewals are disabled",
                        meta.method, meta.mac
                    );
                    return self.reject(packet, meta, source);
                }
                let claimed = match meta.method {
                    PacketType::RequestInitReboot => packet.option_ipv4(OPTION_REQUESTED_IP),
                    _ => meta.ciaddr,
                };
                match resolution {
                    Resolution::Known(definition) => {
                        if claimed == Some(definition.ip) {
                            packet.transform_to_ack();
                            self.accept(packet, meta, definition, source, false)
                        } else if self.config.authoritative {
                            info!(
                                "{} from {} for {:?}, but its assigned IP is {}",
                                meta.method, meta.mac, claimed, definition.ip
                            );
                            self.reject(packet, meta, source)
                        } else {
                            debug!(
                                "{} from {} claims {:?}; staying silent",
                                meta.method, meta.mac, claimed
                            );
                            None
                        }
                    }
                    Resolution::Unknown => {
                        if self.config.authoritative {
                            self.reject(packet, meta, source)
                        } else {
                            debug!("{} is unknown; staying silent", meta.mac);
                            None
                        }
                    }
                }
            }

            PacketType::Inform => match resolution {
                Resolution::Known(definition) => {
                    packet.transform_to_ack();
                    self.accept(packet, meta, definition, source, true)
                }
                Resolution::Unknown => {
                    debug!("INFORM from unknown {}; staying silent", meta.mac);
                    self.suspender
                        .block(&key, self.config.unauthorized_client_timeout);
                    None
                }
            },

            PacketType::Decline | PacketType::Release => None,
        }
    }

    /// Loads the definition into an OFFER/ACK shell, runs the load hook,
    /// and stamps the server identifier.
    fn accept(
        &self,
        mut packet: Packet,
        meta: RequestMeta,
        definition: Definition,
        source: SocketAddr,
        inform: bool,
    ) -> Option<Reply> {
        if inform {
            // An INFORM answer configures but does not assign.
            packet.your_ip_address = Ipv4Addr::new(0, 0, 0, 0);
        } else {
            packet.your_ip_address = definition.ip;
            self.load_option(
                &mut packet,
                OPTION_LEASE_TIME,
                &OptionValue::U32(definition.lease_time),
                &definition,
            );
            self.load_option(
                &mut packet,
                OPTION_RENEWAL_TIME,
                &OptionValue::U32(definition.renewal_time()),
                &definition,
            );
            self.load_option(
                &mut packet,
                OPTION_REBINDING_TIME,
                &OptionValue::U32(definition.rebinding_time()),
                &definition,
            );
        }

        if let Some(ref hostname) = definition.hostname {
            self.load_option(
                &mut packet,
                OPTION_HOSTNAME,
                &OptionValue::String(hostname.to_owned()),
                &definition,
            );
        }
        if !definition.gateways.is_empty() {
            self.load_option(
                &mut packet,
                OPTION_ROUTERS,
                &OptionValue::Ipv4List(definition.gateways.to_owned()),
                &definition,
            );
        }
        if let Some(subnet_mask) = definition.subnet_mask {
            self.load_option(
                &mut packet,
                OPTION_SUBNET_MASK,
                &OptionValue::Ipv4(subnet_mask),
                &definition,
            );
        }
        if let Some(broadcast_address) = definition.broadcast_address {
            self.load_option(
                &mut packet,
                OPTION_BROADCAST_ADDRESS,
                &OptionValue::Ipv4(broadcast_address),
                &definition,
            );
        }
        if let Some(ref domain_name) = definition.domain_name {
            self.load_option(
                &mut packet,
                OPTION_DOMAIN_NAME,
                &OptionValue::String(domain_name.to_owned()),
                &definition,
            );
        }
        if !definition.domain_name_servers.is_empty() {
            self.load_option(
                &mut packet,
                OPTION_DOMAIN_NAME_SERVERS,
                &OptionValue::Ipv4List(definition.domain_name_servers.to_owned()),
                &definition,
            );
        }
        if !definition.ntp_servers.is_empty() {
            self.load_option(
                &mut packet,
                OPTION_NTP_SERVERS,
                &OptionValue::Ipv4List(definition.ntp_servers.to_owned()),
                &definition,
            );
        }

        if packet.server_ip_address.is_unspecified() {
            packet.server_ip_address = self.config.server_ip;
        }
        if let Some(ref server_name) = self.config.server_name {
            if packet.server_name.iter().all(|byte| *byte == 0) {
                packet.server_name = server_name.as_bytes().to_vec();
            }
        }

        if !self.checked_load(&mut packet, &meta, &definition, source) {
            info!("Ignoring {} from {} per the load hook", meta.method, meta.mac);
            return None;
        }
        packet
            .options
            .set(OPTION_SERVER_ID, &OptionValue::Ipv4(self.config.server_ip));

        info!(
            "{} to {} for {} ({}:{})",
            packet
                .options
                .message_type()
                .unwrap_or(MessageType::Undefined),
            meta.mac,
            definition.ip,
            definition.subnet,
            definition.serial
        );
        Some(Reply {
            packet,
            method: meta.method,
            source,
            port: meta.port,
        })
    }

    fn reject(&self, mut packet: Packet, meta: RequestMeta, source: SocketAddr) -> Option<Reply> {
        packet.transform_to_nak();
        packet
            .options
            .set(OPTION_SERVER_ID, &OptionValue::Ipv4(self.config.server_ip));

        info!("DHCPNAK to {}", meta.mac);
        Some(Reply {
            packet,
            method: meta.method,
            source,
            port: meta.port,
        })
    }

    fn load_option(
        &self,
        packet: &mut Packet,
        code: u8,
        value: &OptionValue,
        definition: &Definition,
    ) {
        if !packet.options.set(code, value) {
            error!(
                "Invalid value for {}:{} option {}: {:?}",
                definition.subnet, definition.serial, code, value
            );
        }
    }

    fn observe_decline(&self, packet: &Packet, meta: &RequestMeta) {
        if packet.options.ipv4(OPTION_SERVER_ID) != Some(self.config.server_ip) {
            return;
        }
        let declined = packet.option_ipv4(OPTION_REQUESTED_IP);
        match self.resolver.resolve(packet, meta) {
            Ok(Resolution::Known(ref definition)) if declined == Some(definition.ip) => {
                error!(
                    "DECLINE from {} for {} on ({}:{}); the address may be in use elsewhere",
                    meta.mac, definition.ip, definition.subnet, definition.serial
                );
            }
            Ok(Resolution::Known(ref definition)) => {
                warn!(
                    "DECLINE from {} for {:?}, but its assigned IP is {}",
                    meta.mac, declined, definition.ip
                );
            }
            Ok(Resolution::Unknown) => {
                warn!(
                    "DECLINE from {} for {:?}, but the MAC is unknown",
                    meta.mac, declined
                );
            }
            Err(error) => {
                error!("Lookup for {} failed during DECLINE: {}", meta.mac, error);
            }
        }
    }

    fn observe_release(&self, packet: &Packet, meta: &RequestMeta) {
        if packet.options.ipv4(OPTION_SERVER_ID) != Some(self.config.server_ip) {
            return;
        }
        match self.resolver.resolve(packet, meta) {
            Ok(Resolution::Known(ref definition)) if meta.ciaddr == Some(definition.ip) => {
                info!("RELEASE from {} for {}", meta.mac, definition.ip);
            }
            _ => {
                warn!(
                    "RELEASE from {} for {:?}, but no assignment is known",
                    meta.mac, meta.ciaddr
                );
            }
        }
    }

    fn checked_filter(&self, packet: &Packet, meta: &RequestMeta) -> Verdict {
        match panic::catch_unwind(AssertUnwindSafe(|| self.hooks.filter(packet, meta))) {
            Ok(verdict) => verdict,
            Err(_) => {
                error!("filter hook panicked; rejecting {}", meta.mac);
                Verdict::Reject
            }
        }
    }

    fn checked_load(
        &self,
        response: &mut Packet,
        meta: &RequestMeta,
        definition: &Definition,
        source: SocketAddr,
    ) -> bool {
        match panic::catch_unwind(AssertUnwindSafe(|| {
            self.hooks.load(response, meta, definition, source)
        })) {
            Ok(proceed) => proceed,
            Err(_) => {
                error!("load hook panicked; suppressing the response to {}", meta.mac);
                false
            }
        }
    }
}
