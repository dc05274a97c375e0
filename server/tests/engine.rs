extern crate eui48;
extern crate protocol;
extern crate server;

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

use eui48::MacAddress;
use protocol::*;
use server::cache::DefinitionCache;
use server::netlink::{self, Destination};
use server::suspend::Suspender;
use server::{
    Backend, BackendError, Config, DefaultHooks, Definition, Engine, Hooks, PortClass, Reply,
    RequestMeta, Verdict,
};

struct FixedBackend(Vec<Definition>);

impl Backend for FixedBackend {
    fn lookup(&self, _mac: &MacAddress) -> Result<Vec<Definition>, BackendError> {
        Ok(self.0.to_owned())
    }
}

fn engine_with(definitions: Vec<Definition>, config: Config, hooks: Arc<dyn Hooks>) -> Engine {
    let backend: Arc<dyn Backend> = Arc::new(FixedBackend(definitions));
    let cache = Arc::new(DefinitionCache::new(backend, config.cache.to_owned()));
    let suspender = Arc::new(Suspender::new(
        config.enable_suspend,
        config.suspend_threshold,
    ));
    Engine::new(Arc::new(config), cache, suspender, hooks)
}

fn server_ip() -> Ipv4Addr {
    Ipv4Addr::new(192, 168, 0, 1)
}

fn known_definition() -> Definition {
    Definition::new(Ipv4Addr::new(192, 168, 0, 197), 14400, "lan", 1)
        .with_subnet_mask(Ipv4Addr::new(255, 255, 255, 0))
        .with_gateways(vec![Ipv4Addr::new(192, 168, 0, 1)])
        .with_domain_name_servers(vec![Ipv4Addr::new(192, 168, 0, 5)])
}

/// The fixed header of a BOOTREQUEST from aa:bb:cc:dd:ee:ff plus the
/// given options area.
fn raw_packet(options: &[u8]) -> Vec<u8> {
    let mut bytes = vec![0u8; 236];
    bytes[0] = 1;
    bytes[1] = 1;
    bytes[2] = 6;
    bytes[4..8].copy_from_slice(&[0x12, 0x34, 0x56, 0x78]);
    bytes[28..34].copy_from_slice(&[0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]);
    bytes.extend_from_slice(&[0x63, 0x82, 0x53, 0x63]);
    bytes.extend_from_slice(options);
    bytes
}

fn discover() -> Packet {
    let bytes = raw_packet(&[53, 1, 1, 55, 3, 1, 3, 6, 255]);
    Packet::from_bytes(&bytes).unwrap()
}

fn request_selecting(server_id: Ipv4Addr, requested: Ipv4Addr) -> Packet {
    let mut options = vec![53, 1, 3, 54, 4];
    options.extend_from_slice(&server_id.octets());
    options.extend_from_slice(&[50, 4]);
    options.extend_from_slice(&requested.octets());
    options.push(255);
    Packet::from_bytes(&raw_packet(&options)).unwrap()
}

fn request_renewing(ciaddr: Ipv4Addr) -> Packet {
    let mut bytes = raw_packet(&[53, 1, 3, 255]);
    bytes[12..16].copy_from_slice(&ciaddr.octets());
    Packet::from_bytes(&bytes).unwrap()
}

fn inform(ciaddr: Ipv4Addr) -> Packet {
    let mut bytes = raw_packet(&[53, 1, 8, 255]);
    bytes[12..16].copy_from_slice(&ciaddr.octets());
    Packet::from_bytes(&bytes).unwrap()
}

fn broadcast_source() -> SocketAddr {
    "0.0.0.0:68".parse().unwrap()
}

fn unicast_source(ip: Ipv4Addr) -> SocketAddr {
    SocketAddr::new(ip.into(), 68)
}

fn handle(engine: &Engine, packet: Packet) -> Option<Reply> {
    engine.handle(packet, broadcast_source(), PortClass::Server)
}

#[test]
fn known_mac_discover_yields_a_full_offer() {
    let engine = engine_with(
        vec![known_definition()],
        Config::new(server_ip()),
        Arc::new(DefaultHooks),
    );
    let reply = handle(&engine, discover()).expect("an OFFER");
    let packet = &reply.packet;

    assert_eq!(packet.operation_code, OperationCode::BootReply);
    assert_eq!(packet.options.message_type(), Some(MessageType::DhcpOffer));
    assert_eq!(packet.your_ip_address, Ipv4Addr::new(192, 168, 0, 197));
    assert_eq!(packet.options.ipv4(OPTION_SERVER_ID), Some(server_ip()));
    assert_eq!(packet.options.u32(OPTION_LEASE_TIME), Some(14400));
    assert_eq!(packet.options.u32(OPTION_RENEWAL_TIME), Some(7200));
    assert_eq!(packet.options.u32(OPTION_REBINDING_TIME), Some(12600));
    assert_eq!(
        packet.options.ipv4(OPTION_SUBNET_MASK),
        Some(Ipv4Addr::new(255, 255, 255, 0))
    );
    assert_eq!(
        packet.options.ipv4_list(OPTION_ROUTERS),
        Some(vec![Ipv4Addr::new(192, 168, 0, 1)])
    );
    assert_eq!(
        packet.options.ipv4_list(OPTION_DOMAIN_NAME_SERVERS),
        Some(vec![Ipv4Addr::new(192, 168, 0, 5)])
    );
    assert_eq!(packet.transaction_id, 0x1234_5678);
    assert!(packet.to_bytes().len() >= 300);
}

#[test]
fn repeated_discovers_yield_identical_offers() {
    let engine = engine_with(
        vec![known_definition()],
        Config::new(server_ip()),
        Arc::new(DefaultHooks),
    );
    let first = handle(&engine, discover()).expect("an OFFER").packet.to_bytes();
    let second = handle(&engine, discover()).expect("an OFFER").packet.to_bytes();
    assert_eq!(first, second);
}

#[test]
fn unknown_mac_discover_stays_silent_even_when_authoritative() {
    let engine = engine_with(
        Vec::new(),
        Config::new(server_ip()).authoritative(),
        Arc::new(DefaultHooks),
    );
    assert!(handle(&engine, discover()).is_none());
}

#[test]
fn unknown_mac_request_gets_a_nak_when_authoritative() {
    let engine = engine_with(
        Vec::new(),
        Config::new(server_ip()).authoritative(),
        Arc::new(DefaultHooks),
    );
    let reply = handle(
        &engine,
        request_selecting(server_ip(), Ipv4Addr::new(192, 168, 0, 197)),
    )
    .expect("a NAK");
    let packet = &reply.packet;

    assert_eq!(packet.options.message_type(), Some(MessageType::DhcpNak));
    assert_eq!(packet.options.ipv4(OPTION_SERVER_ID), Some(server_ip()));
    assert!(packet.your_ip_address.is_unspecified());
    assert!(packet.client_ip_address.is_unspecified());
}

#[test]
fn unknown_mac_request_is_silent_without_authority() {
    let engine = engine_with(Vec::new(), Config::new(server_ip()), Arc::new(DefaultHooks));
    assert!(handle(
        &engine,
        request_selecting(server_ip(), Ipv4Addr::new(192, 168, 0, 197))
    )
    .is_none());
}

#[test]
fn selecting_another_server_is_ignored() {
    let engine = engine_with(
        vec![known_definition()],
        Config::new(server_ip()).authoritative(),
        Arc::new(DefaultHooks),
    );
    assert!(handle(
        &engine,
        request_selecting(Ipv4Addr::new(192, 168, 0, 2), Ipv4Addr::new(192, 168, 0, 197))
    )
    .is_none());
}

#[test]
fn selecting_the_wrong_address_gets_a_nak() {
    let engine = engine_with(
        vec![known_definition()],
        Config::new(server_ip()),
        Arc::new(DefaultHooks),
    );
    let reply = handle(
        &engine,
        request_selecting(server_ip(), Ipv4Addr::new(192, 168, 0, 99)),
    )
    .expect("a NAK");
    assert_eq!(
        reply.packet.options.message_type(),
        Some(MessageType::DhcpNak)
    );
}

#[test]
fn renewing_the_wrong_address_gets_a_nak() {
    let definition = Definition::new(Ipv4Addr::new(10, 0, 0, 6), 3600, "lan", 2);
    let engine = engine_with(
        vec![definition],
        Config::new(server_ip()).authoritative(),
        Arc::new(DefaultHooks),
    );
    let ciaddr = Ipv4Addr::new(10, 0, 0, 5);
    let reply = engine
        .handle(
            request_renewing(ciaddr),
            unicast_source(ciaddr),
            PortClass::Server,
        )
        .expect("a NAK");
    assert_eq!(
        reply.packet.options.message_type(),
        Some(MessageType::DhcpNak)
    );
    assert!(reply.packet.your_ip_address.is_unspecified());
}

#[test]
fn renewing_the_assigned_address_gets_an_ack() {
    let address = Ipv4Addr::new(10, 0, 0, 6);
    let definition = Definition::new(address, 3600, "lan", 2);
    let engine = engine_with(
        vec![definition],
        Config::new(server_ip()),
        Arc::new(DefaultHooks),
    );
    let reply = engine
        .handle(
            request_renewing(address),
            unicast_source(address),
            PortClass::Server,
        )
        .expect("an ACK");
    assert_eq!(
        reply.packet.options.message_type(),
        Some(MessageType::DhcpAck)
    );
    assert_eq!(reply.packet.your_ip_address, address);

    // An ACK to a renewal goes straight back to the client's address.
    let config = Config::new(server_ip());
    let (destination, source_port) = netlink::choose_destination(&reply, &config, false);
    assert_eq!(destination, Destination::Unicast(address, 68));
    assert_eq!(source_port, 67);
}

#[test]
fn nak_renewals_forces_clients_back_to_discover() {
    let address = Ipv4Addr::new(10, 0, 0, 6);
    let definition = Definition::new(address, 3600, "lan", 2);
    let mut config = Config::new(server_ip());
    config.nak_renewals = true;
    let engine = engine_with(vec![definition], config, Arc::new(DefaultHooks));

    let reply = engine
        .handle(
            request_renewing(address),
            unicast_source(address),
            PortClass::Server,
        )
        .expect("a NAK");
    assert_eq!(
        reply.packet.options.message_type(),
        Some(MessageType::DhcpNak)
    );
}

#[test]
fn inform_gets_configuration_without_an_assignment() {
    let ciaddr = Ipv4Addr::new(192, 168, 0, 197);
    let engine = engine_with(
        vec![known_definition()],
        Config::new(server_ip()),
        Arc::new(DefaultHooks),
    );
    let reply = engine
        .handle(inform(ciaddr), unicast_source(ciaddr), PortClass::Server)
        .expect("an ACK");
    let packet = &reply.packet;

    assert_eq!(packet.options.message_type(), Some(MessageType::DhcpAck));
    assert!(packet.your_ip_address.is_unspecified());
    assert!(!packet.options.contains(OPTION_LEASE_TIME));
    assert!(!packet.options.contains(OPTION_RENEWAL_TIME));
    assert!(packet.options.contains(OPTION_SUBNET_MASK));
    assert_eq!(packet.options.ipv4(OPTION_SERVER_ID), Some(server_ip()));
}

#[test]
fn inform_from_an_unknown_mac_is_silent() {
    let engine = engine_with(Vec::new(), Config::new(server_ip()), Arc::new(DefaultHooks));
    let ciaddr = Ipv4Addr::new(192, 168, 0, 50);
    assert!(engine
        .handle(inform(ciaddr), unicast_source(ciaddr), PortClass::Server)
        .is_none());
}

#[test]
fn rapid_commit_discover_gets_an_immediate_ack() {
    let engine = engine_with(
        vec![known_definition()],
        Config::new(server_ip()),
        Arc::new(DefaultHooks),
    );
    let bytes = raw_packet(&[53, 1, 1, 80, 0, 255]);
    let reply = handle(&engine, Packet::from_bytes(&bytes).unwrap()).expect("an ACK");

    assert_eq!(
        reply.packet.options.message_type(),
        Some(MessageType::DhcpAck)
    );
    assert!(reply.packet.options.contains(OPTION_RAPID_COMMIT));
}

#[test]
fn decline_and_release_are_observed_silently() {
    let engine = engine_with(
        vec![known_definition()],
        Config::new(server_ip()),
        Arc::new(DefaultHooks),
    );

    let mut options = vec![53, 1, 4, 54, 4];
    options.extend_from_slice(&server_ip().octets());
    options.extend_from_slice(&[50, 4, 192, 168, 0, 197, 255]);
    let decline = Packet::from_bytes(&raw_packet(&options)).unwrap();
    assert!(handle(&engine, decline).is_none());

    let mut options = vec![53, 1, 7, 54, 4];
    options.extend_from_slice(&server_ip().octets());
    options.push(255);
    let mut bytes = raw_packet(&options);
    bytes[12..16].copy_from_slice(&[192, 168, 0, 197]);
    let release = Packet::from_bytes(&bytes).unwrap();
    assert!(engine
        .handle(
            release,
            unicast_source(Ipv4Addr::new(192, 168, 0, 197)),
            PortClass::Server
        )
        .is_none());
}

#[test]
fn relayed_requests_need_relay_support() {
    let engine = engine_with(
        vec![known_definition()],
        Config::new(server_ip()),
        Arc::new(DefaultHooks),
    );
    let mut bytes = raw_packet(&[53, 1, 1, 255]);
    bytes[24..28].copy_from_slice(&[10, 1, 0, 1]);
    let relayed = Packet::from_bytes(&bytes).unwrap();
    assert!(engine
        .handle(
            relayed,
            unicast_source(Ipv4Addr::new(10, 1, 0, 1)),
            PortClass::Server
        )
        .is_none());
}

#[test]
fn relayed_offers_return_to_the_relay() {
    let engine = engine_with(
        vec![known_definition()],
        Config::new(server_ip()).with_relays(Vec::new()),
        Arc::new(DefaultHooks),
    );
    let mut bytes = raw_packet(&[53, 1, 1, 255]);
    bytes[24..28].copy_from_slice(&[10, 1, 0, 1]);
    let relayed = Packet::from_bytes(&bytes).unwrap();
    let reply = engine
        .handle(
            relayed,
            SocketAddr::new(Ipv4Addr::new(10, 1, 0, 1).into(), 67),
            PortClass::Server,
        )
        .expect("an OFFER");

    // The server identifier stays ours even on the relay path.
    assert_eq!(reply.packet.options.ipv4(OPTION_SERVER_ID), Some(server_ip()));

    let config = Config::new(server_ip());
    let (destination, _) = netlink::choose_destination(&reply, &config, true);
    assert_eq!(
        destination,
        Destination::Unicast(Ipv4Addr::new(10, 1, 0, 1), 67)
    );
}

#[test]
fn unlisted_relays_are_refused() {
    let engine = engine_with(
        vec![known_definition()],
        Config::new(server_ip()).with_relays(vec![Ipv4Addr::new(10, 9, 9, 9)]),
        Arc::new(DefaultHooks),
    );
    let mut bytes = raw_packet(&[53, 1, 1, 255]);
    bytes[24..28].copy_from_slice(&[10, 1, 0, 1]);
    let relayed = Packet::from_bytes(&bytes).unwrap();
    assert!(engine
        .handle(
            relayed,
            SocketAddr::new(Ipv4Addr::new(10, 1, 0, 1).into(), 67),
            PortClass::Server
        )
        .is_none());
}

#[test]
fn broadcast_bit_offers_are_broadcast() {
    let engine = engine_with(
        vec![known_definition()],
        Config::new(server_ip()),
        Arc::new(DefaultHooks),
    );
    let mut bytes = raw_packet(&[53, 1, 1, 255]);
    bytes[10] = 0x80;
    let reply = handle(&engine, Packet::from_bytes(&bytes).unwrap()).expect("an OFFER");

    let config = Config::new(server_ip());
    let (destination, _) = netlink::choose_destination(&reply, &config, true);
    assert_eq!(destination, Destination::Broadcast(68));
}

#[test]
fn quiet_offers_go_to_the_hardware_address_when_possible() {
    let engine = engine_with(
        vec![known_definition()],
        Config::new(server_ip()),
        Arc::new(DefaultHooks),
    );
    let config = Config::new(server_ip());

    let reply = handle(&engine, discover()).expect("an OFFER");
    let (destination, _) = netlink::choose_destination(&reply, &config, true);
    assert_eq!(
        destination,
        Destination::Hardware {
            mac: MacAddress::parse_str("aa:bb:cc:dd:ee:ff").unwrap(),
            ip: Ipv4Addr::new(192, 168, 0, 197),
            port: 68,
        }
    );

    // Without a raw link the server falls back to broadcasting.
    let reply = handle(&engine, discover()).expect("an OFFER");
    let (destination, _) = netlink::choose_destination(&reply, &config, false);
    assert_eq!(destination, Destination::Broadcast(68));
}

#[test]
fn flooding_sources_are_throttled() {
    let mut config = Config::new(server_ip());
    config.suspend_threshold = 2;
    let engine = engine_with(vec![known_definition()], config, Arc::new(DefaultHooks));

    assert!(handle(&engine, discover()).is_some());
    assert!(handle(&engine, discover()).is_some());
    assert!(handle(&engine, discover()).is_none());
}

struct RejectingHooks;

impl Hooks for RejectingHooks {
    fn filter(&self, _packet: &Packet, _meta: &RequestMeta) -> Verdict {
        Verdict::Reject
    }
}

#[test]
fn rejected_sources_are_blocked() {
    let engine = engine_with(
        vec![known_definition()],
        Config::new(server_ip()),
        Arc::new(RejectingHooks),
    );
    assert!(handle(&engine, discover()).is_none());
    assert!(handle(&engine, discover()).is_none());
}

struct PanickingHooks;

impl Hooks for PanickingHooks {
    fn filter(&self, _packet: &Packet, _meta: &RequestMeta) -> Verdict {
        panic!("misbehaving embedder code");
    }
}

#[test]
fn a_panicking_hook_is_a_denial_not_a_crash() {
    let engine = engine_with(
        vec![known_definition()],
        Config::new(server_ip()),
        Arc::new(PanickingHooks),
    );
    assert!(handle(&engine, discover()).is_none());
}

struct ProvisioningHooks;

impl Hooks for ProvisioningHooks {
    fn handle_unknown_mac(&self, _packet: &Packet, _meta: &RequestMeta) -> Option<Definition> {
        Some(Definition::new(Ipv4Addr::new(10, 8, 0, 40), 600, "dynamic", 0))
    }
}

#[test]
fn the_unknown_mac_hook_can_provision_clients() {
    let engine = engine_with(Vec::new(), Config::new(server_ip()), Arc::new(ProvisioningHooks));
    let reply = handle(&engine, discover()).expect("an OFFER");
    assert_eq!(reply.packet.your_ip_address, Ipv4Addr::new(10, 8, 0, 40));
    assert_eq!(reply.packet.options.u32(OPTION_LEASE_TIME), Some(600));
}

struct PxeHooks;

impl Hooks for PxeHooks {
    fn load(
        &self,
        response: &mut Packet,
        _meta: &RequestMeta,
        _definition: &Definition,
        _source: SocketAddr,
    ) -> bool {
        response.force_option(OPTION_BOOTFILE_NAME, b"pxelinux.0".to_vec());
        true
    }
}

#[test]
fn the_load_hook_can_decorate_responses() {
    let engine = engine_with(
        vec![known_definition()],
        Config::new(server_ip()),
        Arc::new(PxeHooks),
    );
    let reply = handle(&engine, discover()).expect("an OFFER");
    assert_eq!(
        reply.packet.options.string(OPTION_BOOTFILE_NAME),
        Some("pxelinux.0".to_owned())
    );
}

struct VetoingHooks;

impl Hooks for VetoingHooks {
    fn load(
        &self,
        _response: &mut Packet,
        _meta: &RequestMeta,
        _definition: &Definition,
        _source: SocketAddr,
    ) -> bool {
        false
    }
}

#[test]
fn the_load_hook_can_suppress_transmission() {
    let engine = engine_with(
        vec![known_definition()],
        Config::new(server_ip()),
        Arc::new(VetoingHooks),
    );
    assert!(handle(&engine, discover()).is_none());
}

#[test]
fn multi_record_lookups_keep_the_first_by_default() {
    let first = known_definition();
    let second = Definition::new(Ipv4Addr::new(192, 168, 5, 5), 60, "other", 9);
    let engine = engine_with(
        vec![first.to_owned(), second],
        Config::new(server_ip()),
        Arc::new(DefaultHooks),
    );
    let reply = handle(&engine, discover()).expect("an OFFER");
    assert_eq!(reply.packet.your_ip_address, first.ip);
}

#[test]
fn local_traffic_can_be_disabled_except_for_pxe() {
    let mut config = Config::new(server_ip());
    config.allow_local = false;
    let engine = engine_with(vec![known_definition()], config, Arc::new(DefaultHooks));

    assert!(engine
        .handle(discover(), broadcast_source(), PortClass::Server)
        .is_none());
    assert!(engine
        .handle(discover(), broadcast_source(), PortClass::Proxy)
        .is_some());
}

#[test]
fn responses_never_misplace_yiaddr() {
    // NAKs and INFORM-ACKs must not assign addresses.
    let engine = engine_with(
        Vec::new(),
        Config::new(server_ip()).authoritative(),
        Arc::new(DefaultHooks),
    );
    let nak = handle(
        &engine,
        request_selecting(server_ip(), Ipv4Addr::new(192, 168, 0, 197)),
    )
    .expect("a NAK");
    assert!(nak.packet.your_ip_address.is_unspecified());
    assert!(nak.packet.options.contains(OPTION_MESSAGE_TYPE));
    assert!(nak.packet.to_bytes().len() >= 300);
}
