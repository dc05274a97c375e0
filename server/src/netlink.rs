//! Response routing and raw frame assembly.
//!
//! Per RFC 2131 §4.1 a response goes to exactly one of: the relay that
//! forwarded the request, the client's own address, the local broadcast
//! address, or — when the client has been offered an address it cannot
//! yet defend — straight to its hardware address in a hand-built frame.
//! Only the last path needs layer-2 access; without it the server falls
//! back to broadcasting.

use std::net::Ipv4Addr;

use bytes::BufMut;
use eui48::MacAddress;

use protocol::MessageType;

use config::{Config, QinqTag};
use engine::{PacketType, PortClass, Reply};

/// Where and how a response leaves the server.
#[derive(Debug, Clone, PartialEq)]
pub enum Destination {
    /// Plain UDP to an address that can receive it.
    Unicast(Ipv4Addr, u16),
    /// UDP to 255.255.255.255.
    Broadcast(u16),
    /// A raw Ethernet frame addressed to the client's MAC.
    Hardware {
        mac: MacAddress,
        ip: Ipv4Addr,
        port: u16,
    },
}

/// Picks the destination for a finished reply, honouring any overrides a
/// hook placed on the packet.
///
/// Returns the destination and the UDP source port to claim, which is the
/// proxy port for PXE traffic.
pub fn choose_destination(
    reply: &Reply,
    config: &Config,
    hardware_capable: bool,
) -> (Destination, u16) {
    let packet = &reply.packet;
    let mut source_port = match reply.port {
        PortClass::Server => config.server_port,
        PortClass::Proxy => config.proxy_port.unwrap_or(config.server_port),
    };

    let is_ack = packet.options.message_type() == Some(MessageType::DhcpAck);
    let unicast_to_ciaddr_permitted = is_ack
        && match reply.method {
            PacketType::RequestRenew | PacketType::Inform => true,
            _ => false,
        };

    let mut destination = if let Some(giaddr) = packet.giaddr() {
        Destination::Unicast(giaddr, config.server_port)
    } else if let (Some(ciaddr), true) = (packet.ciaddr(), unicast_to_ciaddr_permitted) {
        Destination::Unicast(ciaddr, config.client_port)
    } else if packet.is_broadcast || packet.your_ip_address.is_unspecified() {
        Destination::Broadcast(config.client_port)
    } else if hardware_capable {
        Destination::Hardware {
            mac: packet
                .response_mac
                .to_owned()
                .unwrap_or_else(|| packet.client_hardware_address.to_owned()),
            ip: packet.your_ip_address,
            port: config.client_port,
        }
    } else {
        // The client cannot ARP yet and no raw link is configured.
        Destination::Broadcast(config.client_port)
    };

    if let Some(ip) = packet.response_ip {
        let port = match destination {
            Destination::Unicast(_, port) => port,
            Destination::Broadcast(port) => port,
            Destination::Hardware { port, .. } => port,
        };
        destination = if ip.is_broadcast() {
            Destination::Broadcast(port)
        } else {
            Destination::Unicast(ip, port)
        };
    }
    if let Some(port) = packet.response_port {
        destination = match destination {
            Destination::Unicast(ip, _) => Destination::Unicast(ip, port),
            Destination::Broadcast(_) => Destination::Broadcast(port),
            Destination::Hardware { mac, ip, .. } => Destination::Hardware { mac, ip, port },
        };
    }
    if let Some(port) = packet.response_source_port {
        source_port = port;
    }

    (destination, source_port)
}

const ETHERTYPE_IPV4: u16 = 0x0800;
const ETHERTYPE_QINQ: u16 = 0x8100;
const DEFAULT_IP_TTL: u8 = 128;

/// RFC 1071 ones'-complement checksum over a list of byte slices, treated
/// as one contiguous big-endian word stream.
fn checksum(parts: &[&[u8]]) -> u16 {
    let mut sum = 0u32;
    let mut high: Option<u8> = None;
    for part in parts {
        for byte in part.iter() {
            sum += match high.take() {
                Some(high) => ((high as u32) << 8) | *byte as u32,
                None => {
                    high = Some(*byte);
                    continue;
                }
            };
        }
    }
    if let Some(high) = high {
        sum += (high as u32) << 8;
    }
    while sum >> 16 != 0 {
        sum = (sum & 0xFFFF) + (sum >> 16);
    }
    !(sum as u16)
}

/// Assembles a complete Ethernet frame around a serialised DHCP payload:
/// destination and source MACs, the configured 802.1Q stack head-first,
/// then IPv4 and UDP headers with their checksums filled in.
pub fn assemble_frame(
    source_mac: &MacAddress,
    destination_mac: &MacAddress,
    qtags: &[QinqTag],
    source_ip: Ipv4Addr,
    destination_ip: Ipv4Addr,
    source_port: u16,
    destination_port: u16,
    payload: &[u8],
) -> Vec<u8> {
    let mut frame = Vec::with_capacity(14 + qtags.len() * 4 + 28 + payload.len());

    // Ethernet header with the optional qtag stack.
    if destination_ip.is_broadcast() {
        frame.put_slice(&[0xFF; 6]);
    } else {
        frame.put_slice(destination_mac.as_bytes());
    }
    frame.put_slice(source_mac.as_bytes());
    for qtag in qtags {
        frame.put_u16_be(ETHERTYPE_QINQ);
        let mut tci = (qtag.pcp as u16 & 0x07) << 13;
        tci |= (qtag.dei as u16) << 12;
        tci |= qtag.vid & 0x0FFF;
        frame.put_u16_be(tci);
    }
    frame.put_u16_be(ETHERTYPE_IPV4);

    // IPv4 header.
    let total_length = (20 + 8 + payload.len()) as u16;
    let mut ip_header = Vec::with_capacity(20);
    ip_header.put_u8(0x45); // version 4, IHL 5
    ip_header.put_u8(0x00);
    ip_header.put_u16_be(total_length);
    ip_header.put_u16_be(0); // identification; we are the origin
    ip_header.put_u16_be(if payload.len() <= 560 { 0x4000 } else { 0 }); // DF
    ip_header.put_u8(DEFAULT_IP_TTL);
    ip_header.put_u8(0x11); // UDP
    ip_header.put_u16_be(0); // checksum placeholder
    ip_header.put_slice(&source_ip.octets());
    ip_header.put_slice(&destination_ip.octets());
    let ip_checksum = checksum(&[&ip_header]);
    ip_header[10] = (ip_checksum >> 8) as u8;
    ip_header[11] = ip_checksum as u8;
    frame.put_slice(&ip_header);

    // UDP header, checksummed over the RFC 768 pseudo header.
    let udp_length = (8 + payload.len()) as u16;
    let mut udp_header = Vec::with_capacity(8);
    udp_header.put_u16_be(source_port);
    udp_header.put_u16_be(destination_port);
    udp_header.put_u16_be(udp_length);
    udp_header.put_u16_be(0); // checksum placeholder
    let pseudo = [
        source_ip.octets()[0],
        source_ip.octets()[1],
        source_ip.octets()[2],
        source_ip.octets()[3],
        destination_ip.octets()[0],
        destination_ip.octets()[1],
        destination_ip.octets()[2],
        destination_ip.octets()[3],
        0,
        0x11,
        (udp_length >> 8) as u8,
        udp_length as u8,
    ];
    let mut udp_checksum = checksum(&[&pseudo, &udp_header, payload]);
    if udp_checksum == 0 {
        udp_checksum = 0xFFFF;
    }
    udp_header[6] = (udp_checksum >> 8) as u8;
    udp_header[7] = udp_checksum as u8;
    frame.put_slice(&udp_header);

    frame.put_slice(payload);
    frame
}

#[cfg(test)]
mod tests {
    use super::*;

    fn folds_to_all_ones(parts: &[&[u8]]) -> bool {
        // A correct checksum makes the covered data sum to 0xFFFF.
        checksum(parts) == 0
    }

    fn macs() -> (MacAddress, MacAddress) {
        (
            MacAddress::parse_str("02:00:00:00:00:01").unwrap(),
            MacAddress::parse_str("aa:bb:cc:dd:ee:ff").unwrap(),
        )
    }

    #[test]
    fn frame_layout_without_tags() {
        let (server, client) = macs();
        let payload = [0u8; 300];
        let frame = assemble_frame(
            &server,
            &client,
            &[],
            "192.168.0.1".parse().unwrap(),
            "192.168.0.197".parse().unwrap(),
            67,
            68,
            &payload,
        );

        assert_eq!(&frame[0..6], client.as_bytes());
        assert_eq!(&frame[6..12], server.as_bytes());
        assert_eq!(&frame[12..14], &[0x08, 0x00]);
        // IPv4 header directly after the Ethernet header.
        assert_eq!(frame[14], 0x45);
        assert_eq!(frame.len(), 14 + 20 + 8 + payload.len());
        // UDP ports.
        assert_eq!(&frame[34..36], &[0, 67]);
        assert_eq!(&frame[36..38], &[0, 68]);
    }

    #[test]
    fn broadcast_frames_use_the_broadcast_mac() {
        let (server, client) = macs();
        let frame = assemble_frame(
            &server,
            &client,
            &[],
            "192.168.0.1".parse().unwrap(),
            "255.255.255.255".parse().unwrap(),
            67,
            68,
            &[0u8; 300],
        );
        assert_eq!(&frame[0..6], &[0xFF; 6]);
    }

    #[test]
    fn qtags_nest_head_first() {
        let (server, client) = macs();
        let qtags = [
            QinqTag {
                pcp: 3,
                dei: false,
                vid: 100,
            },
            QinqTag {
                pcp: 0,
                dei: true,
                vid: 200,
            },
        ];
        let frame = assemble_frame(
            &server,
            &client,
            &qtags,
            "192.168.0.1".parse().unwrap(),
            "192.168.0.197".parse().unwrap(),
            67,
            68,
            &[0u8; 300],
        );

        assert_eq!(&frame[12..14], &[0x81, 0x00]);
        assert_eq!(&frame[14..16], &[0x60, 100]); // pcp 3 << 13 | vid 100
        assert_eq!(&frame[16..18], &[0x81, 0x00]);
        assert_eq!(&frame[18..20], &[0x10, 200]); // dei | vid 200
        assert_eq!(&frame[20..22], &[0x08, 0x00]);
        assert_eq!(frame[22], 0x45);
    }

    #[test]
    fn ip_and_udp_checksums_verify() {
        let (server, client) = macs();
        let payload = [0xA5u8; 301];
        let frame = assemble_frame(
            &server,
            &client,
            &[],
            "10.0.0.1".parse().unwrap(),
            "10.0.0.197".parse().unwrap(),
            67,
            68,
            &payload,
        );

        let ip_header = &frame[14..34];
        assert!(folds_to_all_ones(&[ip_header]));

        let udp_and_payload = &frame[34..];
        let pseudo = [
            10, 0, 0, 1, 10, 0, 0, 197, 0, 0x11, (udp_and_payload.len() >> 8) as u8,
            udp_and_payload.len() as u8,
        ];
        assert!(folds_to_all_ones(&[&pseudo, udp_and_payload]));
    }
}
