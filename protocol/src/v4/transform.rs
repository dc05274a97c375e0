//! In-place transformation of a received packet into its reply.
//!
//! The engine reuses the client's packet for the response: header fields
//! are rewritten and the client-only options are stripped, so whatever the
//! client sent and the server did not overwrite is echoed back.

use std::net::Ipv4Addr;

use super::constants::*;
use super::options::MessageType;
use super::OperationCode;
use super::Packet;

/// Options that only make sense client-to-server.
const CLIENT_ONLY_OPTIONS: &'static [u8] = &[
    OPTION_MAX_REASSEMBLY_SIZE,
    OPTION_VENDOR_SPECIFIC_INFORMATION,
    OPTION_REQUESTED_IP,
    OPTION_OVERLOAD,
    OPTION_PARAMETER_LIST,
    OPTION_MAX_MESSAGE_SIZE,
    OPTION_VENDOR_CLASS_ID,
    OPTION_CLIENT_ID,
    OPTION_CLIENT_SYSTEM,
    OPTION_CLIENT_NDI,
    OPTION_UUID_GUID,
    OPTION_SUBNET_SELECTION,
    OPTION_VENDOR_CLASS,
    OPTION_VENDOR_SPECIFIC,
];

impl Packet {
    fn transform_base(&mut self, message_type: MessageType) {
        self.operation_code = OperationCode::BootReply;
        self.hardware_address_length = 6;
        self.hops = 0;
        self.seconds = 0;
        for code in CLIENT_ONLY_OPTIONS {
            self.options.remove(*code);
        }
        self.options
            .replace_raw(OPTION_MESSAGE_TYPE, vec![message_type as u8]);
    }

    /// Turns the packet into an OFFER shell.
    pub fn transform_to_offer(&mut self) {
        self.transform_base(MessageType::DhcpOffer);
        self.client_ip_address = Ipv4Addr::new(0, 0, 0, 0);
    }

    /// Turns the packet into an ACK shell.
    pub fn transform_to_ack(&mut self) {
        self.transform_base(MessageType::DhcpAck);
    }

    /// Turns the packet into a NAK.
    ///
    /// A NAK carries no address, no lease timers, and no boot fields.
    pub fn transform_to_nak(&mut self) {
        self.transform_base(MessageType::DhcpNak);
        self.client_ip_address = Ipv4Addr::new(0, 0, 0, 0);
        self.your_ip_address = Ipv4Addr::new(0, 0, 0, 0);
        self.server_ip_address = Ipv4Addr::new(0, 0, 0, 0);
        self.server_name = Vec::new();
        self.boot_filename = Vec::new();
        self.options.remove(OPTION_LEASE_TIME);
        self.options.remove(OPTION_RENEWAL_TIME);
        self.options.remove(OPTION_REBINDING_TIME);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn request() -> Packet {
        let mut packet = Packet::new();
        packet.operation_code = OperationCode::BootRequest;
        packet.transaction_id = 0x1234_5678;
        packet.seconds = 7;
        packet.client_ip_address = Ipv4Addr::new(10, 0, 0, 5);
        packet
            .options
            .replace_raw(OPTION_MESSAGE_TYPE, vec![MessageType::DhcpRequest as u8]);
        packet
            .options
            .replace_raw(OPTION_REQUESTED_IP, vec![10, 0, 0, 5]);
        packet.options.replace_raw(OPTION_PARAMETER_LIST, vec![1, 3]);
        packet
    }

    #[test]
    fn nak_is_stripped_bare() {
        let mut packet = request();
        packet.transform_to_nak();

        assert_eq!(packet.operation_code, OperationCode::BootReply);
        assert_eq!(packet.options.message_type(), Some(MessageType::DhcpNak));
        assert!(packet.your_ip_address.is_unspecified());
        assert!(packet.client_ip_address.is_unspecified());
        assert!(!packet.options.contains(OPTION_LEASE_TIME));
        assert!(!packet.options.contains(OPTION_REQUESTED_IP));
        assert_eq!(packet.seconds, 0);
    }

    #[test]
    fn offer_clears_ciaddr_and_client_only_options() {
        let mut packet = request();
        packet.transform_to_offer();

        assert_eq!(packet.options.message_type(), Some(MessageType::DhcpOffer));
        assert!(packet.client_ip_address.is_unspecified());
        assert!(!packet.options.contains(OPTION_PARAMETER_LIST));
        assert_eq!(packet.transaction_id, 0x1234_5678);
    }
}
