//! DHCP message validation module.

use error::ValidationError;

use super::constants::*;
use super::options::MessageType;
use super::Packet;

/// Checks if required options are present for each message type.
macro_rules! must_set_option (
    ($packet:expr, $code:expr, $name:expr) => (
        if !$packet.options.contains($code) {
            return Err(ValidationError::Validation($name));
        }
    );
);

impl Packet {
    /// DHCP message validation.
    ///
    /// Returns the DHCP message type on successful validation.
    ///
    /// # Errors
    /// Returns `ValidationError::Validation` if a required option is
    /// missing or malformed.
    pub fn validate(&self) -> Result<MessageType, ValidationError> {
        let message_type = match self.options.message_type() {
            None => {
                return Err(ValidationError::Validation(
                    "DHCP message type is absent or zero",
                ))
            }
            Some(message_type) => message_type,
        };

        if let Some(maximum_size) = self.maximum_size {
            if (maximum_size as usize) < SIZE_MESSAGE_MINIMAL {
                return Err(ValidationError::Validation(
                    "DHCP maximal message size is too low",
                ));
            }
        }

        match message_type {
            // client generated packets section
            MessageType::DhcpDiscover => {}
            MessageType::DhcpInform => {}
            MessageType::DhcpRequest => {
                if self.client_ip_address.is_unspecified()
                    || self.options.contains(OPTION_SERVER_ID)
                {
                    must_set_option!(self, OPTION_REQUESTED_IP, "requested_ip_address");
                }
            }
            MessageType::DhcpRelease => {
                must_set_option!(self, OPTION_SERVER_ID, "server_identifier");
            }
            MessageType::DhcpDecline => {
                must_set_option!(self, OPTION_REQUESTED_IP, "requested_ip_address");
                must_set_option!(self, OPTION_SERVER_ID, "server_identifier");
            }

            // server generated packets section
            MessageType::DhcpOffer => {
                must_set_option!(self, OPTION_LEASE_TIME, "ip_address_lease_time");
                must_set_option!(self, OPTION_SERVER_ID, "server_identifier");
            }
            MessageType::DhcpAck => {
                must_set_option!(self, OPTION_SERVER_ID, "server_identifier");
            }
            MessageType::DhcpNak => {
                must_set_option!(self, OPTION_SERVER_ID, "server_identifier");
            }

            MessageType::Undefined => {
                return Err(ValidationError::Validation("unknown DHCP message type"))
            }
        }

        Ok(message_type)
    }
}
