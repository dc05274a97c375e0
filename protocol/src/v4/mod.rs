//! The main DHCP message module.

pub mod constants;
pub mod hardware_type;
pub mod operation_code;
pub mod options;
pub mod registry;
pub mod rfc;

mod deserializer;
mod serializer;
mod transform;
mod validator;

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::net::Ipv4Addr;

use eui48::MacAddress;

pub use self::constants::*;
pub use self::hardware_type::HardwareType;
pub use self::operation_code::OperationCode;
pub use self::options::{MessageType, OptionValue, Options, Overload};
pub use self::registry::{OptionSpec, ValueType};

/// A mutable, in-memory DHCP message.
///
/// Created on receive, mutated by the engine and the load hook, serialised
/// once, and dropped.
///
/// [RFC 2131](https://tools.ietf.org/html/rfc2131)
/// [RFC 2132](https://tools.ietf.org/html/rfc2132)
#[derive(Debug, Clone)]
pub struct Packet {
    pub operation_code: OperationCode,
    pub hardware_type: HardwareType,
    pub hardware_address_length: u8,
    pub hops: u8,
    pub transaction_id: u32,
    pub seconds: u16,
    /// Bit 15 of `flags`; the only semantic bit.
    pub is_broadcast: bool,
    pub client_ip_address: Ipv4Addr,
    pub your_ip_address: Ipv4Addr,
    pub server_ip_address: Ipv4Addr,
    pub gateway_ip_address: Ipv4Addr,
    pub client_hardware_address: MacAddress,
    /// The `sname` field; NUL-padded to 64 bytes on the wire.
    pub server_name: Vec<u8>,
    /// The `file` field; NUL-padded to 128 bytes on the wire.
    pub boot_filename: Vec<u8>,
    pub options: Options,

    /// Codes the client asked for (option 55 unioned with the mandatory
    /// set); `None` means no request list was given and everything set on
    /// the packet is emitted.
    pub requested: Option<BTreeSet<u8>>,
    /// The client's message size hint (minimum of options 22 and 57).
    pub maximum_size: Option<u16>,

    /// Hop-to-hop data for the embedder; never serialised.
    pub meta: HashMap<String, String>,

    /// Overrides the destination MAC of the response frame when set.
    pub response_mac: Option<MacAddress>,
    /// Overrides the destination IP of the response when set.
    pub response_ip: Option<Ipv4Addr>,
    /// Overrides the destination port of the response when set.
    pub response_port: Option<u16>,
    /// Overrides the source port of the response when set.
    pub response_source_port: Option<u16>,
}

impl Packet {
    /// Creates a blank packet.
    pub fn new() -> Self {
        Packet {
            operation_code: OperationCode::Undefined,
            hardware_type: HardwareType::Ethernet,
            hardware_address_length: 6,
            hops: 0,
            transaction_id: 0,
            seconds: 0,
            is_broadcast: false,
            client_ip_address: Ipv4Addr::new(0, 0, 0, 0),
            your_ip_address: Ipv4Addr::new(0, 0, 0, 0),
            server_ip_address: Ipv4Addr::new(0, 0, 0, 0),
            gateway_ip_address: Ipv4Addr::new(0, 0, 0, 0),
            client_hardware_address: MacAddress::default(),
            server_name: Vec::new(),
            boot_filename: Vec::new(),
            options: Options::new(),
            requested: None,
            maximum_size: None,
            meta: HashMap::new(),
            response_mac: None,
            response_ip: None,
            response_port: None,
            response_source_port: None,
        }
    }

    /// Whether an option would be emitted by the encoder: either no
    /// parameter request list was given, or the code is in it (or in the
    /// mandatory set, which is unioned in at decode time).
    pub fn is_requested_option(&self, code: u8) -> bool {
        match self.requested {
            Some(ref requested) => requested.contains(&code),
            None => true,
        }
    }

    /// Stores an option and forces it into the requested set, so it
    /// survives parameter-list filtering.
    pub fn force_option(&mut self, code: u8, value: Vec<u8>) {
        self.options.replace_raw(code, value);
        if let Some(ref mut requested) = self.requested {
            requested.insert(code);
        }
    }

    /// An option as an IP, `None` when absent or all-zero; clients pad
    /// unknown addresses with zeroes rather than omitting them.
    pub fn option_ipv4(&self, code: u8) -> Option<Ipv4Addr> {
        match self.options.ipv4(code) {
            Some(address) if !address.is_unspecified() => Some(address),
            _ => None,
        }
    }

    /// `ciaddr`, `None` when unset.
    pub fn ciaddr(&self) -> Option<Ipv4Addr> {
        if self.client_ip_address.is_unspecified() {
            None
        } else {
            Some(self.client_ip_address)
        }
    }

    /// `giaddr`, `None` when the packet was not relayed.
    pub fn giaddr(&self) -> Option<Ipv4Addr> {
        if self.gateway_ip_address.is_unspecified() {
            None
        } else {
            Some(self.gateway_ip_address)
        }
    }
}

impl Default for Packet {
    fn default() -> Self {
        Packet::new()
    }
}

fn strip_nuls(field: &[u8]) -> &[u8] {
    let mut last = field.len();
    while last > 0 && field[last - 1] == 0 {
        last -= 1;
    }
    &field[..last]
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f)?;
        writeln!(f, "{}HEADER{}", "_".repeat(30), "_".repeat(39))?;
        writeln!(f, "{:32} | {}", "Operation code", self.operation_code)?;
        writeln!(f, "{:32} | {}", "Hardware type", self.hardware_type)?;
        writeln!(f, "{:32} | {}", "Hops", self.hops)?;
        writeln!(f, "{:32} | {:#010x}", "Transaction ID", self.transaction_id)?;
        writeln!(f, "{:32} | {}", "Seconds", self.seconds)?;
        writeln!(f, "{:32} | {}", "Broadcast flag", self.is_broadcast)?;
        writeln!(f, "{:32} | {}", "Client IP address", self.client_ip_address)?;
        writeln!(f, "{:32} | {}", "Your IP address", self.your_ip_address)?;
        writeln!(f, "{:32} | {}", "Server IP address", self.server_ip_address)?;
        writeln!(f, "{:32} | {}", "Gateway IP address", self.gateway_ip_address)?;
        writeln!(
            f,
            "{:32} | {}",
            "Client hardware address", self.client_hardware_address
        )?;
        writeln!(
            f,
            "{:32} | {:?}",
            "Server name",
            strip_nuls(&self.server_name)
        )?;
        writeln!(
            f,
            "{:32} | {:?}",
            "Boot filename",
            strip_nuls(&self.boot_filename)
        )?;

        writeln!(f, "{}OPTIONS{}", "_".repeat(30), "_".repeat(38))?;
        for (code, value) in self.options.iter() {
            let selected = if self.is_requested_option(*code) { 'X' } else { ' ' };
            match self.options.get(*code) {
                Ok(typed) => writeln!(
                    f,
                    "[{}][{:03}] {:027}| {:?}",
                    selected,
                    code,
                    registry::spec(*code).name,
                    typed
                )?,
                Err(_) => writeln!(
                    f,
                    "[{}][{:03}] {:027}| {:?}",
                    selected,
                    code,
                    registry::spec(*code).name,
                    value
                )?,
            }
        }
        writeln!(f, "{}", "_".repeat(75))?;
        Ok(())
    }
}
