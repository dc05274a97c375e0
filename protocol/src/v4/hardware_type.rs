//! DHCP hardware type module.

use std::fmt;

/// The `htype` field of a DHCP message (ARP hardware types).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HardwareType {
    Undefined = 0,
    Ethernet = 1,
    Ieee802 = 6,
    Fddi = 8,
}

impl fmt::Display for HardwareType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use self::HardwareType::*;
        match self {
            Ethernet => write!(f, "Ethernet"),
            Ieee802 => write!(f, "IEEE 802"),
            Fddi => write!(f, "FDDI"),

            Undefined => write!(f, "UNDEFINED"),
        }
    }
}

impl From<u8> for HardwareType {
    fn from(value: u8) -> Self {
        use self::HardwareType::*;
        match value {
            1 => Ethernet,
            6 => Ieee802,
            8 => Fddi,

            _ => Undefined,
        }
    }
}
