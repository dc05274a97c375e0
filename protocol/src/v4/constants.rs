//! DHCP message constants.

/// `chaddr` size in bytes.
pub const SIZE_HARDWARE_ADDRESS: usize = 16;

/// `sname` size in bytes.
pub const SIZE_SERVER_NAME: usize = 64;

/// `file` size in bytes.
pub const SIZE_BOOT_FILENAME: usize = 128;

/// The `sname` field offset in bytes.
pub const OFFSET_SERVER_NAME: usize = 44;

/// The `file` field offset in bytes.
pub const OFFSET_BOOT_FILENAME: usize = OFFSET_SERVER_NAME + SIZE_SERVER_NAME;

/// DHCP magic cookie offset in bytes.
pub const OFFSET_MAGIC_COOKIE: usize = OFFSET_SERVER_NAME + SIZE_SERVER_NAME + SIZE_BOOT_FILENAME;

/// DHCP options offset in bytes.
pub const OFFSET_OPTIONS: usize = OFFSET_MAGIC_COOKIE + ::std::mem::size_of::<u32>();

/// Only the highest bit of the `flags` field is used in DHCP.
pub const FLAG_BROADCAST: u16 = 0b1000_0000_0000_0000;

/// The magic number before the DHCP options.
pub const MAGIC_COOKIE: u32 = 0x6382_5363;

/// The size of the IP header the server uses.
pub const SIZE_HEADER_IP: usize = 20;

/// The size of the UDP header the server uses.
pub const SIZE_HEADER_UDP: usize = 8;

/// The minimal message size a client MUST be able to accept.
pub const SIZE_MESSAGE_MINIMAL: usize = 576;

/// The minimal outgoing payload size; some BOOTP relays drop anything less.
pub const SIZE_MESSAGE_PADDED: usize = 300;

/// The default Ethernet MTU, used as the size budget when the client sends
/// no hint of its own.
pub const DEFAULT_MTU: usize = 1500;

/// The port on which DHCP servers and relays listen.
pub const DHCP_PORT_SERVER: u16 = 67;

/// The port on which DHCP clients listen.
pub const DHCP_PORT_CLIENT: u16 = 68;

/// The conventional ProxyDHCP (PXE) port.
pub const DHCP_PORT_PXE: u16 = 4011;

/*
Option codes referenced by name throughout the codec and the engine.
The full code space is described by the `registry` module.
*/
pub const OPTION_PAD: u8 = 0;
pub const OPTION_SUBNET_MASK: u8 = 1;
pub const OPTION_ROUTERS: u8 = 3;
pub const OPTION_DOMAIN_NAME_SERVERS: u8 = 6;
pub const OPTION_HOSTNAME: u8 = 12;
pub const OPTION_DOMAIN_NAME: u8 = 15;
pub const OPTION_MAX_REASSEMBLY_SIZE: u8 = 22;
pub const OPTION_BROADCAST_ADDRESS: u8 = 28;
pub const OPTION_NTP_SERVERS: u8 = 42;
pub const OPTION_VENDOR_SPECIFIC_INFORMATION: u8 = 43;
pub const OPTION_REQUESTED_IP: u8 = 50;
pub const OPTION_LEASE_TIME: u8 = 51;
pub const OPTION_OVERLOAD: u8 = 52;
pub const OPTION_MESSAGE_TYPE: u8 = 53;
pub const OPTION_SERVER_ID: u8 = 54;
pub const OPTION_PARAMETER_LIST: u8 = 55;
pub const OPTION_MESSAGE: u8 = 56;
pub const OPTION_MAX_MESSAGE_SIZE: u8 = 57;
pub const OPTION_RENEWAL_TIME: u8 = 58;
pub const OPTION_REBINDING_TIME: u8 = 59;
pub const OPTION_VENDOR_CLASS_ID: u8 = 60;
pub const OPTION_CLIENT_ID: u8 = 61;
pub const OPTION_TFTP_SERVER_NAME: u8 = 66;
pub const OPTION_BOOTFILE_NAME: u8 = 67;
pub const OPTION_RAPID_COMMIT: u8 = 80;
pub const OPTION_RELAY_AGENT: u8 = 82;
pub const OPTION_CLIENT_SYSTEM: u8 = 93;
pub const OPTION_CLIENT_NDI: u8 = 94;
pub const OPTION_UUID_GUID: u8 = 97;
pub const OPTION_SUBNET_SELECTION: u8 = 118;
pub const OPTION_VENDOR_CLASS: u8 = 124;
pub const OPTION_VENDOR_SPECIFIC: u8 = 125;
pub const OPTION_END: u8 = 255;

/// Options every client receives even when its parameter request list
/// omits them.
pub const MANDATORY_OPTIONS: &'static [u8] = &[
    OPTION_SUBNET_MASK,
    OPTION_ROUTERS,
    OPTION_DOMAIN_NAME_SERVERS,
    OPTION_DOMAIN_NAME,
    OPTION_LEASE_TIME,
    OPTION_MESSAGE_TYPE,
    OPTION_SERVER_ID,
    OPTION_RENEWAL_TIME,
    OPTION_REBINDING_TIME,
];

/// The order in which clients usually expect to see key options.
pub const OPTION_ORDERING: &'static [u8] = &[
    OPTION_MESSAGE_TYPE,
    OPTION_SERVER_ID,
    OPTION_LEASE_TIME,
];
