//! The static DHCP option registry.
//!
//! Maps every option code to its canonical name, its payload type, and
//! whether an RFC-specific sub-codec owns its layout. The registry is pure
//! data, built into the binary and immutable; entries are cheap copies.
//!
//! Derived from the IANA BOOTP/DHCP parameter assignments.

/// The payload type of an option, driving the typed accessors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    /// Four bytes in network byte order.
    Ipv4,
    /// At least one multiple of four bytes in network byte order.
    Ipv4Plus,
    /// Zero or more multiples of four bytes in network byte order.
    Ipv4Mult,
    /// A single byte.
    Byte,
    /// At least one byte.
    BytePlus,
    /// Any number of bytes, conventionally text.
    String,
    /// A single byte constrained to 0 or 1.
    Bool,
    /// Two bytes in network byte order.
    U16,
    /// At least one multiple of two bytes in network byte order.
    U16Plus,
    /// Four bytes in network byte order.
    U32,
    /// At least one multiple of four bytes in network byte order.
    U32Plus,
    /// A type octet followed by at least one byte of identity.
    Identifier,
    /// A zero-length payload; presence alone is the signal.
    None,
    /// Bytes with no layout known to the registry.
    Opaque,
}

impl ValueType {
    /// Checks a payload length against the type's shape.
    pub fn accepts_length(&self, length: usize) -> bool {
        use self::ValueType::*;
        match *self {
            Ipv4 => length == 4,
            Ipv4Plus => length >= 4 && length % 4 == 0,
            Ipv4Mult => length % 4 == 0,
            Byte => length == 1,
            BytePlus => length >= 1,
            String => true,
            Bool => length == 1,
            U16 => length == 2,
            U16Plus => length >= 2 && length % 2 == 0,
            U32 => length == 4,
            U32Plus => length >= 4 && length % 4 == 0,
            Identifier => length >= 2,
            None => length == 0,
            Opaque => true,
        }
    }
}

/// A registry entry: the canonical option name, the payload type, and
/// whether the payload belongs to an RFC-specific sub-codec (see the
/// [`rfc`](../rfc/index.html) module).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptionSpec {
    pub name: &'static str,
    pub value_type: ValueType,
    pub rfc: bool,
}

const fn plain(name: &'static str, value_type: ValueType) -> OptionSpec {
    OptionSpec {
        name,
        value_type,
        rfc: false,
    }
}

const fn sub_codec(name: &'static str, value_type: ValueType) -> OptionSpec {
    OptionSpec {
        name,
        value_type,
        rfc: true,
    }
}

const UNASSIGNED: OptionSpec = plain("unassigned", ValueType::Opaque);
const RESERVED: OptionSpec = plain("reserved", ValueType::Opaque);

/// Returns the registry entry for an option code.
pub fn spec(code: u8) -> OptionSpec {
    use self::ValueType::*;
    match code {
        0 => plain("pad", None),
        1 => plain("subnet_mask", Ipv4),
        2 => plain("time_offset", U32),
        3 => plain("router", Ipv4Plus),
        4 => plain("time_server", Ipv4Plus),
        5 => plain("name_server", Ipv4Plus),
        6 => plain("domain_name_servers", Ipv4Plus),
        7 => plain("log_server", Ipv4Plus),
        8 => plain("cookie_server", Ipv4Plus),
        9 => plain("lpr_server", Ipv4Plus),
        10 => plain("impress_server", Ipv4Plus),
        11 => plain("resource_location_server", Ipv4Plus),
        12 => plain("hostname", String),
        13 => plain("bootfile_size", U16),
        14 => plain("merit_dump_file", String),
        15 => plain("domain_name", String),
        16 => plain("swap_server", Ipv4),
        17 => plain("root_path", String),
        18 => plain("extensions_path", String),
        19 => plain("ip_forwarding", Bool),
        20 => plain("nonlocal_source_routing", Bool),
        21 => plain("policy_filter", Ipv4Plus),
        22 => plain("maximum_datagram_reassembly_size", U16),
        23 => plain("default_ip_ttl", Byte),
        24 => plain("path_mtu_aging_timeout", U32),
        25 => plain("path_mtu_table", U16Plus),
        26 => plain("interface_mtu", U16),
        27 => plain("all_subnets_are_local", Bool),
        28 => plain("broadcast_address", Ipv4),
        29 => plain("perform_mask_discovery", Bool),
        30 => plain("mask_supplier", Bool),
        31 => plain("perform_router_discovery", Bool),
        32 => plain("router_solicitation_address", Ipv4),
        33 => plain("static_routes", Ipv4Plus),
        34 => plain("trailer_encapsulation", Bool),
        35 => plain("arp_cache_timeout", U32),
        36 => plain("ethernet_encapsulation", Bool),
        37 => plain("tcp_default_ttl", Byte),
        38 => plain("tcp_keepalive_interval", U32),
        39 => plain("tcp_keepalive_garbage", Bool),
        40 => plain("nis_domain", String),
        41 => plain("nis_servers", Ipv4Plus),
        42 => plain("ntp_servers", Ipv4Plus),
        43 => plain("vendor_specific_information", BytePlus),
        44 => plain("nbns", Ipv4Plus),
        45 => plain("nbdd", Ipv4Plus),
        46 => plain("nb_node_type", Byte),
        47 => plain("nb_scope", String),
        48 => plain("x_window_system_font_server", Ipv4Plus),
        49 => plain("x_window_system_display_manager", Ipv4Plus),
        50 => plain("requested_ip_address", Ipv4),
        51 => plain("ip_address_lease_time", U32),
        52 => plain("overload", Byte),
        53 => plain("dhcp_message_type", Byte),
        54 => plain("server_identifier", Ipv4),
        55 => plain("parameter_request_list", BytePlus),
        56 => plain("message", String),
        57 => plain("maximum_dhcp_message_size", U16),
        58 => plain("renewal_time_value", U32),
        59 => plain("rebinding_time_value", U32),
        60 => plain("vendor_class_identifier", String),
        61 => plain("client_identifier", Identifier),
        62 => plain("netware_ip_domain_name", String),
        63 => plain("netware_ip_sub_options", BytePlus),
        64 => plain("nis_plus_domain", String),
        65 => plain("nis_plus_servers", Ipv4Plus),
        66 => plain("tftp_server_name", String),
        67 => plain("bootfile_name", String),
        68 => plain("mobile_ip_home_agent", Ipv4Mult),
        69 => plain("smtp_servers", Ipv4Plus),
        70 => plain("pop_servers", Ipv4Plus),
        71 => plain("nntp_servers", Ipv4Plus),
        72 => plain("default_www_server", Ipv4Plus),
        73 => plain("default_finger_server", Ipv4Plus),
        74 => plain("default_irc_server", Ipv4Plus),
        75 => plain("streettalk_server", Ipv4Plus),
        76 => plain("streettalk_directory_assistance_server", Ipv4Plus),
        77 => plain("user_class", String),
        78 => sub_codec("directory_agent", Opaque),
        79 => sub_codec("service_scope", Opaque),
        80 => plain("rapid_commit", None),
        81 => plain("client_fqdn", String),
        82 => sub_codec("relay_agent", BytePlus),
        83 => sub_codec("internet_storage_name_service", Opaque),
        85 => plain("nds_server", Ipv4Plus),
        86 => plain("nds_tree_name", BytePlus),
        87 => plain("nds_context", BytePlus),
        88 => sub_codec("bcmcs_domain_list", Opaque),
        89 => plain("bcmcs_ipv4_list", Ipv4Plus),
        90 => plain("authentication", Opaque),
        91 => plain("client_last_transaction_time", U32),
        92 => plain("associated_ip", Ipv4Plus),
        93 => plain("client_system", U16Plus),
        94 => plain("client_ndi", BytePlus),
        95 => plain("ldap", String),
        97 => plain("uuid_guid", BytePlus),
        98 => plain("open_group_user_auth", String),
        99 => plain("geoconf_civic", BytePlus),
        100 => plain("pcode", String),
        101 => plain("tcode", String),
        112 => plain("netinfo_address", String),
        113 => plain("netinfo_tag", String),
        114 => plain("url", String),
        116 => plain("auto_config", Bool),
        117 => plain("name_service_search", U16Plus),
        118 => plain("subnet_selection", Ipv4),
        119 => sub_codec("domain_search", Opaque),
        120 => sub_codec("sip_servers", Opaque),
        121 => sub_codec("classless_static_route", Opaque),
        122 => plain("cablelabs_client_configuration", String),
        123 => plain("geoconf", BytePlus),
        124 => sub_codec("vendor_class", String),
        125 => sub_codec("vendor_specific", String),
        128 => plain("pxe_128", String),
        129 => plain("pxe_129", String),
        130 => plain("pxe_130", String),
        131 => plain("pxe_131", String),
        132 => plain("pxe_132", String),
        133 => plain("pxe_133", String),
        134 => plain("pxe_134", String),
        135 => plain("pxe_135", String),
        136 => plain("pana_agent", Ipv4Plus),
        137 => sub_codec("v4_lost", Opaque),
        138 => plain("capwap_ac_v4", Ipv4Plus),
        139 => sub_codec("ipv4_mos", Opaque),
        140 => sub_codec("fqdn_mos", Opaque),
        175 => plain("ipxe_test", String),
        208 => plain("pxelinux_magic", U32),
        209 => plain("configuration_file", String),
        210 => plain("path_prefix", String),
        211 => plain("reboot_time", U32),
        255 => plain("end", None),

        224..=254 => RESERVED,
        _ => UNASSIGNED,
    }
}
