//! Server configuration.

use std::net::Ipv4Addr;
use std::path::PathBuf;

use hostname;

use protocol::{DHCP_PORT_CLIENT, DHCP_PORT_SERVER};

/// One 802.1Q tag to prepend to raw response frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QinqTag {
    /// Priority code point, 0-7.
    pub pcp: u8,
    /// Drop eligible indicator.
    pub dei: bool,
    /// VLAN identifier, 1-4094.
    pub vid: u16,
}

/// Definition-cache behaviour; see the `cache` module.
#[derive(Debug, Clone, Default)]
pub struct CacheConfig {
    pub enabled: bool,
    /// Keep the table in a local file instead of memory.
    pub on_disk: bool,
    /// Preserve the file across restarts and serve from it when the
    /// backend is down.
    pub persistent_path: Option<PathBuf>,
    /// Cache unknown-MAC results for this many seconds. Off by default:
    /// an unknown MAC may be provisioned at any moment.
    pub negative_ttl: Option<u64>,
}

/// Everything the engine and the sockets need to know, fixed at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// The IP this server answers as; also the server-identifier option.
    pub server_ip: Ipv4Addr,
    pub server_port: u16,
    pub client_port: u16,
    /// The ProxyDHCP port; `None` disables PXE handling.
    pub proxy_port: Option<u16>,
    /// Interface for raw layer-2 responses; `None` falls back to
    /// broadcasting to clients that lack an address.
    pub response_interface: Option<String>,
    /// 802.1Q tags for raw frames, outermost first.
    pub response_interface_qtags: Vec<QinqTag>,
    /// Sent in the `sname` field of replies.
    pub server_name: Option<String>,

    /// Serve clients on the local link.
    pub allow_local: bool,
    /// Serve relayed clients.
    pub allow_relays: bool,
    /// When non-empty, only these relays are served.
    pub allowed_relays: Vec<Ipv4Addr>,
    /// NAK instead of staying silent when an address cannot be confirmed.
    pub authoritative: bool,
    /// Unconditionally NAK renewals, forcing clients back to DISCOVER.
    pub nak_renewals: bool,

    pub enable_suspend: bool,
    pub suspend_threshold: u32,
    /// Seconds a misbehaving source stays blocked.
    pub misbehaving_client_timeout: u64,
    /// Seconds an unknown or rejected client stays blocked.
    pub unauthorized_client_timeout: u64,
    /// Seconds to let in-flight work finish on shutdown.
    pub shutdown_grace: u64,

    pub cache: CacheConfig,
}

impl Config {
    /// A configuration with the conventional defaults; only the server IP
    /// has no sensible one.
    pub fn new(server_ip: Ipv4Addr) -> Self {
        Config {
            server_ip,
            server_port: DHCP_PORT_SERVER,
            client_port: DHCP_PORT_CLIENT,
            proxy_port: None,
            response_interface: None,
            response_interface_qtags: Vec::new(),
            server_name: hostname::get_hostname(),

            allow_local: true,
            allow_relays: false,
            allowed_relays: Vec::new(),
            authoritative: false,
            nak_renewals: false,

            enable_suspend: true,
            suspend_threshold: 10,
            misbehaving_client_timeout: 150,
            unauthorized_client_timeout: 60,
            shutdown_grace: 5,

            cache: CacheConfig::default(),
        }
    }

    pub fn with_proxy_port(mut self, port: u16) -> Self {
        self.proxy_port = Some(port);
        self
    }

    pub fn with_response_interface<S: ToString>(mut self, iface: S, qtags: Vec<QinqTag>) -> Self {
        self.response_interface = Some(iface.to_string());
        self.response_interface_qtags = qtags;
        self
    }

    pub fn with_relays(mut self, allowed: Vec<Ipv4Addr>) -> Self {
        self.allow_relays = true;
        self.allowed_relays = allowed;
        self
    }

    pub fn authoritative(mut self) -> Self {
        self.authoritative = true;
        self
    }

    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }
}
