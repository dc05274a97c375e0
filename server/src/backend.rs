//! The backing-store contract.
//!
//! A backend answers one question: what should this MAC receive? Anything
//! can sit behind it (SQL, a key-value store, an HTTP service, a flat
//! file); the server only consumes this trait.

use eui48::MacAddress;
use serde_json;
use std::net::Ipv4Addr;

/// An administrator-authored record of what a given MAC should receive.
///
/// Immutable once produced by a backend; the cache relies on the value
/// round-tripping bit-for-bit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Definition {
    /// The address to hand out.
    pub ip: Ipv4Addr,
    #[serde(default)]
    pub hostname: Option<String>,
    /// Routers to advertise; some stores can only supply the first.
    #[serde(default)]
    pub gateways: Vec<Ipv4Addr>,
    #[serde(default)]
    pub subnet_mask: Option<Ipv4Addr>,
    #[serde(default)]
    pub broadcast_address: Option<Ipv4Addr>,
    #[serde(default)]
    pub domain_name: Option<String>,
    /// Conventionally at most three.
    #[serde(default)]
    pub domain_name_servers: Vec<Ipv4Addr>,
    /// Conventionally at most three.
    #[serde(default)]
    pub ntp_servers: Vec<Ipv4Addr>,
    /// Lease duration in seconds.
    pub lease_time: u32,
    /// The record's grouping tag in the store; opaque to the server.
    pub subnet: String,
    /// The record's serial within its subnet tag.
    pub serial: u32,
    /// Site-specific fields carried through to the hooks untouched.
    #[serde(default)]
    pub extra: Option<serde_json::Value>,
}

impl Definition {
    pub fn new<S: ToString>(ip: Ipv4Addr, lease_time: u32, subnet: S, serial: u32) -> Self {
        Definition {
            ip,
            hostname: None,
            gateways: Vec::new(),
            subnet_mask: None,
            broadcast_address: None,
            domain_name: None,
            domain_name_servers: Vec::new(),
            ntp_servers: Vec::new(),
            lease_time,
            subnet: subnet.to_string(),
            serial,
            extra: None,
        }
    }

    pub fn with_hostname<S: ToString>(mut self, hostname: S) -> Self {
        self.hostname = Some(hostname.to_string());
        self
    }

    pub fn with_gateways(mut self, gateways: Vec<Ipv4Addr>) -> Self {
        self.gateways = gateways;
        self
    }

    pub fn with_subnet_mask(mut self, subnet_mask: Ipv4Addr) -> Self {
        self.subnet_mask = Some(subnet_mask);
        self
    }

    pub fn with_broadcast_address(mut self, broadcast_address: Ipv4Addr) -> Self {
        self.broadcast_address = Some(broadcast_address);
        self
    }

    pub fn with_domain_name<S: ToString>(mut self, domain_name: S) -> Self {
        self.domain_name = Some(domain_name.to_string());
        self
    }

    pub fn with_domain_name_servers(mut self, servers: Vec<Ipv4Addr>) -> Self {
        self.domain_name_servers = servers;
        self
    }

    pub fn with_ntp_servers(mut self, servers: Vec<Ipv4Addr>) -> Self {
        self.ntp_servers = servers;
        self
    }

    /// A definition a store handed back that cannot be served; the caller
    /// treats the MAC as unknown.
    pub fn is_well_formed(&self) -> bool {
        !self.ip.is_unspecified() && self.lease_time > 0
    }

    fn extra_u32(&self, field: &str) -> Option<u32> {
        self.extra
            .as_ref()
            .and_then(|extra| extra.get(field))
            .and_then(|value| value.as_u64())
            .map(|value| value as u32)
    }

    /// T1; half the lease unless the record overrides it.
    pub fn renewal_time(&self) -> u32 {
        self.extra_u32("renewal_time")
            .unwrap_or(self.lease_time / 2)
    }

    /// T2; seven eighths of the lease unless the record overrides it.
    pub fn rebinding_time(&self) -> u32 {
        self.extra_u32("rebinding_time")
            .unwrap_or(self.lease_time / 8 * 7)
    }
}

/// The error type backends surface to the resolver.
#[derive(Fail, Debug)]
pub enum BackendError {
    #[fail(display = "backend unavailable: {}", _0)]
    Unavailable(String),
    #[fail(display = "backend query failed: {}", _0)]
    Query(String),
}

/// A source of definitions.
///
/// `lookup` may legally return several records for one MAC; the resolver
/// reduces them to at most one through the `filter_definitions` hook. An
/// empty vector means the MAC is unknown.
pub trait Backend: Send + Sync {
    fn lookup(&self, mac: &MacAddress) -> Result<Vec<Definition>, BackendError>;

    /// Invalidate whatever the backend holds; called on reload.
    fn reinitialise(&self) -> Result<(), BackendError> {
        Ok(())
    }
}

/// A backend that knows nobody. Useful for testing and for deployments
/// that provision every client through `handle_unknown_mac`.
pub struct Null;

impl Backend for Null {
    fn lookup(&self, _mac: &MacAddress) -> Result<Vec<Definition>, BackendError> {
        Ok(Vec::new())
    }
}
