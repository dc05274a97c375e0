//! Structured codecs for options whose payloads are defined outside
//! RFC 2132.
//!
//! Each codec exposes an `encode` producing wire bytes and a `decode`
//! producing the structured form. The typed accessors of `Options` hand
//! these payloads back raw; callers pick the codec by option code via the
//! registry's `rfc` flag.

use std::net::Ipv4Addr;

/// The error type returned by sub-codec decoders.
#[derive(Fail, Debug, Clone, PartialEq, Eq)]
pub enum RfcError {
    #[fail(display = "payload ends mid-structure")]
    Truncated,
    #[fail(display = "malformed payload: {}", _0)]
    BadFormat(&'static str),
}

fn read_u16(bytes: &[u8], position: usize) -> Result<u16, RfcError> {
    if position + 2 > bytes.len() {
        return Err(RfcError::Truncated);
    }
    Ok(((bytes[position] as u16) << 8) | bytes[position + 1] as u16)
}

fn read_u32(bytes: &[u8], position: usize) -> Result<u32, RfcError> {
    if position + 4 > bytes.len() {
        return Err(RfcError::Truncated);
    }
    Ok(((bytes[position] as u32) << 24)
        | ((bytes[position + 1] as u32) << 16)
        | ((bytes[position + 2] as u32) << 8)
        | bytes[position + 3] as u32)
}

fn read_ipv4(bytes: &[u8], position: usize) -> Result<Ipv4Addr, RfcError> {
    if position + 4 > bytes.len() {
        return Err(RfcError::Truncated);
    }
    Ok(Ipv4Addr::new(
        bytes[position],
        bytes[position + 1],
        bytes[position + 2],
        bytes[position + 3],
    ))
}

/*
RFC 1035 wire-format domain lists, shared by options 119, 88, 137 and 140.
*/

/// Encodes FQDNs as concatenated RFC 1035 label sequences.
///
/// No compression is emitted; every name stands alone.
pub fn encode_domain_list(domains: &[String]) -> Vec<u8> {
    let mut bytes = Vec::new();
    for domain in domains {
        for label in domain.split('.').filter(|label| !label.is_empty()) {
            bytes.push(label.len() as u8);
            bytes.extend_from_slice(label.as_bytes());
        }
        bytes.push(0);
    }
    bytes
}

/// Decodes concatenated RFC 1035 names, honouring compression pointers
/// within the payload (RFC 3397 permits them).
pub fn decode_domain_list(bytes: &[u8]) -> Result<Vec<String>, RfcError> {
    let mut domains = Vec::new();
    let mut position = 0;
    while position < bytes.len() {
        let (domain, next) = decode_domain(bytes, position)?;
        domains.push(domain);
        position = next;
    }
    Ok(domains)
}

/// Decodes one name starting at `position`; returns the name and the
/// position just past it in the outer walk.
fn decode_domain(bytes: &[u8], mut position: usize) -> Result<(String, usize), RfcError> {
    let mut labels: Vec<String> = Vec::new();
    let mut resume = None;
    let mut jumps = 0;
    loop {
        if position >= bytes.len() {
            return Err(RfcError::Truncated);
        }
        let length = bytes[position];
        if length == 0 {
            position += 1;
            break;
        }
        if length & 0xC0 == 0xC0 {
            // Compression pointer: fourteen bits of offset into the payload.
            let pointer = (read_u16(bytes, position)? & 0x3FFF) as usize;
            if resume.is_none() {
                resume = Some(position + 2);
            }
            jumps += 1;
            if jumps > bytes.len() {
                return Err(RfcError::BadFormat("compression pointer loop"));
            }
            position = pointer;
            continue;
        }
        if length & 0xC0 != 0 {
            return Err(RfcError::BadFormat("reserved label type"));
        }
        let start = position + 1;
        let end = start + length as usize;
        if end > bytes.len() {
            return Err(RfcError::Truncated);
        }
        labels.push(String::from_utf8_lossy(&bytes[start..end]).into_owned());
        position = end;
    }
    if labels.is_empty() {
        return Err(RfcError::BadFormat("empty domain name"));
    }
    Ok((labels.join("."), resume.unwrap_or(position)))
}

/*
RFC 3046 — option 82, relay agent information.
*/

pub fn rfc3046_encode(sub_options: &[(u8, Vec<u8>)]) -> Vec<u8> {
    let mut bytes = Vec::new();
    for &(code, ref value) in sub_options {
        bytes.push(code);
        bytes.push(value.len() as u8);
        bytes.extend_from_slice(value);
    }
    bytes
}

pub fn rfc3046_decode(bytes: &[u8]) -> Result<Vec<(u8, Vec<u8>)>, RfcError> {
    let mut sub_options = Vec::new();
    let mut position = 0;
    while position < bytes.len() {
        if position + 2 > bytes.len() {
            return Err(RfcError::Truncated);
        }
        let code = bytes[position];
        let length = bytes[position + 1] as usize;
        position += 2;
        if position + length > bytes.len() {
            return Err(RfcError::Truncated);
        }
        sub_options.push((code, bytes[position..position + length].to_vec()));
        position += length;
    }
    Ok(sub_options)
}

/*
RFC 2610 — options 78 and 79, SLP directory agents and service scope.
*/

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryAgents {
    pub mandatory: bool,
    pub addresses: Vec<Ipv4Addr>,
}

pub fn rfc2610_78_encode(agents: &DirectoryAgents) -> Vec<u8> {
    let mut bytes = vec![agents.mandatory as u8];
    for address in &agents.addresses {
        bytes.extend_from_slice(&address.octets());
    }
    bytes
}

pub fn rfc2610_78_decode(bytes: &[u8]) -> Result<DirectoryAgents, RfcError> {
    if bytes.is_empty() {
        return Err(RfcError::Truncated);
    }
    if (bytes.len() - 1) % 4 != 0 {
        return Err(RfcError::BadFormat("address block not a multiple of four"));
    }
    let mut addresses = Vec::with_capacity((bytes.len() - 1) / 4);
    let mut position = 1;
    while position < bytes.len() {
        addresses.push(read_ipv4(bytes, position)?);
        position += 4;
    }
    Ok(DirectoryAgents {
        mandatory: bytes[0] != 0,
        addresses,
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceScope {
    pub mandatory: bool,
    pub scope_list: String,
}

pub fn rfc2610_79_encode(scope: &ServiceScope) -> Vec<u8> {
    let mut bytes = vec![scope.mandatory as u8];
    bytes.extend_from_slice(scope.scope_list.as_bytes());
    bytes
}

pub fn rfc2610_79_decode(bytes: &[u8]) -> Result<ServiceScope, RfcError> {
    if bytes.is_empty() {
        return Err(RfcError::Truncated);
    }
    Ok(ServiceScope {
        mandatory: bytes[0] != 0,
        scope_list: String::from_utf8_lossy(&bytes[1..]).into_owned(),
    })
}

/*
RFC 3361 — option 120, SIP servers. The payload carries either IPv4
addresses or RFC 1035 names, exclusively; the enum makes a mixed payload
unrepresentable.
*/

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SipServers {
    Domains(Vec<String>),
    Addresses(Vec<Ipv4Addr>),
}

pub fn rfc3361_encode(servers: &SipServers) -> Vec<u8> {
    match *servers {
        SipServers::Domains(ref domains) => {
            let mut bytes = vec![0u8];
            bytes.extend_from_slice(&encode_domain_list(domains));
            bytes
        }
        SipServers::Addresses(ref addresses) => {
            let mut bytes = vec![1u8];
            for address in addresses {
                bytes.extend_from_slice(&address.octets());
            }
            bytes
        }
    }
}

pub fn rfc3361_decode(bytes: &[u8]) -> Result<SipServers, RfcError> {
    if bytes.is_empty() {
        return Err(RfcError::Truncated);
    }
    match bytes[0] {
        0 => Ok(SipServers::Domains(decode_domain_list(&bytes[1..])?)),
        1 => {
            if (bytes.len() - 1) % 4 != 0 || bytes.len() == 1 {
                return Err(RfcError::BadFormat("address block not a multiple of four"));
            }
            let mut addresses = Vec::with_capacity((bytes.len() - 1) / 4);
            let mut position = 1;
            while position < bytes.len() {
                addresses.push(read_ipv4(bytes, position)?);
                position += 4;
            }
            Ok(SipServers::Addresses(addresses))
        }
        _ => Err(RfcError::BadFormat("unknown encoding octet")),
    }
}

/*
RFC 3397 — option 119, domain search list.
RFC 4280 — option 88, BCMCS controller domains.
RFC 5223 — option 137, LoST servers.
All three are bare RFC 1035 domain lists.
*/

pub fn rfc3397_encode(domains: &[String]) -> Vec<u8> {
    encode_domain_list(domains)
}

pub fn rfc3397_decode(bytes: &[u8]) -> Result<Vec<String>, RfcError> {
    decode_domain_list(bytes)
}

pub fn rfc4280_encode(domains: &[String]) -> Vec<u8> {
    encode_domain_list(domains)
}

pub fn rfc4280_decode(bytes: &[u8]) -> Result<Vec<String>, RfcError> {
    decode_domain_list(bytes)
}

pub fn rfc5223_encode(domains: &[String]) -> Vec<u8> {
    encode_domain_list(domains)
}

pub fn rfc5223_decode(bytes: &[u8]) -> Result<Vec<String>, RfcError> {
    decode_domain_list(bytes)
}

/*
RFC 3442 — option 121, classless static routes.
*/

/// One classless route: a destination described by its significant prefix
/// octets and a router to reach it through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClasslessRoute {
    pub subnet: Ipv4Addr,
    /// CIDR width, 0 to 32.
    pub mask_width: u8,
    pub router: Ipv4Addr,
}

pub fn rfc3442_encode(routes: &[ClasslessRoute]) -> Result<Vec<u8>, RfcError> {
    let mut bytes = Vec::new();
    for route in routes {
        if route.mask_width > 32 {
            return Err(RfcError::BadFormat("CIDR width above 32"));
        }
        bytes.push(route.mask_width);
        let significant = (route.mask_width as usize + 7) / 8;
        bytes.extend_from_slice(&route.subnet.octets()[..significant]);
        bytes.extend_from_slice(&route.router.octets());
    }
    Ok(bytes)
}

pub fn rfc3442_decode(bytes: &[u8]) -> Result<Vec<ClasslessRoute>, RfcError> {
    let mut routes = Vec::new();
    let mut position = 0;
    while position < bytes.len() {
        let mask_width = bytes[position];
        if mask_width > 32 {
            return Err(RfcError::BadFormat("CIDR width above 32"));
        }
        position += 1;
        let significant = (mask_width as usize + 7) / 8;
        if position + significant + 4 > bytes.len() {
            return Err(RfcError::Truncated);
        }
        let mut subnet = [0u8; 4];
        subnet[..significant].copy_from_slice(&bytes[position..position + significant]);
        position += significant;
        let router = read_ipv4(bytes, position)?;
        position += 4;
        routes.push(ClasslessRoute {
            subnet: Ipv4Addr::from(subnet),
            mask_width,
            router,
        });
    }
    Ok(routes)
}

/*
RFC 3925 — options 124 and 125, vendor-identifying vendor class and
vendor-specific information, keyed by IANA enterprise number.
*/

pub fn rfc3925_124_encode(classes: &[(u32, Vec<u8>)]) -> Vec<u8> {
    let mut bytes = Vec::new();
    for &(enterprise, ref data) in classes {
        bytes.extend_from_slice(&[
            (enterprise >> 24) as u8,
            (enterprise >> 16) as u8,
            (enterprise >> 8) as u8,
            enterprise as u8,
        ]);
        bytes.push(data.len() as u8);
        bytes.extend_from_slice(data);
    }
    bytes
}

pub fn rfc3925_124_decode(bytes: &[u8]) -> Result<Vec<(u32, Vec<u8>)>, RfcError> {
    let mut classes = Vec::new();
    let mut position = 0;
    while position < bytes.len() {
        let enterprise = read_u32(bytes, position)?;
        position += 4;
        if position >= bytes.len() {
            return Err(RfcError::Truncated);
        }
        let length = bytes[position] as usize;
        position += 1;
        if position + length > bytes.len() {
            return Err(RfcError::Truncated);
        }
        classes.push((enterprise, bytes[position..position + length].to_vec()));
        position += length;
    }
    Ok(classes)
}

pub fn rfc3925_125_encode(blocks: &[(u32, Vec<(u8, Vec<u8>)>)]) -> Vec<u8> {
    let mut bytes = Vec::new();
    for &(enterprise, ref sub_options) in blocks {
        bytes.extend_from_slice(&[
            (enterprise >> 24) as u8,
            (enterprise >> 16) as u8,
            (enterprise >> 8) as u8,
            enterprise as u8,
        ]);
        let mut data = Vec::new();
        for &(code, ref value) in sub_options {
            data.push(code);
            data.push(value.len() as u8);
            data.extend_from_slice(value);
        }
        bytes.push(data.len() as u8);
        bytes.extend_from_slice(&data);
    }
    bytes
}

pub fn rfc3925_125_decode(bytes: &[u8]) -> Result<Vec<(u32, Vec<(u8, Vec<u8>)>)>, RfcError> {
    let mut blocks = Vec::new();
    for (enterprise, data) in rfc3925_124_decode(bytes)? {
        blocks.push((enterprise, rfc3046_decode(&data)?));
    }
    Ok(blocks)
}

/*
RFC 4174 — option 83, iSNS configuration.
*/

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IsnsConfig {
    pub functions: u16,
    pub dd_access: u16,
    pub admin_flags: u16,
    pub security: u32,
    pub servers: Vec<Ipv4Addr>,
}

pub fn rfc4174_encode(config: &IsnsConfig) -> Vec<u8> {
    let mut bytes = vec![
        (config.functions >> 8) as u8,
        config.functions as u8,
        (config.dd_access >> 8) as u8,
        config.dd_access as u8,
        (config.admin_flags >> 8) as u8,
        config.admin_flags as u8,
        (config.security >> 24) as u8,
        (config.security >> 16) as u8,
        (config.security >> 8) as u8,
        config.security as u8,
    ];
    for server in &config.servers {
        bytes.extend_from_slice(&server.octets());
    }
    bytes
}

pub fn rfc4174_decode(bytes: &[u8]) -> Result<IsnsConfig, RfcError> {
    if bytes.len() < 10 || (bytes.len() - 10) % 4 != 0 {
        return Err(RfcError::BadFormat("fixed block is ten bytes plus addresses"));
    }
    let mut servers = Vec::with_capacity((bytes.len() - 10) / 4);
    let mut position = 10;
    while position < bytes.len() {
        servers.push(read_ipv4(bytes, position)?);
        position += 4;
    }
    Ok(IsnsConfig {
        functions: read_u16(bytes, 0)?,
        dd_access: read_u16(bytes, 2)?,
        admin_flags: read_u16(bytes, 4)?,
        security: read_u32(bytes, 6)?,
        servers,
    })
}

/*
RFC 5678 — options 139 and 140, Mobility Services (IPv4 addresses and
FQDNs respectively), grouped under sub-option codes.
*/

pub fn rfc5678_139_encode(entries: &[(u8, Vec<Ipv4Addr>)]) -> Vec<u8> {
    let mut bytes = Vec::new();
    for &(code, ref addresses) in entries {
        bytes.push(code);
        bytes.push((addresses.len() * 4) as u8);
        for address in addresses {
            bytes.extend_from_slice(&address.octets());
        }
    }
    bytes
}

pub fn rfc5678_139_decode(bytes: &[u8]) -> Result<Vec<(u8, Vec<Ipv4Addr>)>, RfcError> {
    let mut entries = Vec::new();
    for (code, data) in rfc3046_decode(bytes)? {
        if data.len() % 4 != 0 {
            return Err(RfcError::BadFormat("address block not a multiple of four"));
        }
        let addresses = data
            .chunks(4)
            .map(|chunk| Ipv4Addr::new(chunk[0], chunk[1], chunk[2], chunk[3]))
            .collect();
        entries.push((code, addresses));
    }
    Ok(entries)
}

pub fn rfc5678_140_encode(entries: &[(u8, Vec<String>)]) -> Vec<u8> {
    let mut bytes = Vec::new();
    for &(code, ref domains) in entries {
        let encoded = encode_domain_list(domains);
        bytes.push(code);
        bytes.push(encoded.len() as u8);
        bytes.extend_from_slice(&encoded);
    }
    bytes
}

pub fn rfc5678_140_decode(bytes: &[u8]) -> Result<Vec<(u8, Vec<String>)>, RfcError> {
    let mut entries = Vec::new();
    for (code, data) in rfc3046_decode(bytes)? {
        entries.push((code, decode_domain_list(&data)?));
    }
    Ok(entries)
}
