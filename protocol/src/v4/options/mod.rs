//! DHCP options module.
//!
//! Options are stored as a map from option code to raw payload bytes, the
//! way they travel on the wire. The typed accessors consult the static
//! registry to convert to and from [`OptionValue`](enum.OptionValue.html).
//! Codes 0 (pad) and 255 (end) are never stored.

mod message_type;
mod overload;

pub use self::{message_type::MessageType, overload::Overload};

use std::collections::btree_map;
use std::collections::BTreeMap;
use std::net::Ipv4Addr;

use error::OptionError;
use v4::constants::{OPTION_END, OPTION_PAD};
use v4::registry::{self, ValueType};

/// A typed option value, tagged per the registry entry for its code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    Ipv4(Ipv4Addr),
    Ipv4List(Vec<Ipv4Addr>),
    Byte(u8),
    Bytes(Vec<u8>),
    String(String),
    Bool(bool),
    U16(u16),
    U16List(Vec<u16>),
    U32(u32),
    U32List(Vec<u32>),
    Empty,
}

impl OptionValue {
    /// Serialises the value into wire bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        use self::OptionValue::*;
        match *self {
            Ipv4(address) => address.octets().to_vec(),
            Ipv4List(ref addresses) => {
                let mut bytes = Vec::with_capacity(addresses.len() * 4);
                for address in addresses {
                    bytes.extend_from_slice(&address.octets());
                }
                bytes
            }
            Byte(value) => vec![value],
            Bytes(ref value) => value.to_owned(),
            String(ref value) => value.as_bytes().to_vec(),
            Bool(value) => vec![value as u8],
            U16(value) => vec![(value >> 8) as u8, value as u8],
            U16List(ref values) => {
                let mut bytes = Vec::with_capacity(values.len() * 2);
                for value in values {
                    bytes.push((*value >> 8) as u8);
                    bytes.push(*value as u8);
                }
                bytes
            }
            U32(value) => vec![
                (value >> 24) as u8,
                (value >> 16) as u8,
                (value >> 8) as u8,
                value as u8,
            ],
            U32List(ref values) => {
                let mut bytes = Vec::with_capacity(values.len() * 4);
                for value in values {
                    bytes.push((*value >> 24) as u8);
                    bytes.push((*value >> 16) as u8);
                    bytes.push((*value >> 8) as u8);
                    bytes.push(*value as u8);
                }
                bytes
            }
            Empty => Vec::new(),
        }
    }

    /// Deserialises wire bytes into the tagged form for a payload type.
    ///
    /// The caller has already checked the length against the type; this
    /// only performs the conversion.
    fn from_bytes(value_type: ValueType, bytes: &[u8]) -> OptionValue {
        match value_type {
            ValueType::Ipv4 => {
                OptionValue::Ipv4(Ipv4Addr::new(bytes[0], bytes[1], bytes[2], bytes[3]))
            }
            ValueType::Ipv4Plus | ValueType::Ipv4Mult => OptionValue::Ipv4List(
                bytes
                    .chunks(4)
                    .map(|chunk| Ipv4Addr::new(chunk[0], chunk[1], chunk[2], chunk[3]))
                    .collect(),
            ),
            ValueType::Byte => OptionValue::Byte(bytes[0]),
            ValueType::Bool => OptionValue::Bool(bytes[0] != 0),
            ValueType::String => {
                OptionValue::String(String::from_utf8_lossy(bytes).into_owned())
            }
            ValueType::U16 => OptionValue::U16(((bytes[0] as u16) << 8) | bytes[1] as u16),
            ValueType::U16Plus => OptionValue::U16List(
                bytes
                    .chunks(2)
                    .map(|chunk| ((chunk[0] as u16) << 8) | chunk[1] as u16)
                    .collect(),
            ),
            ValueType::U32 => OptionValue::U32(
                ((bytes[0] as u32) << 24)
                    | ((bytes[1] as u32) << 16)
                    | ((bytes[2] as u32) << 8)
                    | bytes[3] as u32,
            ),
            ValueType::U32Plus => OptionValue::U32List(
                bytes
                    .chunks(4)
                    .map(|chunk| {
                        ((chunk[0] as u32) << 24)
                            | ((chunk[1] as u32) << 16)
                            | ((chunk[2] as u32) << 8)
                            | chunk[3] as u32
                    })
                    .collect(),
            ),
            ValueType::None => OptionValue::Empty,
            ValueType::BytePlus | ValueType::Identifier | ValueType::Opaque => {
                OptionValue::Bytes(bytes.to_vec())
            }
        }
    }
}

/// The option store of a packet: code to raw payload, ascending by code.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Options {
    map: BTreeMap<u8, Vec<u8>>,
}

impl Options {
    pub fn new() -> Self {
        Options {
            map: BTreeMap::new(),
        }
    }

    /// Stores raw payload bytes without registry validation.
    ///
    /// Pad and end are never stored; inserting them is a no-op returning
    /// `false`, as is overwriting an existing code.
    pub fn insert_raw(&mut self, code: u8, value: Vec<u8>) -> bool {
        if code == OPTION_PAD || code == OPTION_END || self.map.contains_key(&code) {
            return false;
        }
        self.map.insert(code, value);
        true
    }

    /// Stores raw payload bytes, replacing any previous value.
    pub fn replace_raw(&mut self, code: u8, value: Vec<u8>) {
        if code != OPTION_PAD && code != OPTION_END {
            self.map.insert(code, value);
        }
    }

    pub fn get_raw(&self, code: u8) -> Option<&[u8]> {
        self.map.get(&code).map(|value| &value[..])
    }

    pub fn remove(&mut self, code: u8) -> bool {
        self.map.remove(&code).is_some()
    }

    pub fn contains(&self, code: u8) -> bool {
        self.map.contains_key(&code)
    }

    pub fn iter(&self) -> btree_map::Iter<u8, Vec<u8>> {
        self.map.iter()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Retrieves an option as its registry-typed value.
    ///
    /// Options owned by an RFC sub-codec, and codes the registry does not
    /// describe, come back as `OptionValue::Bytes`.
    pub fn get(&self, code: u8) -> Result<OptionValue, OptionError> {
        let value = match self.map.get(&code) {
            Some(value) => value,
            None => return Err(OptionError::NoSuchOption(code)),
        };
        let spec = registry::spec(code);
        if spec.rfc {
            return Ok(OptionValue::Bytes(value.to_owned()));
        }
        if !spec.value_type.accepts_length(value.len()) {
            return Err(OptionError::WrongType(code));
        }
        Ok(OptionValue::from_bytes(spec.value_type, value))
    }

    /// Validates a typed value against the registry and stores it.
    ///
    /// Returns `false` on a length or range violation rather than failing
    /// hard; a misconfigured value should cost one option, not the request.
    pub fn set(&mut self, code: u8, value: &OptionValue) -> bool {
        if code == OPTION_PAD || code == OPTION_END {
            return false;
        }
        let bytes = value.to_bytes();
        if bytes.len() > 255 {
            return false;
        }
        let spec = registry::spec(code);
        if !spec.rfc && !spec.value_type.accepts_length(bytes.len()) {
            return false;
        }
        self.map.insert(code, bytes);
        true
    }

    /*
    Convenience accessors used throughout the engine. Getters log and
    swallow type mismatches: the request proceeds without that option.
    */

    pub fn ipv4(&self, code: u8) -> Option<Ipv4Addr> {
        match self.get(code) {
            Ok(OptionValue::Ipv4(address)) => Some(address),
            Ok(_) | Err(OptionError::NoSuchOption(_)) => None,
            Err(error) => {
                warn!("{}", error);
                None
            }
        }
    }

    pub fn ipv4_list(&self, code: u8) -> Option<Vec<Ipv4Addr>> {
        match self.get(code) {
            Ok(OptionValue::Ipv4List(addresses)) => Some(addresses),
            Ok(OptionValue::Ipv4(address)) => Some(vec![address]),
            Ok(_) | Err(OptionError::NoSuchOption(_)) => None,
            Err(error) => {
                warn!("{}", error);
                None
            }
        }
    }

    pub fn byte(&self, code: u8) -> Option<u8> {
        match self.get(code) {
            Ok(OptionValue::Byte(value)) => Some(value),
            Ok(OptionValue::Bool(value)) => Some(value as u8),
            Ok(_) | Err(OptionError::NoSuchOption(_)) => None,
            Err(error) => {
                warn!("{}", error);
                None
            }
        }
    }

    pub fn u16(&self, code: u8) -> Option<u16> {
        match self.get(code) {
            Ok(OptionValue::U16(value)) => Some(value),
            Ok(_) | Err(OptionError::NoSuchOption(_)) => None,
            Err(error) => {
                warn!("{}", error);
                None
            }
        }
    }

    pub fn u32(&self, code: u8) -> Option<u32> {
        match self.get(code) {
            Ok(OptionValue::U32(value)) => Some(value),
            Ok(_) | Err(OptionError::NoSuchOption(_)) => None,
            Err(error) => {
                warn!("{}", error);
                None
            }
        }
    }

    pub fn string(&self, code: u8) -> Option<String> {
        match self.get(code) {
            Ok(OptionValue::String(value)) => Some(value),
            Ok(_) | Err(OptionError::NoSuchOption(_)) => None,
            Err(error) => {
                warn!("{}", error);
                None
            }
        }
    }

    /// The DHCP message type, when present and defined.
    pub fn message_type(&self) -> Option<MessageType> {
        match self.byte(super::constants::OPTION_MESSAGE_TYPE) {
            Some(value) => match MessageType::from(value) {
                MessageType::Undefined => None,
                message_type => Some(message_type),
            },
            None => None,
        }
    }
}
