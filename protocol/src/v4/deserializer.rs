//! DHCP message deserialization module.

use std::cmp;
use std::collections::BTreeSet;
use std::io::Cursor;

use bytes::Buf;
use eui48::MacAddress;

use error::DecodeError;

use super::constants::*;
use super::options::{Options, Overload};
use super::Packet;

impl Packet {
    /// DHCP message deserialization.
    ///
    /// Requires the fixed header plus the magic cookie (240 bytes). The
    /// options area is walked TLV-style until an end octet or the end of
    /// the buffer; option 52 extends the walk into the `file` and `sname`
    /// fields per RFC 2131 §4.1. Duplicate options keep their first
    /// occurrence; the rest are logged and dropped.
    pub fn from_bytes(src: &[u8]) -> Result<Self, DecodeError> {
        if src.len() < OFFSET_OPTIONS {
            return Err(DecodeError::Truncated(src.len()));
        }

        let mut cursor = Cursor::new(src);
        let mut packet = Packet::new();
        packet.operation_code = cursor.get_u8().into();
        packet.hardware_type = cursor.get_u8().into();
        packet.hardware_address_length = cursor.get_u8();
        packet.hops = cursor.get_u8();
        packet.transaction_id = cursor.get_u32_be();
        packet.seconds = cursor.get_u16_be();
        packet.is_broadcast = cursor.get_u16_be() & FLAG_BROADCAST != 0;
        packet.client_ip_address = cursor.get_u32_be().into();
        packet.your_ip_address = cursor.get_u32_be().into();
        packet.server_ip_address = cursor.get_u32_be().into();
        packet.gateway_ip_address = cursor.get_u32_be().into();

        let hardware_length = cmp::min(packet.hardware_address_length as usize, 6);
        packet.client_hardware_address = {
            let mut address = [0u8; 6];
            address[..hardware_length].copy_from_slice(&src[28..28 + hardware_length]);
            MacAddress::new(address)
        };
        cursor.advance(SIZE_HARDWARE_ADDRESS);

        packet.server_name = src[OFFSET_SERVER_NAME..OFFSET_BOOT_FILENAME].to_vec();
        packet.boot_filename = src[OFFSET_BOOT_FILENAME..OFFSET_MAGIC_COOKIE].to_vec();
        cursor.advance(SIZE_SERVER_NAME + SIZE_BOOT_FILENAME);

        if cursor.get_u32_be() != MAGIC_COOKIE {
            return Err(DecodeError::BadMagic);
        }

        Self::append_options(&mut packet.options, &src[OFFSET_OPTIONS..])?;
        match packet.options.byte(OPTION_OVERLOAD).map(Overload::from) {
            Some(Overload::File) => {
                Self::append_options(&mut packet.options, &packet.boot_filename.to_owned())?;
            }
            Some(Overload::Sname) => {
                Self::append_options(&mut packet.options, &packet.server_name.to_owned())?;
            }
            Some(Overload::Both) => {
                Self::append_options(&mut packet.options, &packet.boot_filename.to_owned())?;
                Self::append_options(&mut packet.options, &packet.server_name.to_owned())?;
            }
            _ => {}
        }

        packet.requested = packet.options.get_raw(OPTION_PARAMETER_LIST).map(|codes| {
            let mut requested: BTreeSet<u8> = codes.iter().cloned().collect();
            requested.extend(MANDATORY_OPTIONS.iter().cloned());
            requested
        });
        packet.maximum_size = {
            let datagram = packet.options.u16(OPTION_MAX_REASSEMBLY_SIZE);
            let dhcp = packet.options.u16(OPTION_MAX_MESSAGE_SIZE);
            match (datagram, dhcp) {
                (Some(datagram), Some(dhcp)) => Some(cmp::min(datagram, dhcp)),
                (hint, None) => hint,
                (None, hint) => hint,
            }
        };

        Ok(packet)
    }

    /// Walks one TLV region, appending into `options`. First occurrence of
    /// a duplicated code wins; an overrunning length octet fails the whole
    /// packet.
    fn append_options(options: &mut Options, src: &[u8]) -> Result<(), DecodeError> {
        let mut position = 0;
        while position < src.len() {
            let code = src[position];
            position += 1;
            if code == OPTION_PAD {
                continue;
            }
            if code == OPTION_END {
                break;
            }

            if position >= src.len() {
                return Err(DecodeError::BadOptionLength(code));
            }
            let length = src[position] as usize;
            position += 1;
            if position + length > src.len() {
                return Err(DecodeError::BadOptionLength(code));
            }

            if options.contains(code) {
                warn!("{}; keeping the first occurrence", DecodeError::DuplicateOption(code));
            } else {
                options.insert_raw(code, src[position..position + length].to_vec());
            }
            position += length;
        }
        Ok(())
    }
}
