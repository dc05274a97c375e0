//! DHCP message serialization module.

use std::cmp;

use bytes::BufMut;

use super::constants::*;
use super::Packet;

/// One encoded TLV run for a single option; values longer than 255 bytes
/// are split into consecutive chunks carrying the same code.
fn encoded_length(value: &[u8]) -> usize {
    if value.is_empty() {
        return 2;
    }
    let chunks = (value.len() + 254) / 255;
    chunks * 2 + value.len()
}

fn put_option(buffer: &mut Vec<u8>, code: u8, value: &[u8]) {
    if value.is_empty() {
        buffer.put_u8(code);
        buffer.put_u8(0);
        return;
    }
    for chunk in value.chunks(255) {
        buffer.put_u8(code);
        buffer.put_u8(chunk.len() as u8);
        buffer.put_slice(chunk);
    }
}

impl Packet {
    /// DHCP message serialization.
    ///
    /// Options are emitted with code 53 first, then 54 and 51, then the
    /// rest in ascending code order, filtered by the client's parameter
    /// request list. The result is padded to the 300-byte BOOTP minimum.
    /// When the encoding would exceed the client's size hint (or the
    /// Ethernet MTU when no hint was given), options 66 and 67 are
    /// relocated into `sname`/`file` under option 52; past that, the
    /// largest non-mandatory options are dropped with a warning.
    pub fn to_bytes(&self) -> Vec<u8> {
        let budget = self
            .maximum_size
            .map(|hint| cmp::max(hint as usize, SIZE_MESSAGE_MINIMAL))
            .unwrap_or(DEFAULT_MTU)
            - SIZE_HEADER_IP
            - SIZE_HEADER_UDP;

        // Selection and ordering.
        let mut ordered: Vec<u8> = OPTION_ORDERING
            .iter()
            .cloned()
            .filter(|code| self.options.contains(*code) && self.is_requested_option(*code))
            .collect();
        for (code, _) in self.options.iter() {
            if !OPTION_ORDERING.contains(code) && self.is_requested_option(*code) {
                ordered.push(*code);
            }
        }

        let mut server_name = self.server_name.to_owned();
        let mut boot_filename = self.boot_filename.to_owned();
        let mut overload = 0u8;

        let options_length = |codes: &[u8], options: &super::Options| -> usize {
            codes
                .iter()
                .map(|code| encoded_length(options.get_raw(*code).unwrap_or(&[])))
                .sum()
        };

        // The fixed header, the cookie, option 52 if needed, and the end
        // octet all come out of the same budget.
        let fits = |length: usize, overloaded: bool| {
            OFFSET_OPTIONS + length + 1 + if overloaded { 3 } else { 0 } <= budget
        };

        if !fits(options_length(&ordered, &self.options), false) {
            // Relocate 66 into sname and 67 into file, where free.
            for &(code, into_file) in &[(OPTION_BOOTFILE_NAME, true), (OPTION_TFTP_SERVER_NAME, false)] {
                let field_used = if into_file {
                    boot_filename.iter().any(|byte| *byte != 0)
                } else {
                    server_name.iter().any(|byte| *byte != 0)
                };
                if field_used || !ordered.contains(&code) {
                    continue;
                }
                let value = self.options.get_raw(code).unwrap_or(&[]);
                let capacity = if into_file { SIZE_BOOT_FILENAME } else { SIZE_SERVER_NAME };
                if encoded_length(value) + 1 > capacity {
                    continue;
                }
                let mut field = Vec::with_capacity(capacity);
                put_option(&mut field, code, value);
                field.put_u8(OPTION_END);
                if into_file {
                    boot_filename = field;
                    overload |= 1;
                } else {
                    server_name = field;
                    overload |= 2;
                }
                ordered.retain(|candidate| *candidate != code);
            }

            // Still too big: shed the largest non-mandatory options.
            while !fits(options_length(&ordered, &self.options), overload != 0) {
                let victim = ordered
                    .iter()
                    .cloned()
                    .filter(|code| !MANDATORY_OPTIONS.contains(code))
                    .max_by_key(|code| encoded_length(self.options.get_raw(*code).unwrap_or(&[])));
                match victim {
                    Some(code) => {
                        warn!(
                            "Dropping option {} to fit the {} byte budget",
                            code, budget
                        );
                        ordered.retain(|candidate| *candidate != code);
                    }
                    None => break,
                }
            }
        }

        let mut buffer = Vec::with_capacity(SIZE_MESSAGE_MINIMAL);
        buffer.put_u8(self.operation_code as u8);
        buffer.put_u8(self.hardware_type as u8);
        buffer.put_u8(self.hardware_address_length);
        buffer.put_u8(self.hops);
        buffer.put_u32_be(self.transaction_id);
        buffer.put_u16_be(self.seconds);
        buffer.put_u16_be(if self.is_broadcast { FLAG_BROADCAST } else { 0x0000 });
        buffer.put_u32_be(u32::from(self.client_ip_address));
        buffer.put_u32_be(u32::from(self.your_ip_address));
        buffer.put_u32_be(u32::from(self.server_ip_address));
        buffer.put_u32_be(u32::from(self.gateway_ip_address));
        buffer.put_slice(self.client_hardware_address.as_bytes());
        buffer.put_slice(&vec![0u8; SIZE_HARDWARE_ADDRESS - self.client_hardware_address.as_bytes().len()]);
        let server_name_length = cmp::min(server_name.len(), SIZE_SERVER_NAME);
        buffer.put_slice(&server_name[..server_name_length]);
        buffer.put_slice(&vec![0u8; SIZE_SERVER_NAME - server_name_length]);
        let boot_filename_length = cmp::min(boot_filename.len(), SIZE_BOOT_FILENAME);
        buffer.put_slice(&boot_filename[..boot_filename_length]);
        buffer.put_slice(&vec![0u8; SIZE_BOOT_FILENAME - boot_filename_length]);
        buffer.put_u32_be(MAGIC_COOKIE);

        // Option 52 slots into the ascending section, after the 53/54/51
        // prefix clients expect at the front.
        let prefix = ordered
            .iter()
            .take_while(|code| OPTION_ORDERING.contains(*code))
            .count();
        let mut emitted_overload = overload == 0;
        for (index, code) in ordered.iter().enumerate() {
            if !emitted_overload && index >= prefix && *code > OPTION_OVERLOAD {
                put_option(&mut buffer, OPTION_OVERLOAD, &[overload]);
                emitted_overload = true;
            }
            put_option(&mut buffer, *code, self.options.get_raw(*code).unwrap_or(&[]));
        }
        if !emitted_overload {
            put_option(&mut buffer, OPTION_OVERLOAD, &[overload]);
        }
        buffer.put_u8(OPTION_END);

        while buffer.len() < SIZE_MESSAGE_PADDED {
            buffer.put_u8(0);
        }
        buffer
    }
}
