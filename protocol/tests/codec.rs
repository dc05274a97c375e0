extern crate protocol;

use protocol::*;

/// Builds the fixed header of a BOOTREQUEST with the magic cookie and the
/// given options area appended verbatim.
fn raw_packet(options: &[u8]) -> Vec<u8> {
    let mut bytes = vec![0u8; 236];
    bytes[0] = 1; // op
    bytes[1] = 1; // htype
    bytes[2] = 6; // hlen
    bytes[4..8].copy_from_slice(&[0x12, 0x34, 0x56, 0x78]); // xid
    bytes[28..34].copy_from_slice(&[0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]); // chaddr
    bytes.extend_from_slice(&[0x63, 0x82, 0x53, 0x63]);
    bytes.extend_from_slice(options);
    bytes
}

#[test]
fn decode_rejects_239_bytes() {
    let bytes = raw_packet(&[]);
    assert_eq!(
        Packet::from_bytes(&bytes[..239]).unwrap_err(),
        DecodeError::Truncated(239)
    );
}

#[test]
fn decode_accepts_bare_240_bytes() {
    let bytes = raw_packet(&[]);
    assert_eq!(bytes.len(), 240);
    let packet = Packet::from_bytes(&bytes).unwrap();
    assert!(packet.options.is_empty());
    assert_eq!(packet.transaction_id, 0x1234_5678);
    assert_eq!(
        packet.client_hardware_address.to_hex_string(),
        "aa:bb:cc:dd:ee:ff"
    );
}

#[test]
fn decode_rejects_a_bad_cookie() {
    let mut bytes = raw_packet(&[53, 1, 1, 255]);
    bytes[236] = 0x63;
    bytes[237] = 0x82;
    bytes[238] = 0x53;
    bytes[239] = 0x64;
    assert_eq!(Packet::from_bytes(&bytes).unwrap_err(), DecodeError::BadMagic);
}

#[test]
fn decode_rejects_an_overrunning_length_octet() {
    let bytes = raw_packet(&[53, 1, 1, 12, 200, b'a', b'b']);
    assert_eq!(
        Packet::from_bytes(&bytes).unwrap_err(),
        DecodeError::BadOptionLength(12)
    );
}

#[test]
fn decode_keeps_the_first_duplicate() {
    let bytes = raw_packet(&[53, 1, 1, 53, 1, 3, 255]);
    let packet = Packet::from_bytes(&bytes).unwrap();
    assert_eq!(packet.options.message_type(), Some(MessageType::DhcpDiscover));
}

#[test]
fn decode_skips_pad_octets() {
    let bytes = raw_packet(&[0, 0, 53, 1, 1, 0, 255]);
    let packet = Packet::from_bytes(&bytes).unwrap();
    assert_eq!(packet.options.len(), 1);
}

#[test]
fn decode_continues_into_overloaded_fields() {
    let mut bytes = raw_packet(&[53, 1, 8, 52, 1, 1, 255]);
    // Option 67 tucked into the `file` field.
    bytes[OFFSET_BOOT_FILENAME] = 67;
    bytes[OFFSET_BOOT_FILENAME + 1] = 4;
    bytes[OFFSET_BOOT_FILENAME + 2..OFFSET_BOOT_FILENAME + 6].copy_from_slice(b"boot");
    bytes[OFFSET_BOOT_FILENAME + 6] = 255;

    let packet = Packet::from_bytes(&bytes).unwrap();
    assert_eq!(
        packet.options.string(OPTION_BOOTFILE_NAME),
        Some("boot".to_owned())
    );
}

#[test]
fn decode_honours_contradictory_overload() {
    // Overload claims the file field carries options, but it is empty;
    // the walk simply finds nothing there.
    let bytes = raw_packet(&[53, 1, 1, 52, 1, 1, 255]);
    let packet = Packet::from_bytes(&bytes).unwrap();
    assert_eq!(packet.options.len(), 2);
}

#[test]
fn decode_captures_the_request_list_and_size_hint() {
    let bytes = raw_packet(&[53, 1, 1, 55, 3, 1, 3, 6, 57, 2, 0x02, 0x40, 255]);
    let packet = Packet::from_bytes(&bytes).unwrap();
    assert!(packet.is_requested_option(1));
    assert!(packet.is_requested_option(3));
    // Mandatory options are unioned in even when unlisted.
    assert!(packet.is_requested_option(51));
    assert!(packet.is_requested_option(54));
    // Unlisted, non-mandatory.
    assert!(!packet.is_requested_option(12));
    assert_eq!(packet.maximum_size, Some(576));
}

#[test]
fn encode_pads_to_the_bootp_minimum() {
    let mut packet = Packet::new();
    packet.operation_code = OperationCode::BootReply;
    packet
        .options
        .set(OPTION_MESSAGE_TYPE, &OptionValue::Byte(MessageType::DhcpOffer as u8));
    let bytes = packet.to_bytes();
    assert!(bytes.len() >= SIZE_MESSAGE_PADDED);
}

#[test]
fn encode_places_53_54_51_first_then_ascending() {
    let mut packet = Packet::new();
    packet.operation_code = OperationCode::BootReply;
    packet.options.set(OPTION_SUBNET_MASK, &OptionValue::Ipv4("255.255.255.0".parse().unwrap()));
    packet.options.set(OPTION_LEASE_TIME, &OptionValue::U32(3600));
    packet.options.set(OPTION_SERVER_ID, &OptionValue::Ipv4("192.168.0.1".parse().unwrap()));
    packet.options.set(OPTION_MESSAGE_TYPE, &OptionValue::Byte(2));
    packet.options.set(OPTION_ROUTERS, &OptionValue::Ipv4List(vec!["192.168.0.1".parse().unwrap()]));

    let bytes = packet.to_bytes();
    let options = &bytes[OFFSET_OPTIONS..];
    assert_eq!(options[0], OPTION_MESSAGE_TYPE);
    assert_eq!(options[3], OPTION_SERVER_ID);
    assert_eq!(options[9], OPTION_LEASE_TIME);
    // The remainder is ascending: 1 before 3.
    assert_eq!(options[15], OPTION_SUBNET_MASK);
    assert_eq!(options[21], OPTION_ROUTERS);
    assert_eq!(options[27], OPTION_END);
}

#[test]
fn encode_filters_by_the_request_list() {
    let bytes = raw_packet(&[53, 1, 1, 55, 1, 1, 255]);
    let mut packet = Packet::from_bytes(&bytes).unwrap();
    packet.transform_to_offer();
    packet.options.set(OPTION_SUBNET_MASK, &OptionValue::Ipv4("255.255.255.0".parse().unwrap()));
    packet.options.set(OPTION_HOSTNAME, &OptionValue::String("host".to_owned()));

    let encoded = packet.to_bytes();
    let reparsed = Packet::from_bytes(&encoded).unwrap();
    assert!(reparsed.options.contains(OPTION_SUBNET_MASK));
    // Hostname was neither requested nor mandatory.
    assert!(!reparsed.options.contains(OPTION_HOSTNAME));
}

#[test]
fn encode_decode_round_trip() {
    let bytes = raw_packet(&[53, 1, 1, 50, 4, 192, 168, 0, 197, 61, 7, 1, 0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF, 255]);
    let packet = Packet::from_bytes(&bytes).unwrap();
    let reparsed = Packet::from_bytes(&packet.to_bytes()).unwrap();

    assert_eq!(reparsed.transaction_id, packet.transaction_id);
    assert_eq!(
        reparsed.client_hardware_address,
        packet.client_hardware_address
    );
    assert_eq!(reparsed.options.message_type(), packet.options.message_type());
    assert_eq!(
        reparsed.options.ipv4(OPTION_REQUESTED_IP),
        packet.options.ipv4(OPTION_REQUESTED_IP)
    );
    assert_eq!(
        reparsed.options.get_raw(OPTION_CLIENT_ID),
        packet.options.get_raw(OPTION_CLIENT_ID)
    );
}

#[test]
fn encode_relocates_66_and_67_under_pressure() {
    let mut packet = Packet::new();
    packet.operation_code = OperationCode::BootReply;
    packet.maximum_size = Some(576);
    packet.options.set(OPTION_MESSAGE_TYPE, &OptionValue::Byte(5));
    packet
        .options
        .set(OPTION_BOOTFILE_NAME, &OptionValue::String("pxelinux.0".to_owned()));
    packet
        .options
        .set(OPTION_TFTP_SERVER_NAME, &OptionValue::String("tftp.example.org".to_owned()));
    // Enough opaque vendor payload to overflow a 576-byte budget.
    packet
        .options
        .set(OPTION_VENDOR_SPECIFIC_INFORMATION, &OptionValue::Bytes(vec![0x55; 250]));
    packet.options.set(99, &OptionValue::Bytes(vec![0x66; 40])); // geoconf_civic

    let encoded = packet.to_bytes();
    assert!(encoded.len() <= 576 - SIZE_HEADER_IP - SIZE_HEADER_UDP);

    let reparsed = Packet::from_bytes(&encoded).unwrap();
    // The overload walk recovers the relocated options transparently.
    assert_eq!(
        reparsed.options.string(OPTION_BOOTFILE_NAME),
        Some("pxelinux.0".to_owned())
    );
    assert_eq!(
        reparsed.options.string(OPTION_TFTP_SERVER_NAME),
        Some("tftp.example.org".to_owned())
    );
}

#[test]
fn validate_requires_a_message_type() {
    let mut bytes = raw_packet(&[255]);
    bytes.extend_from_slice(&[0; 8]);
    let packet = Packet::from_bytes(&bytes).unwrap();
    assert!(packet.validate().is_err());
}

#[test]
fn validate_accepts_a_selecting_request() {
    let bytes = raw_packet(&[53, 1, 3, 54, 4, 192, 168, 0, 1, 50, 4, 192, 168, 0, 197, 255]);
    let packet = Packet::from_bytes(&bytes).unwrap();
    assert_eq!(packet.validate().unwrap(), MessageType::DhcpRequest);
}
