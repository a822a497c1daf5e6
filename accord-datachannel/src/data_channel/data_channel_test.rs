use super::*;

fn config(label: &str) -> DataChannelConfig {
    DataChannelConfig {
        label: label.to_owned(),
        ..Default::default()
    }
}

#[test]
fn test_dial_queues_open() {
    let mut channel = DataChannel::dial(config("chat"), 2).unwrap();
    assert_eq!(channel.state(), DataChannelState::Connecting);

    let msg = channel.poll_write().expect("expected a DCEP message");
    assert_eq!(msg.stream_id, 2);
    assert_eq!(msg.ppi, PayloadProtocolIdentifier::Dcep);
    assert_eq!(msg.payload[0], 0x03);
    assert!(channel.poll_write().is_none());
}

#[test]
fn test_negotiated_channel_sends_no_open() {
    let mut channel = DataChannel::dial(
        DataChannelConfig {
            negotiated: true,
            ..config("chat")
        },
        4,
    )
    .unwrap();
    assert!(channel.poll_write().is_none());
}

#[test]
fn test_open_then_ack_handshake() {
    let mut dialer = DataChannel::dial(config("chat"), 2).unwrap();
    let open = dialer.poll_write().unwrap();

    // the peer accepts from the OPEN bytes and immediately acks
    let mut acceptor = DataChannel::accept(
        DataChannelConfig::default(),
        2,
        PayloadProtocolIdentifier::Dcep,
        &open.payload,
    )
    .unwrap();
    assert_eq!(acceptor.state(), DataChannelState::Open);
    assert_eq!(acceptor.config().label, "chat");

    let ack = acceptor.poll_write().unwrap();
    assert_eq!(ack.ppi, PayloadProtocolIdentifier::Dcep);
    assert_eq!(ack.payload[0], 0x02);

    // the ack moves the dialing side from connecting to open
    let opened = dialer
        .handle_inbound(PayloadProtocolIdentifier::Dcep, &ack.payload)
        .unwrap();
    assert!(opened);
    assert_eq!(dialer.state(), DataChannelState::Open);
}

#[test]
fn test_accept_rejects_wrong_ppi() {
    let result = DataChannel::accept(
        DataChannelConfig::default(),
        2,
        PayloadProtocolIdentifier::String,
        &[0x03],
    );
    assert!(matches!(
        result,
        Err(Error::InvalidPayloadProtocolIdentifier(_))
    ));
}

#[test]
fn test_send_maps_payload_protocol_identifiers() {
    let mut channel = DataChannel::dial(config("chat"), 2).unwrap();
    channel.poll_write();

    channel.send(b"hello", true).unwrap();
    channel.send(b"\x01\x02", false).unwrap();
    channel.send(b"", true).unwrap();
    channel.send(b"", false).unwrap();

    let msg = channel.poll_write().unwrap();
    assert_eq!(msg.ppi, PayloadProtocolIdentifier::String);
    assert_eq!(&msg.payload[..], b"hello");

    let msg = channel.poll_write().unwrap();
    assert_eq!(msg.ppi, PayloadProtocolIdentifier::Binary);

    let msg = channel.poll_write().unwrap();
    assert_eq!(msg.ppi, PayloadProtocolIdentifier::StringEmpty);
    assert_eq!(&msg.payload[..], &[0]);

    let msg = channel.poll_write().unwrap();
    assert_eq!(msg.ppi, PayloadProtocolIdentifier::BinaryEmpty);
    assert_eq!(&msg.payload[..], &[0]);

    assert_eq!(channel.messages_sent(), 4);
    assert_eq!(channel.bytes_sent(), 7);
}

#[test]
fn test_inbound_user_messages() {
    let mut channel = DataChannel::dial(config("chat"), 2).unwrap();
    channel
        .handle_inbound(PayloadProtocolIdentifier::String, b"hi")
        .unwrap();
    channel
        .handle_inbound(PayloadProtocolIdentifier::StringEmpty, &[0])
        .unwrap();

    let msg = channel.poll_read().unwrap();
    assert_eq!(&msg.payload[..], b"hi");
    let msg = channel.poll_read().unwrap();
    assert!(msg.payload.is_empty());
    assert_eq!(channel.messages_received(), 2);
    assert_eq!(channel.bytes_received(), 2);
}

#[test]
fn test_close_completes_after_both_resets() {
    let mut channel = DataChannel::dial(config("chat"), 2).unwrap();
    channel.close();
    assert_eq!(channel.state(), DataChannelState::Closing);
    assert!(matches!(
        channel.send(b"late", true),
        Err(Error::ErrDataChannelClosed)
    ));

    assert!(!channel.on_outgoing_stream_reset());
    assert_eq!(channel.state(), DataChannelState::Closing);
    assert!(channel.on_incoming_stream_reset());
    assert_eq!(channel.state(), DataChannelState::Closed);

    // closing again is a no-op
    channel.close();
    assert_eq!(channel.state(), DataChannelState::Closed);
}
