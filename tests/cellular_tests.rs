//! End-to-end tests for the Cellular variant: configuration push, attach,
//! stateless IPv4 transmit and the extended socket state machine.

use std::sync::{Arc, Mutex};
use xbee_rs::{
    parse_frame, ApiFrame, Callbacks, CellularConfig, CellularPacket, DeviceConfig, MockHostPort,
    SocketDest, SocketPhase, XBeeCellular, XBeeDevice, XBeeError,
};

fn sent_frames(mock: &MockHostPort) -> Vec<ApiFrame> {
    let data = mock.get_tx_data();
    let mut rest: &[u8] = &data;
    let mut frames = Vec::new();
    while !rest.is_empty() {
        let (r, frame) = parse_frame(rest).expect("driver wrote a malformed frame");
        frames.push(frame);
        rest = r;
    }
    frames
}

fn device(mock: &MockHostPort) -> XBeeCellular<MockHostPort> {
    XBeeCellular::new(mock.clone(), Callbacks::default())
}

/// Create a socket with the module answering `socket_id` for frame id 1.
async fn created_socket(mock: &MockHostPort, xbee: &mut XBeeCellular<MockHostPort>) -> u8 {
    mock.queue_frame(0xC0, &[0x01, 0x05, 0x00]);
    let socket_id = xbee.socket_create(1).await.unwrap();
    mock.clear();
    socket_id
}

#[tokio::test]
async fn test_configure_then_connect_pushes_config() {
    let mock = MockHostPort::new();
    mock.queue_at_response(1, b"PN", 0x00, &[]);
    mock.queue_at_response(2, b"AN", 0x00, &[]);
    mock.queue_at_response(3, b"CP", 0x00, &[]);
    mock.queue_at_response(4, b"AI", 0x00, &[0x00]);
    let mut xbee = device(&mock);

    let cfg = DeviceConfig::Cellular(CellularConfig {
        apn: "iot.provider".into(),
        sim_pin: "1234".into(),
        carrier_profile: Some(2),
    });
    xbee.configure(&cfg).await.unwrap();
    xbee.connect(std::time::Duration::from_secs(5)).await.unwrap();

    let sent = sent_frames(&mock);
    assert_eq!(sent[0].payload[1..3], [b'P', b'N']);
    assert_eq!(&sent[0].payload[3..], b"1234");
    assert_eq!(sent[1].payload[1..3], [b'A', b'N']);
    assert_eq!(&sent[1].payload[3..], b"iot.provider");
    assert_eq!(sent[2].payload[1..3], [b'C', b'P']);
    assert_eq!(sent[2].payload[3..], [0x02]);
    assert_eq!(sent[3].payload[1..3], [b'A', b'I']);
}

/// Empty config entries are skipped rather than sent as empty parameters.
#[tokio::test]
async fn test_connect_skips_empty_config_entries() {
    let mock = MockHostPort::new();
    mock.queue_at_response(1, b"AI", 0x00, &[0x00]);
    let mut xbee = device(&mock);

    xbee.configure(&DeviceConfig::Cellular(CellularConfig::default()))
        .await
        .unwrap();
    xbee.connect(std::time::Duration::from_secs(5)).await.unwrap();

    let sent = sent_frames(&mock);
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].payload[1..3], [b'A', b'I']);
}

/// The stateless IPv4 transmit frame, byte for byte.
#[tokio::test]
async fn test_send_packet_wire_bytes() {
    let mock = MockHostPort::new();
    let mut xbee = device(&mock);
    // Advance the counter so this send correlates as frame id 5.
    for _ in 0..4 {
        xbee.core().next_frame_id();
    }

    let packet = CellularPacket {
        protocol: 1,
        port: 80,
        ip: [1, 2, 3, 4],
        payload: vec![0xAA, 0xBB],
        ..Default::default()
    };
    xbee.send_packet(&packet).await.unwrap();

    let sent = sent_frames(&mock);
    assert_eq!(sent[0].frame_type, 0x20);
    assert_eq!(
        sent[0].payload,
        vec![0x05, 0x01, 0x00, 0x50, 0x01, 0x02, 0x03, 0x04, 0xAA, 0xBB]
    );
}

#[tokio::test]
async fn test_socket_create() {
    let mock = MockHostPort::new();
    mock.queue_frame(0xC0, &[0x01, 0x07, 0x00]);
    let mut xbee = device(&mock);

    let socket_id = xbee.socket_create(1).await.unwrap();
    assert_eq!(socket_id, 0x07);
    assert_eq!(xbee.socket_phase(socket_id), Some(SocketPhase::Created));

    let sent = sent_frames(&mock);
    assert_eq!(sent[0].frame_type, 0x40);
    assert_eq!(sent[0].payload, vec![0x01, 0x01]);
}

#[tokio::test]
async fn test_socket_create_failure_status() {
    let mock = MockHostPort::new();
    mock.queue_frame(0xC0, &[0x01, 0x00, 0x04]);
    let mut xbee = device(&mock);

    assert!(matches!(
        xbee.socket_create(1).await,
        Err(XBeeError::SocketStatus(0x04))
    ));
}

#[tokio::test]
async fn test_socket_connect_ipv4_reaches_connected() {
    let mock = MockHostPort::new();
    let mut xbee = device(&mock);
    let socket = created_socket(&mock, &mut xbee).await;

    mock.queue_frame(0xC2, &[0x02, socket, 0x00]); // accepted
    mock.queue_frame(0xCF, &[socket, 0x00]); // established
    xbee.socket_connect(socket, 8080, SocketDest::Ipv4([192, 168, 1, 10]))
        .await
        .unwrap();
    assert_eq!(xbee.socket_phase(socket), Some(SocketPhase::Connected));

    let sent = sent_frames(&mock);
    assert_eq!(sent[0].frame_type, 0x42);
    assert_eq!(
        sent[0].payload,
        vec![0x02, socket, 0x1F, 0x90, 0x00, 192, 168, 1, 10]
    );
}

#[tokio::test]
async fn test_socket_connect_hostname_encoding() {
    let mock = MockHostPort::new();
    let mut xbee = device(&mock);
    let socket = created_socket(&mock, &mut xbee).await;

    mock.queue_frame(0xC2, &[0x02, socket, 0x00]);
    mock.queue_frame(0xCF, &[socket, 0x00]);
    xbee.socket_connect(socket, 443, SocketDest::Hostname("example.com"))
        .await
        .unwrap();

    let sent = sent_frames(&mock);
    let payload = &sent[0].payload;
    assert_eq!(payload[4], 0x01); // hostname address type
    assert_eq!(&payload[5..], b"example.com");
}

/// A rejected connect marks the socket closed.
#[tokio::test]
async fn test_socket_connect_rejection() {
    let mock = MockHostPort::new();
    let mut xbee = device(&mock);
    let socket = created_socket(&mock, &mut xbee).await;

    mock.queue_frame(0xC2, &[0x02, socket, 0x22]);
    assert!(matches!(
        xbee.socket_connect(socket, 80, SocketDest::Ipv4([10, 0, 0, 1])).await,
        Err(XBeeError::SocketStatus(0x22))
    ));
    assert_eq!(xbee.socket_phase(socket), Some(SocketPhase::Closed));
}

#[tokio::test]
async fn test_socket_bind_blocking() {
    let mock = MockHostPort::new();
    let mut xbee = device(&mock);
    let socket = created_socket(&mock, &mut xbee).await;

    mock.queue_frame(0xC6, &[0x02, socket, 0x00]);
    xbee.socket_bind(socket, 9000, true).await.unwrap();
    assert_eq!(xbee.socket_phase(socket), Some(SocketPhase::Bound));

    let sent = sent_frames(&mock);
    assert_eq!(sent[0].frame_type, 0x46);
    assert_eq!(sent[0].payload, vec![0x02, socket, 0x23, 0x28]);
}

#[tokio::test]
async fn test_socket_send_and_cap() {
    let mock = MockHostPort::new();
    let mut xbee = device(&mock);
    let socket = created_socket(&mock, &mut xbee).await;

    xbee.socket_send(socket, &[0x68, 0x69]).await.unwrap();
    let sent = sent_frames(&mock);
    assert_eq!(sent[0].frame_type, 0x44);
    assert_eq!(sent[0].payload, vec![0x02, socket, 0x00, 0x68, 0x69]);

    let oversized = vec![0u8; 121];
    assert!(matches!(
        xbee.socket_send(socket, &oversized).await,
        Err(XBeeError::FrameTooLarge { len: 121, max: 120 })
    ));
}

#[tokio::test]
async fn test_socket_send_to_wire_bytes() {
    let mock = MockHostPort::new();
    let mut xbee = device(&mock);
    let socket = created_socket(&mock, &mut xbee).await;

    xbee.socket_send_to(socket, [8, 8, 8, 8], 53, &[0x01])
        .await
        .unwrap();
    let sent = sent_frames(&mock);
    assert_eq!(sent[0].frame_type, 0x45);
    assert_eq!(
        sent[0].payload,
        vec![0x02, socket, 8, 8, 8, 8, 0x00, 0x35, 0x00, 0x01]
    );
}

#[tokio::test]
async fn test_socket_set_option() {
    let mock = MockHostPort::new();
    let mut xbee = device(&mock);
    let socket = created_socket(&mock, &mut xbee).await;

    xbee.socket_set_option(socket, 0x01, &[0x00]).await.unwrap();
    let sent = sent_frames(&mock);
    assert_eq!(sent[0].frame_type, 0x48);
    assert_eq!(sent[0].payload, vec![0x02, socket, 0x01, 0x00]);
}

#[tokio::test]
async fn test_socket_close_blocking() {
    let mock = MockHostPort::new();
    let mut xbee = device(&mock);
    let socket = created_socket(&mock, &mut xbee).await;

    mock.queue_frame(0xCF, &[socket, 0x01]);
    xbee.socket_close(socket, true).await.unwrap();
    assert_eq!(xbee.socket_phase(socket), Some(SocketPhase::Closed));

    let sent = sent_frames(&mock);
    assert_eq!(sent[0].frame_type, 0x43);
    assert_eq!(sent[0].payload, vec![0x02, socket]);
}

#[tokio::test]
async fn test_socket_operations_require_known_socket() {
    let mock = MockHostPort::new();
    let mut xbee = device(&mock);

    assert!(matches!(
        xbee.socket_send(0x09, &[0x00]).await,
        Err(XBeeError::UnknownSocket(0x09))
    ));
}

/// An unsolicited socket-status frame updates the state machine, e.g. the
/// peer closing the connection.
#[tokio::test]
async fn test_unsolicited_socket_status_updates_phase() {
    let mock = MockHostPort::new();
    let mut xbee = device(&mock);
    let socket = created_socket(&mock, &mut xbee).await;

    mock.queue_frame(0xCF, &[socket, 0x01]);
    xbee.process().await.unwrap();
    assert_eq!(xbee.socket_phase(socket), Some(SocketPhase::Closed));
}

#[tokio::test]
async fn test_socket_rx_reaches_callback() {
    let mock = MockHostPort::new();
    let received: Arc<Mutex<Vec<CellularPacket>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = received.clone();
    let mut callbacks = Callbacks::default();
    callbacks.on_receive = Some(Box::new(move |pkt: &CellularPacket| {
        sink.lock().unwrap().push(pkt.clone())
    }));
    let mut xbee = XBeeCellular::new(mock.clone(), callbacks);

    mock.queue_frame(0xCD, &[0x00, 0x05, 0x00, 0xCA, 0xFE]);
    xbee.process().await.unwrap();

    let packets = received.lock().unwrap();
    assert_eq!(packets.len(), 1);
    assert_eq!(packets[0].socket_id, 0x05);
    assert_eq!(packets[0].payload, vec![0xCA, 0xFE]);
}

#[tokio::test]
async fn test_socket_rx_from_parses_source() {
    let mock = MockHostPort::new();
    let received: Arc<Mutex<Vec<CellularPacket>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = received.clone();
    let mut callbacks = Callbacks::default();
    callbacks.on_receive = Some(Box::new(move |pkt: &CellularPacket| {
        sink.lock().unwrap().push(pkt.clone())
    }));
    let mut xbee = XBeeCellular::new(mock.clone(), callbacks);

    mock.queue_frame(
        0xCE,
        &[0x00, 0x05, 0x00, 10, 0, 0, 2, 0x13, 0x88, 0x01, 0x02],
    );
    xbee.process().await.unwrap();

    let packets = received.lock().unwrap();
    assert_eq!(packets.len(), 1);
    assert_eq!(packets[0].ip, [10, 0, 0, 2]);
    assert_eq!(packets[0].remote_port, 5000);
    assert_eq!(packets[0].payload, vec![0x01, 0x02]);
}

/// Receive frames below the documented minimum length are dropped.
#[tokio::test]
async fn test_short_rx_frames_are_dropped() {
    let mock = MockHostPort::new();
    let received: Arc<Mutex<Vec<CellularPacket>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = received.clone();
    let mut callbacks = Callbacks::default();
    callbacks.on_receive = Some(Box::new(move |pkt: &CellularPacket| {
        sink.lock().unwrap().push(pkt.clone())
    }));
    let mut xbee = XBeeCellular::new(mock.clone(), callbacks);

    mock.queue_frame(0xCD, &[0x00, 0x05]); // below 3 bytes
    xbee.process().await.unwrap();
    mock.queue_frame(0xCE, &[0x00, 0x05, 0x00, 10, 0, 0, 2, 0x13]); // below 9
    xbee.process().await.unwrap();

    assert!(received.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_send_data_requires_connected_socket() {
    let mock = MockHostPort::new();
    let mut xbee = device(&mock);

    assert!(matches!(
        xbee.send_data(&[0x00]).await,
        Err(XBeeError::NoConnectedSocket)
    ));
}

#[tokio::test]
async fn test_send_data_uses_connected_socket() {
    let mock = MockHostPort::new();
    let mut xbee = device(&mock);
    let socket = created_socket(&mock, &mut xbee).await;

    mock.queue_frame(0xC2, &[0x02, socket, 0x00]);
    mock.queue_frame(0xCF, &[socket, 0x00]);
    xbee.socket_connect(socket, 80, SocketDest::Ipv4([10, 0, 0, 1]))
        .await
        .unwrap();
    mock.clear();

    xbee.send_data(&[0x11, 0x22]).await.unwrap();
    let sent = sent_frames(&mock);
    assert_eq!(sent[0].frame_type, 0x44);
    assert_eq!(sent[0].payload, vec![0x03, socket, 0x00, 0x11, 0x22]);
}

#[tokio::test]
async fn test_disconnect_closes_open_sockets() {
    let mock = MockHostPort::new();
    let mut xbee = device(&mock);
    let socket = created_socket(&mock, &mut xbee).await;

    xbee.disconnect().await.unwrap();
    assert_eq!(xbee.socket_phase(socket), Some(SocketPhase::Closing));

    let sent = sent_frames(&mock);
    assert_eq!(sent[0].frame_type, 0x43);
}
