//! Tests for the transport receive state machine and frame sends, driven
//! through the mock host port.

use xbee_rs::{pack_frame, FrameTransport, MockHostPort, TransportConfig, XBeeError};

fn transport(mock: &MockHostPort) -> FrameTransport<MockHostPort> {
    FrameTransport::new(mock.clone())
}

#[tokio::test]
async fn test_receive_valid_at_response() {
    let mock = MockHostPort::new();
    mock.queue_rx_data(&[
        0x7E, 0x00, 0x07, 0x88, 0x01, 0x56, 0x52, 0x00, 0x12, 0x00, 0xBC,
    ]);
    let mut transport = transport(&mock);

    let frame = transport.receive_frame().await.unwrap();
    assert_eq!(frame.frame_type, 0x88);
    assert_eq!(frame.wire_len(), 7);
    assert_eq!(frame.payload, vec![0x01, 0x56, 0x52, 0x00, 0x12, 0x00]);
}

#[tokio::test]
async fn test_receive_bad_start_delimiter() {
    let mock = MockHostPort::new();
    mock.queue_rx_data(&[0x00]);
    let mut transport = transport(&mock);

    let result = transport.receive_frame().await;
    assert!(matches!(result, Err(XBeeError::InvalidStartDelimiter(0x00))));
}

#[tokio::test]
async fn test_receive_bad_checksum() {
    let mock = MockHostPort::new();
    mock.queue_rx_data(&[
        0x7E, 0x00, 0x07, 0x88, 0x01, 0x56, 0x52, 0x00, 0x12, 0x00, 0x00,
    ]);
    let mut transport = transport(&mock);

    match transport.receive_frame().await {
        Err(XBeeError::InvalidChecksum {
            expected,
            calculated,
        }) => {
            assert_eq!(expected, 0x00);
            assert_eq!(calculated, 0xBC);
        }
        other => panic!("expected InvalidChecksum, got {other:?}"),
    }
}

#[tokio::test]
async fn test_receive_truncated_data() {
    let mock = MockHostPort::new();
    mock.queue_rx_data(&[0x7E, 0x00, 0x05, 0x88, 0x01, 0x56]);
    let mut transport = transport(&mock);

    let result = transport.receive_frame().await;
    assert!(matches!(result, Err(XBeeError::TimeoutData)));
}

#[tokio::test]
async fn test_receive_truncated_length() {
    let mock = MockHostPort::new();
    mock.queue_rx_data(&[0x7E, 0x00]);
    let mut transport = transport(&mock);

    let result = transport.receive_frame().await;
    assert!(matches!(result, Err(XBeeError::TimeoutLen)));
}

#[tokio::test]
async fn test_receive_missing_checksum() {
    let mock = MockHostPort::new();
    mock.queue_rx_data(&[0x7E, 0x00, 0x02, 0x8A, 0x00]);
    let mut transport = transport(&mock);

    let result = transport.receive_frame().await;
    assert!(matches!(result, Err(XBeeError::TimeoutChecksum)));
}

#[tokio::test]
async fn test_receive_length_exceeds_buffer() {
    let mock = MockHostPort::new();
    mock.queue_rx_data(&[0x7E, 0x02, 0x00, 0x88]);
    let mut transport = transport(&mock);

    let result = transport.receive_frame().await;
    assert!(matches!(
        result,
        Err(XBeeError::LengthExceedsBuffer { declared: 512, .. })
    ));
}

/// Garbage bytes are consumed one at a time; the frame behind them decodes.
#[tokio::test]
async fn test_resynchronization_after_garbage() {
    let mock = MockHostPort::new();
    mock.queue_rx_data(&[0x11, 0x22]);
    mock.queue_frame(0x8A, &[0x02]);
    let mut transport = transport(&mock);

    assert!(matches!(
        transport.receive_frame().await,
        Err(XBeeError::InvalidStartDelimiter(0x11))
    ));
    assert!(matches!(
        transport.receive_frame().await,
        Err(XBeeError::InvalidStartDelimiter(0x22))
    ));
    let frame = transport.receive_frame().await.unwrap();
    assert_eq!(frame.frame_type, 0x8A);
    assert_eq!(frame.payload, vec![0x02]);
}

#[tokio::test]
async fn test_send_frame_wire_bytes() {
    let mock = MockHostPort::new();
    let mut transport = transport(&mock);

    transport.send_frame(0x08, &[0x01, b'V', b'R']).await.unwrap();
    assert_eq!(
        mock.get_tx_data(),
        pack_frame(0x08, &[0x01, b'V', b'R']).to_vec()
    );
}

#[tokio::test]
async fn test_send_frame_too_large() {
    let mock = MockHostPort::new();
    let mut transport = transport(&mock);

    let oversized = vec![0u8; 257];
    let result = transport.send_frame(0x20, &oversized).await;
    assert!(matches!(result, Err(XBeeError::FrameTooLarge { len: 257, .. })));
    assert!(mock.get_tx_data().is_empty());
}

#[tokio::test]
async fn test_send_respects_configured_bound() {
    let mock = MockHostPort::new();
    let config = TransportConfig {
        max_payload: 16,
        ..Default::default()
    };
    let mut transport = FrameTransport::with_config(mock.clone(), config);

    assert!(transport.send_frame(0x20, &[0u8; 16]).await.is_ok());
    assert!(transport.send_frame(0x20, &[0u8; 17]).await.is_err());
}

#[tokio::test]
async fn test_receive_propagates_io_error() {
    let mock = MockHostPort::new();
    mock.set_next_error(std::io::Error::new(
        std::io::ErrorKind::BrokenPipe,
        "unplugged",
    ));
    let mut transport = transport(&mock);

    let result = transport.receive_frame().await;
    assert!(matches!(result, Err(XBeeError::Uart(_))));
}
