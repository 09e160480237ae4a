//! XBee API Protocol Constants
//!
//! This module defines constants used by the XBee API-frame protocol
//! implementation, covering both the LoRaWAN and Cellular module families.

/// Start delimiter of every API frame on the wire
pub const XBEE_START_DELIMITER: u8 = 0x7E;

/// Default bound on frame-data payload size (type byte excluded)
pub const XBEE_MAX_FRAME_PAYLOAD: usize = 256;

/// Largest payload accepted by the socket send / sendto frames
pub const XBEE_MAX_SOCKET_PAYLOAD: usize = 120;

/// Frame ID value meaning "no response requested"
pub const XBEE_FRAME_ID_NONE: u8 = 0x00;

// ----------------------------------------------------------------------------
// Timing defaults (milliseconds)
// ----------------------------------------------------------------------------

/// Window for a single bounded UART read
pub const XBEE_UART_READ_TIMEOUT_MS: u64 = 1000;

/// Default window for an AT command response
pub const XBEE_AT_RESPONSE_TIMEOUT_MS: u64 = 5000;

/// Window for WR / AC configuration commands
pub const XBEE_CONFIG_TIMEOUT_MS: u64 = 5000;

/// Window for socket create / connect-response / bind / close responses
pub const XBEE_SOCKET_RESPONSE_TIMEOUT_MS: u64 = 3000;

/// Window for the final socket-status frame after a socket connect
pub const XBEE_SOCKET_CONNECT_TIMEOUT_MS: u64 = 20_000;

/// Delay between successive attach (AI) polls
pub const XBEE_ATTACH_POLL_INTERVAL_MS: u64 = 1000;

/// Customary window for a blocking attach (60 polls, 1 s apart)
pub const XBEE_ATTACH_TIMEOUT_MS: u64 = 60_000;

// ----------------------------------------------------------------------------
// Frame types (subset of the Digi registry used by these module families)
// ----------------------------------------------------------------------------

pub const XBEE_FRAME_AT_COMMAND: u8 = 0x08;
pub const XBEE_FRAME_TX_REQUEST: u8 = 0x20; // LR TX request / Cellular IPv4 TX
pub const XBEE_FRAME_SOCKET_CREATE: u8 = 0x40;
pub const XBEE_FRAME_SOCKET_CONNECT: u8 = 0x42;
pub const XBEE_FRAME_SOCKET_CLOSE: u8 = 0x43;
pub const XBEE_FRAME_SOCKET_SEND: u8 = 0x44;
pub const XBEE_FRAME_SOCKET_SENDTO: u8 = 0x45;
pub const XBEE_FRAME_SOCKET_BIND: u8 = 0x46;
pub const XBEE_FRAME_SOCKET_OPTION: u8 = 0x48;
pub const XBEE_FRAME_AT_RESPONSE: u8 = 0x88;
pub const XBEE_FRAME_MODEM_STATUS: u8 = 0x8A;
pub const XBEE_FRAME_TX_STATUS: u8 = 0x8B;
pub const XBEE_FRAME_LR_RX: u8 = 0xA0;
pub const XBEE_FRAME_LR_EXPLICIT_RX: u8 = 0xA1;
pub const XBEE_FRAME_SOCKET_CREATE_RESPONSE: u8 = 0xC0;
pub const XBEE_FRAME_SOCKET_CONNECT_RESPONSE: u8 = 0xC2;
pub const XBEE_FRAME_SOCKET_BIND_RESPONSE: u8 = 0xC6;
pub const XBEE_FRAME_SOCKET_RX: u8 = 0xCD;
pub const XBEE_FRAME_SOCKET_RX_FROM: u8 = 0xCE;
pub const XBEE_FRAME_SOCKET_STATUS: u8 = 0xCF;

// ----------------------------------------------------------------------------
// Socket connect address types
// ----------------------------------------------------------------------------

pub const XBEE_SOCKET_ADDR_IPV4: u8 = 0x00;
pub const XBEE_SOCKET_ADDR_HOSTNAME: u8 = 0x01;

// Socket-status values carried by 0xCF frames
pub const XBEE_SOCKET_STATUS_CONNECTED: u8 = 0x00;
pub const XBEE_SOCKET_STATUS_CLOSED: u8 = 0x01;

// IP protocol selectors for the IPv4 TX and socket-create frames
pub const XBEE_IP_PROTOCOL_UDP: u8 = 0x00;
pub const XBEE_IP_PROTOCOL_TCP: u8 = 0x01;

// Delivery status reported by TX-status frames; nonzero values encode failures
pub const XBEE_DELIVERY_SUCCESS: u8 = 0x00;
