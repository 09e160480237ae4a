//! # XBee Error Handling
//!
//! This module defines the XBeeError enum, which represents the different error
//! types that can occur in the xbee-rs crate.

use thiserror::Error;

/// Represents the different error types that can occur in the XBee driver.
#[derive(Debug, Error)]
pub enum XBeeError {
    /// Indicates a failure reported by the underlying UART / host port.
    #[error("UART failure: {0}")]
    Uart(String),

    /// The first byte of a frame was not the 0x7E start delimiter.
    #[error("Invalid start delimiter: 0x{0:02X}")]
    InvalidStartDelimiter(u8),

    /// The two length bytes did not arrive within the UART read window.
    #[error("Timed out reading frame length")]
    TimeoutLen,

    /// The declared number of frame-data bytes did not arrive in time.
    #[error("Timed out reading frame data")]
    TimeoutData,

    /// The trailing checksum byte did not arrive in time.
    #[error("Timed out reading frame checksum")]
    TimeoutChecksum,

    /// Indicates a checksum mismatch on a received frame.
    #[error("Invalid checksum: expected 0x{expected:02X}, calculated 0x{calculated:02X}")]
    InvalidChecksum { expected: u8, calculated: u8 },

    /// The declared frame length exceeds the configured receive bound.
    #[error("Declared frame length {declared} exceeds maximum of {max}")]
    LengthExceedsBuffer { declared: usize, max: usize },

    /// A requested transmission exceeds the configured frame bound.
    #[error("Payload of {len} bytes exceeds maximum of {max}")]
    FrameTooLarge { len: usize, max: usize },

    /// An AT identifier with no wire code was about to be transmitted.
    #[error("Invalid AT command identifier")]
    InvalidCommand,

    /// The module answered an AT command with a nonzero status byte.
    #[error("Module reported AT command status 0x{0:02X}")]
    AtCmdError(u8),

    /// No matching response arrived within the caller's window.
    #[error("No matching response before the deadline")]
    ResponseTimeout,

    /// A response was larger than the caller's buffer; nothing was copied.
    #[error("Response of {len} bytes exceeds caller buffer of {cap} bytes")]
    BufferTooSmall { len: usize, cap: usize },

    /// Indicates an invalid hexadecimal string was provided.
    #[error("Invalid hexadecimal string")]
    InvalidHex,

    /// A caller-supplied value was outside its documented range.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Indicates a malformed frame body (shorter than its documented shape).
    #[error("Error parsing API frame: {0}")]
    FrameParse(String),

    /// The operation is not supported by this module variant.
    #[error("Operation not supported by this module variant")]
    Unsupported,

    /// A socket operation referenced an ID this device has never seen.
    #[error("Unknown socket 0x{0:02X}")]
    UnknownSocket(u8),

    /// The module rejected a socket operation with a nonzero status byte.
    #[error("Socket operation failed with status 0x{0:02X}")]
    SocketStatus(u8),

    /// A previously submitted transmit request was reported undelivered.
    #[error("Transmit failed with delivery status 0x{0:02X}")]
    Delivery(u8),

    /// Data transfer was requested while no socket is in the connected state.
    #[error("No connected socket available")]
    NoConnectedSocket,
}
