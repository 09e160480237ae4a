//! # API Frame Codec
//!
//! Encoding and decoding of the wire-level envelope used by Digi XBee modules:
//!
//! ```text
//! ┌────────────┬──────────┬──────────┬────────────┬────────────┬───────────┐
//! │ delimiter  │ len MSB  │ len LSB  │ frame type │ payload    │ checksum  │
//! │ 0x7E       │          │          │ (1 byte)   │ (len - 1)  │ (1 byte)  │
//! └────────────┴──────────┴──────────┴────────────┴────────────┴───────────┘
//! ```
//!
//! The big-endian length counts the frame type plus the payload. The checksum
//! is `0xFF - (sum of type and payload bytes) mod 256`, so for every valid
//! frame `(sum + checksum) mod 256 == 0xFF`.

use crate::constants::{XBEE_MAX_FRAME_PAYLOAD, XBEE_START_DELIMITER};
use crate::error::XBeeError;
use bytes::{BufMut, BytesMut};
use nom::bytes::complete::take;
use nom::number::complete::{be_u16, be_u8};
use nom::IResult;

/// A decoded (or to-be-sent) API frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiFrame {
    /// 8-bit frame-type opcode.
    pub frame_type: u8,
    /// Frame-data bytes following the type byte.
    pub payload: Vec<u8>,
    /// 8-bit checksum as carried on the wire.
    pub checksum: u8,
}

impl ApiFrame {
    /// Build a frame from its type and payload, computing the checksum.
    pub fn new(frame_type: u8, payload: &[u8]) -> Self {
        ApiFrame {
            frame_type,
            payload: payload.to_vec(),
            checksum: checksum(frame_type, payload),
        }
    }

    /// Value of the wire length field: type byte plus payload bytes.
    pub fn wire_len(&self) -> usize {
        self.payload.len() + 1
    }
}

/// Compute the 8-bit checksum over the frame type and payload.
pub fn checksum(frame_type: u8, payload: &[u8]) -> u8 {
    let sum = payload
        .iter()
        .fold(frame_type, |acc, b| acc.wrapping_add(*b));
    0xFFu8.wrapping_sub(sum)
}

/// Verify the checksum invariant of a frame.
pub fn verify_frame(frame: &ApiFrame) -> Result<(), XBeeError> {
    let calculated = checksum(frame.frame_type, &frame.payload);
    if frame.checksum != calculated {
        return Err(XBeeError::InvalidChecksum {
            expected: frame.checksum,
            calculated,
        });
    }
    Ok(())
}

/// Pack a frame into its on-wire representation.
pub fn pack_frame(frame_type: u8, payload: &[u8]) -> BytesMut {
    let mut buf = BytesMut::with_capacity(payload.len() + 5);
    buf.put_u8(XBEE_START_DELIMITER);
    buf.put_u16((payload.len() + 1) as u16);
    buf.put_u8(frame_type);
    buf.put_slice(payload);
    buf.put_u8(checksum(frame_type, payload));
    buf
}

/// Uses the `nom` crate to parse an API frame from a byte slice.
///
/// Fails on a missing start delimiter, a length outside the configured bound,
/// or a checksum mismatch. Trailing input is returned for the caller.
pub fn parse_frame(input: &[u8]) -> IResult<&[u8], ApiFrame> {
    let (i, delim) = be_u8(input)?;
    if delim != XBEE_START_DELIMITER {
        return Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Tag,
        )));
    }
    let (i, len) = be_u16(i)?;
    if len == 0 || len as usize > XBEE_MAX_FRAME_PAYLOAD + 1 {
        return Err(nom::Err::Error(nom::error::Error::new(
            i,
            nom::error::ErrorKind::LengthValue,
        )));
    }
    let (i, data) = take(len as usize)(i)?;
    let (i, cs) = be_u8(i)?;
    let frame = ApiFrame {
        frame_type: data[0],
        payload: data[1..].to_vec(),
        checksum: cs,
    };
    if verify_frame(&frame).is_err() {
        return Err(nom::Err::Error(nom::error::Error::new(
            i,
            nom::error::ErrorKind::Verify,
        )));
    }
    Ok((i, frame))
}

/// Human-readable name for a frame type, for router diagnostics.
pub fn frame_type_name(frame_type: u8) -> &'static str {
    use crate::constants::*;
    match frame_type {
        XBEE_FRAME_AT_COMMAND => "AT Command",
        XBEE_FRAME_TX_REQUEST => "TX Request",
        XBEE_FRAME_SOCKET_CREATE => "Socket Create",
        XBEE_FRAME_SOCKET_CONNECT => "Socket Connect",
        XBEE_FRAME_SOCKET_CLOSE => "Socket Close",
        XBEE_FRAME_SOCKET_SEND => "Socket Send",
        XBEE_FRAME_SOCKET_SENDTO => "Socket SendTo",
        XBEE_FRAME_SOCKET_BIND => "Socket Bind",
        XBEE_FRAME_SOCKET_OPTION => "Socket Option",
        XBEE_FRAME_AT_RESPONSE => "AT Response",
        XBEE_FRAME_MODEM_STATUS => "Modem Status",
        XBEE_FRAME_TX_STATUS => "TX Status",
        XBEE_FRAME_LR_RX => "LR RX",
        XBEE_FRAME_LR_EXPLICIT_RX => "LR Explicit RX",
        XBEE_FRAME_SOCKET_CREATE_RESPONSE => "Socket Create Response",
        XBEE_FRAME_SOCKET_CONNECT_RESPONSE => "Socket Connect Response",
        XBEE_FRAME_SOCKET_BIND_RESPONSE => "Socket Bind Response",
        XBEE_FRAME_SOCKET_RX => "Socket RX",
        XBEE_FRAME_SOCKET_RX_FROM => "Socket RX-From",
        XBEE_FRAME_SOCKET_STATUS => "Socket Status",
        _ => "Unknown",
    }
}
