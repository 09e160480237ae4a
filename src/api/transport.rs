//! # Transport I/O
//!
//! Timeout-bounded frame reads and write-through frame sends on top of a
//! [`HostPort`](crate::host::HostPort). Receiving is a small state machine:
//! delimiter, length, frame data, checksum, each stage bounded by the UART
//! read window. A byte that is not the start delimiter is consumed and
//! reported, so a caller looping on [`FrameTransport::receive_frame`]
//! resynchronizes on garbage input one byte at a time.

use crate::api::frame::{checksum, pack_frame, ApiFrame};
use crate::constants::{
    XBEE_MAX_FRAME_PAYLOAD, XBEE_START_DELIMITER, XBEE_UART_READ_TIMEOUT_MS,
};
use crate::error::XBeeError;
use crate::host::HostPort;
use crate::util::hex::format_hex_compact;
use log::trace;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::time::timeout;

/// Tunable bounds of the transport.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Upper bound on frame payload size, receive and transmit.
    pub max_payload: usize,
    /// Window for a single bounded UART read.
    pub read_timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        TransportConfig {
            max_payload: XBEE_MAX_FRAME_PAYLOAD,
            read_timeout: Duration::from_millis(XBEE_UART_READ_TIMEOUT_MS),
        }
    }
}

/// Frame-level I/O over a host port.
pub struct FrameTransport<P: HostPort> {
    port: P,
    config: TransportConfig,
}

impl<P: HostPort> FrameTransport<P> {
    pub fn new(port: P) -> Self {
        Self::with_config(port, TransportConfig::default())
    }

    pub fn with_config(port: P, config: TransportConfig) -> Self {
        FrameTransport { port, config }
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    pub fn port_mut(&mut self) -> &mut P {
        &mut self.port
    }

    /// Discard anything already buffered on the receive side.
    pub async fn flush_rx(&mut self) -> Result<(), XBeeError> {
        self.port
            .flush_rx()
            .await
            .map_err(|e| XBeeError::Uart(e.to_string()))
    }

    /// Pack and write a frame, flushing the port afterwards.
    pub async fn send_frame(&mut self, frame_type: u8, payload: &[u8]) -> Result<(), XBeeError> {
        if payload.len() > self.config.max_payload {
            return Err(XBeeError::FrameTooLarge {
                len: payload.len(),
                max: self.config.max_payload,
            });
        }
        let bytes = pack_frame(frame_type, payload);
        trace!("tx frame: {}", format_hex_compact(&bytes));
        self.port
            .write_all(&bytes)
            .await
            .map_err(|e| XBeeError::Uart(e.to_string()))?;
        self.port
            .flush()
            .await
            .map_err(|e| XBeeError::Uart(e.to_string()))
    }

    /// One bounded read. An expired window reports zero bytes, mirroring a
    /// UART driver read timeout.
    async fn read_some(&mut self, buf: &mut [u8]) -> Result<usize, XBeeError> {
        match timeout(self.config.read_timeout, self.port.read(buf)).await {
            Ok(Ok(n)) => Ok(n),
            Ok(Err(e)) => Err(XBeeError::Uart(e.to_string())),
            Err(_) => Ok(0),
        }
    }

    /// Read until `buf` is full or a window expires empty; returns the byte
    /// count actually read.
    async fn fill(&mut self, buf: &mut [u8]) -> Result<usize, XBeeError> {
        let mut got = 0;
        while got < buf.len() {
            let n = self.read_some(&mut buf[got..]).await?;
            if n == 0 {
                break;
            }
            got += n;
        }
        Ok(got)
    }

    /// Receive one frame.
    ///
    /// Stages and failures:
    /// - delimiter: a non-0x7E byte is consumed and reported as
    ///   `InvalidStartDelimiter`; an empty window is a `Uart` timeout
    /// - length: fewer than 2 bytes is `TimeoutLen`; a declared length of
    ///   zero or beyond the configured bound is rejected before reading data
    /// - data: fewer than `length` bytes is `TimeoutData`
    /// - checksum: an empty window is `TimeoutChecksum`; a mismatch is
    ///   `InvalidChecksum`
    pub async fn receive_frame(&mut self) -> Result<ApiFrame, XBeeError> {
        let mut byte = [0u8; 1];
        if self.read_some(&mut byte).await? == 0 {
            return Err(XBeeError::Uart(
                "read timed out waiting for start delimiter".into(),
            ));
        }
        if byte[0] != XBEE_START_DELIMITER {
            return Err(XBeeError::InvalidStartDelimiter(byte[0]));
        }

        let mut len_buf = [0u8; 2];
        if self.fill(&mut len_buf).await? < 2 {
            return Err(XBeeError::TimeoutLen);
        }
        let declared = u16::from_be_bytes(len_buf) as usize;
        if declared == 0 {
            return Err(XBeeError::FrameParse("declared length of zero".into()));
        }
        if declared > self.config.max_payload + 1 {
            return Err(XBeeError::LengthExceedsBuffer {
                declared,
                max: self.config.max_payload + 1,
            });
        }

        let mut data = vec![0u8; declared];
        if self.fill(&mut data).await? < declared {
            return Err(XBeeError::TimeoutData);
        }

        let mut cs = [0u8; 1];
        if self.fill(&mut cs).await? == 0 {
            return Err(XBeeError::TimeoutChecksum);
        }
        let calculated = checksum(data[0], &data[1..]);
        if cs[0] != calculated {
            return Err(XBeeError::InvalidChecksum {
                expected: cs[0],
                calculated,
            });
        }

        let frame = ApiFrame {
            frame_type: data[0],
            payload: data[1..].to_vec(),
            checksum: cs[0],
        };
        trace!(
            "rx frame type 0x{:02X}, {} payload bytes",
            frame.frame_type,
            frame.payload.len()
        );
        Ok(frame)
    }
}
