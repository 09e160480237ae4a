//! Mock host port for testing
//!
//! An in-memory byte stream that stands in for the UART, so the driver can be
//! exercised without hardware. Incoming bytes are queued with
//! [`MockHostPort::queue_rx_data`] (or the frame-aware helpers) and everything
//! the driver writes is captured for inspection.

use crate::api::frame::pack_frame;
use crate::constants::XBEE_FRAME_AT_RESPONSE;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

/// Mock host port that simulates bidirectional communication.
#[derive(Clone, Default)]
pub struct MockHostPort {
    /// Data written by the driver (outgoing).
    tx_buffer: Arc<Mutex<Vec<u8>>>,
    /// Data to be read by the driver (incoming).
    rx_buffer: Arc<Mutex<VecDeque<u8>>>,
    /// Error to surface on the next read or write.
    next_error: Arc<Mutex<Option<io::Error>>>,
}

impl MockHostPort {
    pub fn new() -> Self {
        MockHostPort::default()
    }

    /// Queue raw bytes to be read by the driver.
    pub fn queue_rx_data(&self, data: &[u8]) {
        self.rx_buffer.lock().unwrap().extend(data);
    }

    /// Queue a well-formed API frame (delimiter, length and checksum added).
    pub fn queue_frame(&self, frame_type: u8, payload: &[u8]) {
        self.queue_rx_data(&pack_frame(frame_type, payload));
    }

    /// Queue an AT response frame: `[frame_id, cmd, status, data...]`.
    pub fn queue_at_response(&self, frame_id: u8, cmd: &[u8; 2], status: u8, data: &[u8]) {
        let mut payload = vec![frame_id, cmd[0], cmd[1], status];
        payload.extend_from_slice(data);
        self.queue_frame(XBEE_FRAME_AT_RESPONSE, &payload);
    }

    /// Everything the driver has written so far.
    pub fn get_tx_data(&self) -> Vec<u8> {
        self.tx_buffer.lock().unwrap().clone()
    }

    /// Clear both directions.
    pub fn clear(&self) {
        self.tx_buffer.lock().unwrap().clear();
        self.rx_buffer.lock().unwrap().clear();
    }

    /// Number of queued-but-unread rx bytes.
    pub fn rx_remaining(&self) -> usize {
        self.rx_buffer.lock().unwrap().len()
    }

    /// Surface an I/O error on the next read or write.
    pub fn set_next_error(&self, error: io::Error) {
        *self.next_error.lock().unwrap() = Some(error);
    }
}

impl AsyncRead for MockHostPort {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        if let Some(error) = self.next_error.lock().unwrap().take() {
            return Poll::Ready(Err(error));
        }
        let mut rx = self.rx_buffer.lock().unwrap();
        let available = rx.len().min(buf.remaining());
        if available > 0 {
            let data: Vec<u8> = rx.drain(..available).collect();
            buf.put_slice(&data);
        }
        // An empty queue completes with zero bytes, like a UART read window
        // expiring with nothing on the line.
        Poll::Ready(Ok(()))
    }
}

impl AsyncWrite for MockHostPort {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        if let Some(error) = self.next_error.lock().unwrap().take() {
            return Poll::Ready(Err(error));
        }
        self.tx_buffer.lock().unwrap().extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

#[async_trait]
impl super::HostPort for MockHostPort {
    async fn flush_rx(&mut self) -> Result<(), io::Error> {
        self.rx_buffer.lock().unwrap().clear();
        Ok(())
    }

    async fn pulse_reset(&mut self) -> bool {
        true
    }
}
