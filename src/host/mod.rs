//! # Host Port Abstraction
//!
//! The driver talks to the module through any byte stream implementing
//! [`HostPort`]: a real serial port ([`serial::open`]) on hardware, or the
//! in-memory [`MockHostPort`] in tests. No threads, interrupts or DMA are
//! assumed; reads are bounded by the transport's window and writes go
//! straight through.

pub mod mock;
pub mod serial;

pub use mock::MockHostPort;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};

/// Capability set the platform supplies to the driver.
#[async_trait]
pub trait HostPort: AsyncRead + AsyncWrite + Unpin + Send {
    /// Discard any bytes already buffered on the receive side.
    async fn flush_rx(&mut self) -> Result<(), std::io::Error>;

    /// Pulse the module's hardware reset line, if the platform wired one.
    /// Returns false when no reset line is available.
    async fn pulse_reset(&mut self) -> bool {
        false
    }
}

#[async_trait]
impl HostPort for tokio_serial::SerialStream {
    async fn flush_rx(&mut self) -> Result<(), std::io::Error> {
        use tokio_serial::SerialPort;
        self.clear(tokio_serial::ClearBuffer::Input)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))
    }
}
