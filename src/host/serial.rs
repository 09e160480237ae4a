//! Serial host-port setup.
//!
//! Opens the UART the XBee module is wired to. Digi modules default to
//! 9600 baud 8N1 out of the box.

use crate::error::XBeeError;
use tokio_serial::SerialPortBuilderExt;

/// Default baud rate of a factory-fresh module.
pub const DEFAULT_BAUD: u32 = 9600;

/// Open a serial port as a [`HostPort`](crate::host::HostPort) at 8N1.
pub fn open(path: &str, baud: u32) -> Result<tokio_serial::SerialStream, XBeeError> {
    tokio_serial::new(path, baud)
        .data_bits(tokio_serial::DataBits::Eight)
        .stop_bits(tokio_serial::StopBits::One)
        .parity(tokio_serial::Parity::None)
        .open_native_async()
        .map_err(|e| XBeeError::Uart(e.to_string()))
}
