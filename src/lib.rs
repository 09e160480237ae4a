//! # xbee-rs - A Rust Crate for Digi XBee API-Frame Communication
//!
//! The xbee-rs crate drives Digi XBee radio modules (LoRaWAN and Cellular
//! LTE/NB-IoT variants) over a serial link using Digi's binary API-frame
//! protocol.
//!
//! ## Features
//!
//! - Byte-exact API-frame codec: delimiter, big-endian length, checksum
//! - Timeout-bounded transport with start-delimiter resynchronization
//! - AT-command correlator that never drops interleaved unsolicited frames
//! - LoRaWAN provisioning, OTAA join and confirmed uplink with TX-status wait
//! - Cellular attach, stateless IPv4 transmit and the Extended Socket family
//! - User callbacks for received packets and connection events
//! - Support for logging and error handling
//!
//! ## Usage
//!
//! ```no_run
//! use std::time::Duration;
//! use xbee_rs::{Callbacks, LrPacket, XBeeDevice, XBeeLr};
//!
//! # async fn demo() -> Result<(), xbee_rs::XBeeError> {
//! let port = xbee_rs::open_serial("/dev/ttyUSB0", 9600)?;
//! let mut callbacks = Callbacks::default();
//! callbacks.on_receive = Some(Box::new(|pkt: &LrPacket| {
//!     println!("downlink on port {}: {:?}", pkt.port, pkt.payload);
//! }));
//! let mut xbee = XBeeLr::new(port, callbacks);
//! xbee.init().await?;
//! xbee.set_app_eui("0000000000000000").await?;
//! xbee.connect(Duration::from_secs(60)).await?;
//! xbee.send_data(b"hello").await?;
//! # Ok(())
//! # }
//! ```
//!
//! The driver is single-task and half duplex: all operations are synchronous
//! awaits on one device, and concurrent callers must serialize externally.

pub mod api;
pub mod constants;
pub mod device;
pub mod error;
pub mod host;
pub mod logging;
pub mod util;

pub use crate::error::XBeeError;
pub use crate::logging::{init_logger, init_test_logger};

// Wire-level types
pub use api::at::AtCommand;
pub use api::frame::{checksum, frame_type_name, pack_frame, parse_frame, verify_frame, ApiFrame};
pub use api::transport::{FrameTransport, TransportConfig};

// Host port implementations
pub use host::{HostPort, MockHostPort};

// Device layer
pub use device::{
    Callbacks, CellularConfig, CellularPacket, DeviceConfig, LrPacket, SocketDest, SocketPhase,
    XBeeCellular, XBeeCore, XBeeDevice, XBeeLr,
};

/// Open a serial port for use as the device host port.
///
/// # Arguments
/// * `path` - Serial port path (e.g., "/dev/ttyUSB0" on Linux, "COM3" on Windows)
/// * `baud` - UART baud rate; factory-fresh modules default to 9600
///
/// # Returns
/// * `Ok(SerialStream)` - Port ready to hand to a variant constructor
/// * `Err(XBeeError)` - The port could not be opened
pub fn open_serial(path: &str, baud: u32) -> Result<tokio_serial::SerialStream, XBeeError> {
    host::serial::open(path, baud)
}
