//! # Device Layer
//!
//! Common lifecycle and the polymorphic surface shared by the two module
//! families. [`XBeeCore`] carries what every variant needs: the frame
//! transport, the frame-ID counter and the AT-command correlator. The
//! variants ([`XBeeLr`](lorawan::XBeeLr), [`XBeeCellular`](cellular::XBeeCellular))
//! wrap a core and implement [`XBeeDevice`] for callers that want to drive
//! either family through one interface.

pub mod cellular;
pub mod core;
pub mod lorawan;

pub use cellular::{CellularConfig, CellularPacket, SocketDest, SocketPhase, XBeeCellular};
pub use core::XBeeCore;
pub use lorawan::{LrPacket, XBeeLr};

use crate::error::XBeeError;
use async_trait::async_trait;
use std::time::Duration;

/// User callback table. Any entry may be left unset.
pub struct Callbacks<Pkt> {
    /// Invoked with every received data packet.
    pub on_receive: Option<Box<dyn FnMut(&Pkt) + Send>>,
    /// Invoked after a transmit request has been handed to the module.
    pub on_send: Option<Box<dyn FnMut(&Pkt) + Send>>,
    /// Invoked when a blocking connect observes the attached state.
    pub on_connect: Option<Box<dyn FnMut() + Send>>,
    /// Invoked on disconnect.
    pub on_disconnect: Option<Box<dyn FnMut() + Send>>,
}

impl<Pkt> Default for Callbacks<Pkt> {
    fn default() -> Self {
        Callbacks {
            on_receive: None,
            on_send: None,
            on_connect: None,
            on_disconnect: None,
        }
    }
}

/// Variant-specific configuration handed to [`XBeeDevice::configure`].
#[derive(Debug, Clone)]
pub enum DeviceConfig {
    Cellular(CellularConfig),
}

/// The operations every XBee module family provides.
#[async_trait]
pub trait XBeeDevice: Send {
    /// Reset driver state: frame-ID counter back to 1, receive side flushed.
    async fn init(&mut self) -> Result<(), XBeeError>;

    /// Attach to the network (join for LoRaWAN, LTE registration for
    /// Cellular), polling until attached or `timeout` elapses.
    async fn connect(&mut self, timeout: Duration) -> Result<(), XBeeError>;

    /// Leave the network as far as the variant supports it.
    async fn disconnect(&mut self) -> Result<(), XBeeError>;

    /// Send `payload` with variant-default addressing.
    async fn send_data(&mut self, payload: &[u8]) -> Result<(), XBeeError>;

    /// Ask the module to restart itself. Returns whether the command frame
    /// was accepted; the restart itself is not verified.
    async fn soft_reset(&mut self) -> bool;

    /// Pulse the hardware reset line, when the platform wired one.
    async fn hard_reset(&mut self) -> bool;

    /// Drain pending frames and poll the wire once, dispatching everything
    /// received to the frame router.
    async fn process(&mut self) -> Result<(), XBeeError>;

    /// Whether the module currently reports the attached state.
    async fn connected(&mut self) -> Result<bool, XBeeError>;

    /// Apply variant-specific configuration.
    async fn configure(&mut self, config: &DeviceConfig) -> Result<(), XBeeError>;
}
