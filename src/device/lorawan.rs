//! # XBee LR (LoRaWAN) Variant
//!
//! OTAA provisioning (EUIs, keys, class, region, RX windows), join via
//! AT JN with AI polling, and confirmed uplink: a TX request is followed by a
//! blocking wait for the TX-status frame carrying the same frame ID, whose
//! delivery-status byte is the result.

use crate::api::at::AtCommand;
use crate::api::frame::{frame_type_name, ApiFrame};
use crate::api::transport::TransportConfig;
use crate::constants::{
    XBEE_AT_RESPONSE_TIMEOUT_MS, XBEE_ATTACH_POLL_INTERVAL_MS, XBEE_DELIVERY_SUCCESS,
    XBEE_FRAME_AT_RESPONSE, XBEE_FRAME_LR_EXPLICIT_RX, XBEE_FRAME_LR_RX, XBEE_FRAME_MODEM_STATUS,
    XBEE_FRAME_TX_REQUEST, XBEE_FRAME_TX_STATUS,
};
use crate::device::core::XBeeCore;
use crate::device::{Callbacks, DeviceConfig, XBeeDevice};
use crate::error::XBeeError;
use crate::host::HostPort;
use crate::util::hex::ascii_to_bytes;
use async_trait::async_trait;
use log::{debug, warn};
use std::time::Duration;
use tokio::time::{sleep, Instant};

/// Uplink port used by [`XBeeDevice::send_data`] when the caller does not
/// build a packet.
pub const DEFAULT_LR_PORT: u8 = 2;

/// AI value reported by a joined LoRaWAN module.
const AI_JOINED: u8 = 0x01;

/// A LoRaWAN uplink or downlink packet.
#[derive(Debug, Clone, Default)]
pub struct LrPacket {
    pub payload: Vec<u8>,
    /// LoRaWAN port, 1-223 for application traffic.
    pub port: u8,
    /// Request a confirmed uplink.
    pub ack: bool,
    /// Correlation ID assigned on send.
    pub frame_id: u8,
    /// Delivery status from the TX-status frame; 0x00 is success.
    pub status: u8,
    /// Downlink RSSI in dBm.
    pub rssi: i16,
    /// Downlink SNR in dB.
    pub snr: i8,
    /// Downlink frame counter.
    pub counter: u32,
}

impl LrPacket {
    /// An uplink packet on `port` carrying `payload`.
    pub fn uplink(port: u8, ack: bool, payload: &[u8]) -> Self {
        LrPacket {
            payload: payload.to_vec(),
            port,
            ack,
            ..Default::default()
        }
    }
}

/// Driver for the XBee LR (LoRaWAN) module family.
pub struct XBeeLr<P: HostPort> {
    core: XBeeCore<P>,
    callbacks: Callbacks<LrPacket>,
    /// Delivery status of the most recent TX request, once reported.
    delivery_status: Option<u8>,
}

impl<P: HostPort> XBeeLr<P> {
    pub fn new(port: P, callbacks: Callbacks<LrPacket>) -> Self {
        XBeeLr {
            core: XBeeCore::new(port),
            callbacks,
            delivery_status: None,
        }
    }

    pub fn with_config(port: P, config: TransportConfig, callbacks: Callbacks<LrPacket>) -> Self {
        XBeeLr {
            core: XBeeCore::with_config(port, config),
            callbacks,
            delivery_status: None,
        }
    }

    /// Shared device core, for the common getters (versions, RSSI, serial).
    pub fn core(&mut self) -> &mut XBeeCore<P> {
        &mut self.core
    }

    /// Delivery status of the last transmit, once a TX-status frame arrived.
    pub fn last_delivery_status(&self) -> Option<u8> {
        self.delivery_status
    }

    fn at_timeout() -> Duration {
        Duration::from_millis(XBEE_AT_RESPONSE_TIMEOUT_MS)
    }

    /// Run an AT command, then route anything that arrived while waiting.
    async fn at(&mut self, cmd: AtCommand, param: &[u8]) -> Result<Vec<u8>, XBeeError> {
        let res = self.core.at_command(cmd, param, Self::at_timeout()).await;
        self.dispatch_pending();
        res
    }

    // ------------------------------------------------------------------
    // Provisioning setters
    // ------------------------------------------------------------------

    /// Set the application EUI from 16 hex characters.
    pub async fn set_app_eui(&mut self, eui: &str) -> Result<(), XBeeError> {
        let mut bytes = [0u8; 8];
        ascii_to_bytes(eui, &mut bytes)?;
        self.at(AtCommand::AppEui, &bytes).await.map(|_| ())
    }

    /// Set the application key from 32 hex characters.
    pub async fn set_app_key(&mut self, key: &str) -> Result<(), XBeeError> {
        self.set_key(AtCommand::AppKey, key).await
    }

    /// Set the network key from 32 hex characters.
    pub async fn set_nwk_key(&mut self, key: &str) -> Result<(), XBeeError> {
        self.set_key(AtCommand::NwkKey, key).await
    }

    async fn set_key(&mut self, cmd: AtCommand, key: &str) -> Result<(), XBeeError> {
        let mut bytes = [0u8; 16];
        ascii_to_bytes(key, &mut bytes)?;
        self.at(cmd, &bytes).await.map(|_| ())
    }

    /// Read the device EUI (AT DE): 16 ASCII hex characters.
    pub async fn dev_eui(&mut self) -> Result<String, XBeeError> {
        let data = self.at(AtCommand::DevEui, &[]).await?;
        if data.len() != 16 {
            return Err(XBeeError::FrameParse(format!(
                "DE response carried {} of 16 characters",
                data.len()
            )));
        }
        String::from_utf8(data)
            .map_err(|_| XBeeError::FrameParse("DE response is not ASCII".into()))
    }

    /// Set the LoRaWAN device class: 'A', 'B' or 'C'.
    pub async fn set_class(&mut self, class: char) -> Result<(), XBeeError> {
        if !matches!(class, 'A' | 'B' | 'C') {
            return Err(XBeeError::InvalidParameter(format!(
                "LoRaWAN class '{class}'"
            )));
        }
        self.at(AtCommand::LoRaClass, &[class as u8]).await.map(|_| ())
    }

    /// Set the regional band plan code.
    pub async fn set_region(&mut self, region: u8) -> Result<(), XBeeError> {
        self.at(AtCommand::Region, &[region]).await.map(|_| ())
    }

    /// Set the RX1 window delay in milliseconds.
    pub async fn set_rx1_delay(&mut self, ms: u16) -> Result<(), XBeeError> {
        self.at(AtCommand::Rx1Delay, &ms.to_be_bytes()).await.map(|_| ())
    }

    /// Set the RX2 window delay in milliseconds.
    pub async fn set_rx2_delay(&mut self, ms: u16) -> Result<(), XBeeError> {
        self.at(AtCommand::Rx2Delay, &ms.to_be_bytes()).await.map(|_| ())
    }

    /// Set the RX2 window frequency in hertz.
    pub async fn set_rx2_frequency(&mut self, hz: u32) -> Result<(), XBeeError> {
        self.at(AtCommand::Rx2Frequency, &hz.to_be_bytes()).await.map(|_| ())
    }

    // ------------------------------------------------------------------
    // Data path
    // ------------------------------------------------------------------

    /// Send an uplink and block until its TX-status frame reports a delivery
    /// status, or `timeout` elapses. Returns the delivery status byte;
    /// 0x00 is success.
    pub async fn send_packet(
        &mut self,
        packet: &LrPacket,
        timeout: Duration,
    ) -> Result<u8, XBeeError> {
        let frame_id = self.core.next_frame_id();
        let mut payload = Vec::with_capacity(3 + packet.payload.len());
        payload.push(frame_id);
        payload.push(packet.port);
        payload.push(packet.ack as u8);
        payload.extend_from_slice(&packet.payload);
        self.core
            .send_api_frame(XBEE_FRAME_TX_REQUEST, &payload)
            .await?;

        let status_frame = self
            .core
            .wait_for_frame(timeout, |f| {
                f.frame_type == XBEE_FRAME_TX_STATUS && f.payload.first() == Some(&frame_id)
            })
            .await?;
        let status = *status_frame.payload.get(1).ok_or_else(|| {
            XBeeError::FrameParse("TX status frame without a status byte".into())
        })?;
        self.delivery_status = Some(status);

        if let Some(cb) = self.callbacks.on_send.as_mut() {
            let mut sent = packet.clone();
            sent.frame_id = frame_id;
            sent.status = status;
            cb(&sent);
        }
        self.dispatch_pending();
        Ok(status)
    }

    // ------------------------------------------------------------------
    // Frame router
    // ------------------------------------------------------------------

    fn dispatch_pending(&mut self) {
        for frame in self.core.take_pending() {
            self.route_frame(&frame);
        }
    }

    /// Dispatch one received frame to its handler.
    fn route_frame(&mut self, frame: &ApiFrame) {
        match frame.frame_type {
            XBEE_FRAME_AT_RESPONSE => debug!(
                "late AT response for frame id {:?}",
                frame.payload.first()
            ),
            XBEE_FRAME_MODEM_STATUS => {
                debug!("modem status: {:?}", frame.payload.first())
            }
            XBEE_FRAME_TX_STATUS => self.handle_transmit_status_frame(frame),
            XBEE_FRAME_LR_RX | XBEE_FRAME_LR_EXPLICIT_RX => self.handle_rx_packet_frame(frame),
            other => debug!(
                "unhandled frame type 0x{other:02X} ({})",
                frame_type_name(other)
            ),
        }
    }

    /// A TX-status frame that was not consumed by a send in progress.
    fn handle_transmit_status_frame(&mut self, frame: &ApiFrame) {
        match frame.payload.as_slice() {
            [frame_id, status, ..] => {
                debug!("TX status for frame id {frame_id}: 0x{status:02X}");
                self.delivery_status = Some(*status);
            }
            _ => warn!("TX status frame too short: {} bytes", frame.payload.len()),
        }
    }

    /// Deserialize a downlink frame and hand it to the receive callback.
    fn handle_rx_packet_frame(&mut self, frame: &ApiFrame) {
        let data = &frame.payload;
        if data.len() < 7 {
            warn!("LR RX frame too short: {} bytes", data.len());
            return;
        }
        let packet = LrPacket {
            port: data[0],
            rssi: -(data[1] as i16),
            snr: data[2] as i8,
            counter: u32::from_be_bytes([data[3], data[4], data[5], data[6]]),
            payload: data[7..].to_vec(),
            ..Default::default()
        };
        match self.callbacks.on_receive.as_mut() {
            Some(cb) => cb(&packet),
            None => debug!(
                "downlink on port {} dropped: no receive callback",
                packet.port
            ),
        }
    }
}

#[async_trait]
impl<P: HostPort> XBeeDevice for XBeeLr<P> {
    async fn init(&mut self) -> Result<(), XBeeError> {
        self.delivery_status = None;
        self.core.init().await
    }

    /// Join the network: AT JN, then poll AT AI until the module reports
    /// joined or the deadline passes.
    async fn connect(&mut self, timeout: Duration) -> Result<(), XBeeError> {
        self.at(AtCommand::Join, &[]).await?;
        let deadline = Instant::now() + timeout;
        loop {
            match self.at(AtCommand::AssociationIndication, &[]).await {
                Ok(data) if data.first() == Some(&AI_JOINED) => {
                    if let Some(cb) = self.callbacks.on_connect.as_mut() {
                        cb();
                    }
                    return Ok(());
                }
                Ok(data) => debug!("join pending, AI={:?}", data.first()),
                Err(e) => debug!("AI poll failed: {e}"),
            }
            if Instant::now() >= deadline {
                return Err(XBeeError::ResponseTimeout);
            }
            sleep(Duration::from_millis(XBEE_ATTACH_POLL_INTERVAL_MS)).await;
        }
    }

    async fn disconnect(&mut self) -> Result<(), XBeeError> {
        // The LR module has no leave command; joining again re-keys the
        // session.
        if let Some(cb) = self.callbacks.on_disconnect.as_mut() {
            cb();
        }
        Ok(())
    }

    async fn send_data(&mut self, payload: &[u8]) -> Result<(), XBeeError> {
        let packet = LrPacket::uplink(DEFAULT_LR_PORT, false, payload);
        let status = self.send_packet(&packet, Self::at_timeout()).await?;
        if status != XBEE_DELIVERY_SUCCESS {
            return Err(XBeeError::Delivery(status));
        }
        Ok(())
    }

    async fn soft_reset(&mut self) -> bool {
        self.core.soft_reset().await
    }

    async fn hard_reset(&mut self) -> bool {
        self.core.pulse_reset().await
    }

    async fn process(&mut self) -> Result<(), XBeeError> {
        self.dispatch_pending();
        if let Some(frame) = self.core.poll_wire().await {
            self.route_frame(&frame);
        }
        Ok(())
    }

    async fn connected(&mut self) -> Result<bool, XBeeError> {
        let data = self.at(AtCommand::AssociationIndication, &[]).await?;
        Ok(data.first() == Some(&AI_JOINED))
    }

    async fn configure(&mut self, _config: &DeviceConfig) -> Result<(), XBeeError> {
        Err(XBeeError::Unsupported)
    }
}
