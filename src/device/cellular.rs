//! # XBee Cellular Variant
//!
//! APN/SIM/carrier configuration, LTE attach, stateless IPv4 transmit and the
//! Extended Socket frame family: create, bind, connect, send, sendto,
//! set-option and close, with a per-socket state machine driven by both
//! solicited responses and unsolicited socket-status frames.

use crate::api::at::AtCommand;
use crate::api::frame::{frame_type_name, ApiFrame};
use crate::api::transport::TransportConfig;
use crate::constants::*;
use crate::device::core::XBeeCore;
use crate::device::{Callbacks, DeviceConfig, XBeeDevice};
use crate::error::XBeeError;
use crate::host::HostPort;
use async_trait::async_trait;
use log::{debug, warn};
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::{sleep, Instant};

/// AI value reported by an attached cellular module.
const AI_ATTACHED: u8 = 0x00;

/// Caller-supplied network configuration, copied into the device on
/// [`XBeeDevice::configure`] and pushed to the module on connect.
#[derive(Debug, Clone, Default)]
pub struct CellularConfig {
    /// Access point name; skipped when empty.
    pub apn: String,
    /// SIM PIN; skipped when empty.
    pub sim_pin: String,
    /// Carrier profile selector; skipped when `None`.
    pub carrier_profile: Option<u8>,
}

/// An IPv4 datagram or socket payload moving through the driver.
#[derive(Debug, Clone, Default)]
pub struct CellularPacket {
    /// IP protocol selector for stateless sends.
    pub protocol: u8,
    /// Destination or source port.
    pub port: u16,
    /// Destination or source IPv4 address.
    pub ip: [u8; 4],
    pub payload: Vec<u8>,
    /// Correlation ID assigned on send.
    pub frame_id: u8,
    /// Socket the data arrived on, for socket receive paths.
    pub socket_id: u8,
    /// Source port, for receive-from frames.
    pub remote_port: u16,
    /// Status byte carried by the receive frame.
    pub status: u8,
}

/// Lifecycle phase of an extended socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketPhase {
    Created,
    Bound,
    Connecting,
    Connected,
    Closing,
    Closed,
}

/// Destination of a socket connect.
pub enum SocketDest<'a> {
    Ipv4([u8; 4]),
    Hostname(&'a str),
}

/// Driver for the XBee Cellular (LTE / NB-IoT) module family.
pub struct XBeeCellular<P: HostPort> {
    core: XBeeCore<P>,
    callbacks: Callbacks<CellularPacket>,
    config: CellularConfig,
    sockets: HashMap<u8, SocketPhase>,
}

impl<P: HostPort> XBeeCellular<P> {
    pub fn new(port: P, callbacks: Callbacks<CellularPacket>) -> Self {
        XBeeCellular {
            core: XBeeCore::new(port),
            callbacks,
            config: CellularConfig::default(),
            sockets: HashMap::new(),
        }
    }

    pub fn with_config(
        port: P,
        config: TransportConfig,
        callbacks: Callbacks<CellularPacket>,
    ) -> Self {
        XBeeCellular {
            core: XBeeCore::with_config(port, config),
            callbacks,
            config: CellularConfig::default(),
            sockets: HashMap::new(),
        }
    }

    /// Shared device core, for the common getters (versions, RSSI, serial).
    pub fn core(&mut self) -> &mut XBeeCore<P> {
        &mut self.core
    }

    /// Current phase of a socket, if this device created it.
    pub fn socket_phase(&self, socket_id: u8) -> Option<SocketPhase> {
        self.sockets.get(&socket_id).copied()
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

    fn socket_timeout() -> Duration {
        Duration::from_millis(XBEE_SOCKET_RESPONSE_TIMEOUT_MS)
    }

    // ------------------------------------------------------------------
    // Stateless IPv4 transmit
    // ------------------------------------------------------------------

    /// Send a stateless IPv4 datagram:
    /// `[frame_id, protocol, port, ip, payload]` as a TX request frame.
    pub async fn send_packet(&mut self, packet: &CellularPacket) -> Result<(), XBeeError> {
        let frame_id = self.core.next_frame_id();
        let mut payload = Vec::with_capacity(8 + packet.payload.len());
        payload.push(frame_id);
        payload.push(packet.protocol);
        payload.extend_from_slice(&packet.port.to_be_bytes());
        payload.extend_from_slice(&packet.ip);
        payload.extend_from_slice(&packet.payload);
        self.core
            .send_api_frame(XBEE_FRAME_TX_REQUEST, &payload)
            .await?;

        if let Some(cb) = self.callbacks.on_send.as_mut() {
            let mut sent = packet.clone();
            sent.frame_id = frame_id;
            cb(&sent);
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Extended sockets
    // ------------------------------------------------------------------

    /// Create a socket for `protocol`, returning its module-assigned ID.
    pub async fn socket_create(&mut self, protocol: u8) -> Result<u8, XBeeError> {
        let frame_id = self.core.next_frame_id();
        self.core
            .send_api_frame(XBEE_FRAME_SOCKET_CREATE, &[frame_id, protocol])
            .await?;
        let resp = self
            .core
            .wait_for_frame(Self::socket_timeout(), |f| {
                f.frame_type == XBEE_FRAME_SOCKET_CREATE_RESPONSE
                    && f.payload.first() == Some(&frame_id)
            })
            .await?;
        let (socket_id, status) = match resp.payload.as_slice() {
            [_, socket_id, status, ..] => (*socket_id, *status),
            _ => {
                return Err(XBeeError::FrameParse(
                    "socket create response too short".into(),
                ))
            }
        };
        self.dispatch_pending();
        if status != 0 {
            return Err(XBeeError::SocketStatus(status));
        }
        self.sockets.insert(socket_id, SocketPhase::Created);
        Ok(socket_id)
    }

    /// Connect a socket to an IPv4 address or hostname. Waits for the
    /// connect response, then for the socket-status frame that reports the
    /// connection established.
    pub async fn socket_connect(
        &mut self,
        socket_id: u8,
        port: u16,
        dest: SocketDest<'_>,
    ) -> Result<(), XBeeError> {
        self.known_socket(socket_id)?;
        let frame_id = self.core.next_frame_id();
        let mut payload = Vec::with_capacity(16);
        payload.push(frame_id);
        payload.push(socket_id);
        payload.extend_from_slice(&port.to_be_bytes());
        match dest {
            SocketDest::Ipv4(ip) => {
                payload.push(XBEE_SOCKET_ADDR_IPV4);
                payload.extend_from_slice(&ip);
            }
            SocketDest::Hostname(name) => {
                payload.push(XBEE_SOCKET_ADDR_HOSTNAME);
                payload.extend_from_slice(name.as_bytes());
            }
        }
        self.core
            .send_api_frame(XBEE_FRAME_SOCKET_CONNECT, &payload)
            .await?;
        self.sockets.insert(socket_id, SocketPhase::Connecting);

        let resp = self
            .core
            .wait_for_frame(Self::socket_timeout(), |f| {
                f.frame_type == XBEE_FRAME_SOCKET_CONNECT_RESPONSE
                    && f.payload.first() == Some(&frame_id)
                    && f.payload.get(1) == Some(&socket_id)
            })
            .await?;
        let status = *resp.payload.get(2).ok_or_else(|| {
            XBeeError::FrameParse("socket connect response too short".into())
        })?;
        if status != 0 {
            self.sockets.insert(socket_id, SocketPhase::Closed);
            self.dispatch_pending();
            return Err(XBeeError::SocketStatus(status));
        }

        // The connection is only up once the module reports it established.
        let status_frame = self
            .core
            .wait_for_frame(
                Duration::from_millis(XBEE_SOCKET_CONNECT_TIMEOUT_MS),
                |f| {
                    f.frame_type == XBEE_FRAME_SOCKET_STATUS
                        && f.payload.first() == Some(&socket_id)
                },
            )
            .await?;
        let status = *status_frame.payload.get(1).ok_or_else(|| {
            XBeeError::FrameParse("socket status frame too short".into())
        })?;
        self.dispatch_pending();
        if status != XBEE_SOCKET_STATUS_CONNECTED {
            self.sockets.insert(socket_id, SocketPhase::Closed);
            return Err(XBeeError::SocketStatus(status));
        }
        self.sockets.insert(socket_id, SocketPhase::Connected);
        Ok(())
    }

    /// Bind a socket to a local port for listening.
    pub async fn socket_bind(
        &mut self,
        socket_id: u8,
        port: u16,
        blocking: bool,
    ) -> Result<(), XBeeError> {
        self.known_socket(socket_id)?;
        let frame_id = self.core.next_frame_id();
        let mut payload = vec![frame_id, socket_id];
        payload.extend_from_slice(&port.to_be_bytes());
        self.core
            .send_api_frame(XBEE_FRAME_SOCKET_BIND, &payload)
            .await?;
        if blocking {
            let resp = self
                .core
                .wait_for_frame(Self::socket_timeout(), |f| {
                    f.frame_type == XBEE_FRAME_SOCKET_BIND_RESPONSE
                        && f.payload.first() == Some(&frame_id)
                        && f.payload.get(1) == Some(&socket_id)
                })
                .await?;
            let status = *resp.payload.get(2).ok_or_else(|| {
                XBeeError::FrameParse("socket bind response too short".into())
            })?;
            self.dispatch_pending();
            if status != 0 {
                return Err(XBeeError::SocketStatus(status));
            }
        }
        self.sockets.insert(socket_id, SocketPhase::Bound);
        Ok(())
    }

    /// Send on a connected socket. Payload is capped by the socket frame
    /// limit, 120 bytes.
    pub async fn socket_send(&mut self, socket_id: u8, data: &[u8]) -> Result<(), XBeeError> {
        self.known_socket(socket_id)?;
        Self::check_socket_payload(data)?;
        let frame_id = self.core.next_frame_id();
        let mut payload = vec![frame_id, socket_id, 0x00];
        payload.extend_from_slice(data);
        self.core
            .send_api_frame(XBEE_FRAME_SOCKET_SEND, &payload)
            .await
    }

    /// Send a datagram to an explicit destination on a bound socket.
    pub async fn socket_send_to(
        &mut self,
        socket_id: u8,
        ip: [u8; 4],
        port: u16,
        data: &[u8],
    ) -> Result<(), XBeeError> {
        self.known_socket(socket_id)?;
        Self::check_socket_payload(data)?;
        let frame_id = self.core.next_frame_id();
        let mut payload = vec![frame_id, socket_id];
        payload.extend_from_slice(&ip);
        payload.extend_from_slice(&port.to_be_bytes());
        payload.push(0x00);
        payload.extend_from_slice(data);
        self.core
            .send_api_frame(XBEE_FRAME_SOCKET_SENDTO, &payload)
            .await
    }

    /// Set a socket option byte.
    pub async fn socket_set_option(
        &mut self,
        socket_id: u8,
        option: u8,
        value: &[u8],
    ) -> Result<(), XBeeError> {
        self.known_socket(socket_id)?;
        let frame_id = self.core.next_frame_id();
        let mut payload = vec![frame_id, socket_id, option];
        payload.extend_from_slice(value);
        self.core
            .send_api_frame(XBEE_FRAME_SOCKET_OPTION, &payload)
            .await
    }

    /// Close a socket. When blocking, waits for the socket-status frame that
    /// confirms the close.
    pub async fn socket_close(&mut self, socket_id: u8, blocking: bool) -> Result<(), XBeeError> {
        self.known_socket(socket_id)?;
        let frame_id = self.core.next_frame_id();
        self.core
            .send_api_frame(XBEE_FRAME_SOCKET_CLOSE, &[frame_id, socket_id])
            .await?;
        self.sockets.insert(socket_id, SocketPhase::Closing);
        if blocking {
            let status_frame = self
                .core
                .wait_for_frame(Self::socket_timeout(), |f| {
                    f.frame_type == XBEE_FRAME_SOCKET_STATUS
                        && f.payload.first() == Some(&socket_id)
                })
                .await?;
            let status = *status_frame.payload.get(1).ok_or_else(|| {
                XBeeError::FrameParse("socket status frame too short".into())
            })?;
            self.dispatch_pending();
            if status != XBEE_SOCKET_STATUS_CLOSED {
                return Err(XBeeError::SocketStatus(status));
            }
            self.sockets.insert(socket_id, SocketPhase::Closed);
        }
        Ok(())
    }

    fn known_socket(&self, socket_id: u8) -> Result<(), XBeeError> {
        if self.sockets.contains_key(&socket_id) {
            Ok(())
        } else {
            Err(XBeeError::UnknownSocket(socket_id))
        }
    }

    fn check_socket_payload(data: &[u8]) -> Result<(), XBeeError> {
        if data.len() > XBEE_MAX_SOCKET_PAYLOAD {
            return Err(XBeeError::FrameTooLarge {
                len: data.len(),
                max: XBEE_MAX_SOCKET_PAYLOAD,
            });
        }
        Ok(())
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
            XBEE_FRAME_TX_STATUS => match frame.payload.as_slice() {
                [frame_id, status, ..] => {
                    debug!("TX status for frame id {frame_id}: 0x{status:02X}")
                }
                _ => warn!("TX status frame too short: {} bytes", frame.payload.len()),
            },
            XBEE_FRAME_SOCKET_STATUS => self.handle_socket_status_frame(frame),
            XBEE_FRAME_SOCKET_RX | XBEE_FRAME_SOCKET_RX_FROM => {
                self.handle_rx_packet_frame(frame)
            }
            other => debug!(
                "unhandled frame type 0x{other:02X} ({})",
                frame_type_name(other)
            ),
        }
    }

    /// Unsolicited socket-status frames keep the socket table honest, e.g. a
    /// peer closing a connection the driver believed established.
    fn handle_socket_status_frame(&mut self, frame: &ApiFrame) {
        let (socket_id, status) = match frame.payload.as_slice() {
            [socket_id, status, ..] => (*socket_id, *status),
            _ => {
                warn!(
                    "socket status frame too short: {} bytes",
                    frame.payload.len()
                );
                return;
            }
        };
        if !self.sockets.contains_key(&socket_id) {
            debug!("status 0x{status:02X} for unknown socket 0x{socket_id:02X}");
            return;
        }
        let phase = if status == XBEE_SOCKET_STATUS_CONNECTED {
            SocketPhase::Connected
        } else {
            SocketPhase::Closed
        };
        debug!("socket 0x{socket_id:02X} now {phase:?} (status 0x{status:02X})");
        self.sockets.insert(socket_id, phase);
    }

    /// Deserialize a socket receive (or receive-from) frame and hand it to
    /// the receive callback. Undersized frames are dropped with a diagnostic.
    fn handle_rx_packet_frame(&mut self, frame: &ApiFrame) {
        let data = &frame.payload;
        let packet = match frame.frame_type {
            XBEE_FRAME_SOCKET_RX => {
                if data.len() < 3 {
                    warn!("socket RX frame too short: {} bytes", data.len());
                    return;
                }
                CellularPacket {
                    frame_id: data[0],
                    socket_id: data[1],
                    status: data[2],
                    payload: data[3..].to_vec(),
                    ..Default::default()
                }
            }
            _ => {
                if data.len() < 9 {
                    warn!("socket RX-From frame too short: {} bytes", data.len());
                    return;
                }
                CellularPacket {
                    frame_id: data[0],
                    socket_id: data[1],
                    status: data[2],
                    ip: [data[3], data[4], data[5], data[6]],
                    remote_port: u16::from_be_bytes([data[7], data[8]]),
                    payload: data[9..].to_vec(),
                    ..Default::default()
                }
            }
        };
        match self.callbacks.on_receive.as_mut() {
            Some(cb) => cb(&packet),
            None => debug!(
                "socket 0x{:02X} data dropped: no receive callback",
                packet.socket_id
            ),
        }
    }
}

#[async_trait]
impl<P: HostPort> XBeeDevice for XBeeCellular<P> {
    async fn init(&mut self) -> Result<(), XBeeError> {
        self.sockets.clear();
        self.core.init().await
    }

    /// Push the stored configuration to the module, then poll AT AI until it
    /// reports attached or the deadline passes.
    async fn connect(&mut self, timeout: Duration) -> Result<(), XBeeError> {
        if !self.config.sim_pin.is_empty() {
            let pin = self.config.sim_pin.clone();
            self.at(AtCommand::SimPin, pin.as_bytes()).await?;
        }
        if !self.config.apn.is_empty() {
            let apn = self.config.apn.clone();
            self.at(AtCommand::Apn, apn.as_bytes()).await?;
        }
        if let Some(profile) = self.config.carrier_profile {
            self.at(AtCommand::CarrierProfile, &[profile]).await?;
        }

        let deadline = Instant::now() + timeout;
        loop {
            match self.at(AtCommand::AssociationIndication, &[]).await {
                Ok(data) if data.first() == Some(&AI_ATTACHED) => {
                    if let Some(cb) = self.callbacks.on_connect.as_mut() {
                        cb();
                    }
                    return Ok(());
                }
                Ok(data) => debug!("attach pending, AI={:?}", data.first()),
                Err(e) => debug!("AI poll failed: {e}"),
            }
            if Instant::now() >= deadline {
                return Err(XBeeError::ResponseTimeout);
            }
            sleep(Duration::from_millis(XBEE_ATTACH_POLL_INTERVAL_MS)).await;
        }
    }

    /// Close every socket this device opened and mark the table closed.
    async fn disconnect(&mut self) -> Result<(), XBeeError> {
        let open: Vec<u8> = self
            .sockets
            .iter()
            .filter(|(_, phase)| {
                !matches!(**phase, SocketPhase::Closed | SocketPhase::Closing)
            })
            .map(|(id, _)| *id)
            .collect();
        for socket_id in open {
            if let Err(e) = self.socket_close(socket_id, false).await {
                debug!("close of socket 0x{socket_id:02X} on disconnect failed: {e}");
            }
        }
        if let Some(cb) = self.callbacks.on_disconnect.as_mut() {
            cb();
        }
        Ok(())
    }

    /// Send on the first connected socket.
    async fn send_data(&mut self, payload: &[u8]) -> Result<(), XBeeError> {
        let socket_id = self
            .sockets
            .iter()
            .filter(|(_, phase)| **phase == SocketPhase::Connected)
            .map(|(id, _)| *id)
            .min()
            .ok_or(XBeeError::NoConnectedSocket)?;
        self.socket_send(socket_id, payload).await
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
        Ok(data.first() == Some(&AI_ATTACHED))
    }

    /// Copy the caller's cellular configuration into the device.
    async fn configure(&mut self, config: &DeviceConfig) -> Result<(), XBeeError> {
        let DeviceConfig::Cellular(cfg) = config;
        self.config = cfg.clone();
        Ok(())
    }
}
