//! # Device Core
//!
//! State common to both module families: the frame transport, the monotonic
//! frame-ID counter and the request/response correlator that pairs AT
//! commands with their responses while queueing every unrelated frame for the
//! router. The driver is half duplex; nothing here spawns tasks or assumes
//! concurrency.

use crate::api::at::AtCommand;
use crate::api::frame::ApiFrame;
use crate::api::transport::{FrameTransport, TransportConfig};
use crate::constants::{
    XBEE_AT_RESPONSE_TIMEOUT_MS, XBEE_CONFIG_TIMEOUT_MS, XBEE_FRAME_AT_COMMAND,
    XBEE_FRAME_AT_RESPONSE, XBEE_FRAME_ID_NONE,
};
use crate::error::XBeeError;
use crate::host::HostPort;
use log::{debug, trace};
use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::{sleep, Instant};

/// Pause between correlator poll iterations, to avoid busy-spinning when the
/// line is quiet.
const CORRELATOR_POLL_PAUSE: Duration = Duration::from_millis(1);

/// Shared device state and the AT-command correlator.
pub struct XBeeCore<P: HostPort> {
    transport: FrameTransport<P>,
    frame_id: u8,
    pending: VecDeque<ApiFrame>,
}

impl<P: HostPort> XBeeCore<P> {
    pub fn new(port: P) -> Self {
        Self::with_config(port, TransportConfig::default())
    }

    pub fn with_config(port: P, config: TransportConfig) -> Self {
        XBeeCore {
            transport: FrameTransport::with_config(port, config),
            frame_id: 1,
            pending: VecDeque::new(),
        }
    }

    /// Reset the frame-ID counter and drop anything buffered on the line.
    pub async fn init(&mut self) -> Result<(), XBeeError> {
        self.frame_id = 1;
        self.pending.clear();
        self.transport.flush_rx().await
    }

    /// Claim the next correlation frame ID: 1..=255, wrapping past 0, which
    /// is reserved for "no response requested".
    pub fn next_frame_id(&mut self) -> u8 {
        let id = self.frame_id;
        self.frame_id = match self.frame_id {
            0xFF => 1,
            n => n + 1,
        };
        id
    }

    /// Send a raw API frame.
    pub async fn send_api_frame(
        &mut self,
        frame_type: u8,
        payload: &[u8],
    ) -> Result<(), XBeeError> {
        self.transport.send_frame(frame_type, payload).await
    }

    /// Pulse the platform reset line through the host port.
    pub async fn pulse_reset(&mut self) -> bool {
        self.transport.port_mut().pulse_reset().await
    }

    /// Frames that arrived while a correlator was waiting, in arrival order.
    /// The caller routes them; they are never dropped here.
    pub fn take_pending(&mut self) -> Vec<ApiFrame> {
        std::mem::take(&mut self.pending).into()
    }

    /// One bounded poll of the wire. Receive errors while idling (quiet line,
    /// stray bytes) are traced and swallowed.
    pub async fn poll_wire(&mut self) -> Option<ApiFrame> {
        match self.transport.receive_frame().await {
            Ok(frame) => Some(frame),
            Err(e) => {
                trace!("idle poll: {e}");
                None
            }
        }
    }

    /// Send an AT command and return the response data bytes.
    ///
    /// The response is matched on frame type and frame ID; any other frame
    /// received while waiting is queued for the router. A nonzero response
    /// status becomes `AtCmdError`, and the deadline is measured from entry.
    pub async fn at_command(
        &mut self,
        cmd: AtCommand,
        param: &[u8],
        timeout: Duration,
    ) -> Result<Vec<u8>, XBeeError> {
        let code = cmd.code().ok_or(XBeeError::InvalidCommand)?;
        let frame_id = self.next_frame_id();
        let mut payload = Vec::with_capacity(3 + param.len());
        payload.push(frame_id);
        payload.extend_from_slice(code);
        payload.extend_from_slice(param);
        self.send_api_frame(XBEE_FRAME_AT_COMMAND, &payload).await?;

        let deadline = Instant::now() + timeout;
        loop {
            match self.transport.receive_frame().await {
                Ok(frame)
                    if frame.frame_type == XBEE_FRAME_AT_RESPONSE
                        && frame.payload.first() == Some(&frame_id) =>
                {
                    if frame.payload.len() < 4 {
                        return Err(XBeeError::FrameParse(format!(
                            "AT response of {} bytes is shorter than its header",
                            frame.payload.len()
                        )));
                    }
                    let status = frame.payload[3];
                    if status != 0 {
                        return Err(XBeeError::AtCmdError(status));
                    }
                    return Ok(frame.payload[4..].to_vec());
                }
                Ok(frame) => {
                    trace!(
                        "queueing unsolicited frame type 0x{:02X} during AT wait",
                        frame.frame_type
                    );
                    self.pending.push_back(frame);
                }
                Err(e) => trace!("receive while correlating: {e}"),
            }
            if Instant::now() >= deadline {
                return Err(XBeeError::ResponseTimeout);
            }
            sleep(CORRELATOR_POLL_PAUSE).await;
        }
    }

    /// Send an AT command without requesting a response (frame ID 0).
    pub async fn at_command_no_response(
        &mut self,
        cmd: AtCommand,
        param: &[u8],
    ) -> Result<(), XBeeError> {
        let code = cmd.code().ok_or(XBeeError::InvalidCommand)?;
        let mut payload = Vec::with_capacity(3 + param.len());
        payload.push(XBEE_FRAME_ID_NONE);
        payload.extend_from_slice(code);
        payload.extend_from_slice(param);
        self.send_api_frame(XBEE_FRAME_AT_COMMAND, &payload).await
    }

    /// Run an AT command and copy its response into `buf`. A response larger
    /// than `buf` fails with `BufferTooSmall` and copies nothing.
    pub async fn read_at_into(
        &mut self,
        cmd: AtCommand,
        buf: &mut [u8],
        timeout: Duration,
    ) -> Result<usize, XBeeError> {
        let data = self.at_command(cmd, &[], timeout).await?;
        if data.len() > buf.len() {
            return Err(XBeeError::BufferTooSmall {
                len: data.len(),
                cap: buf.len(),
            });
        }
        buf[..data.len()].copy_from_slice(&data);
        Ok(data.len())
    }

    /// Wait for a frame matching `matches`, queueing everything else.
    /// Pending frames are consulted first so a match that arrived during an
    /// earlier wait is not missed.
    pub async fn wait_for_frame<F>(
        &mut self,
        timeout: Duration,
        mut matches: F,
    ) -> Result<ApiFrame, XBeeError>
    where
        F: FnMut(&ApiFrame) -> bool,
    {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(pos) = self.pending.iter().position(|f| matches(f)) {
                // position() guarantees the index is occupied
                return Ok(self.pending.remove(pos).unwrap());
            }
            match self.transport.receive_frame().await {
                Ok(frame) if matches(&frame) => return Ok(frame),
                Ok(frame) => self.pending.push_back(frame),
                Err(e) => trace!("receive while waiting: {e}"),
            }
            if Instant::now() >= deadline {
                return Err(XBeeError::ResponseTimeout);
            }
            sleep(CORRELATOR_POLL_PAUSE).await;
        }
    }

    // ------------------------------------------------------------------
    // Common module operations
    // ------------------------------------------------------------------

    fn at_timeout() -> Duration {
        Duration::from_millis(XBEE_AT_RESPONSE_TIMEOUT_MS)
    }

    /// Ask the module to restart (AT RE, non-waiting). Returns whether the
    /// command frame was written, not whether the module restarted.
    pub async fn soft_reset(&mut self) -> bool {
        match self.at_command_no_response(AtCommand::SoftReset, &[]).await {
            Ok(()) => true,
            Err(e) => {
                debug!("soft reset not accepted: {e}");
                false
            }
        }
    }

    /// Persist staged configuration to module flash (AT WR).
    pub async fn write_config(&mut self) -> Result<(), XBeeError> {
        self.at_command(
            AtCommand::WriteConfig,
            &[],
            Duration::from_millis(XBEE_CONFIG_TIMEOUT_MS),
        )
        .await
        .map(|_| ())
    }

    /// Apply staged configuration changes (AT AC).
    pub async fn apply_changes(&mut self) -> Result<(), XBeeError> {
        self.at_command(
            AtCommand::ApplyChanges,
            &[],
            Duration::from_millis(XBEE_CONFIG_TIMEOUT_MS),
        )
        .await
        .map(|_| ())
    }

    /// Set the API options byte (AT AO).
    pub async fn set_api_options(&mut self, value: u8) -> Result<(), XBeeError> {
        self.at_command(AtCommand::ApiOptions, &[value], Self::at_timeout())
            .await
            .map(|_| ())
    }

    /// Firmware version (AT VR): four bytes assembled MSB-first.
    pub async fn firmware_version(&mut self) -> Result<u32, XBeeError> {
        let mut buf = [0u8; 4];
        let n = self
            .read_at_into(AtCommand::FirmwareVersion, &mut buf, Self::at_timeout())
            .await?;
        if n < 4 {
            return Err(XBeeError::FrameParse(format!(
                "VR response carried {n} of 4 bytes"
            )));
        }
        Ok(u32::from_be_bytes(buf))
    }

    /// Hardware version (AT HV): two bytes MSB-first.
    pub async fn hardware_version(&mut self) -> Result<u16, XBeeError> {
        let mut buf = [0u8; 2];
        let n = self
            .read_at_into(AtCommand::HardwareVersion, &mut buf, Self::at_timeout())
            .await?;
        if n < 2 {
            return Err(XBeeError::FrameParse(format!(
                "HV response carried {n} of 2 bytes"
            )));
        }
        Ok(u16::from_be_bytes(buf))
    }

    /// RSSI of the last received hop (AT DB), as signed dBm.
    pub async fn last_rssi(&mut self) -> Result<i16, XBeeError> {
        let mut buf = [0u8; 1];
        let n = self
            .read_at_into(AtCommand::LastRssi, &mut buf, Self::at_timeout())
            .await?;
        if n < 1 {
            return Err(XBeeError::FrameParse("empty DB response".into()));
        }
        Ok(-(buf[0] as i16))
    }

    /// Module serial number: AT SH and SL combined into 64 bits.
    pub async fn serial_number(&mut self) -> Result<u64, XBeeError> {
        let mut high = [0u8; 4];
        let n = self
            .read_at_into(AtCommand::SerialHigh, &mut high, Self::at_timeout())
            .await?;
        if n < 4 {
            return Err(XBeeError::FrameParse(format!(
                "SH response carried {n} of 4 bytes"
            )));
        }
        let mut low = [0u8; 4];
        let n = self
            .read_at_into(AtCommand::SerialLow, &mut low, Self::at_timeout())
            .await?;
        if n < 4 {
            return Err(XBeeError::FrameParse(format!(
                "SL response carried {n} of 4 bytes"
            )));
        }
        Ok(((u32::from_be_bytes(high) as u64) << 32) | u32::from_be_bytes(low) as u64)
    }
}
