//! # AT-Command Catalog
//!
//! Symbolic identifiers for the two-ASCII-character AT commands understood by
//! the XBee LoRaWAN and Cellular module families. The catalog is total: every
//! identifier except [`AtCommand::Invalid`] resolves to a wire code, and the
//! correlator refuses to transmit `Invalid`.

/// Symbolic AT-command identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AtCommand {
    /// Sentinel for an unresolvable command; never sent on the wire.
    Invalid,
    /// RE - restore module state via soft reset
    SoftReset,
    /// WR - write staged configuration to flash
    WriteConfig,
    /// AC - apply staged configuration changes
    ApplyChanges,
    /// AO - API options
    ApiOptions,
    /// BD - UART baud rate selector
    BaudRate,
    /// VR - firmware version
    FirmwareVersion,
    /// HV - hardware version
    HardwareVersion,
    /// DB - RSSI of the last received hop
    LastRssi,
    /// SH - serial number, high word
    SerialHigh,
    /// SL - serial number, low word
    SerialLow,
    /// JN - start a network join / attach
    Join,
    /// AI - association indication
    AssociationIndication,
    /// DE - LoRaWAN device EUI
    DevEui,
    /// AE - LoRaWAN application EUI
    AppEui,
    /// AK - LoRaWAN application key
    AppKey,
    /// NK - LoRaWAN network key
    NwkKey,
    /// LC - LoRaWAN device class
    LoRaClass,
    /// RG - LoRaWAN region code
    Region,
    /// R1 - RX1 window delay, milliseconds
    Rx1Delay,
    /// R2 - RX2 window delay, milliseconds
    Rx2Delay,
    /// RF - RX2 window frequency, hertz
    Rx2Frequency,
    /// PN - SIM PIN
    SimPin,
    /// AN - access point name
    Apn,
    /// CP - carrier profile
    CarrierProfile,
}

impl AtCommand {
    /// The two-ASCII-byte code sent on the wire, or `None` for the
    /// `Invalid` sentinel.
    pub fn code(self) -> Option<&'static [u8; 2]> {
        let code: &[u8; 2] = match self {
            AtCommand::Invalid => return None,
            AtCommand::SoftReset => b"RE",
            AtCommand::WriteConfig => b"WR",
            AtCommand::ApplyChanges => b"AC",
            AtCommand::ApiOptions => b"AO",
            AtCommand::BaudRate => b"BD",
            AtCommand::FirmwareVersion => b"VR",
            AtCommand::HardwareVersion => b"HV",
            AtCommand::LastRssi => b"DB",
            AtCommand::SerialHigh => b"SH",
            AtCommand::SerialLow => b"SL",
            AtCommand::Join => b"JN",
            AtCommand::AssociationIndication => b"AI",
            AtCommand::DevEui => b"DE",
            AtCommand::AppEui => b"AE",
            AtCommand::AppKey => b"AK",
            AtCommand::NwkKey => b"NK",
            AtCommand::LoRaClass => b"LC",
            AtCommand::Region => b"RG",
            AtCommand::Rx1Delay => b"R1",
            AtCommand::Rx2Delay => b"R2",
            AtCommand::Rx2Frequency => b"RF",
            AtCommand::SimPin => b"PN",
            AtCommand::Apn => b"AN",
            AtCommand::CarrierProfile => b"CP",
        };
        Some(code)
    }
}
