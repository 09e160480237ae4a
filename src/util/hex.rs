//! # Hex Conversion Utilities
//!
//! ASCII-hex helpers used by the LoRaWAN key/EUI setters and by the frame
//! logging paths. Conversions are strict: the key setters reject input whose
//! length does not match the target width, so a typo never reaches the module.

use crate::error::XBeeError;

/// Decode an ASCII-hex string into `out`, requiring the input to be exactly
/// `2 * out.len()` characters.
///
/// Accepts both uppercase and lowercase digits. Any other character, or a
/// length mismatch, yields `XBeeError::InvalidHex`; callers must not use
/// `out` after a failure.
pub fn ascii_to_bytes(ascii: &str, out: &mut [u8]) -> Result<(), XBeeError> {
    if ascii.len() != out.len() * 2 {
        return Err(XBeeError::InvalidHex);
    }
    hex::decode_to_slice(ascii, out).map_err(|_| XBeeError::InvalidHex)
}

/// Encode bytes to an uppercase ASCII-hex string, the inverse of
/// [`ascii_to_bytes`].
pub fn bytes_to_ascii(bytes: &[u8]) -> String {
    hex::encode_upper(bytes)
}

/// Format bytes as "7e 00 07 88" for log lines.
pub fn format_hex_compact(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_to_bytes() {
        let mut out = [0u8; 4];
        ascii_to_bytes("1A2B3C4D", &mut out).unwrap();
        assert_eq!(out, [0x1A, 0x2B, 0x3C, 0x4D]);
    }

    #[test]
    fn test_ascii_to_bytes_lowercase() {
        let mut out = [0u8; 2];
        ascii_to_bytes("beef", &mut out).unwrap();
        assert_eq!(out, [0xBE, 0xEF]);
    }

    #[test]
    fn test_ascii_to_bytes_wrong_length() {
        let mut out = [0u8; 2];
        assert!(matches!(
            ascii_to_bytes("123", &mut out),
            Err(XBeeError::InvalidHex)
        ));
    }

    #[test]
    fn test_ascii_to_bytes_bad_digit() {
        let mut out = [0u8; 2];
        assert!(matches!(
            ascii_to_bytes("12G4", &mut out),
            Err(XBeeError::InvalidHex)
        ));
    }

    #[test]
    fn test_bytes_to_ascii() {
        assert_eq!(bytes_to_ascii(&[0xAB, 0xCD, 0xEF]), "ABCDEF");
    }

    #[test]
    fn test_format_compact() {
        assert_eq!(format_hex_compact(&[0x7E, 0x00, 0x07]), "7e 00 07");
    }
}
