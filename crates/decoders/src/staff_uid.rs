//! NFC staff card UID
//!
//! Reads the card UID through the reader's CCID escape channel. Readers
//! differ in how they terminate the UID: most append a bare `90 00`, some
//! wrap it as `90 00 00`. The trailer is a property of the reader, so the
//! caller has to name it.

use std::str::FromStr;

use cardreader_apdu_core::{CardTransport, IOCTL_CCID_ESCAPE, Slot, hex};
use derive_more::Display;
use tracing::{debug, warn};

use crate::{
    decoder::CardDecoder,
    error::DecodeError,
    record::{CardRecord, CardType},
};

/// GET DATA (UID) pseudo-APDU
pub const READ_UID: &[u8] = &[0xFF, 0xCA, 0x00, 0x00, 0x00];

/// Application marker whose presence accepts a UID of any length
const AID_MARKER: &str = "414944";

/// Shortest UID, in hex digits, accepted without the application marker
const MIN_UID_DIGITS: usize = 8;

/// Status trailer a reader appends after the UID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum UidTrailer {
    /// `90 00`
    #[display("short")]
    Short,
    /// `90 00 00`
    #[display("framed")]
    Framed,
}

impl UidTrailer {
    /// Trailer as uppercase hex
    pub const fn as_hex(self) -> &'static str {
        match self {
            Self::Short => "9000",
            Self::Framed => "900000",
        }
    }
}

impl FromStr for UidTrailer {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "short" | "9000" => Ok(Self::Short),
            "framed" | "900000" => Ok(Self::Framed),
            other => Err(format!("unknown UID trailer {other:?}, expected short or framed")),
        }
    }
}

/// Decoder for staff cards identified by their NFC UID
#[derive(Debug)]
pub struct StaffUidDecoder {
    trailer: UidTrailer,
}

impl StaffUidDecoder {
    /// Create a decoder for readers using `trailer`
    pub const fn new(trailer: UidTrailer) -> Self {
        Self { trailer }
    }

    /// Extract the card number from the hex of an escape response
    ///
    /// Returns `None` when the response carries no acceptable UID.
    pub fn parse_uid(&self, response_hex: &str) -> Option<String> {
        let trailer = self.trailer.as_hex();
        // Only match the trailer on a byte boundary
        let end = (0..response_hex.len())
            .step_by(2)
            .find(|&index| response_hex[index..].starts_with(trailer))?;
        let uid = &response_hex[..end];

        if response_hex.contains(AID_MARKER) || uid.len() >= MIN_UID_DIGITS {
            Some(uid.to_string())
        } else {
            None
        }
    }
}

impl CardDecoder for StaffUidDecoder {
    fn name(&self) -> &'static str {
        "staff-uid"
    }

    fn decode(
        &mut self,
        transport: &mut dyn CardTransport,
        slot: Slot,
    ) -> Result<CardRecord, DecodeError> {
        let response = transport.control(slot, IOCTL_CCID_ESCAPE, READ_UID)?;
        let response_hex = hex::encode(&response);
        debug!(response = %response_hex, trailer = %self.trailer, "Staff card UID response");

        let mut record = CardRecord::new(CardType::StaffCard);
        match self.parse_uid(&response_hex) {
            Some(uid) => record.card_number = uid,
            None => warn!(response = %response_hex, "Staff card UID rejected"),
        }
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cardreader_apdu_core::{MockEvent, MockTransport};
    use hex_literal::hex;

    #[test]
    fn test_escape_code() {
        assert_eq!(IOCTL_CCID_ESCAPE, 3_225_264);
    }

    #[test]
    fn test_parse_uid() {
        let short = StaffUidDecoder::new(UidTrailer::Short);
        assert_eq!(
            short.parse_uid("04A1B2C3D4E5F69000").as_deref(),
            Some("04A1B2C3D4E5F6")
        );
        // Too short without the marker
        assert_eq!(short.parse_uid("A1B2C39000"), None);
        // Short but carrying the marker
        assert_eq!(short.parse_uid("4149449000").as_deref(), Some("414944"));
        // No trailer at all
        assert_eq!(short.parse_uid("04A1B2C3D4E5F6"), None);
        // "9000" straddling a byte boundary is not a trailer
        assert_eq!(short.parse_uid("04A9000BC2D39000").as_deref(), Some("04A9000BC2D3"));

        let framed = StaffUidDecoder::new(UidTrailer::Framed);
        assert_eq!(framed.parse_uid("04A1B2C3900000").as_deref(), Some("04A1B2C3"));
        assert_eq!(framed.parse_uid("04A1B2C39000"), None);
    }

    #[test]
    fn test_decode_via_control() {
        let mut transport =
            MockTransport::with_responses([hex!("04A1B2C3D4E5F6 9000").to_vec()]);
        let record = StaffUidDecoder::new(UidTrailer::Short)
            .decode(&mut transport, Slot::Contactless)
            .unwrap();
        assert_eq!(record.card_number, "04A1B2C3D4E5F6");
        assert_eq!(record.card_type, CardType::StaffCard);
        assert_eq!(
            transport.events,
            vec![MockEvent::Control(
                Slot::Contactless,
                IOCTL_CCID_ESCAPE,
                READ_UID.to_vec().into()
            )]
        );
    }

    #[test]
    fn test_rejected_uid_is_empty() {
        let mut transport = MockTransport::with_responses([hex!("6300").to_vec()]);
        let record = StaffUidDecoder::new(UidTrailer::Short)
            .decode(&mut transport, Slot::Contactless)
            .unwrap();
        assert!(record.is_empty());
    }

    #[test]
    fn test_trailer_from_str() {
        assert_eq!("short".parse::<UidTrailer>(), Ok(UidTrailer::Short));
        assert_eq!("900000".parse::<UidTrailer>(), Ok(UidTrailer::Framed));
        assert!("guess".parse::<UidTrailer>().is_err());
    }
}
