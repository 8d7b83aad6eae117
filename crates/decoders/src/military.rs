//! Taiwan military NFC ID card

use cardreader_apdu_core::{CardTransport, Command, Expect, Slot, success_payload};
use tracing::warn;

use crate::{
    charset,
    decoder::CardDecoder,
    error::{DecodeError, expect_selected},
    record::{CardRecord, CardType},
};

const SUCCESS: &[u8] = &[0x90, 0x00];

/// SELECT the military ID application
pub const SELECT_APPLICATION: Command = Command::new(
    "select military id",
    &[0x00, 0xA4, 0x04, 0x00, 0x07, 0xA0, 0x00, 0x00, 0x00, 0x79, 0xDB, 0x00],
    Expect::Prefix(SUCCESS),
);

/// SELECT the card number object
pub const SELECT_OBJECT: Command = Command::new(
    "select card number object",
    &[0x80, 0xA4, 0x02, 0x00, 0x02, 0xDB, 0x00],
    Expect::Prefix(SUCCESS),
);

/// READ the card number
pub const READ_CARD_NUMBER: Command = Command::new(
    "read card number",
    &[0x80, 0x52, 0x00, 0x09, 0x02, 0x02, 0x10],
    Expect::Suffix(SUCCESS),
)
.with_capacity(18);

/// Decoder for the Taiwan military NFC ID card
#[derive(Debug, Default)]
pub struct MilitaryIdDecoder;

impl MilitaryIdDecoder {
    /// Create a new decoder
    pub const fn new() -> Self {
        Self
    }
}

impl CardDecoder for MilitaryIdDecoder {
    fn name(&self) -> &'static str {
        "military-id"
    }

    fn decode(
        &mut self,
        transport: &mut dyn CardTransport,
        slot: Slot,
    ) -> Result<CardRecord, DecodeError> {
        for command in [&SELECT_APPLICATION, &SELECT_OBJECT] {
            let response = transport.exchange(slot, command)?;
            expect_selected(command, &response)?;
        }

        let mut record = CardRecord::new(CardType::StaffCard);
        let response = transport.exchange(slot, &READ_CARD_NUMBER)?;
        if let Ok(payload) = success_payload(&response) {
            record.card_number = charset::ascii("card number", payload)?;
        } else {
            warn!(response = %cardreader_apdu_core::hex::encode(&response), "Military ID read refused");
        }
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cardreader_apdu_core::MockTransport;
    use hex_literal::hex;

    #[test]
    fn test_read_card_number() {
        let mut transport = MockTransport::with_responses([
            hex!("9000").to_vec(),
            hex!("9000").to_vec(),
            [b"A000123456789012".as_slice(), &hex!("9000")[..]].concat(),
        ]);
        let record = MilitaryIdDecoder::new()
            .decode(&mut transport, Slot::Contactless)
            .unwrap();
        assert_eq!(record.card_number, "A000123456789012");
        assert_eq!(record.card_type, CardType::StaffCard);
        assert_eq!(transport.transmitted()[2].as_ref(), READ_CARD_NUMBER.apdu());
    }

    #[test]
    fn test_refused_read_is_empty() {
        let mut transport = MockTransport::with_responses([
            hex!("9000").to_vec(),
            hex!("9000").to_vec(),
            hex!("6982").to_vec(),
        ]);
        let record = MilitaryIdDecoder::new()
            .decode(&mut transport, Slot::Contactless)
            .unwrap();
        assert!(record.is_empty());
    }

    #[test]
    fn test_select_object_failed() {
        let mut transport =
            MockTransport::with_responses([hex!("9000").to_vec(), hex!("6A82").to_vec()]);
        let err = MilitaryIdDecoder::new()
            .decode(&mut transport, Slot::Contactless)
            .unwrap_err();
        assert!(matches!(
            err,
            DecodeError::SelectFailed {
                application: "select card number object",
                ..
            }
        ));
    }
}
