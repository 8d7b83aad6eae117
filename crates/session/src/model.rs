//! Reader models
//!
//! The reader name reported at connect time decides which decoders run on
//! which slot.

use cardreader_apdu_core::Slot;
use cardreader_decoders::DecoderKind;
use derive_more::Display;

use crate::config::SessionConfig;

/// Known reader models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum ReaderModel {
    /// ACS ACR39U contact reader
    #[display("ACR39U")]
    Acr39u,
    /// ACS ACR1281U dual interface reader
    #[display("ACR1281U")]
    Acr1281u,
    /// ACS ACR122U NFC reader
    #[display("ACR122U")]
    Acr122u,
    /// ACS ACR1251T NFC reader
    #[display("ACR1251T")]
    Acr1251t,
    /// ACS ACR1255U-J1 Bluetooth NFC reader
    #[display("ACR1255U-J1")]
    Acr1255uJ1,
    /// ACS ACR3901U-S1 Bluetooth contact reader
    #[display("ACR3901U-S1")]
    Acr3901uS1,
    /// Castles EZUSB contact reader
    #[display("Castles EZUSB")]
    CastlesEzUsb,
    /// RFPro C2 contact reader
    #[display("RFPro C2")]
    RfProC2,
    /// Anything else
    #[display("generic")]
    Generic,
}

impl ReaderModel {
    /// Resolve the model from the name a reader reports
    pub fn from_reader_name(name: &str) -> Self {
        let name = name.to_ascii_uppercase();
        let table = [
            ("ACR39U", Self::Acr39u),
            ("ACR1281U", Self::Acr1281u),
            ("ACR122U", Self::Acr122u),
            ("ACR1251T", Self::Acr1251t),
            ("ACR1255U-J1", Self::Acr1255uJ1),
            ("ACR3901U-S1", Self::Acr3901uS1),
            ("EZUSB", Self::CastlesEzUsb),
            ("CASTLES", Self::CastlesEzUsb),
            ("RFPRO", Self::RfProC2),
        ];
        table
            .into_iter()
            .find(|(needle, _)| name.contains(needle))
            .map_or(Self::Generic, |(_, model)| model)
    }

    /// Whether the link only counts as connected once notifications are enabled
    pub const fn requires_notifications(self) -> bool {
        matches!(self, Self::Acr1255uJ1 | Self::Acr3901uS1)
    }

    /// Decoders to try, in order, for a card in `slot`
    pub fn decoders(self, slot: Slot, config: &SessionConfig) -> Vec<DecoderKind> {
        match (self, slot) {
            (Self::Acr39u | Self::CastlesEzUsb | Self::RfProC2, _) => config.contact.clone(),
            (Self::Acr1281u, Slot::Contact) => config.contact.clone(),
            (Self::Acr1281u, Slot::Contactless) => config.contactless.clone(),
            (Self::Acr122u | Self::Acr1251t, _) => config.contactless.clone(),
            (Self::Acr1255uJ1 | Self::Acr3901uS1 | Self::Generic, _) => config
                .contact
                .iter()
                .chain(&config.contactless)
                .copied()
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cardreader_decoders::UidTrailer;

    #[test]
    fn test_from_reader_name() {
        assert_eq!(
            ReaderModel::from_reader_name("ACS ACR39U ICC Reader 00 00"),
            ReaderModel::Acr39u
        );
        assert_eq!(
            ReaderModel::from_reader_name("ACS ACR1281U"),
            ReaderModel::Acr1281u
        );
        assert_eq!(
            ReaderModel::from_reader_name("ACS ACR122U PICC Interface 00 00"),
            ReaderModel::Acr122u
        );
        assert_eq!(
            ReaderModel::from_reader_name("ACR1255U-J1 Auth"),
            ReaderModel::Acr1255uJ1
        );
        assert_eq!(
            ReaderModel::from_reader_name("Generic Smart Card Reader"),
            ReaderModel::Generic
        );
    }

    #[test]
    fn test_decoder_lists() {
        let config = SessionConfig::new(UidTrailer::Short)
            .with_contact_decoders([DecoderKind::TaiwanHealth])
            .with_contactless_decoders([DecoderKind::StaffUid]);

        assert_eq!(
            ReaderModel::Acr39u.decoders(Slot::Contactless, &config),
            vec![DecoderKind::TaiwanHealth]
        );
        assert_eq!(
            ReaderModel::Acr1281u.decoders(Slot::Contactless, &config),
            vec![DecoderKind::StaffUid]
        );
        assert_eq!(
            ReaderModel::Acr122u.decoders(Slot::Contact, &config),
            vec![DecoderKind::StaffUid]
        );
        assert_eq!(
            ReaderModel::Generic.decoders(Slot::Contact, &config),
            vec![DecoderKind::TaiwanHealth, DecoderKind::StaffUid]
        );

        let config = config.with_contactless_decoders([]);
        assert!(ReaderModel::Acr1251t.decoders(Slot::Contactless, &config).is_empty());
    }

    #[test]
    fn test_requires_notifications() {
        assert!(ReaderModel::Acr3901uS1.requires_notifications());
        assert!(!ReaderModel::Acr39u.requires_notifications());
    }
}
