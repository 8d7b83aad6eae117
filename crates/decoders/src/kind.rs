//! Decoder selection by name

use std::str::FromStr;

use derive_more::Display;
use thiserror::Error;

use crate::{
    decoder::{BoxedCardDecoder, BoxedStepDecoder, StepDriver},
    military::MilitaryIdDecoder,
    mykad::MyKadDecoder,
    staff_uid::{StaffUidDecoder, UidTrailer},
    taiwan::TaiwanHealthDecoder,
    thai::ThaiIdDecoder,
};

/// Supported card formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum DecoderKind {
    /// Taiwan health insurance card
    #[display("tw-health")]
    TaiwanHealth,
    /// Thai national ID card
    #[display("thai-id")]
    ThaiId,
    /// Malaysian MyKad
    #[display("mykad")]
    MyKad,
    /// NFC staff card UID
    #[display("staff-uid")]
    StaffUid,
    /// Taiwan military NFC ID
    #[display("military-id")]
    MilitaryId,
}

/// Error for an unknown decoder name
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown decoder {0:?}, expected one of tw-health, thai-id, mykad, staff-uid, military-id")]
pub struct UnknownDecoder(pub String);

impl DecoderKind {
    /// Every decoder, contact formats first
    pub const ALL: [Self; 5] = [
        Self::TaiwanHealth,
        Self::ThaiId,
        Self::MyKad,
        Self::StaffUid,
        Self::MilitaryId,
    ];

    /// Decoders for contact chip cards
    pub const CONTACT: [Self; 3] = [Self::TaiwanHealth, Self::ThaiId, Self::MyKad];

    /// Decoders for contactless cards
    pub const CONTACTLESS: [Self; 2] = [Self::StaffUid, Self::MilitaryId];

    /// Build a blocking decoder
    pub fn build(self, trailer: UidTrailer) -> BoxedCardDecoder {
        match self {
            Self::TaiwanHealth => Box::new(TaiwanHealthDecoder::new()),
            Self::ThaiId => Box::new(StepDriver::new(ThaiIdDecoder::new())),
            Self::MyKad => Box::new(MyKadDecoder::new()),
            Self::StaffUid => Box::new(StaffUidDecoder::new(trailer)),
            Self::MilitaryId => Box::new(MilitaryIdDecoder::new()),
        }
    }

    /// Build a stepwise decoder, if this format has one
    pub fn build_stepwise(self) -> Option<BoxedStepDecoder> {
        match self {
            Self::TaiwanHealth => Some(Box::new(TaiwanHealthDecoder::new())),
            Self::ThaiId => Some(Box::new(ThaiIdDecoder::new())),
            Self::MyKad | Self::StaffUid | Self::MilitaryId => None,
        }
    }
}

impl FromStr for DecoderKind {
    type Err = UnknownDecoder;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.to_string() == s)
            .ok_or_else(|| UnknownDecoder(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_names() {
        for kind in DecoderKind::ALL {
            assert_eq!(kind.to_string().parse::<DecoderKind>(), Ok(kind));
        }
        assert_eq!(
            "jpn".parse::<DecoderKind>(),
            Err(UnknownDecoder("jpn".to_string()))
        );
    }

    #[test]
    fn test_build() {
        for kind in DecoderKind::ALL {
            assert_eq!(kind.build(UidTrailer::Short).name(), kind.to_string());
        }
        assert!(DecoderKind::ThaiId.build_stepwise().is_some());
        assert!(DecoderKind::MyKad.build_stepwise().is_none());
    }
}
