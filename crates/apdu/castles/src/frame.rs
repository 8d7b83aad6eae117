//! Message framing

use crate::error::CastlesError;

/// Length of the message header
pub const HEADER_LEN: usize = 10;

/// Header status byte when no card is in the slot
pub const STATUS_NO_CARD: u8 = 0x42;

/// Message type of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FrameKind {
    /// Transmit an APDU
    Apdu = 0x57,
    /// Power the card on
    PowerOn = 0x62,
    /// Power the card off
    PowerOff = 0x63,
    /// Query the slot status
    SlotStatus = 0x65,
}

impl FrameKind {
    /// Message type the reader answers with
    pub const fn answer(self) -> u8 {
        match self {
            Self::Apdu | Self::PowerOn => 0x80,
            Self::PowerOff | Self::SlotStatus => 0x81,
        }
    }
}

/// Build a request frame
pub fn encode(kind: FrameKind, slot: u8, sequence: u8, data: &[u8]) -> Result<Vec<u8>, CastlesError> {
    let len = u8::try_from(data.len()).map_err(|_| CastlesError::FrameTooLong(data.len()))?;

    let mut frame = Vec::with_capacity(HEADER_LEN + data.len());
    frame.extend_from_slice(&[kind as u8, 0, 0, 0, len, slot, sequence, 0, 0, 0]);
    frame.extend_from_slice(data);
    Ok(frame)
}

/// Header status byte of an answer
pub fn status(answer: &[u8]) -> Result<u8, CastlesError> {
    answer
        .get(7)
        .copied()
        .ok_or(CastlesError::ShortResponse { len: answer.len() })
}

/// Data of an APDU answer, header stripped
pub fn payload(answer: &[u8]) -> Result<&[u8], CastlesError> {
    answer
        .get(HEADER_LEN..)
        .ok_or(CastlesError::ShortResponse { len: answer.len() })
}

/// ATR carried by a power-on answer
///
/// The reader places one extra byte ahead of the ATR and counts it in the
/// length field.
pub fn atr(answer: &[u8]) -> Result<&[u8], CastlesError> {
    let short = || CastlesError::ShortResponse { len: answer.len() };
    let len = usize::from(*answer.get(4).ok_or_else(short)?);
    let end = (HEADER_LEN + len).max(HEADER_LEN + 1);
    answer.get(HEADER_LEN + 1..end).ok_or_else(short)
}
