//! Error types for the Castles transport

use std::io;

use cardreader_apdu_core::{Slot, TransportError};
use thiserror::Error;

/// Castles reader errors
#[derive(Debug, Error)]
pub enum CastlesError {
    /// Endpoint I/O failed
    #[error("Bulk transfer failed: {0}")]
    Io(#[from] io::Error),

    /// The reader answered with nothing
    #[error("Reader returned an empty response")]
    EmptyResponse,

    /// The answer is shorter than its header claims
    #[error("Response of {len} bytes is too short")]
    ShortResponse {
        /// Bytes received
        len: usize,
    },

    /// Data does not fit the single length byte of the header
    #[error("Frame data of {0} bytes is too long")]
    FrameTooLong(usize),

    /// No card in the slot
    #[error("No card present")]
    NoCard,

    /// Power-on answered with an unexpected status
    #[error("Power on rejected with status {status:#04x}")]
    PowerOnRejected {
        /// Header status byte
        status: u8,
    },

    /// The card is a memory card, which takes no APDUs
    #[error("Card with ATR starting {first:#04x} is a memory card")]
    MemoryCard {
        /// First ATR byte
        first: u8,
    },

    /// Power-off answered with an unexpected status
    #[error("Power off rejected with status {status:#04x}")]
    PowerOffRejected {
        /// Header status byte
        status: u8,
    },

    /// Reader has a single contact slot
    #[error("Reader has no {0} slot")]
    UnsupportedSlot(Slot),

    /// Reader has no escape channel
    #[error("Control commands are not supported")]
    ControlUnsupported,
}

impl From<CastlesError> for TransportError {
    fn from(error: CastlesError) -> Self {
        match error {
            CastlesError::Io(e) if e.kind() == io::ErrorKind::TimedOut => Self::Timeout,
            CastlesError::Io(_) | CastlesError::EmptyResponse | CastlesError::ShortResponse { .. } => {
                Self::Transmission
            }
            CastlesError::NoCard => Self::NoCard(Slot::Contact),
            CastlesError::UnsupportedSlot(slot) => Self::UnsupportedSlot(slot),
            CastlesError::ControlUnsupported => Self::Device,
            e @ (CastlesError::FrameTooLong(_)
            | CastlesError::PowerOnRejected { .. }
            | CastlesError::MemoryCard { .. }
            | CastlesError::PowerOffRejected { .. }) => Self::other(e.to_string()),
        }
    }
}
