//! Error types for the PC/SC transport

use cardreader_apdu_core::{Slot, TransportError};
use thiserror::Error;

/// PC/SC-specific errors
#[derive(Debug, Error)]
pub enum PcscError {
    /// PC/SC error
    #[error("PC/SC error: {0}")]
    Pcsc(#[from] pcsc::Error),

    /// No readers available
    #[error("No readers available")]
    NoReadersAvailable,

    /// Reader not found
    #[error("Reader not found: {0}")]
    ReaderNotFound(String),

    /// No reader serves the slot
    #[error("No reader for the {0} slot")]
    NoReaderForSlot(Slot),

    /// No card present in reader
    #[error("No card present in reader: {0}")]
    NoCard(String),

    /// Reader name cannot be passed to PC/SC
    #[error("Invalid reader name: {0:?}")]
    InvalidReaderName(String),

    /// Failed to start the monitor thread
    #[error("Failed to start monitor: {0}")]
    Monitor(String),
}

impl From<PcscError> for TransportError {
    fn from(error: PcscError) -> Self {
        match error {
            PcscError::Pcsc(pcsc::Error::Timeout) => Self::Timeout,
            PcscError::Pcsc(pcsc::Error::InsufficientBuffer) => Self::BufferTooSmall,
            PcscError::Pcsc(
                pcsc::Error::NoSmartcard | pcsc::Error::RemovedCard | pcsc::Error::ResetCard,
            ) => Self::Transmission,
            PcscError::Pcsc(
                pcsc::Error::ReaderUnavailable | pcsc::Error::UnknownReader | pcsc::Error::NoService,
            ) => Self::Connection,
            PcscError::Pcsc(e) => Self::driver(e as i32),
            PcscError::NoReadersAvailable | PcscError::ReaderNotFound(_) => Self::Connection,
            PcscError::NoReaderForSlot(slot) => Self::UnsupportedSlot(slot),
            e @ (PcscError::NoCard(_) | PcscError::InvalidReaderName(_) | PcscError::Monitor(_)) => {
                Self::other(e.to_string())
            }
        }
    }
}
