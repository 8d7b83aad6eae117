//! Error types specific to card transport

use thiserror::Error;

use super::Slot;

/// Transport error type
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Connection error
    #[error("Failed to connect to device")]
    Connection,

    /// Transmission error
    #[error("Failed to transmit data")]
    Transmission,

    /// Device error
    #[error("Device error")]
    Device,

    /// Response did not fit the buffer
    #[error("Buffer too small")]
    BufferTooSmall,

    /// No card in the addressed slot
    #[error("No card present in {0} slot")]
    NoCard(Slot),

    /// The reader has no such slot
    #[error("Reader has no {0} slot")]
    UnsupportedSlot(Slot),

    /// Driver error (with code)
    #[error("Driver error code: {0}")]
    Driver(i32),

    /// Timeout error
    #[error("Operation timed out")]
    Timeout,

    /// Other error with message
    #[error("{0}")]
    Other(String),
}

impl TransportError {
    /// Create a new driver error
    pub const fn driver(code: i32) -> Self {
        Self::Driver(code)
    }

    /// Create a general other error
    pub fn other<S: Into<String>>(message: S) -> Self {
        Self::Other(message.into())
    }

    /// Whether the link to the reader is lost, as opposed to a card or
    /// command level failure
    pub const fn is_link_failure(&self) -> bool {
        matches!(self, Self::Connection | Self::Transmission | Self::Timeout)
    }
}
