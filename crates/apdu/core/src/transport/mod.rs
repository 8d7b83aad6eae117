//! Transport traits for APDU communication with cards
//!
//! Two shapes of reader exist. Blocking readers (USB CCID, PC/SC, vendor
//! SDKs) answer each command synchronously and implement [`CardTransport`].
//! Readers that deliver responses as events (BLE) implement [`ApduSink`]: the
//! session sends a command and the response arrives later through the
//! reader's event stream.

pub mod error;
#[cfg(any(test, feature = "mock"))]
pub mod mock;

use std::fmt;

use bytes::Bytes;
use derive_more::Display;
pub use error::TransportError;
use tracing::{debug, trace};

use crate::command::Command;

/// Response buffer size used when a command does not ask for a specific one
pub const DEFAULT_BUFFER_SIZE: usize = 8192;

/// Control code of the CCID escape command, as Windows numbers it
pub const IOCTL_CCID_ESCAPE: u32 = 0x0031_0000 + 3500 * 4;

/// Card interface of a reader
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display)]
pub enum Slot {
    /// Contact chip slot (index 0)
    #[display("contact")]
    Contact,
    /// Contactless antenna (index 1)
    #[display("contactless")]
    Contactless,
}

impl Slot {
    /// All slots, in index order
    pub const ALL: [Self; 2] = [Self::Contact, Self::Contactless];

    /// Reader slot index
    pub const fn index(self) -> u8 {
        match self {
            Self::Contact => 0,
            Self::Contactless => 1,
        }
    }

    /// Slot for a reader slot index
    pub const fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(Self::Contact),
            1 => Some(Self::Contactless),
            _ => None,
        }
    }
}

/// Trait for blocking card transports
///
/// A transport sends raw APDU bytes and returns the raw response (payload and
/// status word). It has no knowledge of card formats; GET RESPONSE chaining is
/// the caller's job.
pub trait CardTransport: fmt::Debug + Send {
    /// Send raw APDU bytes to the card in `slot` and return the response bytes
    fn transmit(
        &mut self,
        slot: Slot,
        command: &[u8],
        capacity: usize,
    ) -> Result<Bytes, TransportError> {
        trace!(%slot, command = %crate::hex::encode(command), "Transmitting raw command");
        let result = self.do_transmit(slot, command, capacity);
        log_result(&result);
        result
    }

    /// Internal implementation of [`transmit`](Self::transmit)
    fn do_transmit(
        &mut self,
        slot: Slot,
        command: &[u8],
        capacity: usize,
    ) -> Result<Bytes, TransportError>;

    /// Send a reader control (escape) command
    fn control(&mut self, slot: Slot, code: u32, command: &[u8]) -> Result<Bytes, TransportError> {
        trace!(%slot, code = format_args!("{code:#x}"), command = %crate::hex::encode(command), "Sending control command");
        let result = self.do_control(slot, code, command);
        log_result(&result);
        result
    }

    /// Internal implementation of [`control`](Self::control)
    fn do_control(&mut self, slot: Slot, code: u32, command: &[u8])
    -> Result<Bytes, TransportError>;

    /// Power the card on and return its ATR
    fn power_on(&mut self, slot: Slot) -> Result<Bytes, TransportError>;

    /// Power the card off
    fn power_off(&mut self, slot: Slot) -> Result<(), TransportError>;

    /// Check if the transport is connected to its reader
    fn is_connected(&self) -> bool;

    /// Transmit a [`Command`] with its own response capacity
    fn exchange(&mut self, slot: Slot, command: &Command) -> Result<Bytes, TransportError> {
        debug!(%slot, command = command.name(), "Exchanging APDU");
        self.transmit(slot, command.apdu(), command.capacity())
    }
}

fn log_result(result: &Result<Bytes, TransportError>) {
    match result {
        Ok(response) => {
            trace!(response = %crate::hex::encode(response), "Received raw response");
        }
        Err(e) => {
            debug!(error = ?e, "Transport error during transmission");
        }
    }
}

/// Sending half of a reader that delivers responses asynchronously
///
/// Responses and ATRs come back through the reader's event stream, not as
/// return values.
pub trait ApduSink: fmt::Debug + Send {
    /// Queue a raw APDU for the card in `slot`
    fn send_apdu(&mut self, slot: Slot, command: &[u8]) -> Result<(), TransportError>;

    /// Ask the reader to power on the card in `slot`; the ATR arrives as an event
    fn request_power_on(&mut self, slot: Slot) -> Result<(), TransportError>;
}
