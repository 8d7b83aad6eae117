//! Session errors

use std::fmt;

use cardreader_apdu_core::{Slot, TransportError};
use cardreader_decoders::DecodeError;
use thiserror::Error;

/// Why a single decoder attempt did not produce a record
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttemptError {
    /// The decoder failed
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// The decoder finished without a card number
    #[error("card not recognised")]
    EmptyRecord,
}

/// One failed decoder attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedAttempt {
    /// Decoder name
    pub decoder: &'static str,
    /// What went wrong
    pub error: AttemptError,
}

impl fmt::Display for FailedAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.decoder, self.error)
    }
}

/// Every failed attempt of a selection run, in the order tried
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FailedAttempts(Vec<FailedAttempt>);

impl FailedAttempts {
    pub(crate) fn push(&mut self, decoder: &'static str, error: AttemptError) {
        self.0.push(FailedAttempt { decoder, error });
    }

    /// First failure, reported as the cause of the whole run
    pub fn first(&self) -> Option<&FailedAttempt> {
        self.0.first()
    }

    /// All failures
    pub fn as_slice(&self) -> &[FailedAttempt] {
        &self.0
    }

    /// Number of failed attempts
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no attempt was recorded
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for FailedAttempts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.first() {
            Some(first) => write!(f, "{} attempts, first: {first}", self.len()),
            None => f.write_str("no attempts"),
        }
    }
}

/// Error reported for a card read or a reader operation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// The card could not be powered on
    #[error("Invalid card: {0}")]
    InvalidCard(TransportError),

    /// No decoder is configured for the slot
    #[error("No decoders configured for the {slot} slot")]
    NoDecoders {
        /// Slot the card was presented on
        slot: Slot,
    },

    /// Every decoder failed or returned an empty record
    #[error("All decoders failed ({0})")]
    AllDecodersFailed(FailedAttempts),

    /// Operation needs a connected reader
    #[error("Reader not connected")]
    NotConnected,

    /// Transport failure outside a decoder
    #[error(transparent)]
    Transport(#[from] TransportError),
}
