//! Decoder errors

use cardreader_apdu_core::{Command, StatusWord, TransportError};
use thiserror::Error;

/// Error raised while reading a card
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The card rejected the application selection
    #[error("Selecting {application} failed: {response}")]
    SelectFailed {
        /// Command that failed
        application: &'static str,
        /// Hex of the raw response
        response: String,
    },

    /// A response did not satisfy its command's expectation
    #[error("Unexpected status {got} at step {step}")]
    UnexpectedStatusWord {
        /// Command that failed
        step: &'static str,
        /// Status word received
        got: StatusWord,
    },

    /// A response was shorter than its layout requires
    #[error("Response too short: got {len} bytes, need {need}")]
    ShortResponse {
        /// Bytes received
        len: usize,
        /// Bytes required
        need: usize,
    },

    /// Text that is not valid in its character set
    #[error("Invalid {charset} text in field {field}")]
    Encoding {
        /// Field being decoded
        field: &'static str,
        /// Character set it was decoded with
        charset: &'static str,
    },

    /// A field whose content does not fit its format
    #[error("Malformed field {field}: {value:?}")]
    MalformedField {
        /// Field being decoded
        field: &'static str,
        /// Offending content
        value: String,
    },

    /// A response arrived for a decoder with no exchange in flight
    #[error("No exchange in progress")]
    NotStarted,

    /// A stepwise decoder asked for more data without sending a command
    #[error("Decoder stalled without a pending command")]
    Stalled,

    /// Transport failure, including timeouts
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl DecodeError {
    /// Error for a response that `command` does not accept
    pub fn rejected(command: &Command, response: &[u8]) -> Self {
        match StatusWord::from_tail(response) {
            Some(got) => Self::UnexpectedStatusWord {
                step: command.name(),
                got,
            },
            None => Self::ShortResponse {
                len: response.len(),
                need: 2,
            },
        }
    }

    /// Error for a rejected application selection
    pub fn select_failed(command: &Command, response: &[u8]) -> Self {
        Self::SelectFailed {
            application: command.name(),
            response: cardreader_apdu_core::hex::encode(response),
        }
    }
}

/// Check `response` against `command`'s expectation
pub(crate) fn expect(command: &Command, response: &[u8]) -> Result<(), DecodeError> {
    if command.accepts(response) {
        Ok(())
    } else {
        Err(DecodeError::rejected(command, response))
    }
}

/// Check a SELECT response against its expectation
pub(crate) fn expect_selected(command: &Command, response: &[u8]) -> Result<(), DecodeError> {
    if command.accepts(response) {
        Ok(())
    } else {
        Err(DecodeError::select_failed(command, response))
    }
}
