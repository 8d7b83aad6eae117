//! Errors from splitting and checking responses

use thiserror::Error;

use super::status::StatusWord;

/// Error for APDU response processing
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResponseError {
    /// Response shorter than a status word
    #[error("Incomplete response: {0} bytes")]
    Incomplete(usize),

    /// Status word other than the one the caller required
    #[error("Unexpected status {status} ({})", .status.description())]
    Status {
        /// Status word received
        status: StatusWord,
    },
}

impl ResponseError {
    /// Whether this is a status error for `sw`
    pub const fn has_status(&self, sw: u16) -> bool {
        matches!(self, Self::Status { status } if status.to_u16() == sw)
    }
}
