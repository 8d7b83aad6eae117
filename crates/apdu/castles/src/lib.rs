//! Card transport for Castles EZUSB readers
//!
//! The reader speaks a CCID-style protocol over a pair of bulk endpoints.
//! Every message carries a 10-byte header:
//!
//! ```text
//! [kind, 0, 0, 0, len, slot, seq, 0, 0, 0] ++ data
//! ```
//!
//! This crate frames commands, validates power-on answers, strips headers
//! from APDU responses and polls the slot status. Opening the USB device and
//! claiming its endpoints is left to the caller, who hands over a
//! [`BulkEndpoint`].
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![forbid(unsafe_code)]
#![warn(missing_docs, rustdoc::missing_crate_level_docs)]

mod endpoint;
mod error;
pub mod frame;
mod presence;
mod reader;

pub use endpoint::BulkEndpoint;
pub use error::CastlesError;
pub use frame::FrameKind;
pub use presence::{CardChange, PresenceTracker};
pub use reader::{CastlesReader, SequenceCounter};
