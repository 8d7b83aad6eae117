//! PC/SC card transport for reader sessions
//!
//! [`PcscTransport`] implements [`CardTransport`](cardreader_apdu_core::CardTransport)
//! over one or two PC/SC reader names, one per slot: dual-interface readers
//! such as the ACR1281U show up as separate ICC and PICC readers.
//!
//! With the `session` feature (on by default), `PcscLink` opens the transport
//! for a `cardreader-session` device session and runs a `PcscMonitor` thread
//! that turns reader state changes into link events.
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![forbid(unsafe_code)]
#![warn(missing_docs, rustdoc::missing_crate_level_docs)]

mod config;
mod error;
#[cfg(feature = "session")]
mod link;
#[cfg(feature = "session")]
mod monitor;
mod reader;
mod transport;

pub use config::{PcscConfig, ShareMode};
pub use error::PcscError;
#[cfg(feature = "session")]
pub use link::PcscLink;
#[cfg(feature = "session")]
pub use monitor::{PcscMonitor, SlotWatch};
pub use reader::{PcscReader, SlotReaders, list_readers};
pub use transport::PcscTransport;

// Re-export some pcsc types for convenience
pub use pcsc::{Protocols, Scope};
