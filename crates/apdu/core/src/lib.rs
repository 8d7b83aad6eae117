//! Core types for APDU (Application Protocol Data Unit) exchanges with card readers
//!
//! This crate provides the foundational pieces every reader adapter and card decoder
//! builds on, following ISO/IEC 7816-4.
//!
//! ## Overview
//!
//! - A deterministic hex codec used for logging and response matching
//! - Status words and response parsing
//! - Static command descriptors with their expected-response predicate
//! - The [`CardTransport`] trait for blocking readers (USB, PC/SC, vendor SDKs)
//!   and the [`ApduSink`] trait for readers that deliver responses asynchronously (BLE)
//!
//! Readers address their interfaces through a [`Slot`]: the contact chip slot or
//! the contactless antenna.
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![forbid(unsafe_code)]
#![warn(missing_docs, rustdoc::missing_crate_level_docs)]

// Re-export bytes for convenience
pub use bytes::{Bytes, BytesMut};

pub mod command;
pub mod hex;
pub mod response;
pub mod transport;

pub use command::{Command, Expect};
pub use crate::hex::HexError;
pub use response::status::StatusWord;
pub use response::{error::ResponseError, split_status, success_payload};
pub use transport::{
    ApduSink, CardTransport, DEFAULT_BUFFER_SIZE, IOCTL_CCID_ESCAPE, Slot, TransportError,
};

#[cfg(any(test, feature = "mock"))]
pub use transport::mock::{MockEvent, MockSink, MockTransport};

/// Prelude module containing commonly used traits and types
pub mod prelude {
    pub use crate::{
        Bytes, BytesMut, Command, Expect, HexError, ResponseError, StatusWord,
        response::status::common as status,
        transport::{ApduSink, CardTransport, Slot, TransportError},
    };
}
