//! Card-format decoders
//!
//! Each decoder turns the APDU exchanges of one card format into a
//! [`CardRecord`]:
//!
//! - Taiwan national health insurance card
//! - Thai national ID card
//! - Malaysian MyKad (JPN application)
//! - NFC staff cards, identified by UID
//! - Taiwan military NFC ID card
//!
//! Decoders run over a blocking [`CardTransport`](cardreader_apdu_core::CardTransport)
//! through [`CardDecoder`], or over an asynchronous reader through [`StepDecoder`].
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![forbid(unsafe_code)]

pub mod charset;
pub mod decoder;
pub mod era;
pub mod error;
pub mod kind;
pub mod military;
pub mod mykad;
pub mod record;
pub mod staff_uid;
pub mod taiwan;
pub mod thai;

pub use decoder::{BoxedCardDecoder, BoxedStepDecoder, CardDecoder, Step, StepDecoder, StepDriver};
pub use error::DecodeError;
pub use kind::{DecoderKind, UnknownDecoder};
pub use record::{CardDate, CardRecord, CardType, Gender};
pub use staff_uid::UidTrailer;
