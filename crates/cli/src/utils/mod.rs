//! Utility functions and types for the card reader CLI

use std::error::Error;

use cardreader_decoders::{DecoderKind, UidTrailer};
use cardreader_session::SessionConfig;
use cardreader_transport_pcsc::list_readers;
use clap::Args;

pub(crate) mod printer;

/// Decoder selection arguments
#[derive(Args, Debug, Clone)]
pub(crate) struct DecoderArgs {
    /// Decoders tried on contact cards, in order
    #[arg(long, value_delimiter = ',', default_value = "tw-health,thai-id,mykad")]
    pub(crate) contact: Vec<DecoderKind>,

    /// Decoders tried on contactless cards, in order
    #[arg(long, value_delimiter = ',', default_value = "staff-uid,military-id")]
    pub(crate) contactless: Vec<DecoderKind>,

    /// Status trailer the reader appends to NFC UIDs: 'short' (9000) or 'framed' (900000)
    #[arg(long)]
    pub(crate) uid_trailer: UidTrailer,
}

impl DecoderArgs {
    /// Build the session configuration
    pub(crate) fn session_config(&self) -> SessionConfig {
        SessionConfig::new(self.uid_trailer)
            .with_contact_decoders(self.contact.iter().copied())
            .with_contactless_decoders(self.contactless.iter().copied())
    }
}

/// Use the given reader name, or the first reader PC/SC knows about
pub(crate) fn resolve_reader(reader: Option<String>) -> Result<String, Box<dyn Error>> {
    if let Some(reader) = reader {
        return Ok(reader);
    }

    let readers = list_readers()?;
    readers
        .first()
        .map(|reader| reader.name().to_string())
        .ok_or_else(|| "No readers found!".into())
}
