//! Session configuration

use cardreader_decoders::{DecoderKind, UidTrailer};

/// Decoder lists and reader options for a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Decoders tried, in order, for contact cards
    pub contact: Vec<DecoderKind>,

    /// Decoders tried, in order, for contactless cards
    pub contactless: Vec<DecoderKind>,

    /// Status trailer the reader appends to NFC UIDs
    pub uid_trailer: UidTrailer,
}

impl SessionConfig {
    /// Create a configuration with every decoder enabled
    ///
    /// The UID trailer depends on the reader firmware, so there is no default.
    pub fn new(uid_trailer: UidTrailer) -> Self {
        Self {
            contact: DecoderKind::CONTACT.to_vec(),
            contactless: DecoderKind::CONTACTLESS.to_vec(),
            uid_trailer,
        }
    }

    /// Set the contact decoders
    pub fn with_contact_decoders(mut self, decoders: impl IntoIterator<Item = DecoderKind>) -> Self {
        self.contact = decoders.into_iter().collect();
        self
    }

    /// Set the contactless decoders
    pub fn with_contactless_decoders(
        mut self,
        decoders: impl IntoIterator<Item = DecoderKind>,
    ) -> Self {
        self.contactless = decoders.into_iter().collect();
        self
    }

    /// Set the UID trailer
    pub const fn with_uid_trailer(mut self, trailer: UidTrailer) -> Self {
        self.uid_trailer = trailer;
        self
    }
}
