//! Configuration options for the PC/SC transport

use cardreader_apdu_core::Slot;
use pcsc::{Protocols, ShareMode as PcscShareMode};

/// Sharing mode for card connections
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ShareMode {
    /// Exclusive access to the card
    Exclusive,
    /// Shared access to the card
    #[default]
    Shared,
    /// Direct connection to the reader
    Direct,
}

impl From<ShareMode> for PcscShareMode {
    fn from(mode: ShareMode) -> Self {
        match mode {
            ShareMode::Exclusive => Self::Exclusive,
            ShareMode::Shared => Self::Shared,
            ShareMode::Direct => Self::Direct,
        }
    }
}

/// Configuration options for the PC/SC transport
#[derive(Debug, Clone)]
pub struct PcscConfig {
    /// Sharing mode for card connections
    pub share_mode: ShareMode,

    /// Preferred protocols for card communication
    pub protocols: Protocols,

    /// Reader name for the contact slot, overriding discovery
    pub contact_reader: Option<String>,

    /// Reader name for the contactless slot, overriding discovery
    pub contactless_reader: Option<String>,
}

impl Default for PcscConfig {
    fn default() -> Self {
        Self {
            share_mode: ShareMode::Shared,
            protocols: Protocols::ANY,
            contact_reader: None,
            contactless_reader: None,
        }
    }
}

impl PcscConfig {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the sharing mode
    pub const fn with_share_mode(mut self, mode: ShareMode) -> Self {
        self.share_mode = mode;
        self
    }

    /// Set the preferred protocols
    pub const fn with_protocols(mut self, protocols: Protocols) -> Self {
        self.protocols = protocols;
        self
    }

    /// Pin the reader name used for `slot`
    pub fn with_reader(mut self, slot: Slot, name: impl Into<String>) -> Self {
        let name = Some(name.into());
        match slot {
            Slot::Contact => self.contact_reader = name,
            Slot::Contactless => self.contactless_reader = name,
        }
        self
    }

    /// Pinned reader name for `slot`
    pub fn reader(&self, slot: Slot) -> Option<&str> {
        match slot {
            Slot::Contact => self.contact_reader.as_deref(),
            Slot::Contactless => self.contactless_reader.as_deref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let config = PcscConfig::new()
            .with_share_mode(ShareMode::Exclusive)
            .with_reader(Slot::Contactless, "ACS ACR1281 1S Dual Reader PICC 0");
        assert_eq!(config.share_mode, ShareMode::Exclusive);
        assert_eq!(config.reader(Slot::Contact), None);
        assert_eq!(
            config.reader(Slot::Contactless),
            Some("ACS ACR1281 1S Dual Reader PICC 0")
        );
    }
}
