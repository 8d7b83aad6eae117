//! Reader discovery and slot assignment

use cardreader_apdu_core::Slot;
use pcsc::{Context, ReaderState, Scope, State};

use crate::{config::PcscConfig, error::PcscError};

/// Readers with only an NFC interface
const CONTACTLESS_ONLY: [&str; 2] = ["ACR122U", "ACR1251T"];

/// Representation of a PC/SC card reader
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PcscReader {
    name: String,
    has_card: bool,
    atr: Option<Vec<u8>>,
}

impl PcscReader {
    /// Create a new reader
    pub const fn new(name: String, has_card: bool, atr: Option<Vec<u8>>) -> Self {
        Self {
            name,
            has_card,
            atr,
        }
    }

    /// Reader name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether a card is present in the reader
    pub const fn has_card(&self) -> bool {
        self.has_card
    }

    /// ATR of the card, if present
    pub fn atr(&self) -> Option<&[u8]> {
        self.atr.as_deref()
    }

    fn from_reader_state(reader_state: &ReaderState) -> Self {
        let state = reader_state.event_state();
        let has_card = state.contains(State::PRESENT) && !state.contains(State::EMPTY);
        let atr = has_card.then(|| reader_state.atr().to_vec());

        Self::new(
            reader_state.name().to_string_lossy().into_owned(),
            has_card,
            atr,
        )
    }
}

/// List readers known to PC/SC with their card state
pub fn list_readers() -> Result<Vec<PcscReader>, PcscError> {
    let context = Context::establish(Scope::User)?;
    let names = context.list_readers_owned()?;
    if names.is_empty() {
        return Err(PcscError::NoReadersAvailable);
    }

    let mut states: Vec<_> = names
        .into_iter()
        .map(|name| ReaderState::new(name, State::UNAWARE))
        .collect();
    context.get_status_change(None, &mut states)?;

    Ok(states.iter().map(PcscReader::from_reader_state).collect())
}

/// Reader name serving each slot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlotReaders {
    /// Contact slot reader
    pub contact: Option<String>,
    /// Contactless slot reader
    pub contactless: Option<String>,
}

impl SlotReaders {
    /// Reader name for `slot`
    pub fn get(&self, slot: Slot) -> Option<&str> {
        match slot {
            Slot::Contact => self.contact.as_deref(),
            Slot::Contactless => self.contactless.as_deref(),
        }
    }

    /// Slots with a reader, and their reader names
    pub fn iter(&self) -> impl Iterator<Item = (Slot, &str)> {
        Slot::ALL
            .into_iter()
            .filter_map(|slot| self.get(slot).map(|name| (slot, name)))
    }

    /// Assign the readers whose name contains `address` to slots
    ///
    /// Pinned names in `config` win. Otherwise a reader whose name mentions
    /// `PICC` serves the contactless slot, and so does the single reader of a
    /// contactless-only model; every other reader serves the contact slot.
    pub fn assign(names: &[String], address: &str, config: &PcscConfig) -> Result<Self, PcscError> {
        let mut readers = Self {
            contact: config.contact_reader.clone(),
            contactless: config.contactless_reader.clone(),
        };

        let matching: Vec<&String> = names.iter().filter(|name| name.contains(address)).collect();
        for name in &matching {
            let upper = name.to_ascii_uppercase();
            let contactless = upper.contains("PICC")
                || CONTACTLESS_ONLY.iter().any(|model| upper.contains(model));
            let target = if contactless {
                &mut readers.contactless
            } else {
                &mut readers.contact
            };
            if target.is_none() {
                *target = Some((*name).clone());
            }
        }

        if readers.contact.is_none() && readers.contactless.is_none() {
            return Err(PcscError::ReaderNotFound(address.to_string()));
        }
        Ok(readers)
    }

    /// Name reported to the session, used to resolve the reader model
    pub fn display_name(&self) -> &str {
        self.contact
            .as_deref()
            .or(self.contactless.as_deref())
            .unwrap_or_default()
    }
}
