//! PC/SC transport implementation

use std::{ffi::CString, fmt};

use bytes::Bytes;
use cardreader_apdu_core::{CardTransport, IOCTL_CCID_ESCAPE, Slot, TransportError};
use pcsc::{Attribute, Card, Context, Disposition};
use tracing::{debug, warn};

use crate::{config::PcscConfig, error::PcscError, reader::SlotReaders};

/// Control code of the CCID escape command in the PC/SC numbering
const PCSC_CCID_ESCAPE: u32 = 3500;

/// Transport implementation using PC/SC
///
/// Each slot maps to a reader name. Powering a slot on connects to its card
/// and powering it off disconnects with an unpower disposition.
pub struct PcscTransport {
    context: Context,
    readers: SlotReaders,
    names: [Option<CString>; 2],
    cards: [Option<Card>; 2],
    config: PcscConfig,
}

impl fmt::Debug for PcscTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PcscTransport")
            .field("readers", &self.readers)
            .field("contact_card", &self.cards[0].is_some())
            .field("contactless_card", &self.cards[1].is_some())
            .field("config", &self.config)
            .finish()
    }
}

impl PcscTransport {
    /// Create a transport over the readers assigned to each slot
    pub fn new(context: Context, readers: SlotReaders, config: PcscConfig) -> Result<Self, PcscError> {
        let to_cstring = |name: Option<&str>| {
            name.map(|name| {
                CString::new(name).map_err(|_| PcscError::InvalidReaderName(name.to_string()))
            })
            .transpose()
        };
        let names = [
            to_cstring(readers.get(Slot::Contact))?,
            to_cstring(readers.get(Slot::Contactless))?,
        ];

        Ok(Self {
            context,
            readers,
            names,
            cards: [None, None],
            config,
        })
    }

    /// Reader names per slot
    pub const fn readers(&self) -> &SlotReaders {
        &self.readers
    }

    /// Whether `slot` holds a connected card
    pub const fn has_card(&self, slot: Slot) -> bool {
        self.cards[slot.index() as usize].is_some()
    }

    fn reader_name(&self, slot: Slot) -> Result<&CString, PcscError> {
        self.names[slot.index() as usize]
            .as_ref()
            .ok_or(PcscError::NoReaderForSlot(slot))
    }

    fn card(&mut self, slot: Slot) -> Result<&mut Card, PcscError> {
        let name = self.readers.get(slot).unwrap_or_default().to_string();
        self.cards[slot.index() as usize]
            .as_mut()
            .ok_or(PcscError::NoCard(name))
    }

    fn connect(&mut self, slot: Slot) -> Result<Bytes, PcscError> {
        self.disconnect(slot, Disposition::LeaveCard);

        let name = self.reader_name(slot)?;
        let card = match self
            .context
            .connect(name, self.config.share_mode.into(), self.config.protocols)
        {
            Ok(card) => card,
            Err(pcsc::Error::NoSmartcard | pcsc::Error::RemovedCard) => {
                return Err(PcscError::NoCard(name.to_string_lossy().into_owned()));
            }
            Err(e) => return Err(e.into()),
        };

        let atr = card.get_attribute_owned(Attribute::AtrString)?;
        self.cards[slot.index() as usize] = Some(card);
        Ok(Bytes::from(atr))
    }

    fn disconnect(&mut self, slot: Slot, disposition: Disposition) -> Option<PcscError> {
        let card = self.cards[slot.index() as usize].take()?;
        card.disconnect(disposition).err().map(|(_, e)| e.into())
    }

    fn map_control_code(code: u32) -> u32 {
        if code == IOCTL_CCID_ESCAPE {
            PCSC_CCID_ESCAPE
        } else {
            code
        }
    }
}

impl CardTransport for PcscTransport {
    fn do_transmit(
        &mut self,
        slot: Slot,
        command: &[u8],
        capacity: usize,
    ) -> Result<Bytes, TransportError> {
        let mut buffer = vec![0u8; capacity];
        let result = self
            .card(slot)?
            .transmit(command, &mut buffer)
            .map(Bytes::copy_from_slice);

        match result {
            Ok(response) => Ok(response),
            Err(e @ (pcsc::Error::RemovedCard | pcsc::Error::ResetCard)) => {
                debug!(%slot, error = %e, "Card gone, dropping connection");
                self.cards[slot.index() as usize] = None;
                Err(PcscError::from(e).into())
            }
            Err(e) => Err(PcscError::from(e).into()),
        }
    }

    fn do_control(&mut self, slot: Slot, code: u32, command: &[u8]) -> Result<Bytes, TransportError> {
        let control_code = pcsc::ctl_code(Self::map_control_code(code).into());
        let mut buffer = vec![0u8; cardreader_apdu_core::DEFAULT_BUFFER_SIZE];
        let response = self
            .card(slot)?
            .control(control_code, command, &mut buffer)
            .map_err(PcscError::from)?;
        Ok(Bytes::copy_from_slice(response))
    }

    fn power_on(&mut self, slot: Slot) -> Result<Bytes, TransportError> {
        Ok(self.connect(slot)?)
    }

    fn power_off(&mut self, slot: Slot) -> Result<(), TransportError> {
        match self.disconnect(slot, Disposition::UnpowerCard) {
            None => Ok(()),
            Some(e) => Err(e.into()),
        }
    }

    fn is_connected(&self) -> bool {
        self.names.iter().any(Option::is_some)
    }
}

impl Drop for PcscTransport {
    fn drop(&mut self) {
        for slot in Slot::ALL {
            if let Some(e) = self.disconnect(slot, Disposition::LeaveCard) {
                warn!(%slot, error = %e, "Failed to release card");
            }
        }
    }
}
