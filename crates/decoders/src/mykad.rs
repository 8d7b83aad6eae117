//! Malaysian MyKad, JPN application
//!
//! Every field is read with the same three commands: SET LENGTH, SELECT INFO
//! (file and offset) and READ INFO. A field whose exchange is refused is left
//! empty; only the application selection is fatal.

use cardreader_apdu_core::{Bytes, CardTransport, Command, Expect, Slot};
use tracing::{debug, warn};

use crate::{
    charset,
    decoder::CardDecoder,
    era,
    error::{DecodeError, expect, expect_selected},
    record::{CardDate, CardRecord, CardType, Gender},
};

const SUCCESS: &[u8] = &[0x90, 0x00];

/// SELECT the JPN application
pub const SELECT_JPN: Command = Command::new(
    "select jpn",
    &[0x00, 0xA4, 0x04, 0x00, 0x0A, 0xA0, 0x00, 0x00, 0x00, 0x74, 0x4A, 0x50, 0x4E, 0x00, 0x10],
    Expect::Suffix(&[0x61, 0x05]),
);

/// GET RESPONSE for the application selection
pub const SELECT_GET_RESPONSE: Command = Command::new(
    "jpn get response",
    &[0x00, 0xC0, 0x00, 0x00, 0x05],
    Expect::Suffix(SUCCESS),
);

/// Header of the JPN-1-1 record, in front of the name
const RECORD_HEADER: &[u8] = &[0x01, 0x04, 0x24];

/// A field of the JPN-1-1 file
#[derive(Debug, Clone, Copy)]
struct Field {
    name: &'static str,
    offset: u16,
    length: u8,
}

const NAME: Field = Field {
    name: "name",
    offset: 0x0000,
    length: 0xC8,
};
const ID_NUMBER: Field = Field {
    name: "id number",
    offset: 0x0111,
    length: 0x0D,
};
const GENDER: Field = Field {
    name: "gender",
    offset: 0x011E,
    length: 0x01,
};
const BIRTH_DATE: Field = Field {
    name: "birth date",
    offset: 0x0127,
    length: 0x04,
};
const ISSUED_DATE: Field = Field {
    name: "issued date",
    offset: 0x0144,
    length: 0x04,
};

impl Field {
    fn set_length(&self) -> Command {
        Command::owned(
            "set length",
            vec![0xC8, 0x32, 0x00, 0x00, 0x05, 0x08, 0x00, 0x00, self.length, 0x00],
            Expect::Suffix(&[0x91, 0x08]),
        )
    }

    fn select_info(&self) -> Command {
        let [lo, hi] = self.offset.to_le_bytes();
        Command::owned(
            "select info",
            vec![0xCC, 0x00, 0x00, 0x00, 0x08, 0x01, 0x00, 0x01, 0x00, lo, hi, self.length, 0x00],
            Expect::Any,
        )
    }

    fn read_info(&self) -> Command {
        Command::owned(
            "read info",
            vec![0xCC, 0x06, 0x00, 0x00, self.length],
            Expect::Suffix(SUCCESS),
        )
        .with_capacity(self.length as usize + 2)
    }
}

/// Decoder for the MyKad identity card
#[derive(Debug, Default)]
pub struct MyKadDecoder;

impl MyKadDecoder {
    /// Create a new decoder
    pub const fn new() -> Self {
        Self
    }

    /// Read one field, `None` if the card refused it
    fn read_field(
        transport: &mut dyn CardTransport,
        slot: Slot,
        field: Field,
    ) -> Result<Option<Bytes>, DecodeError> {
        let set_length = field.set_length();
        if !set_length.accepts(&transport.exchange(slot, &set_length)?) {
            warn!(field = field.name, "MyKad refused field length");
            return Ok(None);
        }

        // The card answers SELECT INFO with no data worth checking
        transport.exchange(slot, &field.select_info())?;

        let read_info = field.read_info();
        let response = transport.exchange(slot, &read_info)?;
        if !read_info.accepts(&response) {
            warn!(field = field.name, "MyKad refused field read");
            return Ok(None);
        }

        Ok(Some(response.slice(..response.len() - 2)))
    }
}

/// Name from the JPN-1-1 name block: header stripped, cut at the first double space
fn parse_name(raw: &[u8]) -> Result<String, DecodeError> {
    let raw = raw.strip_prefix(RECORD_HEADER).unwrap_or(raw);
    let text = charset::ascii("name", raw)?;
    Ok(text
        .split("  ")
        .next()
        .unwrap_or_default()
        .trim()
        .to_string())
}

/// Packed BCD `YYYYMMDD` date
fn parse_bcd_date(field: &'static str, raw: &[u8]) -> Result<CardDate, DecodeError> {
    era::parse_gregorian(field, cardreader_apdu_core::hex::encode(raw).as_bytes())
}

impl CardDecoder for MyKadDecoder {
    fn name(&self) -> &'static str {
        "mykad"
    }

    fn decode(
        &mut self,
        transport: &mut dyn CardTransport,
        slot: Slot,
    ) -> Result<CardRecord, DecodeError> {
        let response = transport.exchange(slot, &SELECT_JPN)?;
        expect_selected(&SELECT_JPN, &response)?;
        let response = transport.exchange(slot, &SELECT_GET_RESPONSE)?;
        expect(&SELECT_GET_RESPONSE, &response)?;

        let mut record = CardRecord::new(CardType::HealthCard);

        if let Some(id) = Self::read_field(transport, slot, ID_NUMBER)? {
            let id = charset::ascii(ID_NUMBER.name, &id)?;
            record.card_number.clone_from(&id);
            record.national_id = id;
        }

        if let Some(name) = Self::read_field(transport, slot, NAME)? {
            record.name = parse_name(&name)?;
        }

        if let Some(gender) = Self::read_field(transport, slot, GENDER)? {
            record.gender = match gender.first() {
                Some(b'M' | b'L') => Gender::Male,
                Some(b'F' | b'P') => Gender::Female,
                _ => Gender::Unknown,
            };
        }

        if let Some(birth) = Self::read_field(transport, slot, BIRTH_DATE)? {
            record.birth_date = Some(parse_bcd_date(BIRTH_DATE.name, &birth)?);
        }

        if let Some(issued) = Self::read_field(transport, slot, ISSUED_DATE)? {
            record.issued_date = Some(parse_bcd_date(ISSUED_DATE.name, &issued)?);
        }

        debug!(empty = record.is_empty(), "MyKad read finished");
        Ok(record)
    }
}
