//! Thai national ID card
//!
//! The card answers every READ BINARY with `61 XX` and hands out the data
//! through a follow-up GET RESPONSE, so a full read takes seven exchanges.
//! Each exchange depends on the previous one, which makes this decoder
//! stepwise by nature; blocking readers run it through [`StepDriver`].
//!
//! [`StepDriver`]: crate::decoder::StepDriver

use cardreader_apdu_core::{ApduSink, Command, Expect, Slot};
use tracing::debug;

use crate::{
    charset,
    decoder::{Step, StepDecoder},
    era,
    error::{DecodeError, expect},
    record::{CardRecord, CardType, Gender},
};

const SUCCESS: &[u8] = &[0x90, 0x00];

/// The seven commands of a full read, in order
pub const STEPS: [Command; 7] = [
    Command::new(
        "select thai id",
        &[0x00, 0xA4, 0x04, 0x00, 0x08, 0xA0, 0x00, 0x00, 0x00, 0x54, 0x48, 0x00, 0x01],
        Expect::Prefix(&[0x61]),
    ),
    Command::new(
        "read national id",
        &[0x80, 0xB0, 0x00, 0x04, 0x02, 0x00, 0x0D],
        Expect::Prefix(&[0x61, 0x0D]),
    ),
    Command::new(
        "get national id",
        &[0x00, 0xC0, 0x00, 0x00, 0x0D],
        Expect::Suffix(SUCCESS),
    )
    .with_capacity(15),
    Command::new(
        "read personal info",
        &[0x80, 0xB0, 0x00, 0x11, 0x02, 0x00, 0xD1],
        Expect::Prefix(&[0x61, 0xD1]),
    ),
    Command::new(
        "get personal info",
        &[0x00, 0xC0, 0x00, 0x00, 0xD1],
        Expect::Suffix(SUCCESS),
    )
    .with_capacity(211),
    Command::new(
        "read card dates",
        &[0x80, 0xB0, 0x01, 0x67, 0x02, 0x00, 0x12],
        Expect::Prefix(&[0x61, 0x12]),
    ),
    Command::new(
        "get card dates",
        &[0x00, 0xC0, 0x00, 0x00, 0x12],
        Expect::Suffix(SUCCESS),
    )
    .with_capacity(20),
];

const NATIONAL_ID_LEN: usize = 13;
const PERSONAL_INFO_LEN: usize = 209;
/// Thai name field of the personal info record, read in full
const THAI_NAME_LEN: usize = 100;
const CARD_DATES_LEN: usize = 16;

/// Per-insertion progress through [`STEPS`]
#[derive(Debug)]
struct DecodeSession {
    step: usize,
    record: CardRecord,
}

impl DecodeSession {
    fn new() -> Self {
        Self {
            step: 0,
            record: CardRecord::new(CardType::HealthCard),
        }
    }
}

/// Decoder for the Thai national ID card
#[derive(Debug, Default)]
pub struct ThaiIdDecoder {
    session: Option<DecodeSession>,
}

impl ThaiIdDecoder {
    /// Create a new decoder
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of the command awaiting a response, if an exchange is in flight
    pub fn current_step(&self) -> Option<usize> {
        self.session.as_ref().map(|session| session.step)
    }
}

/// Strip the status word, checking the payload is long enough
fn payload(response: &[u8], need: usize) -> Result<&[u8], DecodeError> {
    let payload = &response[..response.len().saturating_sub(2)];
    if payload.len() < need {
        return Err(DecodeError::ShortResponse {
            len: payload.len(),
            need,
        });
    }
    Ok(payload)
}

fn parse_national_id(record: &mut CardRecord, response: &[u8]) -> Result<(), DecodeError> {
    let data = payload(response, NATIONAL_ID_LEN)?;
    let id = charset::ascii("national id", &data[..NATIONAL_ID_LEN])?;
    record.card_number.clone_from(&id);
    record.national_id = id;
    Ok(())
}

fn parse_personal_info(record: &mut CardRecord, response: &[u8]) -> Result<(), DecodeError> {
    let data = payload(response, PERSONAL_INFO_LEN)?;

    // Title, first name, middle name and surname separated by '#'
    let name = charset::tis620("name", &data[..THAI_NAME_LEN])?;
    record.name = name
        .split('#')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    record.birth_date = Some(era::parse_buddhist("birth date", &data[200..208])?);
    record.gender = match data[208] {
        b'1' => Gender::Male,
        b'2' => Gender::Female,
        _ => Gender::Unknown,
    };
    Ok(())
}

fn parse_card_dates(record: &mut CardRecord, response: &[u8]) -> Result<(), DecodeError> {
    let data = payload(response, CARD_DATES_LEN)?;
    record.issued_date = Some(era::parse_buddhist("issued date", &data[0..8])?);
    record.expired_date = Some(era::parse_buddhist("expired date", &data[8..16])?);
    Ok(())
}

impl ThaiIdDecoder {
    fn step(
        session: &mut DecodeSession,
        sink: &mut dyn ApduSink,
        slot: Slot,
        response: &[u8],
    ) -> Result<bool, DecodeError> {
        let command = &STEPS[session.step];
        expect(command, response)?;

        match session.step {
            2 => parse_national_id(&mut session.record, response)?,
            4 => parse_personal_info(&mut session.record, response)?,
            6 => {
                parse_card_dates(&mut session.record, response)?;
                return Ok(true);
            }
            _ => {}
        }

        session.step += 1;
        debug!(step = STEPS[session.step].name(), "Thai ID card next step");
        sink.send_apdu(slot, STEPS[session.step].apdu())?;
        Ok(false)
    }
}

impl StepDecoder for ThaiIdDecoder {
    fn name(&self) -> &'static str {
        "thai-id"
    }

    fn start(&mut self, sink: &mut dyn ApduSink, slot: Slot) -> Result<(), DecodeError> {
        self.reset();
        sink.send_apdu(slot, STEPS[0].apdu())?;
        self.session = Some(DecodeSession::new());
        Ok(())
    }

    fn advance(
        &mut self,
        sink: &mut dyn ApduSink,
        slot: Slot,
        response: &[u8],
    ) -> Result<Step, DecodeError> {
        // Taken out so that every error path leaves the decoder reset
        let mut session = self.session.take().ok_or(DecodeError::NotStarted)?;

        if Self::step(&mut session, sink, slot, response)? {
            Ok(Step::Complete(session.record))
        } else {
            self.session = Some(session);
            Ok(Step::NeedMoreData)
        }
    }

    fn reset(&mut self) {
        self.session = None;
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::decoder::{CardDecoder, StepDriver};
    use cardreader_apdu_core::{MockSink, MockTransport};
    use hex_literal::hex;

    fn pad(mut data: Vec<u8>, len: usize) -> Vec<u8> {
        data.resize(len, b' ');
        data
    }

    /// Responses to the seven steps of a full read
    pub(crate) fn responses() -> Vec<Vec<u8>> {
        // นาย#สมชาย##ใจดี
        let thai_name = hex!("B9D2C223CAC1AAD2C22323E3A8B4D5").to_vec();

        let mut info = pad(thai_name, 100);
        info.extend_from_slice(&pad(b"Mr.#Somchai##Jaidee".to_vec(), 100));
        info.extend_from_slice(b"25300615");
        info.push(b'1');
        info.extend_from_slice(&hex!("9000"));

        let mut dates = pad(b"2560010125690101".to_vec(), 18);
        dates.extend_from_slice(&hex!("9000"));

        vec![
            hex!("6117").to_vec(),
            hex!("610D").to_vec(),
            [b"1103700012345".as_slice(), &hex!("9000")[..]].concat(),
            hex!("61D1").to_vec(),
            info,
            hex!("6112").to_vec(),
            dates,
        ]
    }

    #[test]
    fn test_long_name_uses_whole_field() {
        let mut name = vec![b'A'; 88];
        name.extend_from_slice(b"#LONGSURNAME");
        let mut info = pad(name, 100);
        info.extend_from_slice(&pad(Vec::new(), 100));
        info.extend_from_slice(b"25300615");
        info.push(b'2');
        info.extend_from_slice(&hex!("9000"));

        let mut record = CardRecord::new(CardType::HealthCard);
        parse_personal_info(&mut record, &info).unwrap();
        assert_eq!(record.name, format!("{} LONGSURNAME", "A".repeat(88)));
        assert_eq!(record.gender, Gender::Female);
    }

    #[test]
    fn test_seven_step_read() {
        let mut sink = MockSink::new();
        let mut decoder = ThaiIdDecoder::new();
        decoder.start(&mut sink, Slot::Contact).unwrap();

        let responses = responses();
        let (last, steps) = responses.split_last().unwrap();
        for (i, response) in steps.iter().enumerate() {
            assert_eq!(decoder.current_step(), Some(i));
            assert_eq!(
                decoder.advance(&mut sink, Slot::Contact, response).unwrap(),
                Step::NeedMoreData
            );
        }

        let Step::Complete(record) = decoder.advance(&mut sink, Slot::Contact, last).unwrap()
        else {
            panic!("expected a complete record");
        };
        assert_eq!(record.card_number, "1103700012345");
        assert_eq!(record.national_id, "1103700012345");
        assert_eq!(record.name, "นาย สมชาย ใจดี");
        assert_eq!(record.gender, Gender::Male);
        assert_eq!(record.birth_date.unwrap().to_string(), "1987-06-15");
        assert_eq!(record.issued_date.unwrap().to_string(), "2017-01-01");
        assert_eq!(record.expired_date.unwrap().to_string(), "2026-01-01");
        assert_eq!(decoder.current_step(), None);

        let sent: Vec<_> = sink
            .events
            .iter()
            .filter_map(|event| match event {
                cardreader_apdu_core::MockEvent::Transmit(_, apdu) => Some(apdu.to_vec()),
                _ => None,
            })
            .collect();
        let expected: Vec<_> = STEPS.iter().map(|cmd| cmd.apdu().to_vec()).collect();
        assert_eq!(sent, expected);
    }

    #[test]
    fn test_abort_resets_session() {
        let mut sink = MockSink::new();
        let mut decoder = ThaiIdDecoder::new();
        decoder.start(&mut sink, Slot::Contact).unwrap();
        decoder.advance(&mut sink, Slot::Contact, &hex!("6117")).unwrap();
        decoder.advance(&mut sink, Slot::Contact, &hex!("610D")).unwrap();

        // GET RESPONSE for the national ID fails
        assert_eq!(
            decoder.advance(&mut sink, Slot::Contact, &hex!("6A82")),
            Err(DecodeError::UnexpectedStatusWord {
                step: "get national id",
                got: cardreader_apdu_core::StatusWord::new(0x6A, 0x82),
            })
        );
        assert_eq!(decoder.current_step(), None);
        assert_eq!(
            decoder.advance(&mut sink, Slot::Contact, &hex!("9000")),
            Err(DecodeError::NotStarted)
        );

        // A fresh start begins again at the first command
        decoder.start(&mut sink, Slot::Contact).unwrap();
        assert_eq!(decoder.current_step(), Some(0));
        assert_eq!(
            sink.last_apdu().map(|b| b.to_vec()),
            Some(STEPS[0].apdu().to_vec())
        );
    }

    #[test]
    fn test_blocking_driver() {
        let mut transport = MockTransport::with_responses(responses());
        let mut decoder = StepDriver::new(ThaiIdDecoder::new());

        assert_eq!(decoder.name(), "thai-id");
        let record = decoder.decode(&mut transport, Slot::Contact).unwrap();
        assert_eq!(record.national_id, "1103700012345");
        assert_eq!(transport.transmitted().len(), 7);
        assert_eq!(transport.remaining(), 0);
    }

    #[test]
    fn test_blocking_driver_abort() {
        let mut transport =
            MockTransport::with_responses([hex!("6117").to_vec(), hex!("6E00").to_vec()]);
        let mut decoder = StepDriver::new(ThaiIdDecoder::new());

        let err = decoder.decode(&mut transport, Slot::Contact).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::UnexpectedStatusWord {
                step: "read national id",
                ..
            }
        ));
        assert_eq!(decoder.inner().current_step(), None);
    }
}
