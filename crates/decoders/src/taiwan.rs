//! Taiwan national health insurance card
//!
//! The profile is a single fixed-layout record:
//!
//! | bytes   | field                         |
//! |---------|-------------------------------|
//! | 0..12   | card number, ASCII            |
//! | 12..32  | name, Big5, NUL padded        |
//! | 32..42  | national ID, ASCII            |
//! | 42..49  | birth date, Minguo `YYYMMDD`  |
//! | 49      | gender, `M` or `F`            |
//! | 50..57  | issue date, Minguo `YYYMMDD`  |

use cardreader_apdu_core::{
    ApduSink, CardTransport, Command, Expect, Slot, response::split_status,
};
use tracing::debug;

use crate::{
    charset, era,
    decoder::{CardDecoder, Step, StepDecoder},
    error::{DecodeError, expect_selected},
    record::{CardRecord, CardType, Gender},
};

const SUCCESS: &[u8] = &[0x90, 0x00];

/// SELECT the health card application
pub const SELECT: Command = Command::new(
    "select health card",
    &[
        0x00, 0xA4, 0x04, 0x00, 0x10, 0xD1, 0x58, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x00, 0x11, 0x00,
    ],
    Expect::Suffix(SUCCESS),
);

/// READ PROFILE
pub const READ_PROFILE: Command = Command::new(
    "read profile",
    &[0x00, 0xCA, 0x11, 0x00, 0x02, 0x00, 0x00],
    Expect::Suffix(SUCCESS),
);

/// Length of the profile record
pub const PROFILE_LEN: usize = 57;

/// Parse the profile record returned by [`READ_PROFILE`]
pub fn parse_profile(payload: &[u8]) -> Result<CardRecord, DecodeError> {
    if payload.len() < PROFILE_LEN {
        return Err(DecodeError::ShortResponse {
            len: payload.len(),
            need: PROFILE_LEN,
        });
    }

    Ok(CardRecord {
        card_number: charset::ascii("card number", &payload[0..12])?,
        name: charset::big5("name", &payload[12..32])?,
        national_id: charset::ascii("national id", &payload[32..42])?,
        birth_date: Some(era::parse_minguo("birth date", &payload[42..49])?),
        gender: match payload[49] {
            b'M' => Gender::Male,
            b'F' => Gender::Female,
            _ => Gender::Unknown,
        },
        issued_date: Some(era::parse_minguo("issued date", &payload[50..57])?),
        expired_date: None,
        card_type: CardType::HealthCard,
    })
}

/// Parse the raw READ PROFILE response, status word included
fn parse_profile_response(response: &[u8]) -> Result<CardRecord, DecodeError> {
    let (status, payload) = split_status(response).map_err(|_| DecodeError::ShortResponse {
        len: response.len(),
        need: PROFILE_LEN + 2,
    })?;
    if !status.is_success() {
        return Err(DecodeError::UnexpectedStatusWord {
            step: READ_PROFILE.name(),
            got: status,
        });
    }
    parse_profile(payload)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum State {
    #[default]
    Idle,
    Selecting,
    Reading,
}

/// Decoder for the Taiwan health card
#[derive(Debug, Default)]
pub struct TaiwanHealthDecoder {
    state: State,
}

impl TaiwanHealthDecoder {
    /// Create a new decoder
    pub fn new() -> Self {
        Self::default()
    }
}

impl CardDecoder for TaiwanHealthDecoder {
    fn name(&self) -> &'static str {
        "tw-health"
    }

    fn decode(
        &mut self,
        transport: &mut dyn CardTransport,
        slot: Slot,
    ) -> Result<CardRecord, DecodeError> {
        let response = transport.exchange(slot, &SELECT)?;
        expect_selected(&SELECT, &response)?;

        let response = transport.exchange(slot, &READ_PROFILE)?;
        parse_profile_response(&response)
    }
}

impl StepDecoder for TaiwanHealthDecoder {
    fn name(&self) -> &'static str {
        "tw-health"
    }

    fn start(&mut self, sink: &mut dyn ApduSink, slot: Slot) -> Result<(), DecodeError> {
        self.reset();
        sink.send_apdu(slot, SELECT.apdu())?;
        self.state = State::Selecting;
        Ok(())
    }

    fn advance(
        &mut self,
        sink: &mut dyn ApduSink,
        slot: Slot,
        response: &[u8],
    ) -> Result<Step, DecodeError> {
        let state = std::mem::take(&mut self.state);
        debug!(?state, len = response.len(), "Taiwan health card response");

        match state {
            State::Idle => Err(DecodeError::NotStarted),
            State::Selecting => {
                expect_selected(&SELECT, response)?;
                sink.send_apdu(slot, READ_PROFILE.apdu())?;
                self.state = State::Reading;
                Ok(Step::NeedMoreData)
            }
            State::Reading => parse_profile_response(response).map(Step::Complete),
        }
    }

    fn reset(&mut self) {
        self.state = State::Idle;
    }
}
