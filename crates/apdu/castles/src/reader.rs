//! Castles reader transport

use std::time::Duration;

use bytes::Bytes;
use cardreader_apdu_core::{CardTransport, Slot, TransportError};
use tracing::{debug, trace, warn};

use crate::{
    endpoint::BulkEndpoint,
    error::CastlesError,
    frame::{self, FrameKind, STATUS_NO_CARD},
    presence::{CardChange, PresenceTracker},
};

const WRITE_TIMEOUT: Duration = Duration::from_secs(5);
const READ_TIMEOUT: Duration = Duration::from_secs(10);

/// Header status of a successful power-off
const STATUS_POWERED_OFF: u8 = 0x01;
/// Header status of a power-off with no card
const STATUS_POWER_OFF_NO_CARD: u8 = 0x02;

/// Sequence number stamped on each request
///
/// Advances after every exchange that returned data and wraps modulo 255.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SequenceCounter(u8);

impl SequenceCounter {
    /// Current value
    pub const fn get(self) -> u8 {
        self.0
    }

    /// Move to the next value
    pub const fn advance(&mut self) {
        self.0 = if self.0 >= 0xFE { 0 } else { self.0 + 1 };
    }

    /// Back to zero
    pub const fn reset(&mut self) {
        self.0 = 0;
    }
}

/// Transport over a Castles EZUSB reader
///
/// The reader has a single contact slot, addressed as reader slot 0.
#[derive(Debug)]
pub struct CastlesReader<E> {
    endpoint: E,
    sequence: SequenceCounter,
    presence: PresenceTracker,
    buffer_size: usize,
}

impl<E: BulkEndpoint> CastlesReader<E> {
    /// Wrap a claimed bulk endpoint pair
    pub fn new(endpoint: E) -> Self {
        Self {
            endpoint,
            sequence: SequenceCounter::default(),
            presence: PresenceTracker::default(),
            buffer_size: cardreader_apdu_core::DEFAULT_BUFFER_SIZE,
        }
    }

    /// Set the read buffer size used for control frames
    pub const fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    /// Current sequence number
    pub const fn sequence(&self) -> u8 {
        self.sequence.get()
    }

    /// Release the endpoint
    pub fn into_inner(self) -> E {
        self.endpoint
    }

    /// Ask the reader whether a card is in the slot
    pub fn is_card_present(&mut self) -> Result<bool, CastlesError> {
        let answer = self.send(FrameKind::SlotStatus, &[], self.buffer_size)?;
        Ok(frame::status(&answer)? != STATUS_NO_CARD)
    }

    /// Poll the slot and report a change since the previous poll
    ///
    /// A failed poll counts as no card.
    pub fn poll(&mut self) -> Option<CardChange> {
        let present = self.is_card_present().unwrap_or_else(|e| {
            debug!(error = %e, "Slot status poll failed");
            false
        });
        self.presence.update(present)
    }

    /// Forget the tracked card state and restart the sequence
    pub fn reset(&mut self) {
        self.sequence.reset();
        self.presence = PresenceTracker::default();
    }

    fn send(&mut self, kind: FrameKind, data: &[u8], capacity: usize) -> Result<Vec<u8>, CastlesError> {
        let request = frame::encode(kind, 0, self.sequence.get(), data)?;
        trace!(?kind, sequence = self.sequence.get(), len = request.len(), "Writing frame");
        self.endpoint.write(&request, WRITE_TIMEOUT)?;

        let mut buf = vec![0u8; capacity.max(frame::HEADER_LEN)];
        let len = self.endpoint.read(&mut buf, READ_TIMEOUT)?;
        if len == 0 {
            return Err(CastlesError::EmptyResponse);
        }

        self.sequence.advance();
        buf.truncate(len);
        Ok(buf)
    }

    fn check_slot(slot: Slot) -> Result<(), CastlesError> {
        match slot {
            Slot::Contact => Ok(()),
            Slot::Contactless => Err(CastlesError::UnsupportedSlot(slot)),
        }
    }

    fn do_power_on(&mut self) -> Result<Bytes, CastlesError> {
        let answer = self.send(FrameKind::PowerOn, &[], self.buffer_size)?;
        let status = frame::status(&answer)?;

        if answer[0] != FrameKind::PowerOn.answer() {
            return Err(CastlesError::PowerOnRejected { status });
        }
        match status {
            0 => {}
            STATUS_NO_CARD => return Err(CastlesError::NoCard),
            _ => return Err(CastlesError::PowerOnRejected { status }),
        }

        let atr = frame::atr(&answer)?;
        match atr.first() {
            Some(0x3B | 0x3F) => Ok(Bytes::copy_from_slice(atr)),
            Some(&first) => Err(CastlesError::MemoryCard { first }),
            None => Err(CastlesError::ShortResponse { len: answer.len() }),
        }
    }

    fn do_power_off(&mut self) -> Result<(), CastlesError> {
        let answer = self.send(FrameKind::PowerOff, &[], self.buffer_size)?;
        let status = frame::status(&answer)?;

        if answer[0] == FrameKind::PowerOff.answer() && status == STATUS_POWERED_OFF {
            Ok(())
        } else if status == STATUS_POWER_OFF_NO_CARD {
            Err(CastlesError::NoCard)
        } else {
            Err(CastlesError::PowerOffRejected { status })
        }
    }
}

impl<E: BulkEndpoint> CardTransport for CastlesReader<E> {
    fn do_transmit(
        &mut self,
        slot: Slot,
        command: &[u8],
        capacity: usize,
    ) -> Result<Bytes, TransportError> {
        Self::check_slot(slot)?;
        let answer = self.send(FrameKind::Apdu, command, capacity + frame::HEADER_LEN)?;
        Ok(Bytes::copy_from_slice(frame::payload(&answer)?))
    }

    fn do_control(&mut self, _slot: Slot, code: u32, _command: &[u8]) -> Result<Bytes, TransportError> {
        warn!(code, "Castles reader has no escape channel");
        Err(CastlesError::ControlUnsupported.into())
    }

    fn power_on(&mut self, slot: Slot) -> Result<Bytes, TransportError> {
        Self::check_slot(slot)?;
        let atr = self.do_power_on()?;
        debug!(atr = %cardreader_apdu_core::hex::encode(&atr), "Card powered on");
        Ok(atr)
    }

    fn power_off(&mut self, slot: Slot) -> Result<(), TransportError> {
        Self::check_slot(slot)?;
        Ok(self.do_power_off()?)
    }

    fn is_connected(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::HEADER_LEN;
    use hex_literal::hex;
    use std::{collections::VecDeque, io};

    /// Endpoint answering from a script and recording writes
    #[derive(Debug, Default)]
    struct ScriptedEndpoint {
        answers: VecDeque<Vec<u8>>,
        written: Vec<Vec<u8>>,
    }

    impl ScriptedEndpoint {
        fn new(answers: impl IntoIterator<Item = Vec<u8>>) -> Self {
            Self {
                answers: answers.into_iter().collect(),
                written: Vec::new(),
            }
        }
    }

    impl BulkEndpoint for ScriptedEndpoint {
        fn write(&mut self, data: &[u8], _timeout: Duration) -> io::Result<usize> {
            self.written.push(data.to_vec());
            Ok(data.len())
        }

        fn read(&mut self, buf: &mut [u8], _timeout: Duration) -> io::Result<usize> {
            let answer = self
                .answers
                .pop_front()
                .ok_or_else(|| io::Error::from(io::ErrorKind::TimedOut))?;
            buf[..answer.len()].copy_from_slice(&answer);
            Ok(answer.len())
        }
    }

    #[test]
    fn test_power_on_returns_atr() {
        let mut reader = CastlesReader::new(ScriptedEndpoint::new([
            hex!("80000000050000000000 00 3B951381").to_vec(),
        ]));
        let atr = reader.power_on(Slot::Contact).unwrap();
        assert_eq!(&atr[..], &hex!("3B951381"));
        assert_eq!(reader.sequence(), 1);
        assert_eq!(
            reader.into_inner().written,
            vec![hex!("62000000000000000000").to_vec()]
        );
    }

    #[test]
    fn test_power_on_rejections() {
        let mut reader = CastlesReader::new(ScriptedEndpoint::new([
            hex!("80000000030000000000 00 A2 13").to_vec(),
            hex!("80000000000000420000").to_vec(),
            hex!("80000000000000410000").to_vec(),
        ]));
        assert!(matches!(
            reader.do_power_on(),
            Err(CastlesError::MemoryCard { first: 0xA2 })
        ));
        assert!(matches!(reader.do_power_on(), Err(CastlesError::NoCard)));
        assert!(matches!(
            reader.do_power_on(),
            Err(CastlesError::PowerOnRejected { status: 0x41 })
        ));
        assert!(reader.power_on(Slot::Contactless).is_err());
    }

    #[test]
    fn test_transmit_strips_header() {
        let mut reader = CastlesReader::new(ScriptedEndpoint::new([
            hex!("80000000020000000000 9000").to_vec(),
        ]));
        let response = reader
            .transmit(Slot::Contact, &hex!("00A4040000"), 64)
            .unwrap();
        assert_eq!(&response[..], &hex!("9000"));

        let written = reader.into_inner().written;
        assert_eq!(written[0][..HEADER_LEN], hex!("57000000050000000000"));
        assert_eq!(written[0][HEADER_LEN..], hex!("00A4040000"));
    }

    #[test]
    fn test_sequence_wraps_at_255() {
        let mut counter = SequenceCounter::default();
        for _ in 0..254 {
            counter.advance();
        }
        assert_eq!(counter.get(), 254);
        counter.advance();
        assert_eq!(counter.get(), 0);
    }

    #[test]
    fn test_sequence_only_advances_on_data() {
        let mut reader = CastlesReader::new(ScriptedEndpoint::default());
        assert!(reader.transmit(Slot::Contact, &hex!("00"), 16).is_err());
        assert_eq!(reader.sequence(), 0);
    }

    #[test]
    fn test_power_off() {
        let mut reader = CastlesReader::new(ScriptedEndpoint::new([
            hex!("81000000000000010000").to_vec(),
            hex!("81000000000000020000").to_vec(),
        ]));
        assert!(reader.power_off(Slot::Contact).is_ok());
        assert!(matches!(reader.do_power_off(), Err(CastlesError::NoCard)));
    }

    #[test]
    fn test_poll_reports_transitions() {
        let mut reader = CastlesReader::new(ScriptedEndpoint::new([
            hex!("81000000000000420000").to_vec(),
            hex!("81000000000000000000").to_vec(),
            hex!("81000000000000000000").to_vec(),
            hex!("81000000000000420000").to_vec(),
        ]));
        assert_eq!(reader.poll(), None);
        assert_eq!(reader.poll(), Some(CardChange::Inserted));
        assert_eq!(reader.poll(), None);
        assert_eq!(reader.poll(), Some(CardChange::Removed));

        // Script exhausted: a failed poll reads as no card
        assert_eq!(reader.poll(), None);
        let written = reader.into_inner().written;
        assert_eq!(written[0], hex!("65000000000000000000"));
        assert_eq!(written[3][6], 3);
    }
}
