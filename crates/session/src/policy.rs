//! Decoder selection
//!
//! Decoders for a slot are tried strictly in order and the first one that
//! returns a non-empty record wins. Every attempt runs on a freshly powered
//! card: power on, decode, power off. A card that cannot be powered on is
//! invalid and no further decoder is tried. Losing the link to the reader
//! ends the run with [`SessionError::Transport`]. Power-off failures are
//! logged and otherwise ignored.

use cardreader_apdu_core::{ApduSink, CardTransport, Slot, TransportError};
use cardreader_decoders::{BoxedCardDecoder, BoxedStepDecoder, CardRecord, DecodeError, Step};
use tracing::{debug, info, warn};

use crate::error::{AttemptError, FailedAttempts, SessionError};

/// Transport error that ends a selection run instead of failing one attempt
fn link_failure(error: &DecodeError) -> Option<&TransportError> {
    match error {
        DecodeError::Transport(e) if e.is_link_failure() => Some(e),
        _ => None,
    }
}

/// Run `decoders` in order against the card in `slot`
pub fn select_and_decode(
    decoders: &mut [BoxedCardDecoder],
    transport: &mut dyn CardTransport,
    slot: Slot,
) -> Result<CardRecord, SessionError> {
    if decoders.is_empty() {
        return Err(SessionError::NoDecoders { slot });
    }

    let mut attempts = FailedAttempts::default();

    for decoder in decoders.iter_mut() {
        debug!(decoder = decoder.name(), %slot, "Trying decoder");

        let result = match transport.power_on(slot) {
            Ok(atr) => {
                debug!(atr = %cardreader_apdu_core::hex::encode(&atr), "Card powered on");
                Ok(decoder.decode(transport, slot))
            }
            Err(e) => Err(e),
        };

        if let Err(e) = transport.power_off(slot) {
            warn!(%slot, error = %e, "Failed to power off card");
        }

        match result {
            Err(e) => {
                warn!(%slot, error = %e, "Card could not be powered on");
                return Err(SessionError::InvalidCard(e));
            }
            Ok(Ok(record)) if !record.is_empty() => {
                info!(decoder = decoder.name(), card_type = %record.card_type, "Card decoded");
                return Ok(record);
            }
            Ok(Ok(_)) => {
                debug!(decoder = decoder.name(), "Decoder returned an empty record");
                attempts.push(decoder.name(), AttemptError::EmptyRecord);
            }
            Ok(Err(e)) => {
                if let Some(lost) = link_failure(&e) {
                    warn!(decoder = decoder.name(), %slot, error = %lost, "Link lost while decoding");
                    return Err(SessionError::Transport(lost.clone()));
                }
                debug!(decoder = decoder.name(), error = %e, "Decoder failed");
                attempts.push(decoder.name(), e.into());
            }
        }
    }

    warn!(%slot, %attempts, "No decoder recognised the card");
    Err(SessionError::AllDecodersFailed(attempts))
}

/// State of a [`StepwiseSelection`] after an event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Progress {
    /// Waiting for the reader
    Pending,
    /// Selection finished
    Done(Result<CardRecord, SessionError>),
}

/// Decoder selection for readers that deliver responses asynchronously
///
/// Same ordering and failure accounting as [`select_and_decode`]: the reader
/// is asked to power the card on, its ATR starts the current decoder, and
/// each response advances it. A failed or empty attempt powers the card on
/// again for the next decoder.
#[derive(Debug)]
pub struct StepwiseSelection {
    decoders: Vec<BoxedStepDecoder>,
    current: usize,
    attempts: FailedAttempts,
    running: bool,
}

impl StepwiseSelection {
    /// Create a selection over `decoders`
    pub fn new(decoders: Vec<BoxedStepDecoder>) -> Self {
        Self {
            decoders,
            current: 0,
            attempts: FailedAttempts::default(),
            running: false,
        }
    }

    /// Whether a selection run is in progress
    pub const fn is_running(&self) -> bool {
        self.running
    }

    /// Start a run from the first decoder
    pub fn begin(&mut self, sink: &mut dyn ApduSink, slot: Slot) -> Progress {
        self.cancel();
        if self.decoders.is_empty() {
            return Progress::Done(Err(SessionError::NoDecoders { slot }));
        }
        self.running = true;
        self.power_on(sink, slot)
    }

    /// The card in `slot` was powered on
    pub fn on_atr(&mut self, sink: &mut dyn ApduSink, slot: Slot, atr: &[u8]) -> Progress {
        if !self.running {
            debug!(%slot, "ATR with no selection running");
            return Progress::Pending;
        }
        debug!(atr = %cardreader_apdu_core::hex::encode(atr), "Card powered on");

        let decoder = &mut self.decoders[self.current];
        match decoder.start(sink, slot) {
            Ok(()) => Progress::Pending,
            Err(e) => self.on_decoder_error(sink, slot, e),
        }
    }

    /// A response APDU arrived from the card in `slot`
    pub fn on_response(&mut self, sink: &mut dyn ApduSink, slot: Slot, response: &[u8]) -> Progress {
        if !self.running {
            debug!(%slot, "Response with no selection running");
            return Progress::Pending;
        }

        let decoder = &mut self.decoders[self.current];
        match decoder.advance(sink, slot, response) {
            Ok(Step::NeedMoreData) => Progress::Pending,
            Ok(Step::Complete(record)) if !record.is_empty() => {
                info!(decoder = decoder.name(), card_type = %record.card_type, "Card decoded");
                self.running = false;
                Progress::Done(Ok(record))
            }
            Ok(Step::Complete(_)) => self.next_decoder(sink, slot, AttemptError::EmptyRecord),
            Err(e) => self.on_decoder_error(sink, slot, e),
        }
    }

    /// Abandon the run, discarding any exchange in flight
    pub fn cancel(&mut self) {
        for decoder in &mut self.decoders {
            decoder.reset();
        }
        self.current = 0;
        self.attempts = FailedAttempts::default();
        self.running = false;
    }

    fn on_decoder_error(&mut self, sink: &mut dyn ApduSink, slot: Slot, error: DecodeError) -> Progress {
        if let Some(lost) = link_failure(&error) {
            warn!(%slot, error = %lost, "Link lost while decoding");
            let lost = lost.clone();
            self.cancel();
            return Progress::Done(Err(SessionError::Transport(lost)));
        }
        self.next_decoder(sink, slot, error.into())
    }

    fn next_decoder(&mut self, sink: &mut dyn ApduSink, slot: Slot, error: AttemptError) -> Progress {
        let decoder = &mut self.decoders[self.current];
        debug!(decoder = decoder.name(), %error, "Decoder failed");
        decoder.reset();
        self.attempts.push(decoder.name(), error);

        self.current += 1;
        if self.current < self.decoders.len() {
            return self.power_on(sink, slot);
        }

        self.running = false;
        let attempts = std::mem::take(&mut self.attempts);
        warn!(%slot, %attempts, "No decoder recognised the card");
        Progress::Done(Err(SessionError::AllDecodersFailed(attempts)))
    }

    fn power_on(&mut self, sink: &mut dyn ApduSink, slot: Slot) -> Progress {
        match sink.request_power_on(slot) {
            Ok(()) => Progress::Pending,
            Err(e) => {
                self.cancel();
                Progress::Done(Err(SessionError::InvalidCard(e)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cardreader_apdu_core::{Bytes, MockEvent, MockSink, MockTransport, TransportError};
    use cardreader_decoders::{CardDecoder, CardType, DecodeError, taiwan};
    use hex_literal::hex;

    /// Decoder returning a fixed outcome without touching the card
    #[derive(Debug)]
    struct Scripted {
        name: &'static str,
        outcome: Result<CardRecord, DecodeError>,
    }

    impl CardDecoder for Scripted {
        fn name(&self) -> &'static str {
            self.name
        }

        fn decode(
            &mut self,
            transport: &mut dyn CardTransport,
            slot: Slot,
        ) -> Result<CardRecord, DecodeError> {
            transport.transmit(slot, self.name.as_bytes(), 2)?;
            self.outcome.clone()
        }
    }

    fn record(number: &str) -> CardRecord {
        CardRecord {
            card_number: number.to_string(),
            ..CardRecord::new(CardType::HealthCard)
        }
    }

    fn scripted(name: &'static str, outcome: Result<CardRecord, DecodeError>) -> BoxedCardDecoder {
        Box::new(Scripted { name, outcome })
    }

    fn transport() -> MockTransport {
        MockTransport::with_responses(vec![hex!("9000").to_vec(); 3])
    }

    #[test]
    fn test_third_decoder_wins() {
        let mut decoders = vec![
            scripted("first", Err(DecodeError::NotStarted)),
            scripted("second", Ok(CardRecord::default())),
            scripted("third", Ok(record("123"))),
        ];
        let mut transport = transport();

        let result = select_and_decode(&mut decoders, &mut transport, Slot::Contact).unwrap();
        assert_eq!(result.card_number, "123");

        // Each attempt is bracketed by power on and power off
        let expected: Vec<MockEvent> = ["first", "second", "third"]
            .into_iter()
            .flat_map(|name| {
                [
                    MockEvent::PowerOn(Slot::Contact),
                    MockEvent::Transmit(Slot::Contact, name.as_bytes().to_vec().into()),
                    MockEvent::PowerOff(Slot::Contact),
                ]
            })
            .collect();
        assert_eq!(transport.events, expected);
    }

    #[test]
    fn test_all_decoders_fail() {
        let mut decoders = vec![
            scripted("first", Err(DecodeError::Stalled)),
            scripted("second", Ok(CardRecord::default())),
        ];
        let mut transport = transport();

        let err = select_and_decode(&mut decoders, &mut transport, Slot::Contact).unwrap_err();
        let SessionError::AllDecodersFailed(attempts) = err else {
            panic!("expected AllDecodersFailed, got {err:?}");
        };
        assert_eq!(attempts.len(), 2);
        let first = attempts.first().unwrap();
        assert_eq!(first.decoder, "first");
        assert_eq!(first.error, AttemptError::Decode(DecodeError::Stalled));
        assert_eq!(attempts.as_slice()[1].error, AttemptError::EmptyRecord);
        assert_eq!(transport.power_on_count(), 2);
        assert_eq!(transport.power_off_count(), 2);
    }

    #[test]
    fn test_power_on_failure_is_invalid_card() {
        let mut decoders = vec![
            scripted("first", Ok(record("1"))),
            scripted("second", Ok(record("2"))),
        ];
        let mut transport = transport().failing_power_on();

        let err = select_and_decode(&mut decoders, &mut transport, Slot::Contact).unwrap_err();
        assert_eq!(
            err,
            SessionError::InvalidCard(TransportError::NoCard(Slot::Contact))
        );
        assert_eq!(transport.power_on_count(), 1);
        assert_eq!(transport.power_off_count(), 1);
        assert!(transport.transmitted().is_empty());
    }

    #[test]
    fn test_power_off_failure_is_swallowed() {
        let mut decoders = vec![scripted("only", Ok(record("42")))];
        let mut transport = transport().failing_power_off();

        let result = select_and_decode(&mut decoders, &mut transport, Slot::Contact).unwrap();
        assert_eq!(result.card_number, "42");
    }

    #[test]
    fn test_link_loss_stops_selection() {
        let mut decoders = vec![
            scripted("first", Ok(record("1"))),
            scripted("second", Ok(record("2"))),
            scripted("third", Ok(record("3"))),
        ];
        let mut transport = MockTransport::new();
        transport.push_error(TransportError::Connection);

        let err = select_and_decode(&mut decoders, &mut transport, Slot::Contact).unwrap_err();
        assert_eq!(err, SessionError::Transport(TransportError::Connection));
        assert_eq!(transport.power_on_count(), 1);
        assert_eq!(transport.power_off_count(), 1);
        assert_eq!(transport.transmitted(), vec![Bytes::from_static(b"first")]);
    }

    #[test]
    fn test_card_level_transport_error_tries_next_decoder() {
        let mut decoders = vec![
            scripted("first", Ok(record("1"))),
            scripted("second", Ok(record("2"))),
        ];
        let mut transport = MockTransport::new();
        transport
            .push_error(TransportError::other("escape refused"))
            .push_response(hex!("9000").to_vec());

        let result = select_and_decode(&mut decoders, &mut transport, Slot::Contact).unwrap();
        assert_eq!(result.card_number, "2");
    }

    #[test]
    fn test_stepwise_link_loss_stops_selection() {
        let decoders: Vec<BoxedStepDecoder> = vec![
            Box::new(taiwan::TaiwanHealthDecoder::new()),
            Box::new(cardreader_decoders::thai::ThaiIdDecoder::new()),
        ];
        let mut selection = StepwiseSelection::new(decoders);
        let mut sink = MockSink::new().failing_send(TransportError::Timeout);
        let slot = Slot::Contactless;

        assert_eq!(selection.begin(&mut sink, slot), Progress::Pending);
        assert_eq!(
            selection.on_atr(&mut sink, slot, &hex!("3B00")),
            Progress::Done(Err(SessionError::Transport(TransportError::Timeout)))
        );
        assert!(!selection.is_running());

        // No power-on requested for the second decoder
        let power_ons = sink
            .events
            .iter()
            .filter(|event| matches!(event, MockEvent::PowerOn(_)))
            .count();
        assert_eq!(power_ons, 1);
    }

    #[test]
    fn test_no_decoders() {
        let mut transport = transport();
        assert_eq!(
            select_and_decode(&mut [], &mut transport, Slot::Contactless),
            Err(SessionError::NoDecoders {
                slot: Slot::Contactless
            })
        );
        assert!(transport.events.is_empty());
    }

    #[test]
    fn test_stepwise_falls_through_to_next_decoder() {
        let decoders: Vec<BoxedStepDecoder> = vec![
            Box::new(cardreader_decoders::thai::ThaiIdDecoder::new()),
            Box::new(taiwan::TaiwanHealthDecoder::new()),
        ];
        let mut selection = StepwiseSelection::new(decoders);
        let mut sink = MockSink::new();
        let slot = Slot::Contact;

        assert_eq!(selection.begin(&mut sink, slot), Progress::Pending);
        assert_eq!(sink.events, vec![MockEvent::PowerOn(slot)]);

        // Thai SELECT refused, so the card is powered on again for the next decoder
        assert_eq!(selection.on_atr(&mut sink, slot, &hex!("3B00")), Progress::Pending);
        assert_eq!(selection.on_response(&mut sink, slot, &hex!("6A82")), Progress::Pending);
        assert_eq!(sink.events.last(), Some(&MockEvent::PowerOn(slot)));

        assert_eq!(selection.on_atr(&mut sink, slot, &hex!("3B00")), Progress::Pending);
        assert_eq!(
            sink.last_apdu().map(|apdu| apdu.to_vec()),
            Some(taiwan::SELECT.apdu().to_vec())
        );
        assert_eq!(selection.on_response(&mut sink, slot, &hex!("9000")), Progress::Pending);

        let Progress::Done(Err(SessionError::AllDecodersFailed(attempts))) =
            selection.on_response(&mut sink, slot, &hex!("6982"))
        else {
            panic!("expected every decoder to fail");
        };
        assert_eq!(attempts.len(), 2);
        assert_eq!(attempts.first().unwrap().decoder, "thai-id");
        assert!(!selection.is_running());
    }

    #[test]
    fn test_stepwise_cancel() {
        let decoders: Vec<BoxedStepDecoder> = vec![Box::new(taiwan::TaiwanHealthDecoder::new())];
        let mut selection = StepwiseSelection::new(decoders);
        let mut sink = MockSink::new();

        selection.begin(&mut sink, Slot::Contactless);
        selection.on_atr(&mut sink, Slot::Contactless, &hex!("3B00"));
        selection.cancel();

        assert!(!selection.is_running());
        assert_eq!(
            selection.on_response(&mut sink, Slot::Contactless, &hex!("9000")),
            Progress::Pending
        );
    }
}
