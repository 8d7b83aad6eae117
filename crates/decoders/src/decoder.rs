//! Decoder contracts
//!
//! Blocking readers answer each command before the next one is sent, so a
//! [`CardDecoder`] runs its whole exchange in one call. Readers that deliver
//! responses as events drive a [`StepDecoder`] instead: the decoder sends one
//! command, then waits for [`StepDecoder::advance`] to hand it the response.
//! [`StepDriver`] runs any stepwise decoder to completion over a blocking
//! transport.

use std::fmt;

use cardreader_apdu_core::{
    ApduSink, Bytes, CardTransport, DEFAULT_BUFFER_SIZE, Slot, TransportError,
};
use tracing::debug;

use crate::{error::DecodeError, record::CardRecord};

/// Decoder for readers with a blocking command channel
pub trait CardDecoder: fmt::Debug + Send {
    /// Short name used in logs and failure reports
    fn name(&self) -> &'static str;

    /// Read the card in `slot`
    ///
    /// The card must already be powered on. An empty record means the card
    /// is not one this decoder understands.
    fn decode(
        &mut self,
        transport: &mut dyn CardTransport,
        slot: Slot,
    ) -> Result<CardRecord, DecodeError>;
}

/// Outcome of feeding a response to a [`StepDecoder`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// The next command has been sent
    NeedMoreData,
    /// The exchange finished with this record
    Complete(CardRecord),
}

/// Decoder for readers that deliver responses asynchronously
pub trait StepDecoder: fmt::Debug + Send {
    /// Short name used in logs and failure reports
    fn name(&self) -> &'static str;

    /// Discard any exchange in flight and send the first command
    fn start(&mut self, sink: &mut dyn ApduSink, slot: Slot) -> Result<(), DecodeError>;

    /// Consume the response to the last command sent
    ///
    /// On error the decoder resets itself; it must be started again.
    fn advance(
        &mut self,
        sink: &mut dyn ApduSink,
        slot: Slot,
        response: &[u8],
    ) -> Result<Step, DecodeError>;

    /// Discard any exchange in flight
    fn reset(&mut self);
}

/// Runs a [`StepDecoder`] over a blocking transport
#[derive(Debug)]
pub struct StepDriver<D> {
    decoder: D,
}

impl<D: StepDecoder> StepDriver<D> {
    /// Wrap a stepwise decoder
    pub const fn new(decoder: D) -> Self {
        Self { decoder }
    }

    /// Inner decoder
    pub const fn inner(&self) -> &D {
        &self.decoder
    }
}

/// Holds the single command a stepwise decoder queued
#[derive(Debug, Default)]
struct PendingCommand {
    apdu: Option<Bytes>,
}

impl ApduSink for PendingCommand {
    fn send_apdu(&mut self, _slot: Slot, command: &[u8]) -> Result<(), TransportError> {
        if self.apdu.is_some() {
            return Err(TransportError::other("a command is already pending"));
        }
        self.apdu = Some(Bytes::copy_from_slice(command));
        Ok(())
    }

    fn request_power_on(&mut self, _slot: Slot) -> Result<(), TransportError> {
        // A blocking transport is powered by the caller
        Ok(())
    }
}

impl<D: StepDecoder> CardDecoder for StepDriver<D> {
    fn name(&self) -> &'static str {
        self.decoder.name()
    }

    fn decode(
        &mut self,
        transport: &mut dyn CardTransport,
        slot: Slot,
    ) -> Result<CardRecord, DecodeError> {
        let mut pending = PendingCommand::default();
        self.decoder.start(&mut pending, slot)?;

        loop {
            let Some(apdu) = pending.apdu.take() else {
                self.decoder.reset();
                return Err(DecodeError::Stalled);
            };

            let response = match transport.transmit(slot, &apdu, DEFAULT_BUFFER_SIZE) {
                Ok(response) => response,
                Err(e) => {
                    self.decoder.reset();
                    return Err(e.into());
                }
            };

            match self.decoder.advance(&mut pending, slot, &response)? {
                Step::NeedMoreData => {}
                Step::Complete(record) => {
                    debug!(decoder = self.decoder.name(), "Stepwise decode complete");
                    return Ok(record);
                }
            }
        }
    }
}

/// Boxed blocking decoder
pub type BoxedCardDecoder = Box<dyn CardDecoder>;

/// Boxed stepwise decoder
pub type BoxedStepDecoder = Box<dyn StepDecoder>;
