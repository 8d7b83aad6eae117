//! Scripted transports for tests

use std::collections::VecDeque;

use bytes::Bytes;

use super::{ApduSink, CardTransport, Slot, TransportError};

/// Something that happened on a mock transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockEvent {
    /// Card powered on
    PowerOn(Slot),
    /// Card powered off
    PowerOff(Slot),
    /// APDU transmitted
    Transmit(Slot, Bytes),
    /// Control command sent
    Control(Slot, u32, Bytes),
}

/// Mock transport answering from a script of responses
///
/// Transmit and control commands consume the script in order. An exhausted
/// script fails with [`TransportError::Transmission`].
#[derive(Debug, Clone)]
pub struct MockTransport {
    responses: VecDeque<Result<Bytes, TransportError>>,
    atr: Bytes,
    fail_power_on: bool,
    fail_power_off: bool,
    /// Whether the transport is connected
    pub connected: bool,
    /// Everything the transport was asked to do, in order
    pub events: Vec<MockEvent>,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    /// Create a connected mock with an empty script
    pub fn new() -> Self {
        Self {
            responses: VecDeque::new(),
            atr: Bytes::from_static(&[0x3B, 0x00]),
            fail_power_on: false,
            fail_power_off: false,
            connected: true,
            events: Vec::new(),
        }
    }

    /// Create a mock with the given responses
    pub fn with_responses<I, B>(responses: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        let mut mock = Self::new();
        for response in responses {
            mock.push_response(response);
        }
        mock
    }

    /// Append a response to the script
    pub fn push_response(&mut self, response: impl Into<Bytes>) -> &mut Self {
        self.responses.push_back(Ok(response.into()));
        self
    }

    /// Append an error to the script
    pub fn push_error(&mut self, error: TransportError) -> &mut Self {
        self.responses.push_back(Err(error));
        self
    }

    /// Set the ATR returned by power-on
    #[must_use]
    pub fn with_atr(mut self, atr: impl Into<Bytes>) -> Self {
        self.atr = atr.into();
        self
    }

    /// Make every power-on fail
    #[must_use]
    pub const fn failing_power_on(mut self) -> Self {
        self.fail_power_on = true;
        self
    }

    /// Make every power-off fail
    #[must_use]
    pub const fn failing_power_off(mut self) -> Self {
        self.fail_power_off = true;
        self
    }

    /// Number of scripted responses not consumed yet
    pub fn remaining(&self) -> usize {
        self.responses.len()
    }

    /// Raw APDUs transmitted so far
    pub fn transmitted(&self) -> Vec<Bytes> {
        self.events
            .iter()
            .filter_map(|event| match event {
                MockEvent::Transmit(_, apdu) => Some(apdu.clone()),
                _ => None,
            })
            .collect()
    }

    /// Number of power-on requests seen
    pub fn power_on_count(&self) -> usize {
        self.events
            .iter()
            .filter(|event| matches!(event, MockEvent::PowerOn(_)))
            .count()
    }

    /// Number of power-off requests seen
    pub fn power_off_count(&self) -> usize {
        self.events
            .iter()
            .filter(|event| matches!(event, MockEvent::PowerOff(_)))
            .count()
    }

    fn next_response(&mut self) -> Result<Bytes, TransportError> {
        if !self.connected {
            return Err(TransportError::Connection);
        }
        self.responses
            .pop_front()
            .unwrap_or(Err(TransportError::Transmission))
    }
}

impl CardTransport for MockTransport {
    fn do_transmit(
        &mut self,
        slot: Slot,
        command: &[u8],
        _capacity: usize,
    ) -> Result<Bytes, TransportError> {
        self.events
            .push(MockEvent::Transmit(slot, Bytes::copy_from_slice(command)));
        self.next_response()
    }

    fn do_control(
        &mut self,
        slot: Slot,
        code: u32,
        command: &[u8],
    ) -> Result<Bytes, TransportError> {
        self.events
            .push(MockEvent::Control(slot, code, Bytes::copy_from_slice(command)));
        self.next_response()
    }

    fn power_on(&mut self, slot: Slot) -> Result<Bytes, TransportError> {
        self.events.push(MockEvent::PowerOn(slot));
        if self.fail_power_on {
            return Err(TransportError::NoCard(slot));
        }
        Ok(self.atr.clone())
    }

    fn power_off(&mut self, slot: Slot) -> Result<(), TransportError> {
        self.events.push(MockEvent::PowerOff(slot));
        if self.fail_power_off {
            return Err(TransportError::Device);
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

/// Mock asynchronous reader recording what it was asked to send
#[derive(Debug, Clone, Default)]
pub struct MockSink {
    /// Everything the sink was asked to do, in order
    pub events: Vec<MockEvent>,
    send_error: Option<TransportError>,
}

impl MockSink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every `send_apdu` with `error`
    #[must_use]
    pub fn failing_send(mut self, error: TransportError) -> Self {
        self.send_error = Some(error);
        self
    }

    /// Last APDU sent, if any
    pub fn last_apdu(&self) -> Option<&Bytes> {
        self.events.iter().rev().find_map(|event| match event {
            MockEvent::Transmit(_, apdu) => Some(apdu),
            _ => None,
        })
    }
}

impl ApduSink for MockSink {
    fn send_apdu(&mut self, slot: Slot, command: &[u8]) -> Result<(), TransportError> {
        self.events
            .push(MockEvent::Transmit(slot, Bytes::copy_from_slice(command)));
        self.send_error.clone().map_or(Ok(()), Err)
    }

    fn request_power_on(&mut self, slot: Slot) -> Result<(), TransportError> {
        self.events.push(MockEvent::PowerOn(slot));
        Ok(())
    }
}
