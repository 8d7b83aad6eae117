//! Device session state machine
//!
//! ```text
//! Disconnected -> Connecting -> Connected -> Disconnecting -> Disconnected
//! ```
//!
//! Each slot is tracked separately as card absent or present. The session
//! is driven from a single thread: the owner calls [`DeviceSession::connect`]
//! and [`DeviceSession::disconnect`], and feeds the reader's [`LinkEvent`]s
//! through [`DeviceSession::handle_event`] (or [`DeviceSession::run`]).
//! Decoding runs synchronously on that thread; results go out as
//! [`Notification`]s.

use std::fmt;

use cardreader_apdu_core::{ApduSink, Bytes, CardTransport, Slot, TransportError};
use cardreader_decoders::DecoderKind;
use crossbeam_channel::{Receiver, Sender, unbounded};
use derive_more::Display;
use tracing::{debug, info, warn};

use crate::{
    callback::{Notification, NotificationSender},
    config::SessionConfig,
    error::SessionError,
    model::ReaderModel,
    policy::{Progress, StepwiseSelection, select_and_decode},
};

/// Connection state of a reader
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum DeviceStatus {
    /// Not known yet
    #[display("unknown")]
    Unknown,
    /// Link being opened
    #[display("connecting")]
    Connecting,
    /// Link open and ready for cards
    #[display("connected")]
    Connected,
    /// Link being closed
    #[display("disconnecting")]
    Disconnecting,
    /// No link
    #[display("disconnected")]
    Disconnected,
}

/// Command channel of a connected reader
#[derive(Debug)]
pub enum ReaderChannel {
    /// Reader answering each command synchronously
    Blocking(Box<dyn CardTransport>),
    /// Reader delivering responses as [`LinkEvent`]s
    Stepwise(Box<dyn ApduSink>),
}

/// Result of opening a link
#[derive(Debug)]
pub enum LinkOpen {
    /// The link is up
    Ready {
        /// Command channel
        channel: ReaderChannel,
        /// Name the reader reports
        reader_name: String,
    },
    /// The link will report [`LinkEvent::Established`] or [`LinkEvent::Failed`]
    Pending,
}

/// Result of closing a link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkClose {
    /// The link is down
    Closed,
    /// The link will report [`LinkEvent::Closed`]
    Pending,
}

/// Connection to a reader
///
/// Discovery and pairing happen before a link is opened; the link only
/// connects to an address it is given.
pub trait Link: fmt::Debug + Send {
    /// Start connecting to the reader at `address`
    fn open(&mut self, address: &str) -> Result<LinkOpen, TransportError>;

    /// Close the connection
    ///
    /// Once this returns, the link must not report events for the closed
    /// connection other than a final [`LinkEvent::Closed`].
    fn close(&mut self) -> Result<LinkClose, TransportError>;

    /// Whether the link is only usable after [`LinkEvent::NotificationsEnabled`]
    fn requires_notifications(&self) -> bool {
        false
    }
}

/// Events a link reports to its session
#[derive(Debug)]
pub enum LinkEvent {
    /// A pending open completed
    Established {
        /// Command channel
        channel: ReaderChannel,
        /// Name the reader reports
        reader_name: String,
    },
    /// The reader enabled its notifications
    NotificationsEnabled,
    /// The link closed
    Closed,
    /// The link failed
    Failed(TransportError),
    /// A card was presented
    CardPresent(Slot),
    /// The card was removed
    CardAbsent(Slot),
    /// A card was powered on, with its ATR
    AtrAvailable(Slot, Bytes),
    /// A response APDU arrived
    ResponseApdu(Slot, Bytes),
}

/// Sender for link events
pub type LinkEventSender = Sender<LinkEvent>;
/// Receiver for link events
pub type LinkEventReceiver = Receiver<LinkEvent>;

/// Create an unbounded link event channel
pub fn link_event_channel() -> (LinkEventSender, LinkEventReceiver) {
    unbounded()
}

/// Session with one reader
#[derive(Debug)]
pub struct DeviceSession<L> {
    link: L,
    config: SessionConfig,
    notifier: NotificationSender,
    status: DeviceStatus,
    address: Option<String>,
    pending_address: Option<String>,
    model: Option<ReaderModel>,
    channel: Option<ReaderChannel>,
    notifications_enabled: bool,
    present: [bool; 2],
    selections: [Option<StepwiseSelection>; 2],
}

impl<L: Link> DeviceSession<L> {
    /// Create a disconnected session
    pub fn new(link: L, config: SessionConfig, notifier: NotificationSender) -> Self {
        Self {
            link,
            config,
            notifier,
            status: DeviceStatus::Disconnected,
            address: None,
            pending_address: None,
            model: None,
            channel: None,
            notifications_enabled: false,
            present: [false; 2],
            selections: [None, None],
        }
    }

    /// Current connection state
    pub const fn status(&self) -> DeviceStatus {
        self.status
    }

    /// Address of the reader being connected or connected
    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    /// Model of the connected reader
    pub const fn model(&self) -> Option<ReaderModel> {
        self.model
    }

    /// Whether a card is present on `slot`
    pub const fn is_card_present(&self, slot: Slot) -> bool {
        self.present[slot.index() as usize]
    }

    /// Underlying link
    pub const fn link(&self) -> &L {
        &self.link
    }

    /// Connect to the reader at `address`
    ///
    /// Connecting to the address already being connected is a no-op. A
    /// different address runs the full disconnect sequence first; the new
    /// link is opened once the current one has closed.
    pub fn connect(&mut self, address: &str) {
        match self.status {
            DeviceStatus::Connecting | DeviceStatus::Connected => {
                if self.address.as_deref() == Some(address) {
                    debug!(address, status = %self.status, "Already connecting or connected");
                    return;
                }
                info!(from = ?self.address, to = address, "Switching reader");
                self.pending_address = Some(address.to_string());
                self.close_link();
            }
            DeviceStatus::Disconnecting => {
                debug!(address, "Connecting once the current link has closed");
                self.pending_address = Some(address.to_string());
            }
            DeviceStatus::Unknown | DeviceStatus::Disconnected => self.open_link(address),
        }
    }

    /// Disconnect from the reader
    pub fn disconnect(&mut self) {
        match self.status {
            DeviceStatus::Connecting | DeviceStatus::Connected => self.close_link(),
            DeviceStatus::Disconnecting => {
                if let Some(address) = self.pending_address.take() {
                    debug!(%address, "Dropping queued connect");
                }
            }
            DeviceStatus::Unknown | DeviceStatus::Disconnected => {
                debug!(status = %self.status, "Nothing to disconnect");
            }
        }
    }

    /// Process one link event
    pub fn handle_event(&mut self, event: LinkEvent) {
        match event {
            LinkEvent::Established {
                channel,
                reader_name,
            } => self.on_established(channel, reader_name),
            LinkEvent::NotificationsEnabled => {
                self.notifications_enabled = true;
                if self.status == DeviceStatus::Connecting && self.channel.is_some() {
                    self.mark_connected();
                }
            }
            LinkEvent::Closed => match self.status {
                DeviceStatus::Unknown | DeviceStatus::Disconnected => {
                    debug!("Ignoring close of a link already down");
                }
                _ => self.on_closed(),
            },
            LinkEvent::Failed(e) => match self.status {
                DeviceStatus::Connecting | DeviceStatus::Connected => self.on_failed(e),
                DeviceStatus::Disconnecting => {
                    debug!(error = %e, "Link failed while closing");
                    self.on_closed();
                }
                DeviceStatus::Unknown | DeviceStatus::Disconnected => {
                    debug!(error = %e, status = %self.status, "Ignoring link failure");
                }
            },
            LinkEvent::CardPresent(slot) => self.on_card_present(slot),
            LinkEvent::CardAbsent(slot) => self.on_card_absent(slot),
            LinkEvent::AtrAvailable(slot, atr) => self.on_atr(slot, &atr),
            LinkEvent::ResponseApdu(slot, response) => self.on_response(slot, &response),
        }
    }

    /// Process link events until every sender is dropped
    pub fn run(&mut self, events: &LinkEventReceiver) {
        for event in events.iter() {
            self.handle_event(event);
        }
        debug!("Link event channel closed");
    }

    fn notify(&self, notification: Notification) {
        if self.notifier.send(notification).is_err() {
            debug!("Notification receiver dropped");
        }
    }

    fn set_status(&mut self, status: DeviceStatus) {
        if self.status != status {
            debug!(from = %self.status, to = %status, "Device status changed");
            self.status = status;
            self.notify(Notification::DeviceStatusChanged(status));
        }
    }

    fn open_link(&mut self, address: &str) {
        self.address = Some(address.to_string());
        self.set_status(DeviceStatus::Connecting);

        match self.link.open(address) {
            Ok(LinkOpen::Ready {
                channel,
                reader_name,
            }) => self.on_established(channel, reader_name),
            Ok(LinkOpen::Pending) => debug!(address, "Link opening"),
            Err(e) => self.on_failed(e),
        }
    }

    fn close_link(&mut self) {
        self.set_status(DeviceStatus::Disconnecting);
        match self.link.close() {
            Ok(LinkClose::Closed) => self.on_closed(),
            Ok(LinkClose::Pending) => debug!("Link closing"),
            Err(e) => {
                warn!(error = %e, "Failed to close link");
                self.on_closed();
            }
        }
    }

    fn reset_link_state(&mut self) {
        self.channel = None;
        self.model = None;
        self.notifications_enabled = false;
        self.present = [false; 2];
        self.selections = [None, None];
    }

    fn on_established(&mut self, channel: ReaderChannel, reader_name: String) {
        if self.status != DeviceStatus::Connecting {
            warn!(reader = %reader_name, status = %self.status, "Unexpected link establishment");
            return;
        }

        let model = ReaderModel::from_reader_name(&reader_name);
        info!(reader = %reader_name, %model, "Link established");
        self.model = Some(model);
        self.channel = Some(channel);

        let needs_notifications = self.link.requires_notifications() || model.requires_notifications();
        if needs_notifications && !self.notifications_enabled {
            debug!("Waiting for notifications to be enabled");
        } else {
            self.mark_connected();
        }
    }

    fn mark_connected(&mut self) {
        self.set_status(DeviceStatus::Connected);
        self.notify(Notification::ConnectDevice);
    }

    fn tear_down(&mut self) {
        self.reset_link_state();
        self.address = None;
        self.set_status(DeviceStatus::Disconnected);
    }

    fn on_closed(&mut self) {
        self.tear_down();
        if let Some(address) = self.pending_address.take() {
            self.open_link(&address);
        }
    }

    fn on_failed(&mut self, error: TransportError) {
        warn!(error = %error, address = ?self.address, "Link failed");
        self.tear_down();
        self.notify(Notification::FailToConnectDevice);
    }

    fn on_card_present(&mut self, slot: Slot) {
        if self.status != DeviceStatus::Connected {
            debug!(%slot, status = %self.status, "Ignoring card while not connected");
            return;
        }

        let index = slot.index() as usize;
        if self.present[index] {
            debug!(%slot, "Card already present, ignoring");
            return;
        }
        self.present[index] = true;
        self.notify(Notification::CardPresent(slot));

        let kinds = self
            .model
            .unwrap_or(ReaderModel::Generic)
            .decoders(slot, &self.config);
        let trailer = self.config.uid_trailer;

        match self.channel.as_mut() {
            Some(ReaderChannel::Blocking(transport)) => {
                let mut decoders: Vec<_> = kinds.into_iter().map(|kind| kind.build(trailer)).collect();
                let result = select_and_decode(&mut decoders, transport.as_mut(), slot);
                self.notify(Notification::ReceiveResult(slot, result));
            }
            Some(ReaderChannel::Stepwise(sink)) => {
                let decoders = kinds
                    .into_iter()
                    .filter_map(DecoderKind::build_stepwise)
                    .collect();
                let mut selection = StepwiseSelection::new(decoders);
                let progress = selection.begin(sink.as_mut(), slot);
                self.selections[index] = Some(selection);
                self.on_progress(slot, progress);
            }
            None => self.notify(Notification::ReceiveResult(
                slot,
                Err(SessionError::NotConnected),
            )),
        }
    }

    fn on_card_absent(&mut self, slot: Slot) {
        let index = slot.index() as usize;
        if !self.present[index] {
            debug!(%slot, "Card already absent, ignoring");
            return;
        }
        self.present[index] = false;

        if let Some(mut selection) = self.selections[index].take() {
            selection.cancel();
        }
        self.notify(Notification::CardAbsent(slot));
    }

    fn on_atr(&mut self, slot: Slot, atr: &[u8]) {
        let index = slot.index() as usize;
        let (Some(selection), Some(ReaderChannel::Stepwise(sink))) =
            (self.selections[index].as_mut(), self.channel.as_mut())
        else {
            debug!(%slot, "ATR with no stepwise read in progress");
            return;
        };

        let progress = selection.on_atr(sink.as_mut(), slot, atr);
        self.on_progress(slot, progress);
    }

    fn on_response(&mut self, slot: Slot, response: &[u8]) {
        let index = slot.index() as usize;
        let (Some(selection), Some(ReaderChannel::Stepwise(sink))) =
            (self.selections[index].as_mut(), self.channel.as_mut())
        else {
            debug!(%slot, "Response with no stepwise read in progress");
            return;
        };

        let progress = selection.on_response(sink.as_mut(), slot, response);
        self.on_progress(slot, progress);
    }

    fn on_progress(&mut self, slot: Slot, progress: Progress) {
        if let Progress::Done(result) = progress {
            self.selections[slot.index() as usize] = None;
            self.notify(Notification::ReceiveResult(slot, result));
        }
    }
}
