//! Upward notifications
//!
//! The session runs on the reader's event thread and never calls the owner
//! directly. It sends [`Notification`]s through a channel; the owner drains
//! them on its own thread and dispatches each one to its [`ReaderCallback`].

use cardreader_apdu_core::Slot;
use cardreader_decoders::CardRecord;
use crossbeam_channel::{Receiver, Sender, unbounded};

use crate::{device::DeviceStatus, error::SessionError};

/// Receiver of reader notifications
///
/// Every method defaults to doing nothing.
pub trait ReaderCallback {
    /// The connection state changed
    fn on_device_status_changed(&mut self, _status: DeviceStatus) {}

    /// The reader is connected and ready
    fn on_connect_device(&mut self) {}

    /// The reader could not be connected, or the link failed
    fn on_fail_to_connect_device(&mut self) {}

    /// A card was presented on `slot`
    fn on_card_present(&mut self, _slot: Slot) {}

    /// The card on `slot` was removed
    fn on_card_absent(&mut self, _slot: Slot) {}

    /// A card read finished
    fn on_receive_result(&mut self, _slot: Slot, _result: Result<CardRecord, SessionError>) {}
}

/// A notification from the session to its owner
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// See [`ReaderCallback::on_device_status_changed`]
    DeviceStatusChanged(DeviceStatus),
    /// See [`ReaderCallback::on_connect_device`]
    ConnectDevice,
    /// See [`ReaderCallback::on_fail_to_connect_device`]
    FailToConnectDevice,
    /// See [`ReaderCallback::on_card_present`]
    CardPresent(Slot),
    /// See [`ReaderCallback::on_card_absent`]
    CardAbsent(Slot),
    /// See [`ReaderCallback::on_receive_result`]
    ReceiveResult(Slot, Result<CardRecord, SessionError>),
}

impl Notification {
    /// Deliver this notification to `callback`
    pub fn dispatch(self, callback: &mut dyn ReaderCallback) {
        match self {
            Self::DeviceStatusChanged(status) => callback.on_device_status_changed(status),
            Self::ConnectDevice => callback.on_connect_device(),
            Self::FailToConnectDevice => callback.on_fail_to_connect_device(),
            Self::CardPresent(slot) => callback.on_card_present(slot),
            Self::CardAbsent(slot) => callback.on_card_absent(slot),
            Self::ReceiveResult(slot, result) => callback.on_receive_result(slot, result),
        }
    }
}

/// Sender for notifications
pub type NotificationSender = Sender<Notification>;
/// Receiver for notifications
pub type NotificationReceiver = Receiver<Notification>;

/// Create an unbounded notification channel
pub fn notification_channel() -> (NotificationSender, NotificationReceiver) {
    unbounded()
}

/// Dispatch every notification already queued, returning how many there were
pub fn dispatch_pending(receiver: &NotificationReceiver, callback: &mut dyn ReaderCallback) -> usize {
    let mut count = 0;
    for notification in receiver.try_iter() {
        notification.dispatch(callback);
        count += 1;
    }
    count
}

// Closures receive the notification itself
impl<F> ReaderCallback for F
where
    F: FnMut(Notification),
{
    fn on_device_status_changed(&mut self, status: DeviceStatus) {
        self(Notification::DeviceStatusChanged(status))
    }

    fn on_connect_device(&mut self) {
        self(Notification::ConnectDevice)
    }

    fn on_fail_to_connect_device(&mut self) {
        self(Notification::FailToConnectDevice)
    }

    fn on_card_present(&mut self, slot: Slot) {
        self(Notification::CardPresent(slot))
    }

    fn on_card_absent(&mut self, slot: Slot) {
        self(Notification::CardAbsent(slot))
    }

    fn on_receive_result(&mut self, slot: Slot, result: Result<CardRecord, SessionError>) {
        self(Notification::ReceiveResult(slot, result))
    }
}
