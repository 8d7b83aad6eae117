//! Reader sessions
//!
//! A [`DeviceSession`] owns the link to one reader. It tracks the connection
//! state, the card state of each slot, and resolves the reader's
//! [`ReaderModel`] to decide which decoders to try on a presented card.
//! Results flow back to the owner as [`Notification`]s.
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![forbid(unsafe_code)]
#![warn(missing_docs, rustdoc::missing_crate_level_docs)]

pub mod callback;
pub mod config;
pub mod device;
pub mod error;
pub mod model;
pub mod policy;

pub use callback::{
    Notification, NotificationReceiver, NotificationSender, ReaderCallback, dispatch_pending,
    notification_channel,
};
pub use config::SessionConfig;
pub use device::{
    DeviceSession, DeviceStatus, Link, LinkClose, LinkEvent, LinkEventReceiver, LinkEventSender,
    LinkOpen, ReaderChannel, link_event_channel,
};
pub use error::{AttemptError, FailedAttempt, FailedAttempts, SessionError};
pub use model::ReaderModel;
pub use policy::{Progress, StepwiseSelection, select_and_decode};
