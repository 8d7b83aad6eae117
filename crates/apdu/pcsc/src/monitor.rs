//! Card presence monitor for PC/SC readers

use std::{
    ffi::CString,
    fmt,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use cardreader_apdu_core::{Slot, TransportError};
use cardreader_session::{LinkEvent, LinkEventSender};
use parking_lot::Mutex;
use pcsc::{Context, ReaderState, State};
use tracing::{debug, info, warn};

use crate::{error::PcscError, reader::SlotReaders};

const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Card presence of one slot as last reported
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotWatch {
    slot: Slot,
    present: bool,
}

impl SlotWatch {
    /// Start watching `slot` with no card reported
    pub const fn new(slot: Slot) -> Self {
        Self {
            slot,
            present: false,
        }
    }

    /// Slot being watched
    pub const fn slot(&self) -> Slot {
        self.slot
    }

    /// Turn a reader state into a link event when card presence changed
    ///
    /// A reader that disappeared reports as a link failure.
    pub fn update(&mut self, state: State) -> Option<LinkEvent> {
        if state.intersects(State::UNKNOWN | State::UNAVAILABLE) {
            return Some(LinkEvent::Failed(TransportError::Connection));
        }

        let present = state.contains(State::PRESENT) && !state.contains(State::MUTE);
        if present == self.present {
            return None;
        }
        self.present = present;
        Some(if present {
            LinkEvent::CardPresent(self.slot)
        } else {
            LinkEvent::CardAbsent(self.slot)
        })
    }
}

/// Background thread reporting card insertion and removal on a reader's slots
pub struct PcscMonitor {
    context: Context,
    running: Arc<AtomicBool>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl fmt::Debug for PcscMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PcscMonitor")
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

impl PcscMonitor {
    /// Start watching the readers of each slot, sending events to `sender`
    pub fn spawn(
        context: Context,
        readers: &SlotReaders,
        sender: LinkEventSender,
    ) -> Result<Self, PcscError> {
        let watched: Vec<(SlotWatch, CString)> = readers
            .iter()
            .map(|(slot, name)| {
                let name =
                    CString::new(name).map_err(|_| PcscError::InvalidReaderName(name.to_string()))?;
                Ok((SlotWatch::new(slot), name))
            })
            .collect::<Result<_, PcscError>>()?;

        let running = Arc::new(AtomicBool::new(true));
        let handle = thread::Builder::new()
            .name("pcsc-monitor".to_string())
            .spawn({
                let context = context.clone();
                let running = Arc::clone(&running);
                move || watch(&context, &running, watched, &sender)
            })
            .map_err(|e| PcscError::Monitor(e.to_string()))?;

        Ok(Self {
            context,
            running,
            handle: Mutex::new(Some(handle)),
        })
    }

    /// Whether the monitor thread is still running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Stop the monitor thread and wait for it to exit
    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
        if let Err(e) = self.context.cancel() {
            debug!(error = %e, "Failed to cancel status wait");
        }
        if let Some(handle) = self.handle.lock().take() {
            if handle.join().is_err() {
                warn!("Monitor thread panicked");
            }
        }
    }
}

impl Drop for PcscMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Send `event` to the session, returning whether it was delivered
fn report(sender: &LinkEventSender, event: LinkEvent) -> bool {
    let delivered = sender.send(event).is_ok();
    if !delivered {
        debug!("Link event receiver dropped");
    }
    delivered
}

fn watch(
    context: &Context,
    running: &AtomicBool,
    watched: Vec<(SlotWatch, CString)>,
    sender: &LinkEventSender,
) {
    info!(slots = watched.len(), "Monitoring card presence");
    let (mut watches, names): (Vec<_>, Vec<_>) = watched.into_iter().unzip();
    let mut states: Vec<ReaderState> = names
        .into_iter()
        .map(|name| ReaderState::new(name, State::UNAWARE))
        .collect();

    while running.load(Ordering::Acquire) {
        match context.get_status_change(Some(POLL_INTERVAL), &mut states) {
            Ok(()) => {}
            Err(pcsc::Error::Timeout) => continue,
            Err(pcsc::Error::Cancelled) => break,
            Err(e) => {
                warn!(error = %e, "Status wait failed");
                report(sender, LinkEvent::Failed(PcscError::from(e).into()));
                break;
            }
        }

        for (slot_watch, state) in watches.iter_mut().zip(&mut states) {
            let event_state = state.event_state();
            state.sync_current_state();

            let Some(event) = slot_watch.update(event_state) else {
                continue;
            };
            debug!(slot = %slot_watch.slot(), ?event, "Reader state changed");
            let failed = matches!(event, LinkEvent::Failed(_));
            if !report(sender, event) || failed {
                running.store(false, Ordering::Release);
                break;
            }
        }
    }

    debug!("Monitor stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use cardreader_session::link_event_channel;

    #[test]
    fn test_report_after_receiver_dropped() {
        let (tx, rx) = link_event_channel();
        assert!(report(&tx, LinkEvent::CardPresent(Slot::Contact)));
        assert!(matches!(rx.try_recv(), Ok(LinkEvent::CardPresent(Slot::Contact))));

        drop(rx);
        assert!(!report(&tx, LinkEvent::Failed(TransportError::Connection)));
    }

    #[test]
    fn test_slot_watch_transitions() {
        let mut watch = SlotWatch::new(Slot::Contact);
        assert!(watch.update(State::EMPTY).is_none());
        assert!(matches!(
            watch.update(State::PRESENT | State::CHANGED),
            Some(LinkEvent::CardPresent(Slot::Contact))
        ));
        assert!(watch.update(State::PRESENT | State::INUSE).is_none());
        assert!(matches!(
            watch.update(State::EMPTY | State::CHANGED),
            Some(LinkEvent::CardAbsent(Slot::Contact))
        ));
    }

    #[test]
    fn test_slot_watch_mute_and_unplug() {
        let mut watch = SlotWatch::new(Slot::Contactless);
        assert!(watch.update(State::PRESENT | State::MUTE).is_none());
        assert!(matches!(
            watch.update(State::UNAVAILABLE),
            Some(LinkEvent::Failed(TransportError::Connection))
        ));
    }
}
