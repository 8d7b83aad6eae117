//! PC/SC reader link for device sessions

use cardreader_apdu_core::TransportError;
use cardreader_session::{Link, LinkClose, LinkEventSender, LinkOpen, ReaderChannel};
use pcsc::{Context, Scope};
use tracing::{debug, info};

use crate::{
    config::PcscConfig, error::PcscError, monitor::PcscMonitor, reader::SlotReaders,
    transport::PcscTransport,
};

/// Session link over the PC/SC subsystem
///
/// The address is matched against reader names, so `"ACR1281"` opens both
/// interfaces of a dual reader. Opening starts a [`PcscMonitor`] that feeds
/// card events into the session's event channel.
///
/// ```no_run
/// use cardreader_decoders::UidTrailer;
/// use cardreader_session::{DeviceSession, SessionConfig, link_event_channel, notification_channel};
/// use cardreader_transport_pcsc::{PcscConfig, PcscLink};
///
/// let (events_tx, events_rx) = link_event_channel();
/// let (notify_tx, notify_rx) = notification_channel();
///
/// let link = PcscLink::new(PcscConfig::default(), events_tx);
/// let mut session = DeviceSession::new(link, SessionConfig::new(UidTrailer::Short), notify_tx);
/// session.connect("ACR39U");
/// session.run(&events_rx);
/// # drop(notify_rx);
/// ```
#[derive(Debug)]
pub struct PcscLink {
    config: PcscConfig,
    events: LinkEventSender,
    monitor: Option<PcscMonitor>,
}

impl PcscLink {
    /// Create a closed link sending card events to `events`
    pub const fn new(config: PcscConfig, events: LinkEventSender) -> Self {
        Self {
            config,
            events,
            monitor: None,
        }
    }

    fn try_open(&mut self, address: &str) -> Result<LinkOpen, PcscError> {
        let context = Context::establish(Scope::User)?;
        let names: Vec<String> = context
            .list_readers_owned()?
            .iter()
            .map(|name| name.to_string_lossy().into_owned())
            .collect();

        let readers = SlotReaders::assign(&names, address, &self.config)?;
        let reader_name = readers.display_name().to_string();
        info!(address, ?readers, "Opening PC/SC readers");

        let monitor = PcscMonitor::spawn(context.clone(), &readers, self.events.clone())?;
        let transport = PcscTransport::new(context, readers, self.config.clone())?;
        self.monitor = Some(monitor);

        Ok(LinkOpen::Ready {
            channel: ReaderChannel::Blocking(Box::new(transport)),
            reader_name,
        })
    }
}

impl Link for PcscLink {
    fn open(&mut self, address: &str) -> Result<LinkOpen, TransportError> {
        self.monitor = None;
        Ok(self.try_open(address)?)
    }

    fn close(&mut self) -> Result<LinkClose, TransportError> {
        if let Some(monitor) = self.monitor.take() {
            monitor.stop();
            debug!("PC/SC monitor stopped");
        }
        Ok(LinkClose::Closed)
    }
}
