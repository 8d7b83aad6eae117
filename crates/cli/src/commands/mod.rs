//! CLI commands

use std::{
    error::Error,
    time::{Duration, Instant},
};

use cardreader_session::{
    DeviceSession, DeviceStatus, LinkEventReceiver, NotificationReceiver, ReaderModel,
    dispatch_pending,
    link_event_channel, notification_channel,
};
use cardreader_transport_pcsc::{PcscConfig, PcscLink, list_readers};
use colored::Colorize;
use crossbeam_channel::RecvTimeoutError;

use crate::utils::{DecoderArgs, printer::Printer};

/// List all available readers
pub(crate) fn list_command() -> Result<(), Box<dyn Error>> {
    let readers = list_readers()?;

    println!("Available readers:");
    for (i, reader) in readers.iter().enumerate() {
        let status = if reader.has_card() {
            "card present".green()
        } else {
            "no card".normal()
        };
        let model = ReaderModel::from_reader_name(reader.name());
        println!("{}. {} [{}] ({})", i + 1, reader.name(), model, status);
    }

    Ok(())
}

type OpenSession = (DeviceSession<PcscLink>, NotificationReceiver, LinkEventReceiver);

fn open_session(
    reader: &str,
    args: &DecoderArgs,
    printer: &mut Printer,
) -> Result<OpenSession, Box<dyn Error>> {
    let (events_tx, events_rx) = link_event_channel();
    let (notify_tx, notify_rx) = notification_channel();

    let link = PcscLink::new(PcscConfig::default(), events_tx);
    let mut session = DeviceSession::new(link, args.session_config(), notify_tx);
    session.connect(reader);
    dispatch_pending(&notify_rx, printer);

    if session.status() != DeviceStatus::Connected {
        return Err(format!("Failed to connect to reader '{reader}'").into());
    }
    Ok((session, notify_rx, events_rx))
}

/// Wait for a card and read it once
pub(crate) fn read_command(reader: &str, args: &DecoderArgs, timeout: Duration) -> Result<(), Box<dyn Error>> {
    let mut printer = Printer::default();
    let (mut session, notify_rx, events_rx) = open_session(reader, args, &mut printer)?;

    println!("Waiting for a card...");
    let deadline = Instant::now() + timeout;
    while printer.results() == 0 {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match events_rx.recv_timeout(remaining) {
            Ok(event) => session.handle_event(event),
            Err(RecvTimeoutError::Timeout) => {
                session.disconnect();
                return Err("Timed out waiting for a card".into());
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
        dispatch_pending(&notify_rx, &mut printer);

        if session.status() == DeviceStatus::Disconnected {
            return Err("Reader disconnected".into());
        }
    }

    session.disconnect();
    dispatch_pending(&notify_rx, &mut printer);

    if printer.read() == 0 {
        return Err("Card could not be read".into());
    }
    Ok(())
}

/// Read every card presented until the reader goes away
pub(crate) fn watch_command(reader: &str, args: &DecoderArgs) -> Result<(), Box<dyn Error>> {
    let mut printer = Printer::default();
    let (mut session, notify_rx, events_rx) = open_session(reader, args, &mut printer)?;

    println!("Watching for cards, press Ctrl-C to stop");
    for event in events_rx.iter() {
        session.handle_event(event);
        dispatch_pending(&notify_rx, &mut printer);

        if session.status() == DeviceStatus::Disconnected {
            break;
        }
    }

    println!(
        "{} read, {} failed",
        printer.read().to_string().green(),
        printer.failed().to_string().red()
    );
    Ok(())
}
