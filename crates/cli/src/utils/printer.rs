//! Console output of reader notifications

use cardreader_apdu_core::Slot;
use cardreader_decoders::CardRecord;
use cardreader_session::{DeviceStatus, ReaderCallback, SessionError};
use colored::Colorize;
use tracing::debug;

/// Prints reader notifications and counts card results
#[derive(Debug, Default)]
pub(crate) struct Printer {
    read: usize,
    failed: usize,
}

impl Printer {
    /// Cards read successfully
    pub(crate) const fn read(&self) -> usize {
        self.read
    }

    /// Cards that could not be read
    pub(crate) const fn failed(&self) -> usize {
        self.failed
    }

    /// Results of either kind
    pub(crate) const fn results(&self) -> usize {
        self.read + self.failed
    }
}

impl ReaderCallback for Printer {
    fn on_device_status_changed(&mut self, status: DeviceStatus) {
        debug!(%status, "Reader status");
    }

    fn on_connect_device(&mut self) {
        println!("{}", "Reader connected".green());
    }

    fn on_fail_to_connect_device(&mut self) {
        println!("{}", "Reader connection failed".red());
    }

    fn on_card_present(&mut self, slot: Slot) {
        println!("Card presented ({slot})");
    }

    fn on_card_absent(&mut self, slot: Slot) {
        println!("Card removed ({slot})");
    }

    fn on_receive_result(&mut self, slot: Slot, result: Result<CardRecord, SessionError>) {
        match result {
            Ok(record) => {
                self.read += 1;
                println!("{}", format!("Card read ({slot})").green().bold());
                println!("{record}");
            }
            Err(e) => {
                self.failed += 1;
                println!("{} {e}", format!("Card read failed ({slot}):").red().bold());
            }
        }
    }
}
