//! Status word definitions for APDU responses

use std::fmt;

/// Status Word (SW1-SW2) from an APDU response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatusWord {
    /// First status byte (SW1)
    pub sw1: u8,
    /// Second status byte (SW2)
    pub sw2: u8,
}

impl StatusWord {
    /// Create a new status word
    pub const fn new(sw1: u8, sw2: u8) -> Self {
        Self { sw1, sw2 }
    }

    /// Convert to a u16 value (SW1 | SW2)
    pub const fn to_u16(self) -> u16 {
        u16::from_be_bytes([self.sw1, self.sw2])
    }

    /// Read the trailing status word of a raw response, if it has one
    pub fn from_tail(data: &[u8]) -> Option<Self> {
        match data {
            [.., sw1, sw2] => Some(Self::new(*sw1, *sw2)),
            _ => None,
        }
    }

    /// 90 00
    pub const fn is_success(self) -> bool {
        self.sw1 == 0x90 && self.sw2 == 0x00
    }

    /// Bytes waiting for GET RESPONSE when SW1 = 61
    pub const fn remaining_bytes(self) -> Option<u8> {
        if self.sw1 == 0x61 { Some(self.sw2) } else { None }
    }

    /// Short description, covering the statuses ID cards commonly return
    pub const fn description(self) -> &'static str {
        match (self.sw1, self.sw2) {
            (0x90, 0x00) => "Success",
            (0x61, _) => "More data available",
            (0x91, 0x08) => "Length accepted",
            (0x62, _) | (0x63, _) => "Warning",
            (0x67, 0x00) => "Wrong length",
            (0x69, 0x82) => "Security status not satisfied",
            (0x69, 0x85) => "Conditions of use not satisfied",
            (0x6A, 0x82) => "File not found",
            (0x6A, 0x86) => "Incorrect parameters P1-P2",
            (0x6C, _) => "Wrong Le field",
            (0x6D, 0x00) => "Instruction not supported",
            (0x6E, 0x00) => "Class not supported",
            _ => "Unknown status word",
        }
    }
}

impl From<u16> for StatusWord {
    fn from(status: u16) -> Self {
        let [sw1, sw2] = status.to_be_bytes();
        Self::new(sw1, sw2)
    }
}

impl fmt::Display for StatusWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02X}{:02X}", self.sw1, self.sw2)
    }
}

/// Status words the card decoders match on
pub mod common {
    use super::StatusWord;

    /// Success (90 00)
    pub const SUCCESS: StatusWord = StatusWord::new(0x90, 0x00);

    /// MyKad application selected, 5 bytes waiting (61 05)
    pub const MYKAD_SELECTED: StatusWord = StatusWord::new(0x61, 0x05);

    /// MyKad set-length accepted (91 08)
    pub const LENGTH_ACCEPTED: StatusWord = StatusWord::new(0x91, 0x08);
}
