//! Card presence tracking across slot status polls

/// Change in card presence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardChange {
    /// A card was inserted
    Inserted,
    /// The card was removed
    Removed,
}

/// Turns polled presence into insert and remove transitions
///
/// Starts out with no card, so a card already in the slot at the first poll
/// reports as inserted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PresenceTracker {
    present: bool,
}

impl PresenceTracker {
    /// Whether the last poll saw a card
    pub const fn is_present(&self) -> bool {
        self.present
    }

    /// Record a poll result and return the transition, if any
    pub const fn update(&mut self, present: bool) -> Option<CardChange> {
        if self.present == present {
            return None;
        }
        self.present = present;
        Some(if present {
            CardChange::Inserted
        } else {
            CardChange::Removed
        })
    }
}
