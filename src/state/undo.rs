//! Single-slot buffer holding the last reversible operator action.

use std::time::Duration;

use tokio::time::Instant;
use uuid::Uuid;

use crate::state::tournament::PlayerEntry;

/// How long an action stays reversible.
pub const UNDO_WINDOW: Duration = Duration::from_secs(8);

/// Reversible operator action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UndoAction {
    /// A player was knocked out.
    Eliminate {
        /// Roster entry that was eliminated.
        entry_id: Uuid,
        /// Name shown in the undo prompt.
        name: String,
    },
    /// A rebuy was recorded.
    Rebuy {
        /// Roster entry that bought back in.
        entry_id: Uuid,
        /// Name shown in the undo prompt.
        name: String,
    },
    /// An entry was deleted; the full row is kept to restore it.
    Remove {
        /// Entry as it was before removal.
        entry: PlayerEntry,
    },
}

impl UndoAction {
    /// Name of the player the action applies to.
    pub fn player_name(&self) -> &str {
        match self {
            UndoAction::Eliminate { name, .. } | UndoAction::Rebuy { name, .. } => name,
            UndoAction::Remove { entry } => &entry.name,
        }
    }

    /// Short label of the action kind.
    pub fn kind(&self) -> &'static str {
        match self {
            UndoAction::Eliminate { .. } => "eliminate",
            UndoAction::Rebuy { .. } => "rebuy",
            UndoAction::Remove { .. } => "remove",
        }
    }
}

/// Identifies one push so a stale expiry cannot clear a newer entry.
pub type UndoTicket = u64;

/// Pending action with its expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UndoEntry {
    /// Action to revert.
    pub action: UndoAction,
    /// Instant after which the action is no longer reversible.
    pub expires_at: Instant,
    /// Ticket handed out by [`UndoBuffer::push`].
    pub ticket: UndoTicket,
}

/// At most one pending [`UndoEntry`].
#[derive(Debug, Default)]
pub struct UndoBuffer {
    slot: Option<UndoEntry>,
    next_ticket: UndoTicket,
}

impl UndoBuffer {
    /// Empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `action`, discarding whatever was pending.
    pub fn push(&mut self, action: UndoAction, expires_at: Instant) -> UndoTicket {
        self.next_ticket = self.next_ticket.wrapping_add(1);
        let ticket = self.next_ticket;
        self.slot = Some(UndoEntry {
            action,
            expires_at,
            ticket,
        });
        ticket
    }

    /// Take the pending entry, leaving the slot empty. An entry whose window
    /// closed before `now` is dropped instead of returned.
    pub fn fire(&mut self, now: Instant) -> Option<UndoEntry> {
        self.slot.take().filter(|entry| entry.expires_at > now)
    }

    /// Clear the slot if it still holds the push identified by `ticket`.
    pub fn expire(&mut self, ticket: UndoTicket) -> bool {
        match &self.slot {
            Some(entry) if entry.ticket == ticket => {
                self.slot = None;
                true
            }
            _ => false,
        }
    }

    /// Drop the pending entry, if any.
    pub fn clear(&mut self) {
        self.slot = None;
    }

    /// Currently pending entry.
    pub fn pending(&self) -> Option<&UndoEntry> {
        self.slot.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rebuy(name: &str) -> UndoAction {
        UndoAction::Rebuy {
            entry_id: Uuid::new_v4(),
            name: name.into(),
        }
    }

    #[test]
    fn push_supersedes_pending_entry() {
        let mut buffer = UndoBuffer::new();
        let now = Instant::now();
        let first = buffer.push(rebuy("Ana"), now + UNDO_WINDOW);
        let second = buffer.push(rebuy("Bea"), now + UNDO_WINDOW);

        assert!(!buffer.expire(first));
        assert_eq!(buffer.pending().unwrap().action.player_name(), "Bea");
        assert!(buffer.expire(second));
        assert!(buffer.pending().is_none());
    }

    #[test]
    fn fire_empties_the_slot() {
        let mut buffer = UndoBuffer::new();
        let now = Instant::now();
        assert!(buffer.fire(now).is_none());

        let ticket = buffer.push(rebuy("Ana"), now + UNDO_WINDOW);
        let entry = buffer.fire(now).unwrap();
        assert_eq!(entry.ticket, ticket);
        assert_eq!(entry.action.kind(), "rebuy");
        assert!(buffer.fire(now).is_none());
        assert!(!buffer.expire(ticket));
    }

    #[test]
    fn fire_drops_an_entry_past_its_window() {
        let mut buffer = UndoBuffer::new();
        let now = Instant::now();
        buffer.push(rebuy("Ana"), now + UNDO_WINDOW);

        assert!(buffer.fire(now + UNDO_WINDOW).is_none());
        assert!(buffer.pending().is_none());
    }
}
