//! Chat log for the session channel.
//!
//! DESIGN
//! ======
//! The server relays a chat message to every other connection in the
//! session and never back to its sender. A local message is therefore
//! confirmed once the link accepts it: `insert_optimistic` records it as
//! pending and `mark_sent` confirms it. An inbound message whose id is
//! already present (a relay through another tab, or a backend that does
//! echo) confirms that entry in place; anything else is appended in arrival
//! order.

#[cfg(test)]
#[path = "chat_test.rs"]
mod chat_test;

use crate::net::types::ChatMessagePayload;

/// Whether a message has left this client yet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Delivery {
    /// Shown locally, not yet accepted by the link.
    Pending,
    /// Accepted by the link, or received from the server.
    Confirmed,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatEntry {
    pub message: ChatMessagePayload,
    pub delivery: Delivery,
}

#[derive(Clone, Debug, Default)]
pub struct ChatState {
    pub entries: Vec<ChatEntry>,
}

impl ChatState {
    /// Insert a local message before the link has accepted it.
    ///
    /// Ignored when the id is already present.
    pub fn insert_optimistic(&mut self, message: ChatMessagePayload) {
        if self.position(&message.id).is_some() {
            return;
        }
        self.entries.push(ChatEntry { message, delivery: Delivery::Pending });
    }

    /// Confirm a local message once the link accepted it.
    ///
    /// Returns `false` when no entry has that id.
    pub fn mark_sent(&mut self, id: &str) -> bool {
        let Some(index) = self.position(id) else {
            return false;
        };
        self.entries[index].delivery = Delivery::Confirmed;
        true
    }

    /// Drop a local message the link refused.
    pub fn discard(&mut self, id: &str) -> bool {
        let Some(index) = self.position(id) else {
            return false;
        };
        self.entries.remove(index);
        true
    }

    /// Apply a message received from the server.
    ///
    /// Returns `true` when it was appended, `false` when it confirmed an
    /// existing entry.
    pub fn apply_remote(&mut self, message: ChatMessagePayload) -> bool {
        match self.position(&message.id) {
            Some(index) => {
                self.entries[index] = ChatEntry { message, delivery: Delivery::Confirmed };
                false
            }
            None => {
                self.entries.push(ChatEntry { message, delivery: Delivery::Confirmed });
                true
            }
        }
    }

    pub fn messages(&self) -> impl Iterator<Item = &ChatMessagePayload> {
        self.entries.iter().map(|entry| &entry.message)
    }

    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.entries.iter().filter(|entry| entry.delivery == Delivery::Pending).count()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.entries.iter().position(|entry| entry.message.id == id)
    }
}
