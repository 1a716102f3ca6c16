//! Per-participant holding area for causally early messages.

use crate::message::Message;
use tracing::debug;

/// Messages that arrived before their causal predecessors.
///
/// Holding a message is the expected steady state while it waits for
/// catch-up, not an error. Messages are kept in arrival order and released
/// oldest-first.
#[derive(Debug, Clone, Default)]
pub struct DeliveryBuffer {
    held: Vec<Message>,
}

impl DeliveryBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Holds a message until it becomes deliverable.
    pub fn hold(&mut self, message: Message) {
        debug!(
            message = %message.id,
            from = %message.from,
            to = %message.to,
            depth = self.held.len() + 1,
            "holding message for causal delivery"
        );
        self.held.push(message);
    }

    /// Removes and returns the message at `position`.
    pub fn take(&mut self, position: usize) -> Option<Message> {
        if position < self.held.len() {
            Some(self.held.remove(position))
        } else {
            None
        }
    }

    /// Number of held messages.
    pub fn len(&self) -> usize {
        self.held.len()
    }

    pub fn is_empty(&self) -> bool {
        self.held.is_empty()
    }

    /// Iterates held messages in arrival order.
    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.held.iter()
    }
}
