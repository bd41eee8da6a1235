//! Conversation cache for the selected peer.

use chat_protocol::{Message, Request, RequestId, UserId};
use chat_transport::TransportChannel;

/// Messages exchanged with the selected peer, in arrival order.
#[derive(Debug, Default)]
pub struct ConversationCache {
    peer: Option<UserId>,
    messages: Vec<Message>,
    pending_history: Option<RequestId>,
    history_loaded: bool,
}

impl ConversationCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn peer(&self) -> Option<UserId> {
        self.peer
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Switch to `peer_id`: drop the current sequence and request its history.
    pub fn select_peer(
        &mut self,
        peer_id: UserId,
        channel: &mut TransportChannel,
    ) -> Option<RequestId> {
        self.peer = Some(peer_id);
        self.messages.clear();
        self.history_loaded = false;
        tracing::debug!(peer_id, "peer selected");
        self.request_history(channel)
    }

    /// Whether the selected peer has neither an outstanding nor an answered
    /// history load, as when it was picked before the channel authenticated.
    pub fn needs_history(&self) -> bool {
        self.peer.is_some() && self.pending_history.is_none() && !self.history_loaded
    }

    /// Ask for the selected peer's history.
    pub fn request_history(&mut self, channel: &mut TransportChannel) -> Option<RequestId> {
        let peer_id = self.peer?;
        self.pending_history = channel.send(Request::GetMessages { peer_id });
        tracing::debug!(peer_id, request_id = ?self.pending_history, "history requested");
        self.pending_history
    }

    /// Apply a history batch if it answers the outstanding load.
    ///
    /// Batches echoing a different request id are stale and dropped. Batches
    /// without an id are accepted.
    pub fn on_history(&mut self, request_id: Option<RequestId>, messages: Vec<Message>) -> bool {
        if self.peer.is_none() {
            tracing::debug!("history with no peer selected, dropping");
            return false;
        }

        if let Some(id) = request_id {
            if self.pending_history != Some(id) {
                tracing::debug!(request_id = %id, "stale history result, dropping");
                return false;
            }
            self.pending_history = None;
        }

        self.history_loaded = true;
        self.append_history(messages);
        true
    }

    pub fn append_history(&mut self, messages: Vec<Message>) {
        self.messages.extend(messages);
    }

    pub fn append_one(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
