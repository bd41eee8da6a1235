//! Directory and conversation records.

use serde::{Deserialize, Serialize};

/// Backend-assigned user id.
pub type UserId = u64;

/// Entry of the user directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
}

/// One chat message. Ids are unique within a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: u64,
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub content: String,
}

impl Message {
    /// Whether this message was exchanged between `user_id` and `peer_id`,
    /// in either direction.
    pub fn involves(&self, user_id: UserId, peer_id: UserId) -> bool {
        (self.sender_id == user_id && self.receiver_id == peer_id)
            || (self.sender_id == peer_id && self.receiver_id == user_id)
    }
}
