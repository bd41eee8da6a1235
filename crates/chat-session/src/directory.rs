//! User directory cache.

use chat_protocol::{Request, RequestId, User, UserId};
use chat_transport::TransportChannel;

/// Last directory received from the backend plus the active filter.
#[derive(Debug, Default)]
pub struct DirectoryCache {
    users: Vec<User>,
    query: String,
    local_user_id: Option<UserId>,
    visible: Vec<User>,
}

impl DirectoryCache {
    pub fn new(local_user_id: Option<UserId>) -> Self {
        Self {
            local_user_id,
            ..Self::default()
        }
    }

    /// Ask the backend for the directory.
    pub fn refresh(&self, channel: &mut TransportChannel) -> Option<RequestId> {
        channel.send(Request::GetDirectory)
    }

    /// Replace the cached set wholesale.
    pub fn on_result(&mut self, users: Vec<User>) {
        tracing::debug!(count = users.len(), "directory updated");
        self.users = users;
        self.apply_filter();
    }

    pub fn set_filter(&mut self, query: &str) {
        self.query = query.to_string();
        self.apply_filter();
    }

    /// Filtered view: never contains the local user.
    pub fn visible(&self) -> &[User] {
        &self.visible
    }

    /// The full cached set.
    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub fn contains(&self, user_id: UserId) -> bool {
        self.users.iter().any(|u| u.id == user_id)
    }

    fn apply_filter(&mut self) {
        self.visible = filter(&self.users, &self.query, self.local_user_id);
    }
}

/// Case-insensitive substring match on username, excluding `local_user_id`.
pub fn filter(users: &[User], query: &str, local_user_id: Option<UserId>) -> Vec<User> {
    let needle = query.trim().to_lowercase();
    users
        .iter()
        .filter(|u| Some(u.id) != local_user_id)
        .filter(|u| needle.is_empty() || u.username.to_lowercase().contains(&needle))
        .cloned()
        .collect()
}
