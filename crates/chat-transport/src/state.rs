//! Channel lifecycle states.

/// Lifecycle of one channel instance.
///
/// `Closed` and `Failed` are terminal: a channel that reached either is
/// never reopened, a fresh instance is built instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Disconnected,
    Connecting,
    AwaitingAuth,
    Authenticated,
    Closed,
    Failed,
}

impl ChannelState {
    pub fn is_terminal(self) -> bool {
        matches!(self, ChannelState::Closed | ChannelState::Failed)
    }

    /// States in which a transport error moves the channel to `Failed`.
    pub fn can_fail(self) -> bool {
        matches!(
            self,
            ChannelState::Connecting | ChannelState::AwaitingAuth | ChannelState::Authenticated
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(ChannelState::Closed.is_terminal());
        assert!(ChannelState::Failed.is_terminal());
        assert!(!ChannelState::Disconnected.is_terminal());
        assert!(!ChannelState::Authenticated.is_terminal());
    }

    #[test]
    fn test_failable_states() {
        assert!(ChannelState::Connecting.can_fail());
        assert!(ChannelState::AwaitingAuth.can_fail());
        assert!(ChannelState::Authenticated.can_fail());
        assert!(!ChannelState::Disconnected.can_fail());
        assert!(!ChannelState::Closed.can_fail());
        assert!(!ChannelState::Failed.can_fail());
    }
}
