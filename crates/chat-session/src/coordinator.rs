//! Session coordinator.
//!
//! Owns the session store, the channel and both caches, and turns channel
//! events and user actions into [`CoordinatorEvent`]s. It performs no IO
//! itself; [`crate::SessionRuntime`] drives it.

use crate::{ConversationCache, DirectoryCache, SessionResult};
use chat_protocol::{Message, OutboundFrame, Request, RequestId, User, UserId};
use chat_transport::{
    Backoff, ChannelEvent, ChannelState, LinkEvent, ReconnectPolicy, TransportChannel,
};
use session_store::{Session, SessionStore};
use std::collections::VecDeque;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Shown when the backend cannot be reached.
pub const CONNECTIVITY_MESSAGE: &str = "Connection to the server lost";

/// What the front end should react to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoordinatorEvent {
    /// Leave the chat view for the login flow.
    RedirectToLogin { reason: Option<String> },
    /// The channel authenticated.
    Connected,
    /// New visible directory.
    DirectoryUpdated { users: Vec<User> },
    /// A conversation was opened.
    PeerSelected { peer_id: UserId },
    /// Current message sequence of the selected conversation.
    ConversationUpdated {
        peer_id: UserId,
        messages: Vec<Message>,
    },
    /// Request-level error; the session is intact.
    InlineError { message: String },
    /// Transport failure. `retrying` tells whether a reconnect is scheduled.
    ConnectivityLost { message: String, retrying: bool },
}

/// How [`SessionCoordinator::start`] went.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// A channel is connecting; the caller should open a socket.
    Connecting,
    /// No usable session; a redirect was emitted.
    Redirected,
}

pub struct SessionCoordinator {
    store: SessionStore,
    session: Option<Session>,
    channel: TransportChannel,
    directory: DirectoryCache,
    conversation: ConversationCache,
    policy: ReconnectPolicy,
    backoff: Backoff,
    reconnect_delay: Option<Duration>,
    events: VecDeque<CoordinatorEvent>,
    finished: bool,
}

impl SessionCoordinator {
    pub fn new(store: SessionStore, policy: ReconnectPolicy) -> Self {
        Self {
            store,
            session: None,
            channel: TransportChannel::new(),
            directory: DirectoryCache::new(None),
            conversation: ConversationCache::new(),
            policy,
            backoff: Backoff::new(),
            reconnect_delay: None,
            events: VecDeque::new(),
            finished: false,
        }
    }

    /// Load the session and open the channel, or redirect to login.
    pub fn start(&mut self) -> SessionResult<StartOutcome> {
        let Some(session) = self.store.load()? else {
            info!("no stored session, redirecting to login");
            self.redirect(None);
            return Ok(StartOutcome::Redirected);
        };

        info!(user_id = session.user_id, "starting session");
        self.directory = DirectoryCache::new(Some(session.user_id));
        self.conversation.clear();
        self.channel = TransportChannel::new();
        self.channel.open(Some(&session.token))?;
        self.session = Some(session);
        Ok(StartOutcome::Connecting)
    }

    /// Build a fresh channel after a scheduled reconnect delay.
    pub fn reconnect(&mut self) -> SessionResult<StartOutcome> {
        self.reconnect_delay = None;
        if self.finished {
            return Ok(StartOutcome::Redirected);
        }
        info!(attempt = self.backoff.attempts(), "reconnecting");

        // History is reloaded once the directory confirms the peer.
        self.conversation.clear();

        let token = self.session.as_ref().map(|s| s.token.clone());
        self.channel = TransportChannel::new();
        self.channel.open(token.as_deref())?;
        Ok(StartOutcome::Connecting)
    }

    /// Feed one socket event through the channel.
    pub fn handle_link_event(&mut self, event: LinkEvent) -> SessionResult<()> {
        let Some(event) = self.channel.handle(event) else {
            return Ok(());
        };

        match event {
            ChannelEvent::Authenticated => {
                self.backoff.reset();
                self.emit(CoordinatorEvent::Connected);
                self.directory.refresh(&mut self.channel);
                if self.conversation.needs_history() {
                    debug!(peer_id = ?self.conversation.peer(), "loading history picked while offline");
                    self.conversation.request_history(&mut self.channel);
                }
            }
            ChannelEvent::AuthRejected { reason } => {
                warn!(reason = %reason, "session rejected, clearing");
                self.store.clear()?;
                self.session = None;
                self.redirect(Some(reason));
            }
            ChannelEvent::Directory { users, .. } => self.on_directory(users)?,
            ChannelEvent::Messages {
                messages,
                request_id,
            } => {
                if self.conversation.on_history(request_id, messages) {
                    self.emit_conversation();
                }
            }
            ChannelEvent::MessageSent { message, .. } => self.on_message_sent(message),
            ChannelEvent::RequestError { message, .. } => {
                self.emit(CoordinatorEvent::InlineError { message });
            }
            ChannelEvent::Failed { reason } => self.on_connection_lost(&reason)?,
            ChannelEvent::Closed { reason } => {
                self.on_connection_lost(reason.as_deref().unwrap_or("closed by server"))?
            }
        }
        Ok(())
    }

    /// Open the conversation with `peer_id` and remember the choice.
    pub fn select_peer(&mut self, peer_id: UserId) -> SessionResult<Option<RequestId>> {
        let request_id = self.conversation.select_peer(peer_id, &mut self.channel);

        self.store.set_selected_peer(peer_id)?;
        if let Some(session) = self.session.as_mut() {
            session.selected_peer_id = Some(peer_id);
        }

        self.emit(CoordinatorEvent::PeerSelected { peer_id });
        self.emit_conversation();
        Ok(request_id)
    }

    /// Send `content` to the selected peer.
    ///
    /// Blank content or no selection is ignored.
    pub fn send_message(&mut self, content: &str) -> Option<RequestId> {
        if content.trim().is_empty() {
            return None;
        }
        let Some(peer_id) = self.conversation.peer() else {
            debug!("no peer selected, not sending");
            return None;
        };
        self.channel.send(Request::SendMessage {
            peer_id,
            content: content.to_string(),
        })
    }

    pub fn refresh_directory(&mut self) -> Option<RequestId> {
        self.directory.refresh(&mut self.channel)
    }

    pub fn set_filter(&mut self, query: &str) {
        self.directory.set_filter(query);
        self.emit(CoordinatorEvent::DirectoryUpdated {
            users: self.directory.visible().to_vec(),
        });
    }

    /// Close the channel, clear the store and redirect.
    pub fn logout(&mut self) -> SessionResult<()> {
        info!("logging out");
        self.channel.close();
        self.store.clear()?;
        self.session = None;
        self.conversation.clear();
        self.redirect(None);
        Ok(())
    }

    /// Close the channel and stop, keeping the stored session.
    pub fn unmount(&mut self) {
        debug!("unmounting session");
        self.channel.close();
        self.reconnect_delay = None;
        self.finished = true;
    }

    pub fn drain_outbound(&mut self) -> Vec<OutboundFrame> {
        self.channel.drain_outbound()
    }

    pub fn drain_events(&mut self) -> Vec<CoordinatorEvent> {
        self.events.drain(..).collect()
    }

    /// Delay before the next reconnect, if one is scheduled.
    pub fn take_reconnect(&mut self) -> Option<Duration> {
        self.reconnect_delay.take()
    }

    /// Whether the session ended (logout, unmount or redirect).
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn channel_state(&self) -> ChannelState {
        self.channel.state()
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn directory(&self) -> &DirectoryCache {
        &self.directory
    }

    pub fn conversation(&self) -> &ConversationCache {
        &self.conversation
    }

    fn on_directory(&mut self, users: Vec<User>) -> SessionResult<()> {
        self.directory.on_result(users);
        self.emit(CoordinatorEvent::DirectoryUpdated {
            users: self.directory.visible().to_vec(),
        });

        let stored = self.session.as_ref().and_then(|s| s.selected_peer_id);
        if let Some(peer_id) = stored {
            if self.conversation.peer().is_none() && self.directory.contains(peer_id) {
                debug!(peer_id, "restoring selected peer");
                self.select_peer(peer_id)?;
            }
        }
        Ok(())
    }

    fn on_message_sent(&mut self, message: Message) {
        let (Some(session), Some(peer_id)) = (self.session.as_ref(), self.conversation.peer()) else {
            return;
        };
        if !message.involves(session.user_id, peer_id) {
            debug!(message_id = message.id, "message for another conversation");
            return;
        }
        self.conversation.append_one(message);
        self.emit_conversation();
    }

    fn on_connection_lost(&mut self, reason: &str) -> SessionResult<()> {
        warn!(reason = %reason, "connection lost");

        match self.backoff.next_delay(&self.policy) {
            Some(delay) => {
                info!(
                    attempt = self.backoff.attempts(),
                    delay_ms = delay.as_millis() as u64,
                    "scheduling reconnect"
                );
                self.reconnect_delay = Some(delay);
                self.emit(CoordinatorEvent::ConnectivityLost {
                    message: CONNECTIVITY_MESSAGE.to_string(),
                    retrying: true,
                });
            }
            None => {
                warn!("reconnect attempts exhausted, clearing session");
                self.store.clear()?;
                self.session = None;
                self.emit(CoordinatorEvent::ConnectivityLost {
                    message: CONNECTIVITY_MESSAGE.to_string(),
                    retrying: false,
                });
                self.redirect(Some(CONNECTIVITY_MESSAGE.to_string()));
            }
        }
        Ok(())
    }

    fn emit_conversation(&mut self) {
        if let Some(peer_id) = self.conversation.peer() {
            self.emit(CoordinatorEvent::ConversationUpdated {
                peer_id,
                messages: self.conversation.messages().to_vec(),
            });
        }
    }

    fn redirect(&mut self, reason: Option<String>) {
        self.reconnect_delay = None;
        self.finished = true;
        self.emit(CoordinatorEvent::RedirectToLogin { reason });
    }

    fn emit(&mut self, event: CoordinatorEvent) {
        self.events.push_back(event);
    }
}
