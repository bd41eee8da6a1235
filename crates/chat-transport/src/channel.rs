//! Channel state machine.

use crate::{ChannelState, LinkEvent, TransportError, TransportResult};
use chat_protocol::{InboundFrame, Message, OutboundFrame, Request, RequestId, User};
use std::collections::VecDeque;
use tracing::{debug, info, warn};

/// What the channel reports to its owner after consuming a link event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// The backend accepted the token.
    Authenticated,
    /// The backend refused the token or answered the handshake with garbage.
    AuthRejected { reason: String },
    /// Directory listing.
    Directory {
        users: Vec<User>,
        request_id: Option<RequestId>,
    },
    /// Conversation history batch.
    Messages {
        messages: Vec<Message>,
        request_id: Option<RequestId>,
    },
    /// A message accepted by the backend.
    MessageSent {
        message: Message,
        request_id: Option<RequestId>,
    },
    /// Application error; the session stays usable.
    RequestError {
        message: String,
        request_id: Option<RequestId>,
    },
    /// Transport error.
    Failed { reason: String },
    /// Remote or local close.
    Closed { reason: Option<String> },
}

/// One logical realtime connection.
///
/// The channel performs no IO. Its owner feeds it [`LinkEvent`]s and ships
/// the frames returned by [`TransportChannel::drain_outbound`].
#[derive(Debug)]
pub struct TransportChannel {
    state: ChannelState,
    token: Option<String>,
    outbox: VecDeque<OutboundFrame>,
}

impl Default for TransportChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl TransportChannel {
    pub fn new() -> Self {
        Self {
            state: ChannelState::Disconnected,
            token: None,
            outbox: VecDeque::new(),
        }
    }

    pub fn state(&self) -> ChannelState {
        self.state
    }

    pub fn is_authenticated(&self) -> bool {
        self.state == ChannelState::Authenticated
    }

    /// Start connecting with `token`.
    ///
    /// Fails fast with [`TransportError::MissingToken`] when there is no
    /// token, leaving the channel `Disconnected`. Only a fresh channel can
    /// be opened.
    pub fn open(&mut self, token: Option<&str>) -> TransportResult<()> {
        if self.state != ChannelState::Disconnected {
            return Err(TransportError::InvalidState {
                state: self.state,
                operation: "open",
            });
        }

        let token = token
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(TransportError::MissingToken)?;

        self.token = Some(token.to_string());
        self.state = ChannelState::Connecting;
        debug!("channel connecting");
        Ok(())
    }

    /// Consume one event from the socket.
    pub fn handle(&mut self, event: LinkEvent) -> Option<ChannelEvent> {
        match event {
            LinkEvent::Opened => {
                self.on_open();
                None
            }
            LinkEvent::Frame(text) => self.on_frame(&text),
            LinkEvent::Error(reason) => self.on_error(reason),
            LinkEvent::Closed(reason) => self.on_remote_close(reason),
        }
    }

    /// Queue `request` for sending.
    ///
    /// Outside `Authenticated` the request is dropped without a frame and
    /// `None` is returned.
    pub fn send(&mut self, request: Request) -> Option<RequestId> {
        if self.state != ChannelState::Authenticated {
            debug!(state = ?self.state, request = request.kind(), "dropping request, channel not authenticated");
            return None;
        }

        let request_id = RequestId::new();
        debug!(request = request.kind(), request_id = %request_id, "queueing request");
        self.outbox
            .push_back(OutboundFrame::request(request, request_id));
        Some(request_id)
    }

    /// Close the channel locally. Pending frames are discarded.
    ///
    /// Returns false when the channel was already terminal.
    pub fn close(&mut self) -> bool {
        self.outbox.clear();
        if self.state.is_terminal() {
            return false;
        }
        info!(from = ?self.state, "channel closed locally");
        self.state = ChannelState::Closed;
        true
    }

    /// Take every frame queued since the last call.
    pub fn drain_outbound(&mut self) -> Vec<OutboundFrame> {
        self.outbox.drain(..).collect()
    }

    fn on_open(&mut self) {
        if self.state != ChannelState::Connecting {
            warn!(state = ?self.state, "socket opened in unexpected state");
            return;
        }

        // Connecting always carries a token, see `open`.
        if let Some(token) = self.token.as_deref() {
            self.outbox.push_back(OutboundFrame::auth(token));
        }
        self.state = ChannelState::AwaitingAuth;
        debug!("socket open, auth frame queued");
    }

    fn on_frame(&mut self, text: &str) -> Option<ChannelEvent> {
        match self.state {
            ChannelState::AwaitingAuth => self.on_handshake_frame(text),
            ChannelState::Authenticated => self.on_session_frame(text),
            state => {
                debug!(state = ?state, "ignoring frame outside an open session");
                None
            }
        }
    }

    fn on_handshake_frame(&mut self, text: &str) -> Option<ChannelEvent> {
        let frame = match InboundFrame::parse(text) {
            Ok(frame) => frame,
            Err(e) => {
                return Some(self.reject(format!("malformed auth response: {}", e)));
            }
        };

        match frame {
            InboundFrame::Auth { success: true, .. } => {
                self.state = ChannelState::Authenticated;
                info!("channel authenticated");
                Some(ChannelEvent::Authenticated)
            }
            InboundFrame::Auth { message, .. } => Some(
                self.reject(message.unwrap_or_else(|| "Authentication failed".to_string())),
            ),
            InboundFrame::Error { message, .. } => Some(self.reject(message)),
            InboundFrame::Unknown { kind } => {
                debug!(kind = %kind, "ignoring unknown frame during handshake");
                None
            }
            other => {
                warn!(kind = other.kind(), "unexpected frame before authentication");
                None
            }
        }
    }

    fn on_session_frame(&mut self, text: &str) -> Option<ChannelEvent> {
        let frame = match InboundFrame::parse(text) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, "ignoring malformed frame");
                return None;
            }
        };

        match frame {
            InboundFrame::Directory { users, request_id } => {
                Some(ChannelEvent::Directory { users, request_id })
            }
            InboundFrame::Messages {
                messages,
                request_id,
            } => Some(ChannelEvent::Messages {
                messages,
                request_id,
            }),
            InboundFrame::MessageSent {
                message,
                request_id,
            } => Some(ChannelEvent::MessageSent {
                message,
                request_id,
            }),
            InboundFrame::Error {
                message,
                request_id,
            } => {
                warn!(error = %message, "backend error");
                Some(ChannelEvent::RequestError {
                    message,
                    request_id,
                })
            }
            InboundFrame::Auth { .. } => {
                debug!("ignoring repeated auth frame");
                None
            }
            InboundFrame::Unknown { kind } => {
                debug!(kind = %kind, "ignoring unknown frame type");
                None
            }
        }
    }

    fn on_error(&mut self, reason: String) -> Option<ChannelEvent> {
        if !self.state.can_fail() {
            debug!(state = ?self.state, error = %reason, "ignoring transport error");
            return None;
        }
        warn!(from = ?self.state, error = %reason, "channel failed");
        self.state = ChannelState::Failed;
        self.outbox.clear();
        Some(ChannelEvent::Failed { reason })
    }

    fn on_remote_close(&mut self, reason: Option<String>) -> Option<ChannelEvent> {
        if self.state.is_terminal() {
            return None;
        }
        info!(from = ?self.state, reason = ?reason, "channel closed by remote");
        self.state = ChannelState::Closed;
        self.outbox.clear();
        Some(ChannelEvent::Closed { reason })
    }

    fn reject(&mut self, reason: String) -> ChannelEvent {
        warn!(reason = %reason, "authentication rejected");
        self.state = ChannelState::Failed;
        self.outbox.clear();
        ChannelEvent::AuthRejected { reason }
    }
}
