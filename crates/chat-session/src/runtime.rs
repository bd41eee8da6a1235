//! Async driver for a [`SessionCoordinator`].

use crate::{CoordinatorEvent, SessionCoordinator, SessionResult, StartOutcome};
use chat_protocol::UserId;
use chat_transport::{LinkEvent, WebSocketLink};
use tokio::sync::{broadcast, mpsc};
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Input from the front end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserAction {
    SelectPeer(UserId),
    SendMessage(String),
    SetFilter(String),
    RefreshDirectory,
    Logout,
    /// Leave the chat view, keeping the session.
    Quit,
}

/// Front-end side of a running session.
#[derive(Clone)]
pub struct RuntimeHandle {
    actions: mpsc::Sender<UserAction>,
    events: broadcast::Sender<CoordinatorEvent>,
}

impl RuntimeHandle {
    /// Subscribe to coordinator events. Subscribe before `run` starts to
    /// see the startup events.
    pub fn subscribe(&self) -> broadcast::Receiver<CoordinatorEvent> {
        self.events.subscribe()
    }

    /// Returns false once the runtime has stopped.
    pub async fn send(&self, action: UserAction) -> bool {
        self.actions.send(action).await.is_ok()
    }
}

/// Runs one coordinator against a WebSocket with reconnects.
pub struct SessionRuntime {
    coordinator: SessionCoordinator,
    ws_url: String,
    actions: mpsc::Receiver<UserAction>,
    events: broadcast::Sender<CoordinatorEvent>,
}

impl SessionRuntime {
    pub fn new(coordinator: SessionCoordinator, ws_url: impl Into<String>) -> (Self, RuntimeHandle) {
        let (action_tx, action_rx) = mpsc::channel(32);
        let (event_tx, _) = broadcast::channel(100);

        let runtime = Self {
            coordinator,
            ws_url: ws_url.into(),
            actions: action_rx,
            events: event_tx.clone(),
        };
        let handle = RuntimeHandle {
            actions: action_tx,
            events: event_tx,
        };
        (runtime, handle)
    }

    /// Drive the session until logout, quit or redirect.
    ///
    /// Returns the coordinator so callers can inspect the final state.
    pub async fn run(mut self) -> SessionResult<SessionCoordinator> {
        let mut link = match self.coordinator.start()? {
            StartOutcome::Connecting => Some(WebSocketLink::spawn(&self.ws_url)),
            StartOutcome::Redirected => None,
        };
        let mut reconnect_at: Option<Instant> = None;

        loop {
            self.flush(link.as_ref()).await;

            if self.coordinator.is_finished() {
                if let Some(link) = link.take() {
                    link.close().await;
                }
                info!("session runtime stopped");
                return Ok(self.coordinator);
            }

            if let Some(delay) = self.coordinator.take_reconnect() {
                // The failed link is dropped; its tasks are aborted.
                link = None;
                reconnect_at = Some(Instant::now() + delay);
            }

            tokio::select! {
                event = next_link_event(&mut link) => {
                    match event {
                        Some(event) => self.coordinator.handle_link_event(event)?,
                        None => {
                            link = None;
                            self.coordinator.handle_link_event(LinkEvent::Closed(None))?;
                        }
                    }
                }
                _ = sleep_until(reconnect_at), if reconnect_at.is_some() => {
                    reconnect_at = None;
                    if self.coordinator.reconnect()? == StartOutcome::Connecting {
                        link = Some(WebSocketLink::spawn(&self.ws_url));
                    }
                }
                action = self.actions.recv() => {
                    match action {
                        Some(action) => self.apply(action)?,
                        None => {
                            debug!("all handles dropped");
                            self.coordinator.unmount();
                        }
                    }
                }
            }
        }
    }

    fn apply(&mut self, action: UserAction) -> SessionResult<()> {
        debug!(action = ?action, "user action");
        match action {
            UserAction::SelectPeer(peer_id) => {
                self.coordinator.select_peer(peer_id)?;
            }
            UserAction::SendMessage(content) => {
                self.coordinator.send_message(&content);
            }
            UserAction::SetFilter(query) => self.coordinator.set_filter(&query),
            UserAction::RefreshDirectory => {
                self.coordinator.refresh_directory();
            }
            UserAction::Logout => self.coordinator.logout()?,
            UserAction::Quit => self.coordinator.unmount(),
        }
        Ok(())
    }

    async fn flush(&mut self, link: Option<&WebSocketLink>) {
        for frame in self.coordinator.drain_outbound() {
            match link {
                Some(link) => {
                    if let Err(e) = link.send(&frame).await {
                        warn!(error = %e, "failed to queue frame");
                    }
                }
                None => debug!("no socket, dropping frame"),
            }
        }

        for event in self.coordinator.drain_events() {
            // No subscribers is fine.
            let _ = self.events.send(event);
        }
    }
}

async fn next_link_event(link: &mut Option<WebSocketLink>) -> Option<LinkEvent> {
    match link {
        Some(link) => link.next_event().await,
        None => std::future::pending().await,
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
