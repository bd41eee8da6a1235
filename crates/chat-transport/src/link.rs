//! WebSocket link.

use crate::{TransportError, TransportResult};
use chat_protocol::OutboundFrame;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

/// Raw socket events, fed into a [`crate::TransportChannel`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    Opened,
    Frame(String),
    Error(String),
    Closed(Option<String>),
}

/// One WebSocket connection driven by background tasks.
///
/// The link never reconnects; a dropped socket ends with a single
/// `Closed` or `Error` event and the link is discarded.
pub struct WebSocketLink {
    sender: mpsc::Sender<Message>,
    events: mpsc::Receiver<LinkEvent>,
    task: JoinHandle<()>,
}

impl WebSocketLink {
    /// Start connecting to `url`. The first event is `Opened` or `Error`.
    pub fn spawn(url: &str) -> Self {
        let (msg_tx, msg_rx) = mpsc::channel::<Message>(100);
        let (event_tx, event_rx) = mpsc::channel::<LinkEvent>(100);

        let task = tokio::spawn(run(url.to_string(), msg_tx.clone(), msg_rx, event_tx));

        Self {
            sender: msg_tx,
            events: event_rx,
            task,
        }
    }

    /// Queue a frame for the writer task.
    pub async fn send(&self, frame: &OutboundFrame) -> TransportResult<()> {
        let json = frame.to_json()?;
        self.sender
            .send(Message::Text(json.into()))
            .await
            .map_err(|_| TransportError::NotConnected)
    }

    /// Next socket event; `None` once the socket tasks have finished.
    pub async fn next_event(&mut self) -> Option<LinkEvent> {
        self.events.recv().await
    }

    /// Send a close frame. Errors are ignored, the socket may be gone.
    pub async fn close(&self) {
        let _ = self.sender.send(Message::Close(None)).await;
    }
}

impl Drop for WebSocketLink {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run(
    url: String,
    msg_tx: mpsc::Sender<Message>,
    mut msg_rx: mpsc::Receiver<Message>,
    event_tx: mpsc::Sender<LinkEvent>,
) {
    info!(url = %url, "Connecting to chat server");

    let ws_stream = match connect_async(url.as_str()).await {
        Ok((ws_stream, _)) => ws_stream,
        Err(e) => {
            warn!(error = %e, "WebSocket connect failed");
            let _ = event_tx.send(LinkEvent::Error(e.to_string())).await;
            return;
        }
    };
    let (mut write, mut read) = ws_stream.split();

    if event_tx.send(LinkEvent::Opened).await.is_err() {
        return;
    }

    let writer = tokio::spawn(async move {
        while let Some(msg) = msg_rx.recv().await {
            let closing = matches!(msg, Message::Close(_));
            if let Err(e) = write.send(msg).await {
                debug!(error = %e, "WebSocket write failed");
                break;
            }
            if closing {
                break;
            }
        }
    });

    let last = loop {
        match read.next().await {
            Some(Ok(Message::Text(text))) => {
                if event_tx.send(LinkEvent::Frame(text.to_string())).await.is_err() {
                    break None;
                }
            }
            Some(Ok(Message::Ping(data))) => {
                let _ = msg_tx.send(Message::Pong(data)).await;
            }
            Some(Ok(Message::Close(frame))) => {
                let reason = frame
                    .map(|f| f.reason.to_string())
                    .filter(|r| !r.is_empty());
                info!(reason = ?reason, "WebSocket closed by server");
                break Some(LinkEvent::Closed(reason));
            }
            Some(Ok(_)) => {}
            Some(Err(e)) => {
                error!(error = %e, "WebSocket error");
                break Some(LinkEvent::Error(e.to_string()));
            }
            None => break Some(LinkEvent::Closed(None)),
        }
    };

    writer.abort();
    if let Some(event) = last {
        let _ = event_tx.send(event).await;
    }
}
