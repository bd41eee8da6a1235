//! End-to-end runs of the session runtime against a local WebSocket server.

use chat_session::{
    CoordinatorEvent, SessionCoordinator, SessionRuntime, UserAction,
};
use chat_transport::{ChannelState, ReconnectPolicy};
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use session_store::{create_session_store, MemoryStore, Session, SessionStore};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio_tungstenite::tungstenite::Message;

const GOOD_TOKEN: &str = "good-token";

/// Fake backend. With `drop_first`, the first connection is cut right after
/// authenticating.
async fn start_server(drop_first: bool) -> (String, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let connections = Arc::new(AtomicUsize::new(0));
    let counter = connections.clone();

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let index = counter.fetch_add(1, Ordering::SeqCst);
            let cut_after_auth = drop_first && index == 0;
            tokio::spawn(async move {
                let Ok(ws) = tokio_tungstenite::accept_async(stream).await else {
                    return;
                };
                serve(ws, cut_after_auth).await;
            });
        }
    });

    (format!("ws://{}/ws/auth", addr), connections)
}

async fn serve(
    mut ws: tokio_tungstenite::WebSocketStream<tokio::net::TcpStream>,
    cut_after_auth: bool,
) {
    while let Some(Ok(msg)) = ws.next().await {
        let Message::Text(text) = msg else { continue };
        let frame: Value = serde_json::from_str(&text).unwrap();
        let request_id = frame.get("request_id").cloned().unwrap_or(Value::Null);

        let reply = match frame["type"].as_str() {
            Some("auth") if frame["token"] == GOOD_TOKEN => {
                json!({"type": "auth", "success": true, "message": "Authenticated successfully"})
            }
            Some("auth") => {
                let reply = json!({"type": "error", "message": "Invalid authentication token"});
                let _ = ws.send(Message::Text(reply.to_string().into())).await;
                return;
            }
            Some("getUsers") => json!({
                "type": "get_users_response",
                "request_id": request_id,
                "data": {"users": [{"id": 1, "username": "a"}, {"id": 2, "username": "b"}]}
            }),
            Some("getMessages") => json!({
                "type": "get_messages_response",
                "request_id": request_id,
                "data": {"messages": [
                    {"id": 10, "sender_id": 2, "receiver_id": 1, "content": "hey"}
                ]}
            }),
            Some("sendMessage") => json!({
                "type": "send_message_response",
                "request_id": request_id,
                "data": {"message": {
                    "id": 11,
                    "sender_id": 1,
                    "receiver_id": frame["receiver_id"],
                    "content": frame["content"]
                }}
            }),
            _ => json!({"type": "error", "error": "Unknown message type"}),
        };

        if ws.send(Message::Text(reply.to_string().into())).await.is_err() {
            return;
        }
        if cut_after_auth && frame["type"] == "auth" {
            // Drop the socket without a close handshake.
            return;
        }
    }
}

fn session(token: &str) -> Session {
    Session {
        token: token.to_string(),
        user_id: 1,
        username: Some("a".to_string()),
        selected_peer_id: Some(2),
    }
}

fn fast_policy() -> ReconnectPolicy {
    ReconnectPolicy {
        base_delay: Duration::from_millis(20),
        max_delay: Duration::from_millis(100),
        max_attempts: 3,
    }
}

async fn wait_for(
    events: &mut broadcast::Receiver<CoordinatorEvent>,
    mut matches: impl FnMut(&CoordinatorEvent) -> bool,
) -> CoordinatorEvent {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let event = events.recv().await.unwrap();
            if matches(&event) {
                return event;
            }
        }
    })
    .await
    .expect("timed out waiting for event")
}

#[tokio::test]
async fn test_full_session_then_logout() {
    let (url, _) = start_server(false).await;
    let dir = tempfile::tempdir().unwrap();
    let session_path = dir.path().join("session.json");

    let store = create_session_store(&session_path).unwrap();
    store.save(&session(GOOD_TOKEN)).unwrap();

    let coordinator = SessionCoordinator::new(store, fast_policy());
    let (runtime, handle) = SessionRuntime::new(coordinator, url);
    let mut events = handle.subscribe();
    let task = tokio::spawn(runtime.run());

    wait_for(&mut events, |e| *e == CoordinatorEvent::Connected).await;

    let directory = wait_for(&mut events, |e| {
        matches!(e, CoordinatorEvent::DirectoryUpdated { .. })
    })
    .await;
    match directory {
        CoordinatorEvent::DirectoryUpdated { users } => {
            assert_eq!(users.len(), 1);
            assert_eq!(users[0].username, "b");
        }
        _ => unreachable!(),
    }

    wait_for(&mut events, |e| *e == CoordinatorEvent::PeerSelected { peer_id: 2 }).await;
    wait_for(&mut events, |e| {
        matches!(e, CoordinatorEvent::ConversationUpdated { messages, .. } if messages.len() == 1)
    })
    .await;

    assert!(handle.send(UserAction::SendMessage("hello".to_string())).await);
    let updated = wait_for(&mut events, |e| {
        matches!(e, CoordinatorEvent::ConversationUpdated { messages, .. } if messages.len() == 2)
    })
    .await;
    match updated {
        CoordinatorEvent::ConversationUpdated { peer_id, messages } => {
            assert_eq!(peer_id, 2);
            assert_eq!(messages[1].content, "hello");
        }
        _ => unreachable!(),
    }

    assert!(handle.send(UserAction::Logout).await);
    wait_for(&mut events, |e| {
        *e == CoordinatorEvent::RedirectToLogin { reason: None }
    })
    .await;

    let coordinator = task.await.unwrap().unwrap();
    assert_eq!(coordinator.channel_state(), ChannelState::Closed);

    let reopened = create_session_store(&session_path).unwrap();
    assert_eq!(reopened.load().unwrap(), None);
}

#[tokio::test]
async fn test_rejected_token_clears_session() {
    let (url, _) = start_server(false).await;
    let backing = MemoryStore::new();
    let store = SessionStore::new(Box::new(backing.clone()));
    store.save(&session("expired")).unwrap();

    let coordinator = SessionCoordinator::new(store, fast_policy());
    let (runtime, handle) = SessionRuntime::new(coordinator, url);
    let mut events = handle.subscribe();
    let task = tokio::spawn(runtime.run());

    let event = wait_for(&mut events, |e| {
        matches!(e, CoordinatorEvent::RedirectToLogin { .. })
    })
    .await;
    assert_eq!(
        event,
        CoordinatorEvent::RedirectToLogin {
            reason: Some("Invalid authentication token".to_string())
        }
    );

    let coordinator = task.await.unwrap().unwrap();
    assert_eq!(coordinator.channel_state(), ChannelState::Failed);
    assert!(backing.is_empty());
}

#[tokio::test]
async fn test_reconnects_after_dropped_socket() {
    let (url, connections) = start_server(true).await;
    let backing = MemoryStore::new();
    let store = SessionStore::new(Box::new(backing.clone()));
    store.save(&session(GOOD_TOKEN)).unwrap();

    let coordinator = SessionCoordinator::new(store, fast_policy());
    let (runtime, handle) = SessionRuntime::new(coordinator, url);
    let mut events = handle.subscribe();
    let task = tokio::spawn(runtime.run());

    wait_for(&mut events, |e| *e == CoordinatorEvent::Connected).await;
    wait_for(&mut events, |e| {
        matches!(e, CoordinatorEvent::ConnectivityLost { retrying: true, .. })
    })
    .await;
    wait_for(&mut events, |e| *e == CoordinatorEvent::Connected).await;
    wait_for(&mut events, |e| *e == CoordinatorEvent::PeerSelected { peer_id: 2 }).await;
    assert!(connections.load(Ordering::SeqCst) >= 2);

    assert!(handle.send(UserAction::Quit).await);
    let coordinator = task.await.unwrap().unwrap();
    assert_eq!(coordinator.channel_state(), ChannelState::Closed);
    assert!(!backing.is_empty());
}

#[tokio::test]
async fn test_no_session_redirects_without_connecting() {
    let (url, connections) = start_server(false).await;
    let store = SessionStore::new(Box::new(MemoryStore::new()));

    let coordinator = SessionCoordinator::new(store, fast_policy());
    let (runtime, handle) = SessionRuntime::new(coordinator, url);
    let mut events = handle.subscribe();

    let coordinator = runtime.run().await.unwrap();
    assert_eq!(coordinator.channel_state(), ChannelState::Disconnected);
    assert_eq!(
        events.recv().await.unwrap(),
        CoordinatorEvent::RedirectToLogin { reason: None }
    );
    assert_eq!(connections.load(Ordering::SeqCst), 0);
}
