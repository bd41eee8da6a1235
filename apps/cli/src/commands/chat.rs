//! Interactive chat.

use super::Context;
use anyhow::Result;
use chat_protocol::{Message, UserId};
use chat_session::{CoordinatorEvent, RuntimeHandle, SessionCoordinator, SessionRuntime, UserAction};
use chat_transport::ReconnectPolicy;
use std::collections::HashMap;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;

const HELP: &str =
    "Commands: /users [query], /refresh, /open <id>, /logout, /quit. Anything else is sent.";

/// One line typed at the prompt.
#[derive(Debug, PartialEq, Eq)]
enum Input {
    Users(String),
    Refresh,
    Open(UserId),
    Logout,
    Quit,
    Help,
    Send(String),
    Invalid(String),
    Empty,
}

fn parse_input(line: &str) -> Input {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Input::Empty;
    }
    if !trimmed.starts_with('/') {
        return Input::Send(line.to_string());
    }

    let (command, rest) = trimmed.split_once(' ').unwrap_or((trimmed, ""));
    let rest = rest.trim();
    match command {
        "/users" => Input::Users(rest.to_string()),
        "/refresh" => Input::Refresh,
        "/open" => match rest.parse::<UserId>() {
            Ok(id) => Input::Open(id),
            Err(_) => Input::Invalid(format!("'{}' is not a user id", rest)),
        },
        "/logout" => Input::Logout,
        "/quit" | "/exit" => Input::Quit,
        "/help" => Input::Help,
        other => Input::Invalid(format!("unknown command {}", other)),
    }
}

/// Turns coordinator events into printable lines.
struct ChatView {
    local_user_id: UserId,
    names: HashMap<UserId, String>,
    peer: Option<UserId>,
    shown: usize,
}

impl ChatView {
    fn new(local_user_id: UserId) -> Self {
        Self {
            local_user_id,
            names: HashMap::new(),
            peer: None,
            shown: 0,
        }
    }

    fn name(&self, user_id: UserId) -> String {
        if user_id == self.local_user_id {
            return "you".to_string();
        }
        self.names
            .get(&user_id)
            .cloned()
            .unwrap_or_else(|| format!("#{}", user_id))
    }

    fn render_message(&self, message: &Message) -> String {
        format!("{}: {}", self.name(message.sender_id), message.content)
    }

    fn on_event(&mut self, event: &CoordinatorEvent) -> Vec<String> {
        match event {
            CoordinatorEvent::Connected => vec!["Connected.".to_string()],
            CoordinatorEvent::DirectoryUpdated { users } => {
                for user in users {
                    self.names.insert(user.id, user.username.clone());
                }
                let mut lines = vec![format!("Users ({}):", users.len())];
                lines.extend(users.iter().map(|u| format!("  {:>6}  {}", u.id, u.username)));
                lines
            }
            CoordinatorEvent::PeerSelected { peer_id } => {
                self.peer = Some(*peer_id);
                self.shown = 0;
                vec![format!("--- conversation with {} ---", self.name(*peer_id))]
            }
            CoordinatorEvent::ConversationUpdated { peer_id, messages } => {
                if self.peer != Some(*peer_id) {
                    return Vec::new();
                }
                if messages.len() < self.shown {
                    self.shown = 0;
                }
                let lines = messages[self.shown..]
                    .iter()
                    .map(|m| self.render_message(m))
                    .collect();
                self.shown = messages.len();
                lines
            }
            CoordinatorEvent::InlineError { message } => vec![format!("Error: {}", message)],
            CoordinatorEvent::ConnectivityLost { message, retrying } => {
                if *retrying {
                    vec![format!("{}, reconnecting...", message)]
                } else {
                    vec![format!("{}.", message)]
                }
            }
            CoordinatorEvent::RedirectToLogin { reason } => {
                let mut lines = Vec::new();
                if let Some(reason) = reason {
                    lines.push(format!("Session ended: {}", reason));
                }
                lines.push("Run 'chatline login' to sign in.".to_string());
                lines
            }
        }
    }
}

/// Run the interactive chat until the user quits or the session ends.
pub async fn chat(ctx: &Context, peer: Option<UserId>) -> Result<()> {
    let store = ctx.session_store()?;
    let session = ctx.require_session(&store)?;
    if let Some(peer_id) = peer {
        store.set_selected_peer(peer_id)?;
    }

    let policy = ReconnectPolicy::from(&ctx.config.reconnect);
    let coordinator = SessionCoordinator::new(store, policy);
    let (runtime, handle) = SessionRuntime::new(coordinator, ctx.config.ws_url.clone());
    let mut events = handle.subscribe();
    let mut task = tokio::spawn(runtime.run());

    let mut view = ChatView::new(session.user_id);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    println!("Connecting to {} ...", ctx.config.ws_url);
    println!("{}", HELP);

    loop {
        tokio::select! {
            result = &mut task => {
                let coordinator = result??;
                // Print whatever the runtime published before stopping.
                while let Ok(event) = events.try_recv() {
                    print_lines(view.on_event(&event));
                }
                tracing::debug!(state = ?coordinator.channel_state(), "chat ended");
                return Ok(());
            }
            event = events.recv() => match event {
                Ok(event) => print_lines(view.on_event(&event)),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "chat view lagged behind events");
                }
                Err(RecvError::Closed) => {}
            },
            line = lines.next_line(), if stdin_open => {
                match line? {
                    Some(line) => handle_input(&handle, parse_input(&line)).await,
                    None => {
                        stdin_open = false;
                        handle.send(UserAction::Quit).await;
                    }
                }
            }
        }
    }
}

async fn handle_input(handle: &RuntimeHandle, input: Input) {
    let action = match input {
        Input::Users(query) => UserAction::SetFilter(query),
        Input::Refresh => UserAction::RefreshDirectory,
        Input::Open(peer_id) => UserAction::SelectPeer(peer_id),
        Input::Logout => UserAction::Logout,
        Input::Quit => UserAction::Quit,
        Input::Send(content) => UserAction::SendMessage(content),
        Input::Help => {
            println!("{}", HELP);
            return;
        }
        Input::Invalid(reason) => {
            eprintln!("Error: {}", reason);
            return;
        }
        Input::Empty => return,
    };
    handle.send(action).await;
}

fn print_lines(lines: Vec<String>) {
    for line in lines {
        println!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chat_protocol::User;

    fn message(id: u64, sender_id: UserId, receiver_id: UserId, content: &str) -> Message {
        Message {
            id,
            sender_id,
            receiver_id,
            content: content.to_string(),
        }
    }

    #[test]
    fn test_parse_input() {
        assert_eq!(parse_input("  "), Input::Empty);
        assert_eq!(parse_input("hello there"), Input::Send("hello there".to_string()));
        assert_eq!(parse_input("/users"), Input::Users(String::new()));
        assert_eq!(parse_input("/users  bo "), Input::Users("bo".to_string()));
        assert_eq!(parse_input("/refresh"), Input::Refresh);
        assert_eq!(parse_input("/open 42"), Input::Open(42));
        assert!(matches!(parse_input("/open bob"), Input::Invalid(_)));
        assert_eq!(parse_input("/quit"), Input::Quit);
        assert_eq!(parse_input("/logout"), Input::Logout);
        assert!(matches!(parse_input("/dance"), Input::Invalid(_)));
    }

    #[test]
    fn test_view_prints_only_new_messages() {
        let mut view = ChatView::new(1);
        view.on_event(&CoordinatorEvent::DirectoryUpdated {
            users: vec![User {
                id: 2,
                username: "bob".to_string(),
            }],
        });
        view.on_event(&CoordinatorEvent::PeerSelected { peer_id: 2 });

        let first = vec![message(10, 2, 1, "hi")];
        assert_eq!(
            view.on_event(&CoordinatorEvent::ConversationUpdated {
                peer_id: 2,
                messages: first.clone(),
            }),
            vec!["bob: hi".to_string()]
        );

        let mut second = first;
        second.push(message(11, 1, 2, "hey bob"));
        assert_eq!(
            view.on_event(&CoordinatorEvent::ConversationUpdated {
                peer_id: 2,
                messages: second,
            }),
            vec!["you: hey bob".to_string()]
        );
    }

    #[test]
    fn test_view_restarts_after_peer_switch() {
        let mut view = ChatView::new(1);
        view.on_event(&CoordinatorEvent::PeerSelected { peer_id: 2 });
        view.on_event(&CoordinatorEvent::ConversationUpdated {
            peer_id: 2,
            messages: vec![message(1, 2, 1, "a"), message(2, 2, 1, "b")],
        });

        view.on_event(&CoordinatorEvent::PeerSelected { peer_id: 3 });
        let lines = view.on_event(&CoordinatorEvent::ConversationUpdated {
            peer_id: 3,
            messages: vec![message(5, 3, 1, "c")],
        });
        assert_eq!(lines, vec!["#3: c".to_string()]);
    }

    #[test]
    fn test_view_redirect_mentions_login() {
        let mut view = ChatView::new(1);
        let lines = view.on_event(&CoordinatorEvent::RedirectToLogin {
            reason: Some("Invalid authentication token".to_string()),
        });
        assert_eq!(lines.len(), 2);
        assert!(lines[1].contains("chatline login"));
    }
}
