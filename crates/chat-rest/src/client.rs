//! HTTP client for the chat backend's REST API.

use crate::{await_pending_result, RestError, RestResult};
use chat_config_and_utils::Config;
use chat_protocol::{Message, User, UserId};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// How long a pending login or registration may take.
const PENDING_TIMEOUT: Duration = Duration::from_secs(30);

/// REST client for login, registration, users and messages.
#[derive(Clone)]
pub struct RestClient {
    http_client: reqwest::Client,
    api_url: String,
    ws_base: Url,
}

/// Final outcome of a login or registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthOutcome {
    /// Bearer token. Registration usually yields none.
    pub token: Option<String>,
    /// Backend message, if any.
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
struct Credentials<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct SendMessageBody<'a> {
    content: &'a str,
    receiver_id: UserId,
}

/// Body of `/login` and `/register` answers: either a token, or a uuid
/// naming the pending socket that will carry the result.
#[derive(Debug, Deserialize)]
struct AuthAccepted {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    uuid: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl RestClient {
    /// Create a new REST client.
    ///
    /// # Arguments
    /// * `api_url` - REST base URL (e.g., `http://localhost:8080/api`)
    /// * `ws_base` - Base of pending sockets (e.g., `ws://localhost:8080/ws`)
    pub fn new(api_url: impl Into<String>, ws_base: Url) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            api_url: api_url.into(),
            ws_base,
        }
    }

    pub fn from_config(config: &Config) -> RestResult<Self> {
        Ok(Self::new(config.api_url.clone(), config.ws_base_url()?))
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_url.trim_end_matches('/'), path)
    }

    /// Log in with username and password.
    ///
    /// A successful outcome always carries a token.
    pub async fn login(&self, username: &str, password: &str) -> RestResult<AuthOutcome> {
        let outcome = self.submit_credentials("login", username, password).await?;
        if outcome.token.is_none() {
            return Err(RestError::AuthFailed(
                "Login succeeded without a token".to_string(),
            ));
        }
        tracing::info!(username = %username, "login succeeded");
        Ok(outcome)
    }

    /// Register a new account.
    pub async fn register(&self, username: &str, password: &str) -> RestResult<AuthOutcome> {
        let outcome = self
            .submit_credentials("register", username, password)
            .await?;
        tracing::info!(username = %username, "registration succeeded");
        Ok(outcome)
    }

    async fn submit_credentials(
        &self,
        path: &str,
        username: &str,
        password: &str,
    ) -> RestResult<AuthOutcome> {
        let url = self.endpoint(path);
        tracing::debug!(url = %url, "submitting credentials");

        let response = self
            .http_client
            .post(&url)
            .json(&Credentials { username, password })
            .send()
            .await?;

        // A 401 here is bad credentials, not an expired session.
        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            let message = error_message(response).await;
            return Err(RestError::AuthFailed(message));
        }

        let response = check_status(response, path).await?;
        let accepted: AuthAccepted = response.json().await?;

        if let Some(token) = accepted.token {
            return Ok(AuthOutcome {
                token: Some(token),
                message: accepted.message,
            });
        }

        let Some(uuid) = accepted.uuid else {
            return Ok(AuthOutcome {
                token: None,
                message: accepted.message,
            });
        };

        tracing::debug!(uuid = %uuid, "request accepted, awaiting result");
        let result = await_pending_result(&self.ws_base, &uuid, PENDING_TIMEOUT).await?;

        if !result.success {
            let message = result
                .message
                .unwrap_or_else(|| format!("{} failed", path));
            tracing::warn!(path = %path, error = %message, "credentials rejected");
            return Err(RestError::AuthFailed(message));
        }

        Ok(AuthOutcome {
            token: result.token.filter(|t| !t.is_empty()),
            message: result.message,
        })
    }

    /// Fetch the user owning `token`. Doubles as token validation.
    pub async fn users_self(&self, token: &str) -> RestResult<User> {
        self.get_json("users/self", token).await
    }

    /// Fetch every registered user.
    pub async fn users(&self, token: &str) -> RestResult<Vec<User>> {
        let users: Option<Vec<User>> = self.get_json("users", token).await?;
        Ok(users.unwrap_or_default())
    }

    /// Fetch the conversation with `peer_id`.
    pub async fn messages(&self, token: &str, peer_id: UserId) -> RestResult<Vec<Message>> {
        let messages: Option<Vec<Message>> = self
            .get_json(&format!("messages/{}", peer_id), token)
            .await?;
        Ok(messages.unwrap_or_default())
    }

    /// Send `content` to `peer_id`.
    pub async fn send_message(
        &self,
        token: &str,
        peer_id: UserId,
        content: &str,
    ) -> RestResult<Message> {
        let path = format!("messages/{}", peer_id);
        let response = self
            .http_client
            .post(self.endpoint(&path))
            .bearer_auth(token)
            .json(&SendMessageBody {
                content,
                receiver_id: peer_id,
            })
            .send()
            .await?;

        let response = check_status(response, &path).await?;
        Ok(response.json().await?)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        token: &str,
    ) -> RestResult<T> {
        let url = self.endpoint(path);
        tracing::debug!(url = %url, "GET");

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(token)
            .header("Accept", "application/json")
            .send()
            .await?;

        let response = check_status(response, path).await?;
        Ok(response.json().await?)
    }
}

async fn check_status(response: reqwest::Response, path: &str) -> RestResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if status == reqwest::StatusCode::UNAUTHORIZED {
        tracing::warn!(path = %path, "token rejected");
        return Err(RestError::Unauthorized);
    }

    let message = error_message(response).await;
    tracing::error!(status = %status, path = %path, error = %message, "request failed");
    Err(RestError::Status {
        status: status.as_u16(),
        message,
    })
}

async fn error_message(response: reqwest::Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    parse_error_body(&body).unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("Request failed")
            .to_string()
    })
}

fn parse_error_body(body: &str) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    parsed.error.or(parsed.message).filter(|m| !m.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Serve one canned HTTP response and hand back the raw request.
    async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let request = read_request(&mut stream).await;
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            stream.shutdown().await.unwrap();
            request
        });

        (format!("http://{}/api", addr), handle)
    }

    async fn read_request(stream: &mut tokio::net::TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = stream.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);

            let text = String::from_utf8_lossy(&buf);
            if let Some(end) = text.find("\r\n\r\n") {
                let length = text[..end]
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if buf.len() >= end + 4 + length {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    }

    fn client(api_url: String) -> RestClient {
        RestClient::new(api_url, Url::parse("ws://127.0.0.1:1/ws").unwrap())
    }

    #[test]
    fn test_endpoint_joins_paths() {
        let rest = client("http://localhost:8080/api/".to_string());
        assert_eq!(rest.endpoint("users/self"), "http://localhost:8080/api/users/self");
    }

    #[test]
    fn test_from_config_derives_ws_base() {
        let rest = RestClient::from_config(&Config::default()).unwrap();
        assert_eq!(rest.ws_base.as_str(), "ws://localhost:8080/ws");
        assert_eq!(rest.endpoint("login"), "http://localhost:8080/api/login");
    }

    #[test]
    fn test_parse_error_body() {
        assert_eq!(
            parse_error_body(r#"{"error":"Username is required"}"#),
            Some("Username is required".to_string())
        );
        assert_eq!(
            parse_error_body(r#"{"message":"nope"}"#),
            Some("nope".to_string())
        );
        assert_eq!(parse_error_body("<html>"), None);
    }

    #[tokio::test]
    async fn test_users_self_sends_bearer_token() {
        let (url, server) = serve_once("200 OK", r#"{"id":3,"username":"carol"}"#).await;

        let user = client(url).users_self("jwt-abc").await.unwrap();
        assert_eq!(user, User { id: 3, username: "carol".to_string() });

        let request = server.await.unwrap();
        assert!(request.starts_with("GET /api/users/self "));
        assert!(request.to_lowercase().contains("authorization: bearer jwt-abc"));
    }

    #[tokio::test]
    async fn test_unauthorized_maps_to_variant() {
        let (url, _server) = serve_once("401 Unauthorized", r#"{"error":"invalid token"}"#).await;
        let err = client(url).users("stale").await.unwrap_err();
        assert!(matches!(err, RestError::Unauthorized));
    }

    #[tokio::test]
    async fn test_status_error_carries_backend_message() {
        let (url, _server) =
            serve_once("500 Internal Server Error", r#"{"error":"Failed to fetch users"}"#).await;
        match client(url).users("tok").await.unwrap_err() {
            RestError::Status { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "Failed to fetch users");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_null_message_list_is_empty() {
        let (url, _server) = serve_once("200 OK", "null").await;
        let messages = client(url).messages("tok", 2).await.unwrap();
        assert!(messages.is_empty());
    }

    #[tokio::test]
    async fn test_send_message_posts_body() {
        let (url, server) = serve_once(
            "200 OK",
            r#"{"id":9,"sender_id":1,"receiver_id":2,"content":"hello"}"#,
        )
        .await;

        let message = client(url).send_message("tok", 2, "hello").await.unwrap();
        assert_eq!(message.id, 9);

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /api/messages/2 "));
        assert!(request.contains(r#""receiver_id":2"#));
        assert!(request.contains(r#""content":"hello""#));
    }

    #[tokio::test]
    async fn test_login_with_direct_token() {
        let (url, server) = serve_once("200 OK", r#"{"token":"jwt"}"#).await;

        let outcome = client(url).login("alice", "secret1").await.unwrap();
        assert_eq!(outcome.token.as_deref(), Some("jwt"));

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /api/login "));
        assert!(request.contains(r#""username":"alice""#));
    }

    #[tokio::test]
    async fn test_login_rejected_with_bad_request() {
        let (url, _server) = serve_once(
            "400 Bad Request",
            r#"{"error":"Password must be at least 6 characters long"}"#,
        )
        .await;
        match client(url).login("alice", "x").await.unwrap_err() {
            RestError::Status { status, message } => {
                assert_eq!(status, 400);
                assert!(message.starts_with("Password"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_login_via_pending_socket() {
        use futures_util::{SinkExt, StreamExt};
        use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
        use tokio_tungstenite::tungstenite::Message as WsMessage;

        let ws_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let ws_addr = ws_listener.local_addr().unwrap();
        let ws_server = tokio::spawn(async move {
            let (stream, _) = ws_listener.accept().await.unwrap();
            let mut path = String::new();
            let callback = |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
                path = req.uri().path().to_string();
                Ok(resp)
            };
            let mut ws = tokio_tungstenite::accept_hdr_async(stream, callback)
                .await
                .unwrap();
            ws.send(WsMessage::Text(
                r#"{"uuid":"u-42","success":true,"message":"Login successful","token":"jwt-42"}"#
                    .to_string()
                    .into(),
            ))
            .await
            .unwrap();
            let _ = ws.next().await;
            path
        });

        let (url, _server) = serve_once(
            "202 Accepted",
            r#"{"uuid":"u-42","message":"Login request received."}"#,
        )
        .await;
        let rest = RestClient::new(url, Url::parse(&format!("ws://{}/ws", ws_addr)).unwrap());

        let outcome = rest.login("alice", "secret1").await.unwrap();
        assert_eq!(outcome.token.as_deref(), Some("jwt-42"));
        assert_eq!(ws_server.await.unwrap(), "/ws/u-42");
    }
}
