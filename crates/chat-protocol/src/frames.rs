//! Realtime channel frames.

use crate::{Message, ProtocolError, ProtocolResult, User, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Client-generated correlation id attached to outbound requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Requests the client can issue once authenticated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    GetDirectory,
    GetMessages { peer_id: UserId },
    SendMessage { peer_id: UserId, content: String },
}

impl Request {
    /// Short name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Request::GetDirectory => "get_directory",
            Request::GetMessages { .. } => "get_messages",
            Request::SendMessage { .. } => "send_message",
        }
    }
}

/// Frames sent to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum OutboundFrame {
    #[serde(rename = "auth")]
    Auth { token: String },

    #[serde(rename = "getUsers")]
    GetUsers {
        #[serde(skip_serializing_if = "Option::is_none")]
        request_id: Option<RequestId>,
    },

    #[serde(rename = "getMessages")]
    GetMessages {
        receiver_id: UserId,
        #[serde(skip_serializing_if = "Option::is_none")]
        request_id: Option<RequestId>,
    },

    #[serde(rename = "sendMessage")]
    SendMessage {
        content: String,
        receiver_id: UserId,
        #[serde(skip_serializing_if = "Option::is_none")]
        request_id: Option<RequestId>,
    },
}

impl OutboundFrame {
    /// Create the auth frame that opens every session.
    pub fn auth(token: &str) -> Self {
        OutboundFrame::Auth {
            token: token.to_string(),
        }
    }

    /// Build the frame for `request`, tagged with `request_id`.
    pub fn request(request: Request, request_id: RequestId) -> Self {
        let request_id = Some(request_id);
        match request {
            Request::GetDirectory => OutboundFrame::GetUsers { request_id },
            Request::GetMessages { peer_id } => OutboundFrame::GetMessages {
                receiver_id: peer_id,
                request_id,
            },
            Request::SendMessage { peer_id, content } => OutboundFrame::SendMessage {
                content,
                receiver_id: peer_id,
                request_id,
            },
        }
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Frames received from the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundFrame {
    /// Outcome of the auth handshake.
    Auth {
        success: bool,
        token: Option<String>,
        message: Option<String>,
    },
    /// `get_users_response`
    Directory {
        users: Vec<User>,
        request_id: Option<RequestId>,
    },
    /// `get_messages_response`
    Messages {
        messages: Vec<Message>,
        request_id: Option<RequestId>,
    },
    /// `send_message_response`
    MessageSent {
        message: Message,
        request_id: Option<RequestId>,
    },
    /// Unsolicited or request-level error.
    Error {
        message: String,
        request_id: Option<RequestId>,
    },
    /// A `type` this client does not know.
    Unknown { kind: String },
}

#[derive(Deserialize)]
struct UsersData {
    #[serde(default)]
    users: Option<Vec<User>>,
}

#[derive(Deserialize)]
struct MessagesData {
    #[serde(default)]
    messages: Option<Vec<Message>>,
}

#[derive(Deserialize)]
struct MessageData {
    message: Message,
}

impl InboundFrame {
    /// Wire name of this frame's type.
    pub fn kind(&self) -> &str {
        match self {
            InboundFrame::Auth { .. } => "auth",
            InboundFrame::Directory { .. } => "get_users_response",
            InboundFrame::Messages { .. } => "get_messages_response",
            InboundFrame::MessageSent { .. } => "send_message_response",
            InboundFrame::Error { .. } => "error",
            InboundFrame::Unknown { kind } => kind,
        }
    }

    /// Decode one text frame.
    ///
    /// Only `type` is read before dispatch, so unknown types decode to
    /// [`InboundFrame::Unknown`] whatever else they carry. Frames that are
    /// not JSON objects, lack a type, or carry a broken payload for a known
    /// type are errors. A `null` user or message list is empty, and an
    /// echoed `request_id` that is not a UUID reads as absent.
    pub fn parse(text: &str) -> ProtocolResult<Self> {
        let value: serde_json::Value = serde_json::from_str(text)?;
        let serde_json::Value::Object(mut fields) = value else {
            return Err(ProtocolError::MissingType);
        };
        let kind = match fields.get("type").and_then(|v| v.as_str()) {
            Some(kind) => kind.to_string(),
            None => return Err(ProtocolError::MissingType),
        };
        let request_id = fields
            .get("request_id")
            .and_then(|v| v.as_str())
            .and_then(|s| Uuid::parse_str(s).ok())
            .map(RequestId);

        let frame = match kind.as_str() {
            "auth" => InboundFrame::Auth {
                success: fields
                    .get("success")
                    .and_then(|v| v.as_bool())
                    .unwrap_or(false),
                token: text_field(&fields, "token"),
                message: text_field(&fields, "message").or_else(|| text_field(&fields, "error")),
            },
            "get_users_response" => {
                let data: UsersData = decode_data(&kind, fields.remove("data"))?;
                InboundFrame::Directory {
                    users: data.users.unwrap_or_default(),
                    request_id,
                }
            }
            "get_messages_response" => {
                let data: MessagesData = decode_data(&kind, fields.remove("data"))?;
                InboundFrame::Messages {
                    messages: data.messages.unwrap_or_default(),
                    request_id,
                }
            }
            "send_message_response" => {
                let data: MessageData = decode_data(&kind, fields.remove("data"))?;
                InboundFrame::MessageSent {
                    message: data.message,
                    request_id,
                }
            }
            "error" => InboundFrame::Error {
                message: text_field(&fields, "message")
                    .or_else(|| text_field(&fields, "error"))
                    .unwrap_or_else(|| "Unknown error".to_string()),
                request_id,
            },
            _ => InboundFrame::Unknown { kind },
        };

        Ok(frame)
    }
}

fn text_field(fields: &serde_json::Map<String, serde_json::Value>, key: &str) -> Option<String> {
    fields.get(key).and_then(|v| v.as_str()).map(str::to_string)
}

fn decode_data<T: serde::de::DeserializeOwned>(
    kind: &str,
    data: Option<serde_json::Value>,
) -> ProtocolResult<T> {
    let data = data.ok_or_else(|| ProtocolError::Malformed {
        kind: kind.to_string(),
        reason: "missing data".to_string(),
    })?;
    serde_json::from_value(data).map_err(|e| ProtocolError::Malformed {
        kind: kind.to_string(),
        reason: e.to_string(),
    })
}

/// Single frame delivered on a pending login or registration socket.
///
/// These frames carry no `type`; `success` decides the outcome and `token`
/// is present for successful logins.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PendingAuthResult {
    #[serde(default)]
    pub uuid: Option<String>,
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
}

impl PendingAuthResult {
    pub fn parse(text: &str) -> ProtocolResult<Self> {
        Ok(serde_json::from_str(text)?)
    }
}
