//! Realtime transport for the chatline client.
//!
//! This crate provides:
//! - [`TransportChannel`], the connection state machine, free of IO
//! - [`WebSocketLink`], the tokio-tungstenite socket that feeds it
//! - [`ReconnectPolicy`], bounded exponential backoff between channels

mod channel;
mod error;
mod link;
mod reconnect;
mod state;

pub use channel::{ChannelEvent, TransportChannel};
pub use error::{TransportError, TransportResult};
pub use link::{LinkEvent, WebSocketLink};
pub use reconnect::{Backoff, ReconnectPolicy};
pub use state::ChannelState;
