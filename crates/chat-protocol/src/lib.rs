//! Wire types shared by the realtime channel, the REST client and the caches.
//!
//! Frames are JSON text with a `type` discriminator. Outbound requests may
//! carry a `request_id`; backends that echo it get exact response
//! correlation, the rest fall back to matching by `type`.

mod error;
mod frames;
mod models;

pub use error::{ProtocolError, ProtocolResult};
pub use frames::{InboundFrame, OutboundFrame, PendingAuthResult, Request, RequestId};
pub use models::{Message, User, UserId};
