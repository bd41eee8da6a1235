//! REST client for the chat backend.
//!
//! Covers login and registration, including the asynchronous variant where
//! the backend answers with a `uuid` and delivers the outcome on a pending
//! WebSocket, plus the bearer-authenticated user and message endpoints.

mod client;
mod error;
mod pending;

pub use client::{AuthOutcome, RestClient};
pub use error::{RestError, RestResult};
pub use pending::await_pending_result;
