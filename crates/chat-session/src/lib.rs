//! Session coordination for the chatline client.
//!
//! This crate provides:
//! - [`DirectoryCache`] and [`ConversationCache`], the client-side views
//! - [`SessionCoordinator`], the startup and message-sync state machine
//! - [`SessionRuntime`], which drives a coordinator over a real socket

mod conversation;
mod coordinator;
mod directory;
mod error;
mod runtime;

pub use conversation::ConversationCache;
pub use coordinator::{CoordinatorEvent, SessionCoordinator, StartOutcome, CONNECTIVITY_MESSAGE};
pub use directory::{filter, DirectoryCache};
pub use error::{SessionError, SessionResult};
pub use runtime::{RuntimeHandle, SessionRuntime, UserAction};
