//! Terminal client for the chat server.
//!
//! Fetches the message list over REST, keeps it current from the push
//! channel and renders the contact list and conversation as text.

pub mod api;
pub mod book;
pub mod render;
pub mod watch;

pub use api::{push_url, ApiClient, ClientError, PushClient, PushStream};
pub use book::{ChatBook, ChatSummary, OutgoingMessage};
