//! Handlers for server

pub mod messages;
pub mod realtime;

// Re-export AppState from config
pub use crate::config::AppState;

pub use messages::{create_message, get_message, list_messages, update_message_status};
pub use realtime::subscribe;
