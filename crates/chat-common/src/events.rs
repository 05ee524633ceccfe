//! Push channel events
//!
//! Every store mutation made through the server is fanned out to connected
//! clients as one of these, encoded as `{"event": "...", "data": {...}}`.

use crate::models::Message;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ChatEvent {
    #[serde(rename = "newMessage")]
    NewMessage(Message),
    #[serde(rename = "messageUpdated")]
    MessageUpdated(Message),
}

impl ChatEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ChatEvent::NewMessage(_) => "newMessage",
            ChatEvent::MessageUpdated(_) => "messageUpdated",
        }
    }

    pub fn message(&self) -> &Message {
        match self {
            ChatEvent::NewMessage(msg) | ChatEvent::MessageUpdated(msg) => msg,
        }
    }
}
