//! In-memory message book
//!
//! Holds the full message list fetched once from the server and keeps it in
//! step with push events. Conversations are derived on demand by grouping on
//! the contact id, in the order contacts were first seen.

use chat_common::{ChatEvent, Message};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

/// Sidebar entry for one contact
#[derive(Debug, Clone, PartialEq)]
pub struct ChatSummary {
    pub contact_id: String,
    /// Name from the conversation's first message
    pub name: String,
    pub last_body: String,
    pub last_timestamp: DateTime<Utc>,
    pub message_count: usize,
}

/// Body of a new outgoing message, as the server expects it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutgoingMessage {
    pub wa_id: String,
    pub name: String,
    pub message: String,
}

#[derive(Debug, Default, Clone)]
pub struct ChatBook {
    messages: Vec<Message>,
}

impl ChatBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole list with a fresh fetch
    pub fn replace_all(&mut self, messages: Vec<Message>) {
        self.messages = messages;
    }

    /// Apply a push event. Returns whether anything changed.
    pub fn apply(&mut self, event: ChatEvent) -> bool {
        match event {
            ChatEvent::NewMessage(msg) => {
                // A fetch racing the subscription can already hold it.
                match self.position(&msg.id) {
                    Some(idx) => self.messages[idx] = msg,
                    None => self.messages.push(msg),
                }
                true
            }
            ChatEvent::MessageUpdated(msg) => match self.position(&msg.id) {
                Some(idx) => {
                    self.messages[idx] = msg;
                    true
                }
                None => false,
            },
        }
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.messages.iter().position(|m| m.id == id)
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// One summary per contact, first-seen order
    pub fn chats(&self) -> Vec<ChatSummary> {
        let mut chats: Vec<ChatSummary> = Vec::new();
        let mut index: HashMap<&str, usize> = HashMap::new();

        for msg in &self.messages {
            match index.get(msg.contact_id.as_str()) {
                Some(&idx) => {
                    let chat = &mut chats[idx];
                    chat.last_body = msg.body.clone();
                    chat.last_timestamp = msg.timestamp;
                    chat.message_count += 1;
                }
                None => {
                    index.insert(&msg.contact_id, chats.len());
                    chats.push(ChatSummary {
                        contact_id: msg.contact_id.clone(),
                        name: msg.name.clone(),
                        last_body: msg.body.clone(),
                        last_timestamp: msg.timestamp,
                        message_count: 1,
                    });
                }
            }
        }

        chats
    }

    /// Messages of one contact in list order
    pub fn conversation(&self, contact_id: &str) -> Vec<&Message> {
        self.messages
            .iter()
            .filter(|m| m.contact_id == contact_id)
            .collect()
    }

    /// Build an outgoing message for an existing chat.
    ///
    /// `None` when the text is blank or the contact has no conversation.
    pub fn compose(&self, contact_id: &str, text: &str) -> Option<OutgoingMessage> {
        if text.trim().is_empty() {
            return None;
        }
        let first = self.messages.iter().find(|m| m.contact_id == contact_id)?;
        Some(OutgoingMessage {
            wa_id: first.contact_id.clone(),
            name: first.name.clone(),
            message: text.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chat_common::{MessageStatus, Sender};
    use chrono::TimeZone;

    fn msg(id: &str, contact: &str, name: &str, body: &str, secs: i64) -> Message {
        Message {
            id: id.to_string(),
            contact_id: contact.to_string(),
            name: name.to_string(),
            body: body.to_string(),
            status: MessageStatus::Sent,
            timestamp: Utc.timestamp_opt(secs, 0).unwrap(),
            correlation_id: None,
            sender: Sender::Them,
        }
    }

    fn book() -> ChatBook {
        let mut book = ChatBook::new();
        book.replace_all(vec![
            msg("1", "929967673820", "Neha Joshi", "Hi", 10),
            msg("2", "919937320320", "Ravi Kumar", "Hello", 20),
            msg("3", "929967673820", "Neha J.", "Are you there?", 30),
        ]);
        book
    }

    #[test]
    fn test_chats_group_by_contact_in_first_seen_order() {
        let chats = book().chats();
        assert_eq!(chats.len(), 2);

        assert_eq!(chats[0].contact_id, "929967673820");
        assert_eq!(chats[0].name, "Neha Joshi");
        assert_eq!(chats[0].last_body, "Are you there?");
        assert_eq!(chats[0].message_count, 2);

        assert_eq!(chats[1].contact_id, "919937320320");
        assert_eq!(chats[1].last_timestamp, Utc.timestamp_opt(20, 0).unwrap());
    }

    #[test]
    fn test_new_message_appends_and_dedupes() {
        let mut book = book();
        assert!(book.apply(ChatEvent::NewMessage(msg("4", "1", "New", "yo", 40))));
        assert_eq!(book.len(), 4);
        assert_eq!(book.chats().last().unwrap().contact_id, "1");

        let mut again = msg("4", "1", "New", "yo", 40);
        again.status = MessageStatus::Delivered;
        assert!(book.apply(ChatEvent::NewMessage(again)));
        assert_eq!(book.len(), 4);
        assert_eq!(book.messages()[3].status, MessageStatus::Delivered);
    }

    #[test]
    fn test_update_replaces_in_place_and_ignores_unknown() {
        let mut book = book();
        let mut updated = msg("2", "919937320320", "Ravi Kumar", "Hello", 20);
        updated.status = MessageStatus::Read;

        assert!(book.apply(ChatEvent::MessageUpdated(updated)));
        assert_eq!(book.messages()[1].status, MessageStatus::Read);
        assert_eq!(book.messages()[0].status, MessageStatus::Sent);

        assert!(!book.apply(ChatEvent::MessageUpdated(msg("99", "x", "X", "?", 1))));
        assert_eq!(book.len(), 3);
    }

    #[test]
    fn test_compose_uses_first_message_identity() {
        let book = book();
        let out = book.compose("929967673820", "On my way").unwrap();
        assert_eq!(
            out,
            OutgoingMessage {
                wa_id: "929967673820".to_string(),
                name: "Neha Joshi".to_string(),
                message: "On my way".to_string(),
            }
        );

        assert!(book.compose("929967673820", "   ").is_none());
        assert!(book.compose("000", "hello").is_none());
    }

    #[test]
    fn test_conversation_keeps_list_order() {
        let book = book();
        let bodies: Vec<_> = book
            .conversation("929967673820")
            .into_iter()
            .map(|m| m.body.as_str())
            .collect();
        assert_eq!(bodies, vec!["Hi", "Are you there?"]);
    }
}
