//! Webhook payload envelope
//!
//! Payload files wrap a WhatsApp Business webhook body under `metaData`:
//!
//! ```text
//! metaData.entry[].changes[] = { field, value: { contacts[], messages[], statuses[] } }
//! ```
//!
//! Extraction is pure: a file either yields its full list of events or a
//! `PayloadError`, so nothing is written for a file that turns out malformed.

use chat_common::MessageStatus;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("invalid JSON envelope: {0}")]
    Json(#[from] serde_json::Error),

    #[error("envelope has no changes")]
    NoChanges,

    #[error("message {message_id} has no contact")]
    MissingContact { message_id: String },

    #[error("message {message_id} has invalid timestamp {value:?}")]
    InvalidTimestamp { message_id: String, value: String },

    #[error("status update {id} has unknown status {value:?}")]
    UnknownStatus { id: String, value: String },
}

/// Envelope fields other than `metaData` (`_id`, `payload_type`, ...) are ignored
#[derive(Debug, Deserialize)]
pub struct PayloadFile {
    #[serde(rename = "metaData")]
    pub meta_data: MetaData,
}

#[derive(Debug, Deserialize)]
pub struct MetaData {
    pub entry: Vec<Entry>,
}

#[derive(Debug, Deserialize)]
pub struct Entry {
    pub changes: Vec<Change>,
}

#[derive(Debug, Deserialize)]
pub struct Change {
    pub field: String,
    pub value: ChangeValue,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChangeValue {
    #[serde(default)]
    pub contacts: Vec<Contact>,
    #[serde(default)]
    pub messages: Vec<InboundMessage>,
    #[serde(default)]
    pub statuses: Vec<StatusUpdate>,
}

#[derive(Debug, Deserialize)]
pub struct Contact {
    pub wa_id: String,
    pub profile: Option<Profile>,
}

#[derive(Debug, Deserialize)]
pub struct Profile {
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct InboundMessage {
    pub id: String,
    pub from: Option<String>,
    pub timestamp: UnixTime,
    pub text: Option<TextBody>,
}

#[derive(Debug, Deserialize)]
pub struct TextBody {
    pub body: String,
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub id: String,
    pub status: String,
}

/// Unix seconds, sent as a string by the webhook but tolerated as a number
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum UnixTime {
    Text(String),
    Number(i64),
}

impl UnixTime {
    fn to_datetime(&self) -> Option<DateTime<Utc>> {
        let secs = match self {
            UnixTime::Text(s) => s.trim().parse::<i64>().ok()?,
            UnixTime::Number(n) => *n,
        };
        DateTime::from_timestamp(secs, 0)
    }

    fn raw(&self) -> String {
        match self {
            UnixTime::Text(s) => s.clone(),
            UnixTime::Number(n) => n.to_string(),
        }
    }
}

/// A message received from a contact
#[derive(Debug, Clone, PartialEq)]
pub struct IncomingMessage {
    pub contact_id: String,
    pub name: String,
    pub body: String,
    pub timestamp: DateTime<Utc>,
    pub correlation_id: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PayloadEvent {
    Message(IncomingMessage),
    Status {
        correlation_id: String,
        status: MessageStatus,
    },
}

const UNKNOWN_NAME: &str = "Unknown";

/// Parse one payload file and extract its events in document order
pub fn parse_payload(bytes: &[u8]) -> Result<Vec<PayloadEvent>, PayloadError> {
    let file: PayloadFile = serde_json::from_slice(bytes)?;
    extract_events(&file)
}

pub fn extract_events(file: &PayloadFile) -> Result<Vec<PayloadEvent>, PayloadError> {
    let changes: Vec<&Change> = file
        .meta_data
        .entry
        .iter()
        .flat_map(|entry| entry.changes.iter())
        .collect();

    if changes.is_empty() {
        return Err(PayloadError::NoChanges);
    }

    let mut events = Vec::new();
    for change in changes {
        // Real feeds deliver statuses under field "messages" too.
        if change.field != "messages" && change.field != "statuses" {
            continue;
        }

        for msg in &change.value.messages {
            events.push(PayloadEvent::Message(incoming_message(
                msg,
                &change.value.contacts,
            )?));
        }

        for status in &change.value.statuses {
            let parsed = status
                .status
                .parse::<MessageStatus>()
                .map_err(|_| PayloadError::UnknownStatus {
                    id: status.id.clone(),
                    value: status.status.clone(),
                })?;
            events.push(PayloadEvent::Status {
                correlation_id: status.id.clone(),
                status: parsed,
            });
        }
    }

    Ok(events)
}

fn incoming_message(
    msg: &InboundMessage,
    contacts: &[Contact],
) -> Result<IncomingMessage, PayloadError> {
    let contact = msg
        .from
        .as_deref()
        .and_then(|from| contacts.iter().find(|c| c.wa_id == from))
        .or_else(|| contacts.first())
        .ok_or_else(|| PayloadError::MissingContact {
            message_id: msg.id.clone(),
        })?;

    let timestamp = msg
        .timestamp
        .to_datetime()
        .ok_or_else(|| PayloadError::InvalidTimestamp {
            message_id: msg.id.clone(),
            value: msg.timestamp.raw(),
        })?;

    let name = contact
        .profile
        .as_ref()
        .and_then(|p| p.name.clone())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| UNKNOWN_NAME.to_string());

    Ok(IncomingMessage {
        contact_id: contact.wa_id.clone(),
        name,
        body: msg.text.as_ref().map(|t| t.body.clone()).unwrap_or_default(),
        timestamp,
        correlation_id: msg.id.clone(),
    })
}
