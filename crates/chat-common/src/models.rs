use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A single chat message as stored and sent over the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Store-assigned identifier
    #[serde(rename = "_id")]
    pub id: String,
    /// Contact the conversation belongs to
    #[serde(rename = "wa_id")]
    pub contact_id: String,
    /// Display name of the contact
    pub name: String,
    #[serde(rename = "message")]
    pub body: String,
    pub status: MessageStatus,
    pub timestamp: DateTime<Utc>,
    /// External message id used to match incoming status updates
    #[serde(rename = "meta_msg_id", default)]
    pub correlation_id: Option<String>,
    pub sender: Sender,
}

impl Message {
    pub fn is_outgoing(&self) -> bool {
        self.sender == Sender::Me
    }
}

/// Delivery status. Ordered by progress: sent < delivered < read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Sent,
    Delivered,
    Read,
}

impl MessageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageStatus::Sent => "sent",
            MessageStatus::Delivered => "delivered",
            MessageStatus::Read => "read",
        }
    }
}

impl fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} value: {value:?}")]
pub struct ParseEnumError {
    kind: &'static str,
    value: String,
}

impl ParseEnumError {
    /// Which enum rejected the value, `status` or `sender`
    pub fn kind(&self) -> &'static str {
        self.kind
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

impl FromStr for MessageStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sent" => Ok(MessageStatus::Sent),
            "delivered" => Ok(MessageStatus::Delivered),
            "read" => Ok(MessageStatus::Read),
            other => Err(ParseEnumError {
                kind: "status",
                value: other.to_string(),
            }),
        }
    }
}

/// Who wrote the message: the local user or the remote contact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sender {
    #[serde(rename = "me")]
    Me,
    #[serde(rename = "them")]
    Them,
}

impl Sender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sender::Me => "me",
            Sender::Them => "them",
        }
    }
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sender {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "me" => Ok(Sender::Me),
            "them" => Ok(Sender::Them),
            other => Err(ParseEnumError {
                kind: "sender",
                value: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> Message {
        Message {
            id: "66b1".to_string(),
            contact_id: "929967673820".to_string(),
            name: "Neha Joshi".to_string(),
            body: "Hi, I'd like to know more".to_string(),
            status: MessageStatus::Delivered,
            timestamp: Utc.timestamp_opt(1_754_400_000, 0).unwrap(),
            correlation_id: Some("wamid.HBgM".to_string()),
            sender: Sender::Them,
        }
    }

    #[test]
    fn test_message_uses_wire_field_names() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["_id"], "66b1");
        assert_eq!(json["wa_id"], "929967673820");
        assert_eq!(json["message"], "Hi, I'd like to know more");
        assert_eq!(json["status"], "delivered");
        assert_eq!(json["meta_msg_id"], "wamid.HBgM");
        assert_eq!(json["sender"], "them");
    }

    #[test]
    fn test_missing_correlation_id_defaults_to_none() {
        let json = serde_json::json!({
            "_id": "1",
            "wa_id": "42",
            "name": "Ravi",
            "message": "hey",
            "status": "sent",
            "timestamp": "2025-08-06T12:00:00Z",
            "sender": "me"
        });
        let msg: Message = serde_json::from_value(json).unwrap();
        assert_eq!(msg.correlation_id, None);
        assert!(msg.is_outgoing());
    }

    #[test]
    fn test_status_order_follows_delivery_progress() {
        assert!(MessageStatus::Sent < MessageStatus::Delivered);
        assert!(MessageStatus::Delivered < MessageStatus::Read);
    }

    #[test]
    fn test_unknown_status_is_rejected() {
        let err = "failed".parse::<MessageStatus>().unwrap_err();
        assert_eq!(err.value(), "failed");
        assert_eq!(err.kind(), "status");
        assert_eq!("read".parse::<MessageStatus>().unwrap(), MessageStatus::Read);
    }

    #[test]
    fn test_unknown_sender_names_its_kind() {
        let err = "bot".parse::<Sender>().unwrap_err();
        assert_eq!(err.kind(), "sender");
        assert_eq!(err.to_string(), "unknown sender value: \"bot\"");
        assert_eq!("them".parse::<Sender>().unwrap(), Sender::Them);
    }
}
