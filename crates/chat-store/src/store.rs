use crate::error::{Result, StoreError};
use chat_common::{Message, MessageStatus, Sender};
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

const COLUMNS: &str = "id, wa_id, name, message, status, timestamp, meta_msg_id, sender";

/// A message that has not been stored yet
#[derive(Debug, Clone, PartialEq)]
pub struct NewMessage {
    pub contact_id: String,
    pub name: String,
    pub body: String,
    pub status: MessageStatus,
    pub timestamp: DateTime<Utc>,
    pub correlation_id: Option<String>,
    pub sender: Sender,
}

impl NewMessage {
    /// Message written by the local user, stamped now
    pub fn outgoing(
        contact_id: impl Into<String>,
        name: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            contact_id: contact_id.into(),
            name: name.into(),
            body: body.into(),
            status: MessageStatus::Sent,
            timestamp: Utc::now(),
            correlation_id: None,
            sender: Sender::Me,
        }
    }

    /// Message received from a contact through an external feed
    pub fn incoming(
        contact_id: impl Into<String>,
        name: impl Into<String>,
        body: impl Into<String>,
        timestamp: DateTime<Utc>,
        correlation_id: impl Into<String>,
    ) -> Self {
        Self {
            contact_id: contact_id.into(),
            name: name.into(),
            body: body.into(),
            status: MessageStatus::Sent,
            timestamp,
            correlation_id: Some(correlation_id.into()),
            sender: Sender::Them,
        }
    }
}

#[derive(sqlx::FromRow)]
struct MessageRow {
    id: String,
    wa_id: String,
    name: String,
    message: String,
    status: String,
    timestamp: i64,
    meta_msg_id: Option<String>,
    sender: String,
}

impl TryFrom<MessageRow> for Message {
    type Error = StoreError;

    fn try_from(row: MessageRow) -> Result<Self> {
        let corrupt = |reason: String| StoreError::Corrupt {
            id: row.id.clone(),
            reason,
        };

        let status = row
            .status
            .parse::<MessageStatus>()
            .map_err(|e| corrupt(e.to_string()))?;
        let sender = row
            .sender
            .parse::<Sender>()
            .map_err(|e| corrupt(e.to_string()))?;
        let timestamp = DateTime::from_timestamp_millis(row.timestamp)
            .ok_or_else(|| corrupt(format!("timestamp {} out of range", row.timestamp)))?;

        Ok(Message {
            id: row.id,
            contact_id: row.wa_id,
            name: row.name,
            body: row.message,
            status,
            timestamp,
            correlation_id: row.meta_msg_id,
            sender,
        })
    }
}

fn decode_all(rows: Vec<MessageRow>) -> Result<Vec<Message>> {
    rows.into_iter().map(Message::try_from).collect()
}

/// The message collection
#[derive(Clone, Debug)]
pub struct MessageStore {
    pool: SqlitePool,
}

impl MessageStore {
    /// Open (creating if missing) the database at `database_url`
    pub async fn connect(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let store = Self::from_pool(pool).await?;
        info!("[Store] Connected to {}", database_url);
        Ok(store)
    }

    /// Private in-memory database, mainly for tests
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;

        // Every connection to :memory: is its own database, so pin exactly one.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        Self::from_pool(pool).await
    }

    /// Wrap an existing pool and bring its schema up to date
    pub async fn from_pool(pool: SqlitePool) -> Result<Self> {
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    /// All messages, oldest first
    pub async fn list(&self) -> Result<Vec<Message>> {
        let sql = format!("SELECT {COLUMNS} FROM messages ORDER BY timestamp ASC, rowid ASC");
        let rows = sqlx::query_as::<_, MessageRow>(&sql)
            .fetch_all(&self.pool)
            .await?;
        decode_all(rows)
    }

    /// Messages of one contact, oldest first
    pub async fn list_for_contact(&self, contact_id: &str) -> Result<Vec<Message>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM messages WHERE wa_id = ? ORDER BY timestamp ASC, rowid ASC"
        );
        let rows = sqlx::query_as::<_, MessageRow>(&sql)
            .bind(contact_id)
            .fetch_all(&self.pool)
            .await?;
        decode_all(rows)
    }

    pub async fn get(&self, id: &str) -> Result<Option<Message>> {
        let sql = format!("SELECT {COLUMNS} FROM messages WHERE id = ?");
        sqlx::query_as::<_, MessageRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Message::try_from)
            .transpose()
    }

    /// Store a message and return it with its assigned id
    pub async fn insert(&self, new: NewMessage) -> Result<Message> {
        let millis = new.timestamp.timestamp_millis();
        // Stored at millisecond precision; hand back exactly what a read would return.
        let timestamp = DateTime::from_timestamp_millis(millis).unwrap_or(new.timestamp);

        let message = Message {
            id: Uuid::new_v4().to_string(),
            contact_id: new.contact_id,
            name: new.name,
            body: new.body,
            status: new.status,
            timestamp,
            correlation_id: new.correlation_id,
            sender: new.sender,
        };

        sqlx::query(
            "INSERT INTO messages (id, wa_id, name, message, status, timestamp, meta_msg_id, sender) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&message.id)
        .bind(&message.contact_id)
        .bind(&message.name)
        .bind(&message.body)
        .bind(message.status.as_str())
        .bind(millis)
        .bind(&message.correlation_id)
        .bind(message.sender.as_str())
        .execute(&self.pool)
        .await?;

        debug!(
            "[Store] Inserted message {} for {} ({})",
            message.id, message.contact_id, message.sender
        );

        Ok(message)
    }

    /// Set the status of the message with `id`
    pub async fn update_status(&self, id: &str, status: MessageStatus) -> Result<Option<Message>> {
        let sql = format!("UPDATE messages SET status = ? WHERE id = ? RETURNING {COLUMNS}");
        sqlx::query_as::<_, MessageRow>(&sql)
            .bind(status.as_str())
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Message::try_from)
            .transpose()
    }

    /// Set the status of the message carrying `correlation_id`.
    ///
    /// At most one message changes: the earliest one with that correlation id.
    /// Returns `None` and leaves the store untouched when nothing matches.
    pub async fn update_status_by_correlation(
        &self,
        correlation_id: &str,
        status: MessageStatus,
    ) -> Result<Option<Message>> {
        let sql = format!(
            "UPDATE messages SET status = ? \
             WHERE id = (SELECT id FROM messages WHERE meta_msg_id = ? ORDER BY timestamp ASC, rowid ASC LIMIT 1) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, MessageRow>(&sql)
            .bind(status.as_str())
            .bind(correlation_id)
            .fetch_optional(&self.pool)
            .await?
            .map(Message::try_from)
            .transpose()
    }

    pub async fn count(&self) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM messages")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[tokio::test]
    async fn test_insert_assigns_id_and_lists_oldest_first() {
        let store = MessageStore::in_memory().await.unwrap();

        store
            .insert(NewMessage::incoming("42", "Ravi", "second", at(200), "wamid.2"))
            .await
            .unwrap();
        let first = store
            .insert(NewMessage::incoming("42", "Ravi", "first", at(100), "wamid.1"))
            .await
            .unwrap();

        assert!(!first.id.is_empty());
        let listed = store.list().await.unwrap();
        let bodies: Vec<_> = listed.iter().map(|m| m.body.as_str()).collect();
        assert_eq!(bodies, vec!["first", "second"]);
        assert_eq!(listed[0], first);
    }

    #[tokio::test]
    async fn test_same_timestamp_keeps_insertion_order() {
        let store = MessageStore::in_memory().await.unwrap();
        for body in ["a", "b", "c"] {
            store
                .insert(NewMessage::incoming("1", "A", body, at(10), body))
                .await
                .unwrap();
        }
        let bodies: Vec<_> = store
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.body)
            .collect();
        assert_eq!(bodies, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_outgoing_message_round_trips_through_get() {
        let store = MessageStore::in_memory().await.unwrap();
        let sent = store
            .insert(NewMessage::outgoing("42", "Ravi", "hello"))
            .await
            .unwrap();

        let fetched = store.get(&sent.id).await.unwrap().unwrap();
        assert_eq!(fetched, sent);
        assert_eq!(fetched.sender, Sender::Me);
        assert_eq!(fetched.status, MessageStatus::Sent);
        assert!(store.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_status_by_id() {
        let store = MessageStore::in_memory().await.unwrap();
        let msg = store
            .insert(NewMessage::outgoing("42", "Ravi", "hello"))
            .await
            .unwrap();

        let updated = store
            .update_status(&msg.id, MessageStatus::Read)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.status, MessageStatus::Read);
        assert_eq!(updated.id, msg.id);

        assert!(store
            .update_status("nope", MessageStatus::Read)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_correlation_update_touches_only_earliest_match() {
        let store = MessageStore::in_memory().await.unwrap();
        let early = store
            .insert(NewMessage::incoming("1", "A", "early", at(1), "dup"))
            .await
            .unwrap();
        let late = store
            .insert(NewMessage::incoming("1", "A", "late", at(2), "dup"))
            .await
            .unwrap();

        let updated = store
            .update_status_by_correlation("dup", MessageStatus::Delivered)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.id, early.id);

        let late_now = store.get(&late.id).await.unwrap().unwrap();
        assert_eq!(late_now.status, MessageStatus::Sent);
    }

    #[tokio::test]
    async fn test_list_for_contact_filters() {
        let store = MessageStore::in_memory().await.unwrap();
        store
            .insert(NewMessage::outgoing("1", "A", "to a"))
            .await
            .unwrap();
        store
            .insert(NewMessage::outgoing("2", "B", "to b"))
            .await
            .unwrap();

        let only_b = store.list_for_contact("2").await.unwrap();
        assert_eq!(only_b.len(), 1);
        assert_eq!(only_b[0].body, "to b");
        assert_eq!(store.count().await.unwrap(), 2);
    }
}
