use chat_common::{sqlite_url, MessageStatus, Sender};
use chat_store::{MessageStore, NewMessage};
use chrono::{TimeZone, Utc};
use tempfile::tempdir;

#[tokio::test]
async fn test_two_handles_see_each_others_writes() {
    let dir = tempdir().unwrap();
    let url = sqlite_url(&dir.path().join("messages.sqlite"));

    // Server and importer each hold their own pool on the same file.
    let server = MessageStore::connect(&url).await.unwrap();
    let importer = MessageStore::connect(&url).await.unwrap();

    let incoming = importer
        .insert(NewMessage::incoming(
            "929967673820",
            "Neha Joshi",
            "Hi there",
            Utc.timestamp_opt(1_754_400_000, 0).unwrap(),
            "wamid.abc",
        ))
        .await
        .unwrap();

    let reply = server
        .insert(NewMessage::outgoing("929967673820", "Neha Joshi", "Hello!"))
        .await
        .unwrap();

    let listed = server.list().await.unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].id, incoming.id);
    assert_eq!(listed[0].sender, Sender::Them);
    assert_eq!(listed[1].id, reply.id);

    importer
        .update_status_by_correlation("wamid.abc", MessageStatus::Read)
        .await
        .unwrap()
        .unwrap();

    let seen = server.get(&incoming.id).await.unwrap().unwrap();
    assert_eq!(seen.status, MessageStatus::Read);

    server.close().await;
    importer.close().await;
}

#[tokio::test]
async fn test_reopen_keeps_messages() {
    let dir = tempdir().unwrap();
    let url = sqlite_url(&dir.path().join("messages.sqlite"));

    {
        let store = MessageStore::connect(&url).await.unwrap();
        store
            .insert(NewMessage::outgoing("1", "A", "persisted"))
            .await
            .unwrap();
        store.close().await;
    }

    let store = MessageStore::connect(&url).await.unwrap();
    let listed = store.list().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].body, "persisted");
}

#[tokio::test]
async fn test_unmatched_correlation_leaves_store_unchanged() {
    let store = MessageStore::in_memory().await.unwrap();
    store
        .insert(NewMessage::incoming(
            "1",
            "A",
            "hi",
            Utc.timestamp_opt(5, 0).unwrap(),
            "wamid.known",
        ))
        .await
        .unwrap();

    let before = store.list().await.unwrap();
    let result = store
        .update_status_by_correlation("wamid.unknown", MessageStatus::Delivered)
        .await
        .unwrap();

    assert!(result.is_none());
    assert_eq!(store.list().await.unwrap(), before);
}
