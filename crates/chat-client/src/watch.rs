//! Live-follow loop for the `watch` command

use crate::book::ChatBook;
use chat_common::ChatEvent;
use std::future::Future;
use std::io;
use tokio::sync::mpsc;

/// Why [`follow`] returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowEnd {
    Shutdown,
    ChannelClosed,
}

/// Apply pushed events to `book` until `shutdown` resolves or the channel closes.
///
/// `on_change` runs after every event that changed the book. `shutdown` is
/// polled as one future for the whole run, so a signal that lands while
/// `on_change` runs is still seen.
pub async fn follow<S, F>(
    book: &mut ChatBook,
    events: &mut mpsc::Receiver<ChatEvent>,
    shutdown: S,
    mut on_change: F,
) -> io::Result<FollowEnd>
where
    S: Future,
    F: FnMut(&ChatBook) -> io::Result<()>,
{
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => return Ok(FollowEnd::Shutdown),
            event = events.recv() => match event {
                Some(event) => {
                    if book.apply(event) {
                        on_change(book)?;
                    }
                }
                None => return Ok(FollowEnd::ChannelClosed),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chat_common::{Message, MessageStatus, Sender};
    use chrono::{TimeZone, Utc};
    use tokio::sync::oneshot;

    fn msg(id: &str) -> Message {
        Message {
            id: id.to_string(),
            contact_id: "919937320320".to_string(),
            name: "Ravi Kumar".to_string(),
            body: format!("body {}", id),
            status: MessageStatus::Sent,
            timestamp: Utc.timestamp_opt(1_754_400_000, 0).unwrap(),
            correlation_id: None,
            sender: Sender::Them,
        }
    }

    #[tokio::test]
    async fn test_follow_applies_events_until_channel_closes() {
        let (tx, mut rx) = mpsc::channel(8);
        tx.send(ChatEvent::NewMessage(msg("1"))).await.unwrap();
        tx.send(ChatEvent::MessageUpdated(msg("missing"))).await.unwrap();
        tx.send(ChatEvent::NewMessage(msg("2"))).await.unwrap();
        drop(tx);

        let mut book = ChatBook::new();
        let mut redraws = 0;
        let end = follow(&mut book, &mut rx, std::future::pending::<()>(), |_| {
            redraws += 1;
            Ok(())
        })
        .await
        .unwrap();

        assert_eq!(end, FollowEnd::ChannelClosed);
        assert_eq!(book.len(), 2);
        // The unknown update changed nothing, so it drew nothing.
        assert_eq!(redraws, 2);
    }

    #[tokio::test]
    async fn test_shutdown_during_redraw_is_not_lost() {
        let (tx, mut rx) = mpsc::channel(8);
        tx.send(ChatEvent::NewMessage(msg("1"))).await.unwrap();

        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let mut stop_tx = Some(stop_tx);

        let mut book = ChatBook::new();
        // The sender stays alive, so only the shutdown can end the loop.
        let end = follow(&mut book, &mut rx, stop_rx, |_| {
            if let Some(stop) = stop_tx.take() {
                let _ = stop.send(());
            }
            Ok(())
        })
        .await
        .unwrap();

        assert_eq!(end, FollowEnd::Shutdown);
        assert_eq!(book.len(), 1);
        drop(tx);
    }

    #[tokio::test]
    async fn test_redraw_error_ends_follow() {
        let (tx, mut rx) = mpsc::channel(8);
        tx.send(ChatEvent::NewMessage(msg("1"))).await.unwrap();

        let mut book = ChatBook::new();
        let err = follow(&mut book, &mut rx, std::future::pending::<()>(), |_| {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "stdout closed"))
        })
        .await
        .unwrap_err();

        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
        drop(tx);
    }
}
