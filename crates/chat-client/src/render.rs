//! Text rendering of the two-pane chat view

use crate::book::ChatBook;
use chat_common::{Message, MessageStatus};
use chrono::{DateTime, Local, Utc};
use std::fmt::Write;

const BLUE: &str = "\x1b[34m";
const RESET: &str = "\x1b[0m";
const RULE: &str = "────────────────────────────────────────";

/// Local wall-clock time as `HH:MM`
pub fn format_time(timestamp: DateTime<Utc>) -> String {
    timestamp.with_timezone(&Local).format("%H:%M").to_string()
}

/// Delivery ticks; only the local user's messages carry them
pub fn status_marker(msg: &Message) -> String {
    if !msg.is_outgoing() {
        return String::new();
    }
    match msg.status {
        MessageStatus::Sent => "✓".to_string(),
        MessageStatus::Delivered => "✓✓".to_string(),
        MessageStatus::Read => format!("{BLUE}✓✓{RESET}"),
    }
}

/// Contact list with the latest message of each chat
pub fn render_sidebar(book: &ChatBook, selected: Option<&str>) -> String {
    let mut out = String::new();
    let chats = book.chats();
    if chats.is_empty() {
        out.push_str("  (no chats yet)\n");
        return out;
    }

    for chat in chats {
        let marker = if selected == Some(chat.contact_id.as_str()) {
            '>'
        } else {
            ' '
        };
        let _ = writeln!(
            out,
            "{} {} ({})  {}",
            marker,
            chat.name,
            chat.contact_id,
            format_time(chat.last_timestamp)
        );
        let _ = writeln!(out, "    {}", chat.last_body);
    }
    out
}

/// Header plus every bubble of one conversation
pub fn render_conversation(book: &ChatBook, contact_id: &str) -> String {
    let messages = book.conversation(contact_id);
    let Some(first) = messages.first() else {
        return "Select a chat to view messages\n".to_string();
    };

    let mut out = String::new();
    let _ = writeln!(out, "{}  {}", first.name, contact_id);
    let _ = writeln!(out, "{RULE}");
    for msg in messages {
        let time = format_time(msg.timestamp);
        if msg.is_outgoing() {
            let _ = writeln!(out, "{:>40}", msg.body);
            let _ = writeln!(out, "{:>40}", format!("{} {}", time, status_marker(msg)).trim_end());
        } else {
            let _ = writeln!(out, "{}: {}", msg.name, msg.body);
            let _ = writeln!(out, "{}", time);
        }
    }
    out
}

/// Both panes, sidebar first
pub fn render_screen(book: &ChatBook, selected: Option<&str>) -> String {
    let mut out = String::from("Chats\n");
    out.push_str(&render_sidebar(book, selected));
    let _ = writeln!(out, "{RULE}");
    match selected {
        Some(contact_id) => out.push_str(&render_conversation(book, contact_id)),
        None => out.push_str("Select a chat to view messages\n"),
    }
    out
}
