use anyhow::{bail, Context};
use chat_client::render::{render_conversation, render_screen, render_sidebar};
use chat_client::api::forward_events;
use chat_client::watch::{follow, FollowEnd};
use chat_client::{ApiClient, ChatBook, PushClient};
use chat_common::MessageStatus;
use clap::{Parser, Subcommand};
use std::io::Write;
use tokio::sync::mpsc;
use tracing::error;

#[derive(Parser, Debug)]
#[command(name = "chat", about = "Terminal client for the chat server")]
struct Cli {
    /// Base URL of the chat server
    #[arg(long, env = "CHAT_SERVER_URL", default_value = "http://localhost:5000")]
    server: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List chats with their latest message
    Chats,
    /// Print one conversation
    Open { wa_id: String },
    /// Send a message into an existing chat
    Send {
        wa_id: String,
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },
    /// Set the delivery status of a message
    Mark { id: String, status: MessageStatus },
    /// Follow live updates until interrupted
    Watch { wa_id: Option<String> },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    chat_common::init_tracing("chat_client=warn,warn");

    let cli = Cli::parse();
    let api = ApiClient::new(&cli.server)?;

    match cli.command {
        Command::Chats => {
            let book = fetch_book(&api).await?;
            print!("{}", render_sidebar(&book, None));
        }
        Command::Open { wa_id } => {
            let book = fetch_book(&api).await?;
            print!("{}", render_conversation(&book, &wa_id));
        }
        Command::Send { wa_id, text } => {
            let book = fetch_book(&api).await?;
            let text = text.join(" ");
            let Some(outgoing) = book.compose(&wa_id, &text) else {
                bail!("No chat with {} (or empty message)", wa_id);
            };
            let sent = api.send_message(&outgoing).await?;
            println!("Sent {} to {}", sent.id, sent.contact_id);
        }
        Command::Mark { id, status } => {
            let updated = api.update_status(&id, status).await?;
            println!("{} is now {}", updated.id, updated.status);
        }
        Command::Watch { wa_id } => watch(&cli.server, &api, wa_id.as_deref()).await?,
    }

    Ok(())
}

async fn fetch_book(api: &ApiClient) -> anyhow::Result<ChatBook> {
    let messages = api
        .list_messages()
        .await
        .with_context(|| format!("Failed to fetch messages from {}", api.base_url()))?;
    let mut book = ChatBook::new();
    book.replace_all(messages);
    Ok(book)
}

async fn watch(server: &str, api: &ApiClient, selected: Option<&str>) -> anyhow::Result<()> {
    let push = PushClient::new(server)?;
    let (tx, mut rx) = mpsc::channel(64);

    // Subscribe before the fetch so nothing between the two is missed.
    let stream = push.connect().await?;
    let push_task = tokio::spawn(async move { forward_events(stream, tx).await });

    let mut book = fetch_book(api).await?;
    redraw(&book, selected)?;

    let end = follow(&mut book, &mut rx, tokio::signal::ctrl_c(), |book| {
        redraw(book, selected)
    })
    .await?;

    if end == FollowEnd::ChannelClosed {
        match push_task.await {
            Ok(Ok(())) => error!("Push channel closed by server"),
            Ok(Err(e)) => error!("Push channel error: {}", e),
            Err(e) => error!("Push task failed: {}", e),
        }
    } else {
        push_task.abort();
    }
    Ok(())
}

fn redraw(book: &ChatBook, selected: Option<&str>) -> std::io::Result<()> {
    let mut stdout = std::io::stdout().lock();
    write!(stdout, "\x1b[2J\x1b[H{}", render_screen(book, selected))?;
    stdout.flush()?;
    Ok(())
}
