use anyhow::Context;
use chat_ingest::Ingestor;
use chat_store::MessageStore;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "chat-ingest")]
#[command(about = "Import webhook message/status payload files into the message store")]
struct Cli {
    /// Directory holding the payload files
    #[arg(short, long, env = "PAYLOAD_DIR")]
    dir: Option<PathBuf>,

    /// Store URL, e.g. sqlite://chat_data/messages.sqlite
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    chat_common::init_tracing("chat_ingest=info,chat_store=info,warn");
    let cli = Cli::parse();

    let database_url = match cli.database_url {
        Some(url) => url,
        None => {
            chat_common::ensure_dir(&chat_common::chat_root())?;
            chat_common::database_url()
        }
    };
    let dir = cli.dir.unwrap_or_else(chat_common::payloads_dir);

    info!("=== Chat Payload Importer ===");

    let store = MessageStore::connect(&database_url)
        .await
        .with_context(|| format!("Failed to connect to {}", database_url))?;
    info!("Connected to message store for payload processing");

    let ingestor = Ingestor::new(store.clone());
    let result = ingestor.ingest_dir(&dir).await;
    store.close().await;

    let report = result?;
    info!(
        "Imported {} messages and {} status updates",
        report.messages_inserted, report.statuses_applied
    );
    Ok(())
}
