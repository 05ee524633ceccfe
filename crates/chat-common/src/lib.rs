//! Shared pieces of the chat services
//!
//! Directory layout:
//! ```text
//! chat_data/
//! ├── messages.sqlite   # Message store shared by server and importer
//! └── payloads/         # Default drop directory for webhook payload files
//! ```

pub mod events;
pub mod models;

pub use events::ChatEvent;
pub use models::{Message, MessageStatus, ParseEnumError, Sender};

use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// File name of the message database inside the data root
pub const DATABASE_FILE: &str = "messages.sqlite";

/// Get the CHAT_ROOT directory from environment or default
pub fn chat_root() -> PathBuf {
    std::env::var("CHAT_ROOT")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("chat_data"))
}

/// Default payload directory for the importer
pub fn payloads_dir() -> PathBuf {
    chat_root().join("payloads")
}

/// Database file path under the data root
pub fn db_path() -> PathBuf {
    chat_root().join(DATABASE_FILE)
}

/// SQLite URL for a database file
pub fn sqlite_url(path: &Path) -> String {
    format!("sqlite://{}", path.to_string_lossy().replace('\\', "/"))
}

/// DATABASE_URL from environment, falling back to the file under CHAT_ROOT
pub fn database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| sqlite_url(&db_path()))
}

/// Ensure a single directory exists
pub fn ensure_dir(path: &Path) -> anyhow::Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
        info!("Created directory: {:?}", path);
    }
    Ok(())
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins when set, otherwise `default_filter` is used.
pub fn init_tracing(default_filter: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    // A second init (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
