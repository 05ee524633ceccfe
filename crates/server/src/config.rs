//! Chat server configuration

use chat_common::ChatEvent;
use chat_store::MessageStore;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use tokio::sync::broadcast;

/// Configuration for the chat server
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Interface to bind
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Data directory, created on start
    pub data_dir: PathBuf,
    /// Message store URL
    pub database_url: String,
    /// Allowed browser origin; any origin when unset
    pub client_url: Option<String>,
    /// Static UI directory
    pub public_dir: PathBuf,
    /// Buffered push events per subscriber before it starts lagging
    pub event_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: std::env::var("HOST")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED)),
            port: std::env::var("PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5000),
            data_dir: chat_common::chat_root(),
            database_url: chat_common::database_url(),
            client_url: std::env::var("CLIENT_URL").ok().filter(|s| !s.is_empty()),
            public_dir: std::env::var("PUBLIC_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("public")),
            event_capacity: std::env::var("EVENT_CAPACITY")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(256),
        }
    }
}

impl ServerConfig {
    /// Read configuration from the environment
    pub fn from_env() -> Self {
        Self::default()
    }

    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Ensure the data directory exists
    pub async fn ensure_dirs(&self) -> anyhow::Result<()> {
        tokio::fs::create_dir_all(&self.data_dir).await?;
        Ok(())
    }
}

/// App state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub store: MessageStore,
    events: broadcast::Sender<ChatEvent>,
}

impl AppState {
    pub fn new(store: MessageStore, event_capacity: usize) -> Self {
        let (events, _) = broadcast::channel(event_capacity.max(1));
        Self { store, events }
    }

    /// Fan an event out to every connected client
    pub fn publish(&self, event: ChatEvent) {
        // Err only means nobody is listening right now.
        let _ = self.events.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChatEvent> {
        self.events.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.events.receiver_count()
    }
}
