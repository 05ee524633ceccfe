//! Chat Server Library
//!
//! REST endpoints over the shared message store plus a WebSocket push channel
//! that carries every mutation made through this server to all clients.

pub mod config;
pub mod error;
pub mod handlers;

use axum::{
    http::{HeaderValue, Method},
    routing::get,
    Router,
};
use chat_store::MessageStore;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

pub use config::{AppState, ServerConfig};
pub use error::{Error, Result};

use handlers::{create_message, get_message, list_messages, subscribe, update_message_status};

/// Build the application router
pub fn router(state: AppState, config: &ServerConfig) -> Router {
    Router::new()
        .route("/messages", get(list_messages).post(create_message))
        .route(
            "/messages/{id}",
            get(get_message).patch(update_message_status),
        )
        // Push channel
        .route("/ws", get(subscribe))
        .route("/health", get(health_check))
        // Browser UI
        .fallback_service(ServeDir::new(&config.public_dir))
        .with_state(state)
        .layer(cors_layer(config.client_url.as_deref()))
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(client_url: Option<&str>) -> CorsLayer {
    let Some(origin) = client_url else {
        return CorsLayer::permissive();
    };

    match origin.parse::<HeaderValue>() {
        Ok(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_methods([Method::GET, Method::POST, Method::PATCH])
            .allow_headers(Any),
        Err(e) => {
            warn!("Ignoring invalid CLIENT_URL {:?}: {}", origin, e);
            CorsLayer::permissive()
        }
    }
}

pub async fn run(config: ServerConfig) -> anyhow::Result<()> {
    info!("=== Chat Server ===");

    config.ensure_dirs().await?;
    let store = MessageStore::connect(&config.database_url).await?;
    info!("Message store connected: {}", config.database_url);

    let state = AppState::new(store.clone(), config.event_capacity);
    let app = router(state, &config);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Server running with WebSockets on http://{}", addr);
    info!("UI served from {:?}", config.public_dir);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    store.close().await;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

async fn health_check() -> &'static str {
    "OK - Chat Server is running"
}
