//! API client layer for REST and WebSocket push connections.

use crate::book::OutgoingMessage;
use chat_common::{ChatEvent, Message, MessageStatus};
use futures::TryStreamExt;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("WebSocket error: {0}")]
    WebSocket(Box<tokio_tungstenite::tungstenite::Error>),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Server returned {status}: {message}")]
    Server { status: u16, message: String },
    #[error("Invalid server URL: {0}")]
    InvalidUrl(String),
}

impl From<tokio_tungstenite::tungstenite::Error> for ClientError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::WebSocket(Box::new(err))
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;

/// Open push channel connection
pub type PushStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// REST client for the message endpoints
#[derive(Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET /messages
    pub async fn list_messages(&self) -> Result<Vec<Message>> {
        let response = self
            .client
            .get(format!("{}/messages", self.base_url))
            .send()
            .await?;
        parse_response(response).await
    }

    /// POST /messages
    pub async fn send_message(&self, outgoing: &OutgoingMessage) -> Result<Message> {
        let response = self
            .client
            .post(format!("{}/messages", self.base_url))
            .json(outgoing)
            .send()
            .await?;
        parse_response(response).await
    }

    /// PATCH /messages/{id}
    pub async fn update_status(&self, id: &str, status: MessageStatus) -> Result<Message> {
        let response = self
            .client
            .patch(format!("{}/messages/{}", self.base_url, id))
            .json(&json!({ "status": status }))
            .send()
            .await?;
        parse_response(response).await
    }
}

async fn parse_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();
    let bytes = response.bytes().await?;

    if !status.is_success() {
        let message = serde_json::from_slice::<serde_json::Value>(&bytes)
            .ok()
            .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
            .unwrap_or_else(|| String::from_utf8_lossy(&bytes).into_owned());
        return Err(ClientError::Server {
            status: status.as_u16(),
            message,
        });
    }

    Ok(serde_json::from_slice(&bytes)?)
}

/// WebSocket endpoint for a server base URL
pub fn push_url(base_url: &str) -> Result<String> {
    let base = base_url.trim_end_matches('/');
    let ws_base = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{}", rest)
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{}", rest)
    } else if base.starts_with("ws://") || base.starts_with("wss://") {
        base.to_string()
    } else {
        return Err(ClientError::InvalidUrl(base_url.to_string()));
    };
    Ok(format!("{}/ws", ws_base))
}

/// Subscriber to the server's push channel
#[derive(Clone)]
pub struct PushClient {
    endpoint: String,
}

impl PushClient {
    pub fn new(base_url: &str) -> Result<Self> {
        Ok(Self {
            endpoint: push_url(base_url)?,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub async fn connect(&self) -> Result<PushStream> {
        let (stream, _) = tokio_tungstenite::connect_async(self.endpoint.as_str()).await?;
        debug!("Connected to push channel {}", self.endpoint);
        Ok(stream)
    }

    /// Connect and forward events until the socket closes
    pub async fn stream_events(&self, sender: mpsc::Sender<ChatEvent>) -> Result<()> {
        let stream = self.connect().await?;
        forward_events(stream, sender).await
    }
}

/// Decode text frames into events until the socket closes or the receiver is dropped
pub async fn forward_events(mut stream: PushStream, sender: mpsc::Sender<ChatEvent>) -> Result<()> {
    while let Some(frame) = stream.try_next().await? {
        let WsMessage::Text(text) = frame else {
            continue;
        };
        match serde_json::from_str::<ChatEvent>(text.as_str()) {
            Ok(event) => {
                if sender.send(event).await.is_err() {
                    break;
                }
            }
            Err(err) => warn!("Push event decode error: {}", err),
        }
    }
    Ok(())
}
