//! REST handlers over the message collection
//!
//! Every successful write is published on the push channel after it is stored.

use crate::config::AppState;
use crate::error::{Error, Result};
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    response::Json,
};
use chat_common::{ChatEvent, Message, MessageStatus};
use chat_store::NewMessage;
use serde::Deserialize;
use tracing::{debug, info};

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub wa_id: Option<String>,
}

/// Body of `POST /messages`. Unknown fields are ignored.
#[derive(Debug, Deserialize)]
pub struct CreateMessageInput {
    pub wa_id: String,
    pub name: Option<String>,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusInput {
    pub status: MessageStatus,
}

/// GET /messages
pub async fn list_messages(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Message>>> {
    let messages = match query.wa_id.as_deref() {
        Some(contact_id) => state.store.list_for_contact(contact_id).await?,
        None => state.store.list().await?,
    };
    debug!("GET /messages -> {} messages", messages.len());
    Ok(Json(messages))
}

/// GET /messages/{id}
pub async fn get_message(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Message>> {
    state
        .store
        .get(&id)
        .await?
        .map(Json)
        .ok_or(Error::MessageNotFound { id })
}

/// POST /messages
///
/// Stores an outgoing message from the local user and broadcasts `newMessage`.
pub async fn create_message(
    State(state): State<AppState>,
    payload: std::result::Result<Json<CreateMessageInput>, JsonRejection>,
) -> Result<Json<Message>> {
    let Json(input) = payload?;
    let wa_id = input.wa_id.trim();
    if wa_id.is_empty() {
        return Err(Error::BadRequest("wa_id is required".to_string()));
    }
    if input.message.trim().is_empty() {
        return Err(Error::BadRequest("message must not be empty".to_string()));
    }

    let name = input
        .name
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| wa_id.to_string());

    let message = state
        .store
        .insert(NewMessage::outgoing(wa_id, name, input.message))
        .await?;

    info!("POST /messages -> {} to {}", message.id, message.contact_id);
    state.publish(ChatEvent::NewMessage(message.clone()));

    Ok(Json(message))
}

/// PATCH /messages/{id}
///
/// Sets the delivery status and broadcasts `messageUpdated`.
pub async fn update_message_status(
    Path(id): Path<String>,
    State(state): State<AppState>,
    payload: std::result::Result<Json<UpdateStatusInput>, JsonRejection>,
) -> Result<Json<Message>> {
    let Json(input) = payload?;
    let updated = state
        .store
        .update_status(&id, input.status)
        .await?
        .ok_or_else(|| Error::MessageNotFound { id: id.clone() })?;

    info!("PATCH /messages/{} -> {}", id, updated.status);
    state.publish(ChatEvent::MessageUpdated(updated.clone()));

    Ok(Json(updated))
}
