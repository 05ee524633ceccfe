use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chat_store::StoreError;
use serde_json::json;
use tracing::error;

#[derive(Debug)]
pub enum Error {
    MessageNotFound { id: String },
    BadRequest(String),
    /// Body missing, not JSON, or not the expected shape
    InvalidBody(JsonRejection),
    Store(StoreError),
}

pub type Result<T> = core::result::Result<T, Error>;

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            Error::MessageNotFound { id } => {
                (StatusCode::NOT_FOUND, format!("Message {} not found", id))
            }
            Error::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Error::InvalidBody(rejection) => (rejection.status(), rejection.body_text()),
            Error::Store(err) => {
                error!("Store failure: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Message store unavailable".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "message": error_message
            }
        }));

        (status, body).into_response()
    }
}

impl From<StoreError> for Error {
    fn from(err: StoreError) -> Self {
        Error::Store(err)
    }
}

impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        Error::InvalidBody(rejection)
    }
}
