use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tokio::sync::mpsc;

/// A common error type that can be used throughout the App
#[derive(thiserror::Error, Debug)]
pub enum Error {
    // 400 Bad Request
    #[error(transparent)]
    Validation(#[from] validator::ValidationErrors),
    #[error("The user doesn't exist")]
    UserNotExist,
    #[error("The username {0} is already taken")]
    DuplicateUsername(String),

    // 422 UnprocessableEntity
    #[error(transparent)]
    JsonRejection(#[from] JsonRejection),

    // Websocket errors, contained to the connection that hit them
    #[error("The room is closed")]
    RoomClosed,
}

// Sending into a retired hub's channel means the room is gone
impl<T> From<mpsc::error::SendError<T>> for Error {
    fn from(_: mpsc::error::SendError<T>) -> Self {
        Self::RoomClosed
    }
}

impl Error {
    pub fn into_error(self) -> (StatusCode, String) {
        let status = match self {
            Error::Validation(_) | Error::UserNotExist | Error::DuplicateUsername(_) => {
                StatusCode::BAD_REQUEST
            }
            Error::JsonRejection(_) => StatusCode::UNPROCESSABLE_ENTITY,
            _ => {
                tracing::error!("{}", self.to_string());
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Server internal error".into(),
                );
            }
        };
        (status, self.to_string())
    }
}

// Axum allows you to return Error which impl IntoResponse
impl IntoResponse for Error {
    fn into_response(self) -> Response {
        self.into_error().into_response()
    }
}
