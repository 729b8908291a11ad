use axum::{http::StatusCode, response::{IntoResponse, Response}, Json};
use serde_json::json;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("name already in use")]
    NameTaken,

    #[error("{0} not found")]
    NotFound(String),

    #[error("only the sender can change this message")]
    Forbidden,

    #[error("sender is not in the room")]
    UnknownSender,

    #[error("message type {0:?} is not allowed")]
    InvalidType(String),

    #[error("store failure: {0}")]
    Store(#[from] sqlx::Error),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn status_code(&self) -> StatusCode {
        use AppError::*;
        match self {
            Validation(_) | UnknownSender | InvalidType(_) => StatusCode::UNPROCESSABLE_ENTITY,
            NameTaken => StatusCode::CONFLICT,
            NotFound(_) => StatusCode::NOT_FOUND,
            Forbidden => StatusCode::UNAUTHORIZED,
            Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if let AppError::Store(err) = &self {
            tracing::error!(error = %err, "store call failed");
        }

        (
            status,
            Json(json!({
                "error": self.to_string(),
                "status": status.as_u16(),
            })),
        )
            .into_response()
    }
}
