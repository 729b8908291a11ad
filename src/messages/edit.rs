use axum::{debug_handler, extract::{rejection::JsonRejection, Path, State}, http::StatusCode, Json};

use crate::{identity::User, AppError, AppResult};

use super::{MessageBody, MessageStore};

#[debug_handler(state = crate::AppState)]
pub(crate) async fn remove(
    State(messages): State<MessageStore>,
    User(user): User,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    messages.remove(&id, &user).await?;
    Ok(StatusCode::OK)
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn update(
    State(messages): State<MessageStore>,
    User(user): User,
    Path(id): Path<String>,
    body: Result<Json<MessageBody>, JsonRejection>,
) -> AppResult<StatusCode> {
    let Json(MessageBody { to, text, kind }) = body.map_err(|e| AppError::validation(e.body_text()))?;

    messages
        .update(
            &id,
            &user,
            &to.unwrap_or_default(),
            &text.unwrap_or_default(),
            &kind.unwrap_or_default(),
        )
        .await?;

    Ok(StatusCode::OK)
}
