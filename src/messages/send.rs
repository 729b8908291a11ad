use axum::{debug_handler, extract::{rejection::JsonRejection, State}, http::StatusCode, Json};

use crate::{db::Message, identity::User, AppError, AppResult};

use super::{MessageBody, MessageStore};

#[debug_handler(state = crate::AppState)]
pub(crate) async fn send(
    State(messages): State<MessageStore>,
    User(user): User,
    body: Result<Json<MessageBody>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Message>)> {
    let Json(MessageBody { to, text, kind }) = body.map_err(|e| AppError::validation(e.body_text()))?;

    let message = messages
        .send(
            &user,
            &to.ok_or_else(|| AppError::validation("to is required"))?,
            &text.ok_or_else(|| AppError::validation("text is required"))?,
            &kind.ok_or_else(|| AppError::validation("type is required"))?,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(message)))
}
