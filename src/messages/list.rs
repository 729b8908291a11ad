use std::num::IntErrorKind;

use axum::{debug_handler, extract::{rejection::QueryRejection, Query, State}, Json};
use serde::Deserialize;

use crate::{db::Message, identity::User, AppError, AppResult};

use super::MessageStore;

#[derive(Deserialize)]
pub(crate) struct ListQuery {
    limit: Option<String>,
}

/// A limit past `u32::MAX` is clamped; it already asks for more messages than can exist.
fn parse_limit(raw: Option<String>) -> AppResult<Option<u32>> {
    raw.map(|raw| match raw.trim().parse::<u32>() {
        Ok(limit) if limit > 0 => Ok(limit),
        Err(e) if *e.kind() == IntErrorKind::PosOverflow => Ok(u32::MAX),
        _ => Err(AppError::validation(format!("limit {raw:?} is not a positive integer"))),
    })
    .transpose()
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn list(
    State(messages): State<MessageStore>,
    User(user): User,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> AppResult<Json<Vec<Message>>> {
    let Query(ListQuery { limit }) = query.map_err(|e| AppError::validation(e.body_text()))?;
    let limit = parse_limit(limit)?;

    Ok(Json(messages.list_for(&user, limit).await?))
}
