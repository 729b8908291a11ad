use axum::{debug_handler, extract::{rejection::JsonRejection, State}, http::StatusCode, Json};
use serde::Deserialize;

use crate::{db::Participant, AppError, AppResult};

use super::Registry;

#[derive(Deserialize)]
pub(crate) struct JoinBody {
    name: Option<String>,
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn join(
    State(registry): State<Registry>,
    body: Result<Json<JoinBody>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Participant>)> {
    let Json(JoinBody { name }) = body.map_err(|e| AppError::validation(e.body_text()))?;
    let name = name.ok_or_else(|| AppError::validation("name is required"))?;

    let participant = registry.register(&name).await?;
    Ok((StatusCode::CREATED, Json(participant)))
}
